use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

use supalink::client;
use supalink::config::Config;
use supalink::diag::{self, CheckStatus};
use supalink::storage::Platform;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PlatformArg {
    /// Browser context with working local storage.
    Web,
    /// Web rendering without a window (server-side rendering).
    HeadlessWeb,
    /// Native runtime with a persistent data directory.
    Native,
}

#[derive(Debug, Parser)]
#[command(author, version, about = "Connection check for the Supabase backend wiring")]
struct Args {
    /// Runtime platform to emulate for storage selection
    #[arg(long, value_enum, default_value = "native")]
    platform: PlatformArg,
    /// Data directory for the native session store
    #[arg(long, default_value = "./data")]
    data_dir: PathBuf,
}

impl Args {
    fn platform(&self) -> Platform {
        match self.platform {
            PlatformArg::Web => Platform::Web { has_window: true },
            PlatformArg::HeadlessWeb => Platform::Web { has_window: false },
            PlatformArg::Native => Platform::Native {
                data_dir: self.data_dir.clone(),
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();

    // Missing environment variables are fatal here, before any client
    // exists; db/auth problems later are captured as log lines instead.
    let cfg = Config::from_env()?;
    let client = client::init(&cfg, &args.platform())?;
    info!("running connection check");

    let report = diag::run_connection_check(client).await;
    for line in &report.lines {
        println!("\u{2022} {line}");
    }
    println!("Status: {}", report.status.as_str());

    Ok(match report.status {
        CheckStatus::Passed => ExitCode::SUCCESS,
        CheckStatus::Failed => ExitCode::FAILURE,
    })
}
