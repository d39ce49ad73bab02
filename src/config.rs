//! Environment-based configuration for the Supabase client.
//!
//! Values come from process environment variables only. Each setting has a
//! primary name and an Expo-prefixed fallback so the same environment file
//! works for both server-side tooling and the mobile build pipeline.
use reqwest::Url;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable. Set one of: {0}")]
    Missing(String),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Resolved startup configuration. Both fields are guaranteed non-blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

/// Read `primary` from the environment, falling back to `fallback`.
/// Blank (all-whitespace) values count as absent.
pub fn read_env(primary: &str, fallback: Option<&str>) -> Option<String> {
    std::env::var(primary)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(|| {
            fallback
                .and_then(|name| std::env::var(name).ok())
                .filter(|v| !v.trim().is_empty())
        })
}

/// Insist that a resolved value is present. The error names every variable
/// that was checked so an operator knows which ones to set.
pub fn require_env(value: Option<String>, labels: &[&str]) -> Result<String, ConfigError> {
    value.ok_or_else(|| ConfigError::Missing(labels.join(", ")))
}

impl Config {
    /// Resolve the full configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let cfg = Config {
            supabase_url: require_env(
                read_env("SUPABASE_URL", Some("EXPO_PUBLIC_SUPABASE_URL")),
                &["SUPABASE_URL", "EXPO_PUBLIC_SUPABASE_URL"],
            )?,
            supabase_anon_key: require_env(
                read_env("SUPABASE_ANON_KEY", Some("EXPO_PUBLIC_SUPABASE_ANON_KEY")),
                &["SUPABASE_ANON_KEY", "EXPO_PUBLIC_SUPABASE_ANON_KEY"],
            )?,
        };
        validate(&cfg)?;
        Ok(cfg)
    }
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if Url::parse(&cfg.supabase_url).is_err() {
        return Err(ConfigError::Invalid("supabase_url must be an absolute URL"));
    }
    if cfg.supabase_anon_key.trim().is_empty() {
        return Err(ConfigError::Invalid("supabase_anon_key must be non-empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment mutation is process-global; serialize these tests.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear(names: &[&str]) {
        for name in names {
            std::env::remove_var(name);
        }
    }

    #[test]
    fn read_env_prefers_primary() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear(&["SL_TEST_PRIMARY", "SL_TEST_FALLBACK"]);
        std::env::set_var("SL_TEST_PRIMARY", "from-primary");
        std::env::set_var("SL_TEST_FALLBACK", "from-fallback");
        let got = read_env("SL_TEST_PRIMARY", Some("SL_TEST_FALLBACK"));
        assert_eq!(got.as_deref(), Some("from-primary"));
        clear(&["SL_TEST_PRIMARY", "SL_TEST_FALLBACK"]);
    }

    #[test]
    fn read_env_uses_fallback_when_primary_absent_or_blank() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear(&["SL_TEST_PRIMARY", "SL_TEST_FALLBACK"]);
        std::env::set_var("SL_TEST_FALLBACK", "from-fallback");
        let got = read_env("SL_TEST_PRIMARY", Some("SL_TEST_FALLBACK"));
        assert_eq!(got.as_deref(), Some("from-fallback"));

        std::env::set_var("SL_TEST_PRIMARY", "   ");
        let got = read_env("SL_TEST_PRIMARY", Some("SL_TEST_FALLBACK"));
        assert_eq!(got.as_deref(), Some("from-fallback"));
        clear(&["SL_TEST_PRIMARY", "SL_TEST_FALLBACK"]);
    }

    #[test]
    fn read_env_absent_when_neither_set() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear(&["SL_TEST_PRIMARY", "SL_TEST_FALLBACK"]);
        assert_eq!(read_env("SL_TEST_PRIMARY", Some("SL_TEST_FALLBACK")), None);
        assert_eq!(read_env("SL_TEST_PRIMARY", None), None);
    }

    #[test]
    fn require_env_lists_all_candidate_names() {
        let err = require_env(None, &["SUPABASE_URL", "EXPO_PUBLIC_SUPABASE_URL"]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("SUPABASE_URL"));
        assert!(msg.contains("EXPO_PUBLIC_SUPABASE_URL"));
    }

    #[test]
    fn require_env_passes_value_through() {
        let got = require_env(Some("abc".into()), &["X"]).unwrap();
        assert_eq!(got, "abc");
    }

    #[test]
    fn from_env_fails_without_variables() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear(&[
            "SUPABASE_URL",
            "EXPO_PUBLIC_SUPABASE_URL",
            "SUPABASE_ANON_KEY",
            "EXPO_PUBLIC_SUPABASE_ANON_KEY",
        ]);
        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::Missing(names) => assert!(names.contains("SUPABASE_URL")),
            other => panic!("wrong error: {other}"),
        }
    }

    #[test]
    fn from_env_accepts_fallback_names() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear(&["SUPABASE_URL", "SUPABASE_ANON_KEY"]);
        std::env::set_var("EXPO_PUBLIC_SUPABASE_URL", "https://demo.supabase.co");
        std::env::set_var("EXPO_PUBLIC_SUPABASE_ANON_KEY", "anon-key");
        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.supabase_url, "https://demo.supabase.co");
        assert_eq!(cfg.supabase_anon_key, "anon-key");
        clear(&["EXPO_PUBLIC_SUPABASE_URL", "EXPO_PUBLIC_SUPABASE_ANON_KEY"]);
    }

    #[test]
    fn invalid_url_rejected() {
        let cfg = Config {
            supabase_url: "not a url".into(),
            supabase_anon_key: "k".into(),
        };
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("supabase_url")),
            other => panic!("wrong error: {other}"),
        }
    }
}
