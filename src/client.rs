//! The shared Supabase client handle.
//!
//! One client is constructed per process from the resolved configuration and
//! an explicit platform value. Library code takes `&SupabaseClient`; only the
//! binary goes through the `init`/`get` singleton, so tests can build their
//! own instances pointed at a stub backend.
use anyhow::{anyhow, Context, Result};
use once_cell::sync::OnceCell;
use reqwest::{Client, Url};
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::auth::Session;
use crate::config::Config;
use crate::db::Table;
use crate::query::QueryBuilder;
use crate::storage::{select_storage, Platform, SessionOptions, SessionStorage};

/// Storage key under which the serialized session lives.
pub const SESSION_STORAGE_KEY: &str = "sb-auth-token";

pub struct SupabaseClient {
    http: Client,
    base_url: Url,
    anon_key: String,
    storage: Arc<dyn SessionStorage>,
    options: SessionOptions,
    session: RwLock<Option<Session>>,
}

impl fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("base_url", &self.base_url)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl SupabaseClient {
    /// Build a client from resolved configuration, selecting the storage
    /// adapter and session options for `platform`.
    pub fn new(config: &Config, platform: &Platform) -> Result<Self> {
        let base_url = Url::parse(&config.supabase_url).context("invalid Supabase URL")?;
        Ok(Self::with_parts(
            base_url,
            config.supabase_anon_key.clone(),
            select_storage(platform),
            SessionOptions::for_platform(platform),
        ))
    }

    /// Assemble a client from explicit parts. Used by `new` and by tests
    /// that point at a stub backend.
    pub fn with_parts(
        base_url: Url,
        anon_key: String,
        storage: Arc<dyn SessionStorage>,
        options: SessionOptions,
    ) -> Self {
        let http = Client::builder()
            .user_agent("supalink/0.1")
            .no_proxy()
            .build()
            .expect("reqwest client");
        Self {
            http,
            base_url,
            anon_key,
            storage,
            options,
            session: RwLock::new(None),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn options(&self) -> SessionOptions {
        self.options
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    pub(crate) fn anon_key(&self) -> &str {
        &self.anon_key
    }

    /// Start a query against one of the known tables.
    pub fn from(&self, table: Table) -> QueryBuilder<'_> {
        QueryBuilder::new(self, table)
    }

    /// Session currently held in memory, if any.
    pub async fn cached_session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    /// Access token for the current session, used as the bearer credential
    /// on query requests. Falls back to the anon key when absent.
    pub(crate) async fn access_token(&self) -> Option<String> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|s| s.access_token.clone())
    }

    /// Cache a session and, when the platform persists sessions, write it
    /// through to the storage adapter.
    pub(crate) async fn store_session(&self, session: Session) -> Result<()> {
        if self.options.persist_session {
            let serialized = serde_json::to_string(&session)?;
            self.storage
                .set_item(SESSION_STORAGE_KEY, &serialized)
                .await?;
        }
        *self.session.write().await = Some(session);
        Ok(())
    }

    /// Drop the cached session and its persisted copy.
    pub(crate) async fn clear_session(&self) -> Result<()> {
        self.storage.remove_item(SESSION_STORAGE_KEY).await?;
        *self.session.write().await = None;
        Ok(())
    }

    /// Read a previously persisted session from storage without caching it.
    /// A corrupt stored value is treated as absent.
    pub(crate) async fn persisted_session(&self) -> Result<Option<Session>> {
        let Some(raw) = self.storage.get_item(SESSION_STORAGE_KEY).await? else {
            return Ok(None);
        };
        Ok(serde_json::from_str(&raw).ok())
    }
}

static CLIENT: OnceCell<SupabaseClient> = OnceCell::new();

/// Construct the process-wide client. Callable once; later calls return the
/// already-initialized handle.
pub fn init(config: &Config, platform: &Platform) -> Result<&'static SupabaseClient> {
    CLIENT.get_or_try_init(|| SupabaseClient::new(config, platform))
}

/// The process-wide client, if `init` has run.
pub fn get() -> Result<&'static SupabaseClient> {
    CLIENT
        .get()
        .ok_or_else(|| anyhow!("Supabase client is not initialized"))
}
