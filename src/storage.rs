//! Session storage adapters and platform selection.
//!
//! The backend client persists session tokens through a small key-value
//! interface. Which implementation backs that interface depends on where the
//! process runs: a browser context gets the synchronous local-storage
//! analogue, a windowless web context (server-side rendering) gets a no-op
//! store, and a native runtime gets an async file-backed store. The platform
//! is passed in explicitly so the selection stays a pure, testable function.
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::fs;

/// Runtime platform, as detected by the embedding application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Platform {
    /// Web rendering context. `has_window` is false when rendering
    /// server-side, where no local storage exists.
    Web { has_window: bool },
    /// Native mobile/desktop runtime with a writable data directory.
    Native { data_dir: PathBuf },
}

/// Key-value interface the client uses to persist session tokens.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn get_item(&self, key: &str) -> Result<Option<String>>;
    async fn set_item(&self, key: &str, value: &str) -> Result<()>;
    async fn remove_item(&self, key: &str) -> Result<()>;
}

/// Synchronous in-process store wrapped in the async interface, standing in
/// for `window.localStorage`.
#[derive(Debug, Default)]
pub struct LocalStorage {
    items: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl SessionStorage for LocalStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.lock().unwrap().get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.items.lock().unwrap().insert(key.into(), value.into());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        self.items.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Storage that remembers nothing. Session persistence is intentionally
/// disabled in windowless web contexts rather than erroring.
#[derive(Debug, Default)]
pub struct NoopStorage;

#[async_trait]
impl SessionStorage for NoopStorage {
    async fn get_item(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn set_item(&self, _key: &str, _value: &str) -> Result<()> {
        Ok(())
    }

    async fn remove_item(&self, _key: &str) -> Result<()> {
        Ok(())
    }
}

/// Persistent store for native runtimes: one JSON object file under the
/// application data directory.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join("session-store.json"),
        }
    }

    async fn load(&self) -> Result<Map<String, Value>> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => {
                let value: Value =
                    serde_json::from_str(&content).context("corrupt session store file")?;
                match value {
                    Value::Object(map) => Ok(map),
                    _ => Ok(Map::new()),
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
            Err(err) => Err(err).context("failed to read session store file"),
        }
    }

    async fn save(&self, map: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("failed to create session store directory")?;
        }
        let content = serde_json::to_string(map)?;
        fs::write(&self.path, content)
            .await
            .context("failed to write session store file")
    }
}

#[async_trait]
impl SessionStorage for FileStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        let map = self.load().await?;
        Ok(map.get(key).and_then(|v| v.as_str()).map(String::from))
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut map = self.load().await?;
        map.insert(key.into(), Value::String(value.into()));
        self.save(&map).await
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        let mut map = self.load().await?;
        if map.remove(key).is_some() {
            self.save(&map).await?;
        }
        Ok(())
    }
}

/// Pick the storage adapter for a platform. Evaluated once, at client
/// construction.
pub fn select_storage(platform: &Platform) -> Arc<dyn SessionStorage> {
    match platform {
        Platform::Web { has_window: true } => Arc::new(LocalStorage::default()),
        Platform::Web { has_window: false } => Arc::new(NoopStorage),
        Platform::Native { data_dir } => Arc::new(FileStorage::new(data_dir)),
    }
}

/// Auth subsystem options derived from the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub auto_refresh_token: bool,
    pub persist_session: bool,
    pub detect_session_in_url: bool,
}

impl SessionOptions {
    pub fn for_platform(platform: &Platform) -> Self {
        // Persistence and refresh are disabled only where storage is a no-op.
        let persistent = !matches!(platform, Platform::Web { has_window: false });
        Self {
            auto_refresh_token: persistent,
            persist_session: persistent,
            // The app never parses auth redirects out of a URL.
            detect_session_in_url: false,
        }
    }
}
