use std::{io::ErrorKind, path::PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::{config, error::StoreError, types::StoredToken};

/// Durable home of the refresh token. The access token is never handed to a
/// store.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn load(&self) -> Result<Option<String>, StoreError>;
    async fn save(&self, refresh_token: &str) -> Result<(), StoreError>;
}

/// Keeps the refresh token in a JSON file under the local data directory.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: PathBuf) -> Self {
        FileTokenStore { path }
    }

    /// `<data_local_dir>/spotlink/cache/token.json`
    pub fn default_location() -> Self {
        Self::new(config::data_dir().join("cache").join("token.json"))
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self) -> Result<Option<String>, StoreError> {
        let content = match async_fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let stored: StoredToken = serde_json::from_str(&content)?;
        Ok(Some(stored.refresh_token).filter(|t| !t.is_empty()))
    }

    async fn save(&self, refresh_token: &str) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(&StoredToken {
            refresh_token: refresh_token.to_string(),
            saved_at: Utc::now(),
        })?;
        async_fs::write(&self.path, json).await?;
        Ok(())
    }
}

/// In-process store, for hosts with their own persistence and for tests.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(refresh_token: impl Into<String>) -> Self {
        MemoryTokenStore {
            token: Mutex::new(Some(refresh_token.into())),
        }
    }

    pub async fn current(&self) -> Option<String> {
        self.token.lock().await.clone()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> Result<Option<String>, StoreError> {
        Ok(self.current().await)
    }

    async fn save(&self, refresh_token: &str) -> Result<(), StoreError> {
        *self.token.lock().await = Some(refresh_token.to_string());
        Ok(())
    }
}
