// # Memory Config Store
//
// In-memory implementation of ConfigStore. Nothing survives the process;
// used by tests and by callers that manage persistence themselves.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::error::Result;
use crate::traits::ConfigStore;

/// In-memory config store
///
/// Clones share the same record, so a test can keep a handle and inspect
/// what the workflow saved.
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigStore {
    inner: Arc<RwLock<Option<Config>>>,
}

impl MemoryConfigStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `config`
    pub fn with_config(config: Config) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Some(config))),
        }
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn load(&self) -> Result<Option<Config>> {
        Ok(self.inner.read().await.clone())
    }

    async fn save(&self, config: &Config) -> Result<()> {
        *self.inner.write().await = Some(config.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.inner.write().await = None;
        Ok(())
    }
}
