// # Config Store Trait
//
// Persistence for the user's [`Config`] record.
//
// Components never write the record themselves. The workflow saves a
// changed copy only after the operation it describes has succeeded, so a
// failed scheduler install can never leave `autoUpdate = true` behind.

use async_trait::async_trait;

use crate::config::Config;

/// Persistent storage for [`Config`]
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Load the record
    ///
    /// # Returns
    ///
    /// - `Ok(Some(config))`: A record exists
    /// - `Ok(None)`: Nothing saved yet
    /// - `Err(Error)`: Storage error
    async fn load(&self) -> Result<Option<Config>, crate::Error>;

    /// Replace the record
    async fn save(&self, config: &Config) -> Result<(), crate::Error>;

    /// Delete the record. Deleting a missing record succeeds.
    async fn clear(&self) -> Result<(), crate::Error>;
}
