//! Durable per-account storage of canonical graphs.
//!
//! Adapters only move whole snapshots keyed by [`AccountId`]; serializing
//! read-modify-write cycles is the job of [`crate::canonical::CanonicalStore`].

use std::sync::Arc;

use ahash::AHashMap;
use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use crate::{
    SocialGraphError,
    config::{StorageConfig, StorageKind},
    ids::AccountId,
    snapshot::GraphSnapshot,
};

#[cfg(feature = "sqlite-store")]
mod sqlite;

#[cfg(feature = "sqlite-store")]
pub use sqlite::SqlitePersistence;

#[async_trait]
pub trait PersistenceAdapter: Send + Sync {
    /// Returns the stored snapshot, or `NotFound` when the account has none yet.
    async fn load(&self, account: &AccountId) -> Result<GraphSnapshot, SocialGraphError>;

    async fn save(
        &self,
        account: &AccountId,
        snapshot: &GraphSnapshot,
    ) -> Result<(), SocialGraphError>;
}

#[async_trait]
impl<P> PersistenceAdapter for Arc<P>
where
    P: PersistenceAdapter + ?Sized,
{
    async fn load(&self, account: &AccountId) -> Result<GraphSnapshot, SocialGraphError> {
        (**self).load(account).await
    }

    async fn save(
        &self,
        account: &AccountId,
        snapshot: &GraphSnapshot,
    ) -> Result<(), SocialGraphError> {
        (**self).save(account, snapshot).await
    }
}

#[derive(Default)]
pub struct MemoryPersistence {
    graphs: RwLock<AHashMap<AccountId, GraphSnapshot>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accounts(&self) -> Vec<AccountId> {
        let mut accounts: Vec<_> = self.graphs.read().keys().cloned().collect();
        accounts.sort();
        accounts
    }
}

#[async_trait]
impl PersistenceAdapter for MemoryPersistence {
    async fn load(&self, account: &AccountId) -> Result<GraphSnapshot, SocialGraphError> {
        debug!(%account, "memory load");
        self.graphs
            .read()
            .get(account)
            .cloned()
            .ok_or_else(|| SocialGraphError::not_found(format!("graph for account {account}")))
    }

    async fn save(
        &self,
        account: &AccountId,
        snapshot: &GraphSnapshot,
    ) -> Result<(), SocialGraphError> {
        debug!(%account, users = snapshot.users.len(), "memory save");
        self.graphs.write().insert(account.clone(), snapshot.clone());
        Ok(())
    }
}

/// Opens the store selected by `config`.
pub fn open_store(config: &StorageConfig) -> Result<Arc<dyn PersistenceAdapter>, SocialGraphError> {
    match config.kind {
        StorageKind::Memory => Ok(Arc::new(MemoryPersistence::new())),
        #[cfg(feature = "sqlite-store")]
        StorageKind::Sqlite => {
            let path = config
                .path
                .as_deref()
                .ok_or_else(|| SocialGraphError::validation("sqlite storage requires a path"))?;
            Ok(Arc::new(SqlitePersistence::open(path)?))
        }
        #[cfg(not(feature = "sqlite-store"))]
        StorageKind::Sqlite => Err(SocialGraphError::validation(
            "sqlite storage is not compiled in",
        )),
    }
}
