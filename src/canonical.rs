//! Server side of the sync protocol: the authoritative graph per account.
//!
//! Every write is a read-modify-write cycle against the [`PersistenceAdapter`].
//! Cycles for the same account are serialized by a per-account async lock, so
//! two concurrent `connect` commits both land instead of one overwriting the
//! other. Accounts never share a lock or any graph state.

use std::sync::Arc;

use ahash::AHashMap;
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::{
    SocialGraphError,
    auth::{AuthGateway, Credential, authorize},
    graph::GraphStore,
    ids::AccountId,
    persistence::PersistenceAdapter,
    snapshot::{GraphSnapshot, import_snapshot},
    sync::{CommitReceipt, Mutation, RemoteGraph},
};

pub struct CanonicalStore<P, A> {
    persistence: P,
    gateway: A,
    locks: Mutex<AHashMap<AccountId, Arc<tokio::sync::Mutex<()>>>>,
}

impl<P, A> CanonicalStore<P, A>
where
    P: PersistenceAdapter,
    A: AuthGateway,
{
    pub fn new(persistence: P, gateway: A) -> Self {
        Self {
            persistence,
            gateway,
            locks: Mutex::new(AHashMap::new()),
        }
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    /// Binds a credential to this store, producing a replica's remote.
    pub fn session(self: &Arc<Self>, credential: Credential) -> CanonicalSession<P, A> {
        CanonicalSession {
            store: Arc::clone(self),
            credential,
        }
    }

    pub async fn commit(
        &self,
        credential: &Credential,
        mutation: &Mutation,
    ) -> Result<CommitReceipt, SocialGraphError> {
        let account = authorize(&self.gateway, credential).await?;
        let lock = self.account_lock(&account);
        let outcome = {
            let _guard = lock.lock().await;
            debug!(%account, op = mutation.kind(), "account locked");
            self.apply_locked(account.clone(), mutation).await
        };
        self.release_lock(&account, lock);
        outcome
    }

    async fn apply_locked(
        &self,
        account: AccountId,
        mutation: &Mutation,
    ) -> Result<CommitReceipt, SocialGraphError> {
        let mut graph = self.read_graph(&account).await?;
        mutation.apply(&mut graph)?;
        let snapshot = graph.snapshot();
        self.persistence.save(&account, &snapshot).await?;

        let last_modified = graph
            .last_modified()
            .ok_or_else(|| SocialGraphError::persistence("committed graph has no timestamp"))?;
        info!(%account, op = mutation.kind(), "canonical graph updated");
        Ok(CommitReceipt {
            account,
            last_modified,
        })
    }

    pub async fn load(&self, credential: &Credential) -> Result<GraphSnapshot, SocialGraphError> {
        let account = authorize(&self.gateway, credential).await?;
        self.persistence.load(&account).await
    }

    /// Stores a whole snapshot after validating it; the previous graph survives a rejection.
    pub async fn save(
        &self,
        credential: &Credential,
        snapshot: GraphSnapshot,
    ) -> Result<CommitReceipt, SocialGraphError> {
        self.commit(credential, &Mutation::Replace { snapshot })
            .await
    }

    /// Runs a read-only query against the account's current canonical graph.
    pub async fn read<T, F>(&self, credential: &Credential, query: F) -> Result<T, SocialGraphError>
    where
        F: FnOnce(&GraphStore) -> T,
    {
        let account = authorize(&self.gateway, credential).await?;
        let graph = self.read_graph(&account).await?;
        Ok(query(&graph))
    }

    async fn read_graph(&self, account: &AccountId) -> Result<GraphStore, SocialGraphError> {
        match self.persistence.load(account).await {
            Ok(snapshot) => import_snapshot(snapshot),
            Err(SocialGraphError::NotFound(_)) => Ok(GraphStore::new()),
            Err(err) => Err(err),
        }
    }

    /// Number of accounts with a commit in flight or waiting.
    pub fn locked_accounts(&self) -> usize {
        self.locks.lock().len()
    }

    fn account_lock(&self, account: &AccountId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock();
        Arc::clone(locks.entry(account.clone()).or_default())
    }

    /// Drops the table entry once no other commit holds or awaits it. Clones
    /// are only taken under the table lock, so the count cannot grow here.
    fn release_lock(&self, account: &AccountId, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.locks.lock();
        if Arc::strong_count(&lock) == 2 {
            locks.remove(account);
        }
    }
}

pub struct CanonicalSession<P, A> {
    store: Arc<CanonicalStore<P, A>>,
    credential: Credential,
}

#[async_trait]
impl<P, A> RemoteGraph for CanonicalSession<P, A>
where
    P: PersistenceAdapter,
    A: AuthGateway,
{
    async fn commit(&self, mutation: &Mutation) -> Result<CommitReceipt, SocialGraphError> {
        self.store.commit(&self.credential, mutation).await
    }

    async fn fetch(&self) -> Result<GraphSnapshot, SocialGraphError> {
        self.store.load(&self.credential).await
    }
}
