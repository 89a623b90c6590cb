//! Optimistic replica synchronization.
//!
//! Every mutation runs through the same cycle:
//!
//! ```text
//! Idle -> Applying (local) -> Committing (remote) -> Committed | RolledBack
//! ```
//!
//! The local [`GraphStore`] is cloned before the mutation is applied. If the
//! remote commit fails for any reason, including a timeout, that clone is put
//! back so the replica is exactly what it was before the call. Read-only
//! queries never leave the process.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    SocialGraphError,
    config::SyncConfig,
    graph::{Connection, GraphStore, User},
    ids::{AccountId, UserId},
    query::GraphQuery,
    snapshot::{GraphSnapshot, import_snapshot},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    AddUser { user: User },
    Connect { connection: Connection },
    Replace { snapshot: GraphSnapshot },
}

impl Mutation {
    pub fn kind(&self) -> &'static str {
        match self {
            Mutation::AddUser { .. } => "add_user",
            Mutation::Connect { .. } => "connect",
            Mutation::Replace { .. } => "replace",
        }
    }

    /// Replays the mutation with the ids chosen by the replica that produced it.
    pub fn apply(&self, graph: &mut GraphStore) -> Result<(), SocialGraphError> {
        match self {
            Mutation::AddUser { user } => graph.insert_user(user.clone()).map(|_| ()),
            Mutation::Connect { connection } => {
                graph.insert_connection(connection.clone()).map(|_| ())
            }
            Mutation::Replace { snapshot } => graph.replace_with(snapshot.clone()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitReceipt {
    pub account: AccountId,
    pub last_modified: DateTime<Utc>,
}

/// The canonical side of a replica, already bound to one account.
#[async_trait]
pub trait RemoteGraph: Send + Sync {
    async fn commit(&self, mutation: &Mutation) -> Result<CommitReceipt, SocialGraphError>;
    async fn fetch(&self) -> Result<GraphSnapshot, SocialGraphError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Applying,
    Committing,
    Committed,
    RolledBack,
}

pub struct SyncController<R> {
    local: GraphStore,
    remote: R,
    state: SyncState,
    commit_timeout: Duration,
}

impl<R> SyncController<R>
where
    R: RemoteGraph,
{
    pub fn new(remote: R, config: &SyncConfig) -> Self {
        Self::with_local(GraphStore::new(), remote, config)
    }

    pub fn with_local(local: GraphStore, remote: R, config: &SyncConfig) -> Self {
        Self {
            local,
            remote,
            state: SyncState::Idle,
            commit_timeout: config.commit_timeout(),
        }
    }

    pub fn local(&self) -> &GraphStore {
        &self.local
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn query(&self) -> GraphQuery<'_> {
        self.local.query()
    }

    pub async fn add_user(&mut self, name: &str) -> Result<User, SocialGraphError> {
        self.run(|graph| {
            let user = graph.add_user(name)?;
            let mutation = Mutation::AddUser { user: user.clone() };
            Ok((user, mutation))
        })
        .await
    }

    pub async fn connect(
        &mut self,
        a: &UserId,
        b: &UserId,
    ) -> Result<Connection, SocialGraphError> {
        self.run(|graph| {
            let connection = graph.connect(a, b)?;
            let mutation = Mutation::Connect {
                connection: connection.clone(),
            };
            Ok((connection, mutation))
        })
        .await
    }

    /// Replaces the whole replica, then the canonical graph.
    pub async fn import(&mut self, snapshot: GraphSnapshot) -> Result<(), SocialGraphError> {
        self.run(|graph| {
            graph.replace_with(snapshot.clone())?;
            Ok(((), Mutation::Replace { snapshot }))
        })
        .await
    }

    /// Reloads the replica from the canonical graph; an account without a
    /// stored graph starts empty. Any other failure leaves the replica as is.
    pub async fn pull(&mut self) -> Result<(), SocialGraphError> {
        let fetched = tokio::time::timeout(self.commit_timeout, self.remote.fetch())
            .await
            .map_err(|_| {
                SocialGraphError::persistence(format!(
                    "fetch timed out after {:?}",
                    self.commit_timeout
                ))
            })?;
        self.local = match fetched {
            Ok(snapshot) => import_snapshot(snapshot)?,
            Err(SocialGraphError::NotFound(_)) => GraphStore::new(),
            Err(err) => return Err(err),
        };
        debug!(users = self.local.user_count(), "replica refreshed");
        Ok(())
    }

    async fn run<T, F>(&mut self, apply: F) -> Result<T, SocialGraphError>
    where
        F: FnOnce(&mut GraphStore) -> Result<(T, Mutation), SocialGraphError>,
    {
        self.state = SyncState::Applying;
        let before = self.local.clone();
        let (value, mutation) = match apply(&mut self.local) {
            Ok(applied) => applied,
            Err(err) => {
                debug!(error = %err, "mutation rejected locally");
                self.local = before;
                self.state = SyncState::Idle;
                return Err(err);
            }
        };

        self.state = SyncState::Committing;
        debug!(op = mutation.kind(), "committing");
        match self.commit(&mutation).await {
            Ok(receipt) => {
                self.local.observe_modified(receipt.last_modified);
                self.state = SyncState::Committed;
                info!(op = mutation.kind(), account = %receipt.account, "committed");
                Ok(value)
            }
            Err(err) => {
                self.local = before;
                self.state = SyncState::RolledBack;
                warn!(op = mutation.kind(), error = %err, "commit failed, replica rolled back");
                if err.is_local() {
                    debug!("canonical graph diverged from the replica; pull to refresh");
                }
                Err(err)
            }
        }
    }

    async fn commit(&self, mutation: &Mutation) -> Result<CommitReceipt, SocialGraphError> {
        tokio::time::timeout(self.commit_timeout, self.remote.commit(mutation))
            .await
            .map_err(|_| {
                SocialGraphError::persistence(format!(
                    "commit timed out after {:?}",
                    self.commit_timeout
                ))
            })?
    }
}
