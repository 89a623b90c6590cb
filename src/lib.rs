//! Per-account social graph engine.
//!
//! Each account owns one undirected graph of users and connections
//! ([`GraphStore`]). Read-only algorithms ([`bfs`], [`algo`], reachable via
//! [`GraphStore::query`]) answer connectivity, mutual-friend, suggestion and
//! connected-component questions. [`SyncController`] keeps a client replica in
//! step with the canonical graph held by [`CanonicalStore`], rolling the
//! replica back whenever a commit fails.
//!
//! ```rust
//! use socialgraph::GraphStore;
//!
//! let mut graph = GraphStore::new();
//! let a = graph.add_user("ada").unwrap();
//! let b = graph.add_user("bob").unwrap();
//! let c = graph.add_user("cy").unwrap();
//! graph.connect(&a.id, &b.id).unwrap();
//! graph.connect(&b.id, &c.id).unwrap();
//!
//! assert!(graph.query().are_connected(&a.id, &c.id));
//! assert_eq!(graph.query().suggest_friends(&a.id), vec![c]);
//! ```

pub mod algo;
pub mod auth;
pub mod bench_utils;
pub mod bfs;
pub mod canonical;
pub mod client;
pub mod config;
pub mod errors;
pub mod external;
pub mod graph;
pub mod ids;
pub mod persistence;
pub mod query;
pub mod safety;
pub mod snapshot;
pub mod sync;

pub use crate::auth::{AuthGateway, Credential, Principal, StaticAuthGateway};
pub use crate::canonical::{CanonicalSession, CanonicalStore};
pub use crate::config::{SocialGraphConfig, StorageKind, SyncConfig};
pub use crate::errors::SocialGraphError;
pub use crate::external::{ExternalEngine, SaveAck};
pub use crate::graph::{Connection, GraphStore, User};
pub use crate::ids::{AccountId, ConnectionId, UserId};
pub use crate::persistence::{MemoryPersistence, PersistenceAdapter, open_store};
pub use crate::query::GraphQuery;
pub use crate::snapshot::{GraphSnapshot, export_snapshot, import_snapshot};
pub use crate::sync::{CommitReceipt, Mutation, RemoteGraph, SyncController, SyncState};

#[cfg(feature = "sqlite-store")]
pub use crate::persistence::SqlitePersistence;
