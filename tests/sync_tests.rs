use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use socialgraph::{
    AccountId, CanonicalStore, CommitReceipt, Connection, ConnectionId, Credential,
    GraphSnapshot, GraphStore, MemoryPersistence, Mutation, PersistenceAdapter, RemoteGraph,
    SocialGraphError, StaticAuthGateway, SyncConfig, SyncController, SyncState, User, UserId,
};

type Store = CanonicalStore<Arc<MemoryPersistence>, Arc<StaticAuthGateway>>;

struct Fixture {
    persistence: Arc<MemoryPersistence>,
    gateway: Arc<StaticAuthGateway>,
    store: Arc<Store>,
}

fn fixture() -> Fixture {
    let persistence = Arc::new(MemoryPersistence::new());
    let gateway = Arc::new(StaticAuthGateway::new());
    gateway.register("alice-token", AccountId::from("alice"));
    gateway.register("bob-token", AccountId::from("bob"));
    let store = Arc::new(CanonicalStore::new(
        Arc::clone(&persistence),
        Arc::clone(&gateway),
    ));
    Fixture {
        persistence,
        gateway,
        store,
    }
}

fn replica(
    store: &Arc<Store>,
    token: &str,
) -> SyncController<socialgraph::CanonicalSession<Arc<MemoryPersistence>, Arc<StaticAuthGateway>>> {
    SyncController::new(store.session(Credential::bearer(token)), &SyncConfig::default())
}

/// Remote that fails every commit after counting it.
#[derive(Default)]
struct FailingRemote {
    commits: AtomicUsize,
}

#[async_trait]
impl RemoteGraph for FailingRemote {
    async fn commit(&self, _mutation: &Mutation) -> Result<CommitReceipt, SocialGraphError> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        Err(SocialGraphError::persistence("disk full"))
    }

    async fn fetch(&self) -> Result<GraphSnapshot, SocialGraphError> {
        Err(SocialGraphError::persistence("offline"))
    }
}

struct SlowRemote {
    delay: Duration,
}

#[async_trait]
impl RemoteGraph for SlowRemote {
    async fn commit(&self, _mutation: &Mutation) -> Result<CommitReceipt, SocialGraphError> {
        tokio::time::sleep(self.delay).await;
        Ok(CommitReceipt {
            account: AccountId::from("slow"),
            last_modified: Utc::now(),
        })
    }

    async fn fetch(&self) -> Result<GraphSnapshot, SocialGraphError> {
        tokio::time::sleep(self.delay).await;
        Ok(GraphSnapshot::default())
    }
}

fn seeded_graph() -> (GraphStore, UserId, UserId) {
    let mut graph = GraphStore::new();
    let a = graph.add_user("ada").expect("ada").id;
    let b = graph.add_user("bob").expect("bob").id;
    (graph, a, b)
}

#[tokio::test]
async fn test_committed_mutations_reach_canonical_graph() {
    let fx = fixture();
    let mut client = replica(&fx.store, "alice-token");
    client.pull().await.expect("pull");
    let a = client.add_user("ada").await.expect("ada");
    let b = client.add_user("bob").await.expect("bob");
    let edge = client.connect(&a.id, &b.id).await.expect("connect");
    assert_eq!(client.state(), SyncState::Committed);

    let canonical = fx
        .persistence
        .load(&AccountId::from("alice"))
        .await
        .expect("stored");
    assert_eq!(canonical.users, vec![a, b]);
    assert_eq!(canonical.connections, vec![edge]);
    assert!(client.local().last_modified() >= canonical.last_modified);
}

#[tokio::test]
async fn test_failed_commit_restores_replica_exactly() {
    let (graph, a, b) = seeded_graph();
    let before = graph.clone();
    let mut client = SyncController::with_local(graph, FailingRemote::default(), &SyncConfig::default());

    let err = client.connect(&a, &b).await.expect_err("remote failure");
    assert!(matches!(err, SocialGraphError::Persistence(_)));
    assert_eq!(client.state(), SyncState::RolledBack);
    assert_eq!(client.local(), &before);
    assert!(!client.local().connection_exists(&a, &b));

    let err = client.add_user("cy").await.expect_err("remote failure");
    assert!(matches!(err, SocialGraphError::Persistence(_)));
    assert_eq!(client.local(), &before);
    assert_eq!(client.remote().commits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_local_rejection_never_reaches_remote() {
    let (graph, a, _) = seeded_graph();
    let before = graph.clone();
    let mut client = SyncController::with_local(graph, FailingRemote::default(), &SyncConfig::default());

    let err = client.add_user("ada").await.expect_err("duplicate");
    assert!(matches!(err, SocialGraphError::Duplicate(_)));
    let err = client.connect(&a, &a).await.expect_err("self loop");
    assert!(matches!(err, SocialGraphError::Validation(_)));

    assert_eq!(client.state(), SyncState::Idle);
    assert_eq!(client.local(), &before);
    assert_eq!(client.remote().commits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_commit_timeout_rolls_back() {
    let (graph, a, b) = seeded_graph();
    let before = graph.clone();
    let config = SyncConfig::with_timeout(Duration::from_millis(20));
    let remote = SlowRemote {
        delay: Duration::from_millis(500),
    };
    let mut client = SyncController::with_local(graph, remote, &config);

    let err = client.connect(&a, &b).await.expect_err("timeout");
    assert!(matches!(err, SocialGraphError::Persistence(_)));
    assert_eq!(client.state(), SyncState::RolledBack);
    assert_eq!(client.local(), &before);

    let err = client.pull().await.expect_err("fetch timeout");
    assert!(matches!(err, SocialGraphError::Persistence(_)));
    assert_eq!(client.local(), &before);
}

#[tokio::test]
async fn test_unknown_token_is_rejected_and_rolled_back() {
    let fx = fixture();
    let mut client = replica(&fx.store, "stolen-token");
    let err = client.add_user("mallory").await.expect_err("auth");
    assert!(matches!(err, SocialGraphError::Auth(_)));
    assert_eq!(client.state(), SyncState::RolledBack);
    assert_eq!(client.local().user_count(), 0);
    assert!(fx.persistence.accounts().is_empty());
}

#[tokio::test]
async fn test_inactive_account_cannot_commit_or_read() {
    let fx = fixture();
    fx.gateway.set_active(&AccountId::from("alice"), false);
    let mut client = replica(&fx.store, "alice-token");
    assert!(matches!(
        client.add_user("ada").await,
        Err(SocialGraphError::Auth(_))
    ));
    assert!(matches!(client.pull().await, Err(SocialGraphError::Auth(_))));

    fx.gateway.set_active(&AccountId::from("alice"), true);
    client.add_user("ada").await.expect("reactivated");
}

#[tokio::test]
async fn test_stale_replica_duplicate_is_rolled_back() {
    let fx = fixture();
    let mut first = replica(&fx.store, "alice-token");
    let mut stale = replica(&fx.store, "alice-token");
    first.add_user("ann").await.expect("ann");

    let err = stale.add_user("ann").await.expect_err("canonical duplicate");
    assert!(matches!(err, SocialGraphError::Duplicate(_)));
    assert_eq!(stale.state(), SyncState::RolledBack);
    assert_eq!(stale.local().user_count(), 0);

    stale.pull().await.expect("pull");
    assert_eq!(stale.local().users(), first.local().users());
}

#[tokio::test]
async fn test_pull_without_stored_graph_starts_empty() {
    let fx = fixture();
    let (graph, _, _) = seeded_graph();
    let mut client = SyncController::with_local(
        graph,
        fx.store.session(Credential::bearer("bob-token")),
        &SyncConfig::default(),
    );
    client.pull().await.expect("pull");
    assert_eq!(client.local().user_count(), 0);
}

#[tokio::test]
async fn test_import_replaces_both_sides_and_rejects_bad_snapshots() {
    let fx = fixture();
    let mut client = replica(&fx.store, "alice-token");
    client.add_user("old").await.expect("old");

    let snapshot = GraphSnapshot {
        users: vec![
            User { id: UserId::from("u1"), name: "one".into() },
            User { id: UserId::from("u2"), name: "two".into() },
        ],
        connections: vec![Connection {
            id: ConnectionId::from("c1"),
            a: UserId::from("u1"),
            b: UserId::from("u2"),
        }],
        last_modified: None,
    };
    client.import(snapshot.clone()).await.expect("import");
    let stored = fx
        .store
        .persistence()
        .load(&AccountId::from("alice"))
        .await
        .expect("stored");
    assert_eq!(stored.users, snapshot.users);
    assert_eq!(stored.connections, snapshot.connections);

    let before = client.local().clone();
    let mut dangling = snapshot;
    dangling.connections[0].b = UserId::from("u9");
    let err = client.import(dangling).await.expect_err("dangling");
    assert!(matches!(err, SocialGraphError::ReferentialIntegrity(_)));
    assert_eq!(client.local(), &before);
    assert_eq!(client.state(), SyncState::Idle);
}

#[tokio::test]
async fn test_accounts_are_isolated() {
    let fx = fixture();
    let mut alice = replica(&fx.store, "alice-token");
    let mut bob = replica(&fx.store, "bob-token");
    alice.add_user("ada").await.expect("alice ada");
    bob.add_user("ada").await.expect("bob ada");
    bob.add_user("bea").await.expect("bob bea");

    let alice_count = fx
        .store
        .read(&Credential::bearer("alice-token"), |g| g.user_count())
        .await
        .expect("read");
    assert_eq!(alice_count, 1);
    assert_eq!(
        fx.persistence.accounts(),
        vec![AccountId::from("alice"), AccountId::from("bob")]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_commits_to_one_account_all_land() {
    let fx = fixture();
    let credential = Credential::bearer("alice-token");
    let hub = User {
        id: UserId::from("hub"),
        name: "hub".into(),
    };
    fx.store
        .commit(&credential, &Mutation::AddUser { user: hub })
        .await
        .expect("hub");
    for idx in 0..16 {
        let user = User {
            id: UserId::new(format!("spoke{idx}")),
            name: format!("spoke {idx}"),
        };
        fx.store
            .commit(&credential, &Mutation::AddUser { user })
            .await
            .expect("spoke");
    }

    let tasks: Vec<_> = (0..16)
        .map(|idx| {
            let store = Arc::clone(&fx.store);
            let credential = credential.clone();
            tokio::spawn(async move {
                let connection = Connection {
                    id: ConnectionId::new(format!("edge{idx}")),
                    a: UserId::from("hub"),
                    b: UserId::new(format!("spoke{idx}")),
                };
                store
                    .commit(&credential, &Mutation::Connect { connection })
                    .await
            })
        })
        .collect();
    for task in tasks {
        task.await.expect("join").expect("commit");
    }

    let degree = fx
        .store
        .read(&credential, |g| g.query().degree(&UserId::from("hub")))
        .await
        .expect("read");
    assert_eq!(degree, 16);
    assert_eq!(fx.store.locked_accounts(), 0);
}

#[tokio::test]
async fn test_canonical_commit_rejects_names_already_taken() {
    let fx = fixture();
    let credential = Credential::bearer("alice-token");
    let mut client = replica(&fx.store, "alice-token");
    let bob = client.add_user("bob").await.expect("bob");

    for name in [" bob ".to_string(), bob.id.to_string()] {
        let user = User {
            id: UserId::new(format!("replayed-{}", name.trim())),
            name,
        };
        let err = fx
            .store
            .commit(&credential, &Mutation::AddUser { user })
            .await
            .expect_err("taken name");
        assert!(matches!(err, SocialGraphError::Duplicate(_)));
    }

    let padded = User {
        id: UserId::from("replayed-cy"),
        name: "  cy ".into(),
    };
    fx.store
        .commit(&credential, &Mutation::AddUser { user: padded })
        .await
        .expect("fresh name");
    let names: Vec<String> = fx
        .store
        .read(&credential, |g| g.users().iter().map(|u| u.name.clone()).collect())
        .await
        .expect("read");
    assert_eq!(names, vec!["bob".to_string(), "cy".to_string()]);
    assert_eq!(fx.store.locked_accounts(), 0);
}

#[tokio::test]
async fn test_canonical_save_rejects_invalid_snapshot_and_keeps_previous() {
    let fx = fixture();
    let credential = Credential::bearer("alice-token");
    let mut client = replica(&fx.store, "alice-token");
    client.add_user("ada").await.expect("ada");
    let before = fx.store.load(&credential).await.expect("load");

    let bad = GraphSnapshot {
        users: vec![User { id: UserId::from("x"), name: "x".into() }],
        connections: vec![Connection {
            id: ConnectionId::from("c"),
            a: UserId::from("x"),
            b: UserId::from("x"),
        }],
        last_modified: None,
    };
    let err = fx.store.save(&credential, bad).await.expect_err("self loop");
    assert!(matches!(err, SocialGraphError::ReferentialIntegrity(_)));
    assert_eq!(fx.store.load(&credential).await.expect("load"), before);
}
