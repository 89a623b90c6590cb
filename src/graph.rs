use ahash::{AHashMap, AHashSet};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    errors::SocialGraphError,
    ids::{self, ConnectionId, UserId},
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
}

/// An unordered pair: `(a, b)` and `(b, a)` denote the same edge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Connection {
    pub id: ConnectionId,
    #[serde(alias = "user1Id")]
    pub a: UserId,
    #[serde(alias = "user2Id")]
    pub b: UserId,
}

/// One account's graph. Users are kept as dense indices so traversal never
/// re-hashes string ids; the lookup tables are derived from `users` and
/// `connections` and updated in place as records are pushed.
#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    users: Vec<User>,
    connections: Vec<Connection>,
    index: AHashMap<UserId, usize>,
    names: AHashSet<String>,
    connection_ids: AHashSet<ConnectionId>,
    pairs: AHashSet<(usize, usize)>,
    adjacency: Vec<Vec<usize>>,
    last_modified: Option<DateTime<Utc>>,
}

impl PartialEq for GraphStore {
    fn eq(&self, other: &Self) -> bool {
        self.users == other.users
            && self.connections == other.connections
            && self.last_modified == other.last_modified
    }
}

impl Eq for GraphStore {}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh id and inserts a user named `name`.
    pub fn add_user(&mut self, name: &str) -> Result<User, SocialGraphError> {
        let name = self.check_new_name(name)?;
        let id = ids::allocate(ids::USER_PREFIX, |candidate| {
            self.index.contains_key(&UserId::from(candidate))
        });
        let user = User {
            id: UserId(id),
            name: name.to_string(),
        };
        self.push_user(user.clone());
        self.touch();
        Ok(user)
    }

    /// Inserts a user whose id was allocated elsewhere (replaying a replica's mutation).
    pub fn insert_user(&mut self, user: User) -> Result<User, SocialGraphError> {
        if user.id.as_str().trim().is_empty() {
            return Err(SocialGraphError::validation("user id must be set"));
        }
        let name = self.check_new_name(&user.name)?.to_string();
        if self.index.contains_key(&user.id) {
            return Err(SocialGraphError::duplicate(format!("user {}", user.id)));
        }
        let user = User { id: user.id, name };
        self.push_user(user.clone());
        self.touch();
        Ok(user)
    }

    pub fn connect(&mut self, a: &UserId, b: &UserId) -> Result<Connection, SocialGraphError> {
        let (ia, ib) = self.validate_pair(a, b)?;
        let id = ids::allocate(ids::CONNECTION_PREFIX, |candidate| {
            self.connection_ids.contains(&ConnectionId::from(candidate))
        });
        let connection = Connection {
            id: ConnectionId(id),
            a: a.clone(),
            b: b.clone(),
        };
        self.push_connection(connection.clone(), ia, ib);
        self.touch();
        Ok(connection)
    }

    /// Inserts a connection whose id was allocated elsewhere.
    pub fn insert_connection(
        &mut self,
        connection: Connection,
    ) -> Result<Connection, SocialGraphError> {
        if connection.id.as_str().trim().is_empty() {
            return Err(SocialGraphError::validation("connection id must be set"));
        }
        if self.connection_ids.contains(&connection.id) {
            return Err(SocialGraphError::duplicate(format!(
                "connection {}",
                connection.id
            )));
        }
        let (ia, ib) = self.validate_pair(&connection.a, &connection.b)?;
        self.push_connection(connection.clone(), ia, ib);
        self.touch();
        Ok(connection)
    }

    pub fn connection_exists(&self, a: &UserId, b: &UserId) -> bool {
        match (self.index_of(a), self.index_of(b)) {
            (Some(ia), Some(ib)) => self.pairs.contains(&canonical_pair(ia, ib)),
            _ => false,
        }
    }

    /// Direct neighbors in connection-creation order; unknown ids yield nothing.
    pub fn neighbors(&self, id: &UserId) -> Vec<UserId> {
        match self.index_of(id) {
            Some(idx) => self.adjacency[idx]
                .iter()
                .map(|&n| self.users[n].id.clone())
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn user_by_id(&self, id: &UserId) -> Option<&User> {
        self.index_of(id).map(|idx| &self.users[idx])
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.last_modified
    }

    /// Adopts a timestamp reported by the canonical store without ever moving backwards.
    pub fn observe_modified(&mut self, at: DateTime<Utc>) {
        self.last_modified = Some(match self.last_modified {
            Some(previous) if previous > at => previous,
            _ => at,
        });
    }

    pub(crate) fn touch(&mut self) {
        self.observe_modified(Utc::now());
    }

    pub(crate) fn index_of(&self, id: &UserId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub(crate) fn user_at(&self, idx: usize) -> &User {
        &self.users[idx]
    }

    pub(crate) fn neighbor_indices(&self, idx: usize) -> &[usize] {
        &self.adjacency[idx]
    }

    pub(crate) fn edge_indices(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.connections
            .iter()
            .filter_map(|c| Some((self.index_of(&c.a)?, self.index_of(&c.b)?)))
    }

    /// Builds a graph from records that already passed the snapshot safety checks.
    pub(crate) fn from_records(
        users: Vec<User>,
        connections: Vec<Connection>,
        last_modified: Option<DateTime<Utc>>,
    ) -> Result<Self, SocialGraphError> {
        let mut graph = GraphStore::new();
        for user in users {
            if graph.index.contains_key(&user.id) {
                return Err(SocialGraphError::integrity(format!(
                    "duplicate user id {}",
                    user.id
                )));
            }
            graph.push_user(user);
        }
        for connection in connections {
            let (ia, ib) = graph
                .validate_pair(&connection.a, &connection.b)
                .map_err(|e| SocialGraphError::integrity(e.to_string()))?;
            if !graph.connection_ids.insert(connection.id.clone()) {
                return Err(SocialGraphError::integrity(format!(
                    "duplicate connection id {}",
                    connection.id
                )));
            }
            graph.push_connection(connection, ia, ib);
        }
        graph.last_modified = last_modified;
        Ok(graph)
    }

    fn validate_pair(&self, a: &UserId, b: &UserId) -> Result<(usize, usize), SocialGraphError> {
        if a.as_str().is_empty() || b.as_str().is_empty() {
            return Err(SocialGraphError::validation("both user ids are required"));
        }
        if a == b {
            return Err(SocialGraphError::validation("self loops are not supported"));
        }
        let ia = self
            .index_of(a)
            .ok_or_else(|| SocialGraphError::not_found(format!("user {a}")))?;
        let ib = self
            .index_of(b)
            .ok_or_else(|| SocialGraphError::not_found(format!("user {b}")))?;
        if self.pairs.contains(&canonical_pair(ia, ib)) {
            return Err(SocialGraphError::duplicate(format!("connection {a} - {b}")));
        }
        Ok((ia, ib))
    }

    /// Trims `name` and rejects it when empty or equal to an existing name or user id.
    fn check_new_name<'n>(&self, name: &'n str) -> Result<&'n str, SocialGraphError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SocialGraphError::validation("user name must be set"));
        }
        if self.names.contains(name) || self.index.contains_key(&UserId::from(name)) {
            return Err(SocialGraphError::duplicate(format!("user {name}")));
        }
        Ok(name)
    }

    fn push_user(&mut self, user: User) {
        self.index.insert(user.id.clone(), self.users.len());
        self.names.insert(user.name.clone());
        self.adjacency.push(Vec::new());
        self.users.push(user);
    }

    fn push_connection(&mut self, connection: Connection, ia: usize, ib: usize) {
        self.pairs.insert(canonical_pair(ia, ib));
        self.connection_ids.insert(connection.id.clone());
        self.adjacency[ia].push(ib);
        self.adjacency[ib].push(ia);
        self.connections.push(connection);
    }
}

fn canonical_pair(a: usize, b: usize) -> (usize, usize) {
    if a <= b { (a, b) } else { (b, a) }
}
