use crate::{
    algo, bfs,
    graph::{GraphStore, User},
    ids::UserId,
};

/// Read-only engine calls bound to one graph snapshot.
pub struct GraphQuery<'a> {
    graph: &'a GraphStore,
}

impl<'a> GraphQuery<'a> {
    pub fn new(graph: &'a GraphStore) -> Self {
        Self { graph }
    }

    pub fn neighbors(&self, id: &UserId) -> Vec<UserId> {
        self.graph.neighbors(id)
    }

    pub fn are_directly_connected(&self, a: &UserId, b: &UserId) -> bool {
        bfs::are_directly_connected(self.graph, a, b)
    }

    pub fn are_connected(&self, a: &UserId, b: &UserId) -> bool {
        bfs::are_connected(self.graph, a, b)
    }

    pub fn reachable_from(&self, start: &UserId) -> Vec<UserId> {
        bfs::reachable_from(self.graph, start)
    }

    pub fn mutual_friends(&self, a: &UserId, b: &UserId) -> Vec<User> {
        algo::mutual_friends(self.graph, a, b)
    }

    pub fn suggest_friends(&self, id: &UserId) -> Vec<User> {
        algo::suggest_friends(self.graph, id)
    }

    pub fn find_components(&self) -> Vec<Vec<User>> {
        algo::find_components(self.graph)
    }

    pub fn degree(&self, id: &UserId) -> usize {
        algo::degree(self.graph, id)
    }
}

impl GraphStore {
    pub fn query(&self) -> GraphQuery<'_> {
        GraphQuery::new(self)
    }
}
