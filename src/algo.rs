use ahash::AHashSet;

use crate::{
    graph::{GraphStore, User},
    ids::UserId,
};

/// Neighbors shared by `a` and `b`, in `a`'s neighbor order.
pub fn mutual_friends(graph: &GraphStore, a: &UserId, b: &UserId) -> Vec<User> {
    let (Some(ia), Some(ib)) = (graph.index_of(a), graph.index_of(b)) else {
        return Vec::new();
    };
    let theirs: AHashSet<usize> = graph.neighbor_indices(ib).iter().copied().collect();
    graph
        .neighbor_indices(ia)
        .iter()
        .filter(|n| theirs.contains(n))
        .map(|&n| graph.user_at(n).clone())
        .collect()
}

/// Second-degree contacts of `id` that are neither `id` nor already direct neighbors.
pub fn suggest_friends(graph: &GraphStore, id: &UserId) -> Vec<User> {
    let Some(origin) = graph.index_of(id) else {
        return Vec::new();
    };
    let direct: AHashSet<usize> = graph.neighbor_indices(origin).iter().copied().collect();
    let mut seen = AHashSet::new();
    let mut suggestions = Vec::new();
    for &friend in graph.neighbor_indices(origin) {
        for &candidate in graph.neighbor_indices(friend) {
            if candidate == origin || direct.contains(&candidate) {
                continue;
            }
            if seen.insert(candidate) {
                suggestions.push(graph.user_at(candidate).clone());
            }
        }
    }
    suggestions
}

/// Connected components, isolated users included as singletons. Components
/// are ordered by their earliest-inserted member and keep insertion order inside.
pub fn find_components(graph: &GraphStore) -> Vec<Vec<User>> {
    let mut sets = DisjointSet::new(graph.user_count());
    for (a, b) in graph.edge_indices() {
        sets.union(a, b);
    }
    let mut slot_of_root = vec![usize::MAX; graph.user_count()];
    let mut components: Vec<Vec<User>> = Vec::new();
    for idx in 0..graph.user_count() {
        let root = sets.find(idx);
        if slot_of_root[root] == usize::MAX {
            slot_of_root[root] = components.len();
            components.push(Vec::new());
        }
        components[slot_of_root[root]].push(graph.user_at(idx).clone());
    }
    components
}

pub fn degree(graph: &GraphStore, id: &UserId) -> usize {
    graph
        .index_of(id)
        .map(|idx| graph.neighbor_indices(idx).len())
        .unwrap_or(0)
}

/// Union-find over dense indices with iterative path compression and union by size.
pub(crate) struct DisjointSet {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl DisjointSet {
    pub(crate) fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            size: vec![1; len],
        }
    }

    pub(crate) fn find(&mut self, mut node: usize) -> usize {
        let mut root = node;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    pub(crate) fn union(&mut self, a: usize, b: usize) -> bool {
        let (mut ra, mut rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        if self.size[ra] < self.size[rb] {
            std::mem::swap(&mut ra, &mut rb);
        }
        self.parent[rb] = ra;
        self.size[ra] += self.size[rb];
        true
    }
}

#[cfg(test)]
mod tests {
    use super::DisjointSet;

    #[test]
    fn long_chain_compresses_without_recursion() {
        let len = 200_000;
        let mut sets = DisjointSet::new(len);
        for idx in 1..len {
            sets.union(idx - 1, idx);
        }
        let root = sets.find(len - 1);
        assert_eq!(sets.find(0), root);
        assert!(!sets.union(0, len - 1));
    }
}
