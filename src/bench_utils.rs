use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    graph::{Connection, GraphStore, User},
    ids::{ConnectionId, UserId},
};

#[derive(Clone, Debug)]
pub enum GraphShape {
    Line,
    Star,
    RandomErdosRenyi { edges: usize },
    /// `count` dense groups with no edges between them.
    Clusters { count: usize, edges_per_user: usize },
}

pub fn user_id(idx: usize) -> UserId {
    UserId(format!("u{idx}"))
}

/// Builds a graph with ids `u0..u{n-1}`; identical inputs give identical users and connections.
pub fn generate_graph(shape: GraphShape, node_count: usize, seed: u64) -> GraphStore {
    assert!(node_count > 1, "node_count must exceed 1");
    let mut graph = GraphStore::new();
    for idx in 0..node_count {
        // `u{idx}` ids and names are unique, so this cannot fail.
        let _ = graph.insert_user(User {
            id: user_id(idx),
            name: format!("member {idx}"),
        });
    }
    let pairs: Vec<(usize, usize)> = match shape {
        GraphShape::Line => (1..node_count).map(|idx| (idx - 1, idx)).collect(),
        GraphShape::Star => (1..node_count).map(|idx| (0, idx)).collect(),
        GraphShape::RandomErdosRenyi { edges } => random_pairs(node_count, edges, seed),
        GraphShape::Clusters {
            count,
            edges_per_user,
        } => cluster_pairs(node_count, count.max(1), edges_per_user, seed),
    };
    // Random shapes draw self-loops and repeated pairs; the store rejects those and they are skipped.
    for (n, (a, b)) in pairs.into_iter().enumerate() {
        let _ = graph.insert_connection(Connection {
            id: ConnectionId(format!("c{n}")),
            a: user_id(a),
            b: user_id(b),
        });
    }
    graph
}

fn random_pairs(node_count: usize, edges: usize, seed: u64) -> Vec<(usize, usize)> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..edges)
        .map(|_| (rng.gen_range(0..node_count), rng.gen_range(0..node_count)))
        .collect()
}

fn cluster_pairs(
    node_count: usize,
    count: usize,
    edges_per_user: usize,
    seed: u64,
) -> Vec<(usize, usize)> {
    let mut rng = StdRng::seed_from_u64(seed);
    let width = node_count.div_ceil(count);
    let mut pairs = Vec::new();
    for idx in 0..node_count {
        let start = (idx / width) * width;
        let end = (start + width).min(node_count);
        for _ in 0..edges_per_user {
            pairs.push((idx, rng.gen_range(start..end)));
        }
    }
    pairs
}
