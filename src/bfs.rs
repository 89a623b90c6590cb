use std::collections::VecDeque;

use crate::{graph::GraphStore, ids::UserId};

pub fn are_directly_connected(graph: &GraphStore, a: &UserId, b: &UserId) -> bool {
    graph.connection_exists(a, b)
}

/// Reachability over the undirected adjacency. Unknown ids are never
/// connected; a known id is connected to itself.
pub fn are_connected(graph: &GraphStore, a: &UserId, b: &UserId) -> bool {
    if graph.connection_exists(a, b) {
        return true;
    }
    let (Some(start), Some(end)) = (graph.index_of(a), graph.index_of(b)) else {
        return false;
    };
    if start == end {
        return true;
    }
    let mut seen = vec![false; graph.user_count()];
    let mut queue = VecDeque::new();
    seen[start] = true;
    queue.push_back(start);
    while let Some(node) = queue.pop_front() {
        for &next in graph.neighbor_indices(node) {
            if next == end {
                return true;
            }
            if !seen[next] {
                seen[next] = true;
                queue.push_back(next);
            }
        }
    }
    false
}

/// Users reachable from `start` in breadth-first order, `start` first.
pub fn reachable_from(graph: &GraphStore, start: &UserId) -> Vec<UserId> {
    let Some(origin) = graph.index_of(start) else {
        return Vec::new();
    };
    let mut seen = vec![false; graph.user_count()];
    let mut order = Vec::new();
    let mut queue = VecDeque::new();
    seen[origin] = true;
    queue.push_back(origin);
    while let Some(node) = queue.pop_front() {
        order.push(graph.user_at(node).id.clone());
        for &next in graph.neighbor_indices(node) {
            if !seen[next] {
                seen[next] = true;
                queue.push_back(next);
            }
        }
    }
    order
}
