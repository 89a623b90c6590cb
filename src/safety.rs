use std::fmt;

use ahash::AHashSet;
use serde::Serialize;

use crate::{SocialGraphError, snapshot::GraphSnapshot};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SafetyReport {
    pub total_users: usize,
    pub total_connections: usize,
    pub malformed_records: usize,
    pub duplicate_user_ids: usize,
    pub duplicate_connection_ids: usize,
    pub self_loops: usize,
    pub duplicate_edges: usize,
    pub dangling_edges: usize,
}

impl SafetyReport {
    pub fn merge(&mut self, other: &SafetyReport) {
        self.total_users = self.total_users.max(other.total_users);
        self.total_connections = self.total_connections.max(other.total_connections);
        self.malformed_records += other.malformed_records;
        self.duplicate_user_ids += other.duplicate_user_ids;
        self.duplicate_connection_ids += other.duplicate_connection_ids;
        self.self_loops += other.self_loops;
        self.duplicate_edges += other.duplicate_edges;
        self.dangling_edges += other.dangling_edges;
    }

    pub fn has_issues(&self) -> bool {
        self.malformed_records > 0
            || self.duplicate_user_ids > 0
            || self.duplicate_connection_ids > 0
            || self.self_loops > 0
            || self.duplicate_edges > 0
            || self.dangling_edges > 0
    }
}

#[derive(Debug)]
pub struct SafetyError {
    pub report: SafetyReport,
}

impl fmt::Display for SafetyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = &self.report;
        write!(
            f,
            "snapshot rejected: malformed={} duplicate_user_ids={} duplicate_connection_ids={} \
             self_loops={} duplicate_edges={} dangling_edges={}",
            r.malformed_records,
            r.duplicate_user_ids,
            r.duplicate_connection_ids,
            r.self_loops,
            r.duplicate_edges,
            r.dangling_edges
        )
    }
}

impl std::error::Error for SafetyError {}

impl From<SafetyError> for SocialGraphError {
    fn from(err: SafetyError) -> Self {
        SocialGraphError::integrity(err.to_string())
    }
}

pub fn validate_records(snapshot: &GraphSnapshot) -> SafetyReport {
    let mut report = base_report(snapshot);
    report.malformed_records = snapshot
        .users
        .iter()
        .filter(|u| u.id.as_str().trim().is_empty() || u.name.trim().is_empty())
        .count()
        + snapshot
            .connections
            .iter()
            .filter(|c| {
                c.id.as_str().trim().is_empty()
                    || c.a.as_str().trim().is_empty()
                    || c.b.as_str().trim().is_empty()
            })
            .count();
    report
}

pub fn validate_unique_ids(snapshot: &GraphSnapshot) -> SafetyReport {
    let mut report = base_report(snapshot);
    let mut users = AHashSet::new();
    report.duplicate_user_ids = snapshot
        .users
        .iter()
        .filter(|u| !users.insert(u.id.as_str()))
        .count();
    let mut connections = AHashSet::new();
    report.duplicate_connection_ids = snapshot
        .connections
        .iter()
        .filter(|c| !connections.insert(c.id.as_str()))
        .count();
    report
}

pub fn validate_no_self_loops(snapshot: &GraphSnapshot) -> SafetyReport {
    let mut report = base_report(snapshot);
    report.self_loops = snapshot.connections.iter().filter(|c| c.a == c.b).count();
    report
}

pub fn validate_no_duplicate_edges(snapshot: &GraphSnapshot) -> SafetyReport {
    let mut report = base_report(snapshot);
    let mut pairs = AHashSet::new();
    report.duplicate_edges = snapshot
        .connections
        .iter()
        .filter(|c| c.a != c.b)
        .filter(|c| {
            let pair = if c.a <= c.b {
                (c.a.as_str(), c.b.as_str())
            } else {
                (c.b.as_str(), c.a.as_str())
            };
            !pairs.insert(pair)
        })
        .count();
    report
}

pub fn validate_referential_integrity(snapshot: &GraphSnapshot) -> SafetyReport {
    let mut report = base_report(snapshot);
    let known: AHashSet<&str> = snapshot.users.iter().map(|u| u.id.as_str()).collect();
    report.dangling_edges = snapshot
        .connections
        .iter()
        .filter(|c| !known.contains(c.a.as_str()) || !known.contains(c.b.as_str()))
        .count();
    report
}

pub fn run_safety_checks(snapshot: &GraphSnapshot) -> SafetyReport {
    let mut report = SafetyReport::default();
    report.merge(&validate_records(snapshot));
    report.merge(&validate_unique_ids(snapshot));
    report.merge(&validate_no_self_loops(snapshot));
    report.merge(&validate_no_duplicate_edges(snapshot));
    report.merge(&validate_referential_integrity(snapshot));
    report
}

pub fn run_strict_safety_checks(snapshot: &GraphSnapshot) -> Result<(), SafetyError> {
    let report = run_safety_checks(snapshot);
    if report.has_issues() {
        Err(SafetyError { report })
    } else {
        Ok(())
    }
}

fn base_report(snapshot: &GraphSnapshot) -> SafetyReport {
    SafetyReport {
        total_users: snapshot.users.len(),
        total_connections: snapshot.connections.len(),
        ..SafetyReport::default()
    }
}
