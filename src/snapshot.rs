//! Portable snapshot of one account's graph.
//!
//! The wire format is `{"users": [...], "connections": [...]}` with an optional
//! `lastModified` timestamp. Imports are checked against every structural
//! invariant before a [`GraphStore`] is built, so a rejected snapshot never
//! leaves a partially replaced graph behind.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    SocialGraphError,
    graph::{Connection, GraphStore, User},
    safety::run_strict_safety_checks,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub users: Vec<User>,
    pub connections: Vec<Connection>,
    #[serde(
        rename = "lastModified",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub last_modified: Option<DateTime<Utc>>,
}

pub fn export_snapshot(graph: &GraphStore) -> GraphSnapshot {
    GraphSnapshot {
        users: graph.users().to_vec(),
        connections: graph.connections().to_vec(),
        last_modified: graph.last_modified(),
    }
}

pub fn import_snapshot(snapshot: GraphSnapshot) -> Result<GraphStore, SocialGraphError> {
    run_strict_safety_checks(&snapshot)?;
    GraphStore::from_records(
        snapshot.users,
        snapshot.connections,
        snapshot.last_modified,
    )
}

impl GraphStore {
    pub fn snapshot(&self) -> GraphSnapshot {
        export_snapshot(self)
    }

    /// Swaps in the snapshot's contents as a new mutation; on error `self` is untouched.
    pub fn replace_with(&mut self, snapshot: GraphSnapshot) -> Result<(), SocialGraphError> {
        let mut next = import_snapshot(snapshot)?;
        if let Some(previous) = self.last_modified() {
            next.observe_modified(previous);
        }
        next.touch();
        *self = next;
        Ok(())
    }
}

pub fn snapshot_to_string(snapshot: &GraphSnapshot) -> Result<String, SocialGraphError> {
    serde_json::to_string(snapshot).map_err(|e| SocialGraphError::validation(e.to_string()))
}

pub fn snapshot_from_str(input: &str) -> Result<GraphSnapshot, SocialGraphError> {
    serde_json::from_str(input).map_err(|e| SocialGraphError::validation(e.to_string()))
}

pub fn write_snapshot<W: Write>(
    snapshot: &GraphSnapshot,
    mut writer: W,
) -> Result<(), SocialGraphError> {
    serde_json::to_writer_pretty(&mut writer, snapshot)
        .map_err(|e| SocialGraphError::persistence(e.to_string()))?;
    writer
        .flush()
        .map_err(|e| SocialGraphError::persistence(e.to_string()))
}

pub fn read_snapshot<R: Read>(reader: R) -> Result<GraphSnapshot, SocialGraphError> {
    serde_json::from_reader(reader).map_err(|e| SocialGraphError::validation(e.to_string()))
}

pub fn dump_graph_to_path<P: AsRef<Path>>(
    graph: &GraphStore,
    path: P,
) -> Result<(), SocialGraphError> {
    let file =
        File::create(path.as_ref()).map_err(|e| SocialGraphError::persistence(e.to_string()))?;
    write_snapshot(&export_snapshot(graph), BufWriter::new(file))
}

pub fn load_graph_from_path<P: AsRef<Path>>(path: P) -> Result<GraphStore, SocialGraphError> {
    let file =
        File::open(path.as_ref()).map_err(|e| SocialGraphError::persistence(e.to_string()))?;
    import_snapshot(read_snapshot(BufReader::new(file))?)
}
