//! Client for an engine running in a separate process.
//!
//! The child is started directly with an argv array. Identifiers travel as
//! discrete arguments and are never joined into a shell command line, so ids
//! containing quotes or shell metacharacters reach the engine verbatim.

use std::{
    ffi::{OsStr, OsString},
    path::{Path, PathBuf},
};

use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use tokio::process::Command;
use tracing::debug;

use crate::{
    SocialGraphError,
    graph::{Connection, User},
    ids::{AccountId, UserId},
    snapshot::GraphSnapshot,
};

/// Reply to `save`: counts of the graph now stored for the account.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct SaveAck {
    pub saved: bool,
    pub users: usize,
    pub connections: usize,
}

pub struct ExternalEngine {
    program: PathBuf,
    base_args: Vec<OsString>,
}

impl ExternalEngine {
    pub fn new<P: Into<PathBuf>>(program: P) -> Self {
        Self {
            program: program.into(),
            base_args: Vec::new(),
        }
    }

    /// Targets one account of the store at `db` (`memory` or a SQLite path).
    pub fn with_store<P: Into<PathBuf>>(program: P, db: &str, account: &AccountId) -> Self {
        let mut engine = Self::new(program);
        engine.base_args = vec![
            "--db".into(),
            db.into(),
            "--account".into(),
            account.as_str().into(),
        ];
        engine
    }

    pub async fn add_user(&self, name: &str) -> Result<User, SocialGraphError> {
        self.call(&["add-user", name]).await
    }

    pub async fn connect(&self, a: &UserId, b: &UserId) -> Result<Connection, SocialGraphError> {
        self.call(&["connect", a.as_str(), b.as_str()]).await
    }

    pub async fn check_connection(&self, a: &UserId, b: &UserId) -> Result<bool, SocialGraphError> {
        let value: Value = self
            .call(&["check-connection", a.as_str(), b.as_str()])
            .await?;
        value
            .get("connected")
            .and_then(Value::as_bool)
            .ok_or_else(|| SocialGraphError::persistence("engine reply lacks `connected`"))
    }

    pub async fn mutual_friends(&self, a: &UserId, b: &UserId) -> Result<Vec<User>, SocialGraphError> {
        self.call(&["mutual-friends", a.as_str(), b.as_str()]).await
    }

    pub async fn suggest_friends(&self, id: &UserId) -> Result<Vec<User>, SocialGraphError> {
        self.call(&["suggest-friends", id.as_str()]).await
    }

    pub async fn find_communities(&self) -> Result<Vec<Vec<User>>, SocialGraphError> {
        self.call(&["find-communities"]).await
    }

    pub async fn load(&self) -> Result<GraphSnapshot, SocialGraphError> {
        self.call(&["load"]).await
    }

    /// Replaces the account graph with the snapshot file at `snapshot`, or
    /// writes the current graph back when no file is given.
    pub async fn save(&self, snapshot: Option<&Path>) -> Result<SaveAck, SocialGraphError> {
        let mut args = vec![OsStr::new("save")];
        args.extend(snapshot.map(Path::as_os_str));
        self.call(args.as_slice()).await
    }

    async fn call<T, S>(&self, args: &[S]) -> Result<T, SocialGraphError>
    where
        T: DeserializeOwned,
        S: AsRef<OsStr>,
    {
        let command = args.first().map(|arg| arg.as_ref().to_string_lossy().into_owned());
        debug!(program = %self.program.display(), command = ?command, "spawning engine");
        let output = Command::new(&self.program)
            .args(&self.base_args)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| SocialGraphError::persistence(e.to_string()))?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let value: Value = serde_json::from_str(stdout.trim()).map_err(|e| {
            SocialGraphError::persistence(format!(
                "engine exited with {} and unreadable output: {e}",
                output.status
            ))
        })?;
        if let Some(err) = value.get("error") {
            return Err(serde_json::from_value(err.clone())
                .unwrap_or_else(|_| SocialGraphError::persistence(err.to_string())));
        }
        if !output.status.success() {
            return Err(SocialGraphError::persistence(format!(
                "engine exited with {}",
                output.status
            )));
        }
        serde_json::from_value(value).map_err(|e| SocialGraphError::persistence(e.to_string()))
    }
}
