use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use super::PersistenceAdapter;
use crate::{
    SocialGraphError,
    ids::AccountId,
    snapshot::{GraphSnapshot, snapshot_from_str, snapshot_to_string},
};

/// One row per account holding the serialized snapshot. Statements run on
/// tokio's blocking pool so async callers never stall a runtime worker.
pub struct SqlitePersistence {
    conn: Arc<Mutex<Connection>>,
}

impl SqlitePersistence {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SocialGraphError> {
        let conn =
            Connection::open(path).map_err(|e| SocialGraphError::persistence(e.to_string()))?;
        ensure_schema(&conn)?;
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> Result<Self, SocialGraphError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| SocialGraphError::persistence(e.to_string()))?;
        ensure_schema(&conn)?;
        Ok(Self::from_connection(conn))
    }

    pub fn account_ids(&self) -> Result<Vec<AccountId>, SocialGraphError> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT account_id FROM account_graphs ORDER BY account_id")
            .map_err(|e| SocialGraphError::persistence(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| SocialGraphError::persistence(e.to_string()))?;
        let mut ids = Vec::new();
        for id in rows {
            ids.push(AccountId(
                id.map_err(|e| SocialGraphError::persistence(e.to_string()))?,
            ));
        }
        Ok(ids)
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T, SocialGraphError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, SocialGraphError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || op(&conn.lock()))
            .await
            .map_err(|e| SocialGraphError::persistence(e.to_string()))?
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }
}

#[async_trait]
impl PersistenceAdapter for SqlitePersistence {
    async fn load(&self, account: &AccountId) -> Result<GraphSnapshot, SocialGraphError> {
        debug!(%account, "sqlite load");
        let key = account.as_str().to_string();
        let stored: Option<String> = self
            .blocking(move |conn| {
                conn.query_row(
                    "SELECT snapshot FROM account_graphs WHERE account_id=?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| SocialGraphError::persistence(e.to_string()))
            })
            .await?;
        match stored {
            Some(text) => snapshot_from_str(&text)
                .map_err(|e| SocialGraphError::persistence(format!("corrupt snapshot: {e}"))),
            None => Err(SocialGraphError::not_found(format!(
                "graph for account {account}"
            ))),
        }
    }

    async fn save(
        &self,
        account: &AccountId,
        snapshot: &GraphSnapshot,
    ) -> Result<(), SocialGraphError> {
        debug!(%account, users = snapshot.users.len(), "sqlite save");
        let text = snapshot_to_string(snapshot)?;
        let modified = snapshot.last_modified.map(|ts| ts.to_rfc3339());
        let key = account.as_str().to_string();
        self.blocking(move |conn| {
            conn.execute(
                "INSERT INTO account_graphs(account_id, snapshot, last_modified) VALUES(?1, ?2, ?3)
                 ON CONFLICT(account_id) DO UPDATE SET snapshot=excluded.snapshot,
                 last_modified=excluded.last_modified",
                params![key, text, modified],
            )
            .map(|_| ())
            .map_err(|e| SocialGraphError::persistence(e.to_string()))
        })
        .await
    }
}

fn ensure_schema(conn: &Connection) -> Result<(), SocialGraphError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS account_graphs (
            account_id    TEXT PRIMARY KEY,
            snapshot      TEXT NOT NULL,
            last_modified TEXT
        );
        "#,
    )
    .map_err(|e| SocialGraphError::persistence(e.to_string()))?;
    Ok(())
}
