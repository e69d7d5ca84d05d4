use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use tracing::warn;

use todosync_core::{PendingOp, SyncError, SyncResult, Task};

const TASKS_SLOT: &str = "tasks";
const PENDING_SLOT: &str = "pending_ops";
const TOKEN_SLOT: &str = "auth_token";

/// Durable key/value storage backing the task cache, the pending queue
/// and the auth token.
///
/// The cache and queue accessors are fail-soft: a broken or missing slot
/// reads back as empty and write failures are logged and swallowed, so a
/// full disk degrades the app to session-only instead of breaking it.
#[derive(Clone)]
pub struct LocalStore {
    pool: SqlitePool,
}

impl LocalStore {
    /// Open (and if needed create) the store at `url`, e.g.
    /// `sqlite:todosync.db?mode=rwc` or `sqlite::memory:`.
    pub async fn open(url: &str) -> SyncResult<Self> {
        // one connection: an in-memory database per-connection would
        // otherwise hand each pooled connection its own empty store
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await
            .map_err(|e| SyncError::Storage(e.to_string()))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS slots (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await
        .map_err(|e| SyncError::Storage(e.to_string()))?;

        Ok(LocalStore { pool })
    }

    async fn read_slot(&self, key: &str) -> SyncResult<Option<String>> {
        let row = sqlx::query("SELECT value FROM slots WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| SyncError::Storage(e.to_string()))?;

        match row {
            Some(row) => {
                let value: String = row
                    .try_get("value")
                    .map_err(|e| SyncError::Storage(e.to_string()))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn write_slot(&self, key: &str, value: &str) -> SyncResult<()> {
        sqlx::query(
            "INSERT INTO slots (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|e| SyncError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn delete_slot(&self, key: &str) -> SyncResult<()> {
        sqlx::query("DELETE FROM slots WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| SyncError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Persist the task cache. Failures are logged and swallowed.
    pub async fn save_tasks(&self, tasks: &[Task]) {
        self.save_json(TASKS_SLOT, tasks).await;
    }

    /// Read back the cached task list; empty on absence or corruption.
    pub async fn load_tasks(&self) -> Vec<Task> {
        self.load_json(TASKS_SLOT).await
    }

    /// Persist the pending operation queue. Failures are logged and swallowed.
    pub async fn save_pending(&self, ops: &[PendingOp]) {
        self.save_json(PENDING_SLOT, ops).await;
    }

    /// Read back the pending queue; empty on absence or corruption.
    pub async fn load_pending(&self) -> Vec<PendingOp> {
        self.load_json(PENDING_SLOT).await
    }

    pub async fn save_token(&self, token: &str) -> SyncResult<()> {
        self.write_slot(TOKEN_SLOT, token).await
    }

    pub async fn load_token(&self) -> SyncResult<Option<String>> {
        self.read_slot(TOKEN_SLOT).await
    }

    pub async fn clear_token(&self) -> SyncResult<()> {
        self.delete_slot(TOKEN_SLOT).await
    }

    async fn save_json<T: serde::Serialize + ?Sized>(&self, slot: &str, value: &T) {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                warn!(slot, error = %e, "failed to encode slot, keeping previous value");
                return;
            }
        };
        if let Err(e) = self.write_slot(slot, &json).await {
            warn!(slot, error = %e, "failed to persist slot");
        }
    }

    async fn load_json<T: serde::de::DeserializeOwned>(&self, slot: &str) -> Vec<T> {
        let raw = match self.read_slot(slot).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(slot, error = %e, "failed to read slot, treating as empty");
                return Vec::new();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!(slot, error = %e, "corrupt slot, treating as empty");
                Vec::new()
            }
        }
    }
}
