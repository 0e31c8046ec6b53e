use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::DateTime;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info, warn};
use crate::core::{
    Mutation, NewUploadTask, QueueError, Result, StoreListener, Subscribers, SubscriptionId,
    TaskId, TaskStore, TaskView, UploadStatus, UploadTask, MediaKind,
};

/// Highest schema version this build knows how to open.
pub const SCHEMA_VERSION: i64 = 1;

const SCHEMA_V1: &str = "
    CREATE TABLE IF NOT EXISTS upload_queue (
        id           INTEGER PRIMARY KEY AUTOINCREMENT,
        payload      BLOB    NOT NULL,
        media_kind   TEXT    NOT NULL,
        display_name TEXT    NOT NULL,
        byte_size    INTEGER NOT NULL,
        status       TEXT    NOT NULL,
        created_at   INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_upload_queue_status ON upload_queue(status);
";

const TASK_COLUMNS: &str = "id, payload, media_kind, display_name, byte_size, status, created_at";
const VIEW_COLUMNS: &str = "id, display_name, media_kind, byte_size, status, created_at";

/// Upload queue persisted in an embedded SQLite database.
pub struct SqliteTaskStore {
    conn: Mutex<Connection>,
    subscribers: Subscribers,
}

impl SqliteTaskStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        let store = Self::init(conn)?;
        info!(path = %path.display(), "upload queue database opened");
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            subscribers: Subscribers::new(),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| QueueError::internal("upload queue connection lock poisoned"))
    }

    /// Push the refreshed snapshot while the connection is still held, so
    /// listeners observe mutations in the order they were applied.
    ///
    /// Runs after the write is committed; a failed read only skips this
    /// notification and never turns the write into an error.
    fn publish(&self, conn: &Connection) {
        if self.subscribers.is_empty() {
            return;
        }
        match read_views(conn) {
            Ok(snapshot) => self.subscribers.notify(&snapshot),
            Err(e) => warn!(error = %e, "could not refresh queue listeners"),
        }
    }
}

fn migrate(conn: &Connection) -> Result<()> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if version > SCHEMA_VERSION {
        return Err(QueueError::SchemaVersion {
            found: version,
            supported: SCHEMA_VERSION,
        });
    }

    if version < 1 {
        conn.execute_batch(SCHEMA_V1)?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        debug!(version = SCHEMA_VERSION, "upload queue schema created");
    }

    Ok(())
}

fn created_at_from_millis(index: usize, millis: i64) -> rusqlite::Result<DateTime<chrono::Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(index, millis))
}

fn row_to_task(row: &Row<'_>) -> rusqlite::Result<UploadTask> {
    let payload: Vec<u8> = row.get(1)?;
    let byte_size: i64 = row.get(4)?;

    Ok(UploadTask {
        id: TaskId(row.get(0)?),
        payload: Bytes::from(payload),
        media_kind: row.get(2)?,
        display_name: row.get(3)?,
        byte_size: byte_size as u64,
        status: row.get(5)?,
        created_at: created_at_from_millis(6, row.get(6)?)?,
    })
}

fn row_to_view(row: &Row<'_>) -> rusqlite::Result<TaskView> {
    let byte_size: i64 = row.get(3)?;

    Ok(TaskView {
        id: TaskId(row.get(0)?),
        display_name: row.get(1)?,
        media_kind: row.get(2)?,
        byte_size: byte_size as u64,
        status: row.get(4)?,
        created_at: created_at_from_millis(5, row.get(5)?)?,
    })
}

fn read_views(conn: &Connection) -> Result<Vec<TaskView>> {
    let mut stmt = conn.prepare_cached(&format!("SELECT {VIEW_COLUMNS} FROM upload_queue ORDER BY id"))?;
    let views = stmt
        .query_map([], row_to_view)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(views)
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn insert(&self, task: NewUploadTask) -> Result<TaskId> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO upload_queue (payload, media_kind, display_name, byte_size, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                &task.payload[..],
                task.media_kind,
                task.display_name,
                task.byte_size as i64,
                UploadStatus::Pending,
                task.created_at.timestamp_millis(),
            ],
        )?;
        let id = TaskId(conn.last_insert_rowid());
        self.publish(&conn);
        Ok(id)
    }

    async fn query_by_status(&self, status: UploadStatus) -> Result<Vec<UploadTask>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {TASK_COLUMNS} FROM upload_queue WHERE status = ?1 ORDER BY id"
        ))?;
        let tasks = stmt
            .query_map(params![status], row_to_task)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    async fn update_status(&self, id: TaskId, status: UploadStatus) -> Result<Mutation> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE upload_queue SET status = ?1 WHERE id = ?2",
            params![status, id.0],
        )?;
        if changed == 0 {
            return Ok(Mutation::NotFound);
        }
        self.publish(&conn);
        Ok(Mutation::Applied)
    }

    async fn delete(&self, id: TaskId) -> Result<Mutation> {
        let conn = self.lock()?;
        let changed = conn.execute("DELETE FROM upload_queue WHERE id = ?1", params![id.0])?;
        if changed == 0 {
            return Ok(Mutation::NotFound);
        }
        self.publish(&conn);
        Ok(Mutation::Applied)
    }

    async fn get(&self, id: TaskId) -> Result<Option<UploadTask>> {
        let conn = self.lock()?;
        let task = conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM upload_queue WHERE id = ?1"),
                params![id.0],
                row_to_task,
            )
            .optional()?;
        Ok(task)
    }

    async fn snapshot(&self) -> Result<Vec<TaskView>> {
        let conn = self.lock()?;
        read_views(&conn)
    }

    async fn subscribe(&self, listener: StoreListener) -> Result<SubscriptionId> {
        let conn = self.lock()?;
        let id = self.subscribers.add(listener);
        let snapshot = read_views(&conn)?;
        self.subscribers.notify_one(id, &snapshot);
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.remove(id)
    }
}

impl ToSql for UploadStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for UploadStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value.as_str()?.parse().map_err(|err| FromSqlError::Other(Box::new(err)))
    }
}

impl ToSql for MediaKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for MediaKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value.as_str()?.parse().map_err(|err| FromSqlError::Other(Box::new(err)))
    }
}
