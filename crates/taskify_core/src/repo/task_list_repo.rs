//! Task-list repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Mirror the whole task list as one JSON blob under a fixed key.
//! - Keep SQL and serialization details inside the persistence boundary.
//!
//! # Invariants
//! - An absent key reads back as `Ok(None)`, never as an error; a present
//!   but unparseable blob reads back as `CorruptBlob`.
//! - Read paths reject duplicate task ids instead of masking them.
//! - `save_tasks` replaces the stored blob wholesale; there is no delta
//!   persistence.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::task::Task;
use rusqlite::{params, Connection};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Fixed key under which the serialized task list lives.
pub const TASKS_KEY: &str = "tasks";

const KV_TABLE: &str = "kv_store";
const KV_REQUIRED_COLUMNS: &[&str] = &["key", "value", "updated_at"];

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for task-list persistence operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// The stored blob exists but cannot be decoded into a task list.
    CorruptBlob {
        key: &'static str,
        message: String,
    },
    /// The outgoing task list could not be serialized.
    Serialize(serde_json::Error),
    /// Connection has not been bootstrapped through `open_db`.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::CorruptBlob { key, message } => {
                write!(f, "corrupt blob under key `{key}`: {message}")
            }
            Self::Serialize(err) => write!(f, "task list serialization failed: {err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection not bootstrapped: schema version {actual_version}, expected {expected_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Serialize(err) => Some(err),
            Self::CorruptBlob { .. }
            | Self::UninitializedConnection { .. }
            | Self::MissingRequiredTable(_)
            | Self::MissingRequiredColumn { .. } => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for the durable task-list mirror.
pub trait TaskListRepository {
    /// Reads the stored list.
    ///
    /// `Ok(None)` means no blob has ever been written (first run).
    fn load_tasks(&self) -> RepoResult<Option<Vec<Task>>>;

    /// Serializes `tasks` and replaces the stored blob.
    fn save_tasks(&self, tasks: &[Task]) -> RepoResult<()>;
}

/// SQLite-backed task-list repository over the `kv_store` table.
pub struct SqliteTaskListRepository {
    conn: Connection,
}

impl SqliteTaskListRepository {
    /// Wraps a bootstrapped connection, rejecting one that has not been
    /// opened through `open_db` (wrong schema version, missing table or
    /// columns).
    pub fn try_new(conn: Connection) -> RepoResult<Self> {
        let actual_version =
            conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
        let expected_version = latest_version();
        if actual_version != expected_version {
            return Err(RepoError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }

        if !table_exists(&conn, KV_TABLE)? {
            return Err(RepoError::MissingRequiredTable(KV_TABLE));
        }
        for column in KV_REQUIRED_COLUMNS {
            if !column_exists(&conn, KV_TABLE, column)? {
                return Err(RepoError::MissingRequiredColumn {
                    table: KV_TABLE,
                    column,
                });
            }
        }

        Ok(Self { conn })
    }
}

impl TaskListRepository for SqliteTaskListRepository {
    fn load_tasks(&self) -> RepoResult<Option<Vec<Task>>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM kv_store WHERE key = ?1;")?;
        let mut rows = stmt.query([TASKS_KEY])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };

        let blob: String = row.get(0)?;
        let tasks: Vec<Task> =
            serde_json::from_str(&blob).map_err(|err| RepoError::CorruptBlob {
                key: TASKS_KEY,
                message: err.to_string(),
            })?;

        let mut seen = HashSet::new();
        for task in &tasks {
            if !seen.insert(task.id.as_str()) {
                return Err(RepoError::CorruptBlob {
                    key: TASKS_KEY,
                    message: format!("duplicate task id `{}`", task.id),
                });
            }
        }

        Ok(Some(tasks))
    }

    fn save_tasks(&self, tasks: &[Task]) -> RepoResult<()> {
        let blob = serde_json::to_string(tasks).map_err(RepoError::Serialize)?;
        self.conn.execute(
            "INSERT INTO kv_store (key, value, updated_at)
             VALUES (?1, ?2, strftime('%s', 'now') * 1000)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![TASKS_KEY, blob],
        )?;
        Ok(())
    }
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn column_exists(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM pragma_table_info(?1) WHERE name = ?2
        );",
        params![table, column],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
