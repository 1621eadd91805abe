// src/db.rs
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use thiserror::Error;

const DB_FILE_NAME: &str = "liftlog.sqlite";
const APP_DATA_DIR: &str = "liftlog";
const DATA_DIR_ENV_VAR: &str = "LIFTLOG_DATA_DIR";

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database connection failed")]
    Connection(#[source] rusqlite::Error),
    #[error("Failed to get application data directory")]
    DataDir,
    #[error("I/O error accessing database file")]
    Io(#[from] std::io::Error),
    #[error("Database query failed: {0}")]
    QueryFailed(#[source] rusqlite::Error),
    #[error("Database update failed: {0}")]
    UpdateFailed(#[source] rusqlite::Error),
    #[error("Database delete failed: {0}")]
    DeleteFailed(#[source] rusqlite::Error),
}

/// Flat string key/value storage. Values are whole serialized blobs.
pub trait KeyValueStore {
    /// Returns the stored value, `None` if the key is absent.
    /// # Errors
    /// Returns `DbError` if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, DbError>;

    /// Inserts or replaces the value under `key`.
    /// # Errors
    /// Returns `DbError` if the write fails; the previous value is kept.
    fn set(&self, key: &str, value: &str) -> Result<(), DbError>;

    /// Removes every listed key. Either all are removed or none are.
    /// # Errors
    /// Returns `DbError` if the delete fails.
    fn remove_all(&self, keys: &[&str]) -> Result<(), DbError>;
}

/// Gets the path to the SQLite database file within the app's data directory.
/// Creates the directory if it doesn't exist.
pub fn get_db_path() -> Result<PathBuf, DbError> {
    let app_dir = match std::env::var(DATA_DIR_ENV_VAR) {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => dirs::data_dir().ok_or(DbError::DataDir)?.join(APP_DATA_DIR),
    };
    if !app_dir.exists() {
        std::fs::create_dir_all(&app_dir)?;
    }
    Ok(app_dir.join(DB_FILE_NAME))
}

/// Opens a connection to the SQLite database.
pub fn open_db<P: AsRef<Path>>(path: P) -> Result<Connection, DbError> {
    Connection::open(path).map_err(DbError::Connection)
}

/// Initializes the key/value table if it doesn't exist.
pub fn init_db(conn: &Connection) -> Result<(), DbError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv (
            key TEXT PRIMARY KEY NOT NULL,
            value TEXT NOT NULL -- serialized JSON blob
        )",
        [],
    )
    .map_err(DbError::Connection)?;
    Ok(())
}

/// SQLite-backed `KeyValueStore`.
pub struct SqliteStore {
    conn: Connection,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Opens (and initializes) the store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        let conn = open_db(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory().map_err(DbError::Connection)?;
        Self::from_connection(conn)
    }

    pub fn from_connection(conn: Connection) -> Result<Self, DbError> {
        init_db(&conn)?;
        Ok(Self { conn })
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, DbError> {
        self.conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(DbError::QueryFailed)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), DbError> {
        self.conn
            .execute(
                "INSERT INTO kv (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )
            .map_err(DbError::UpdateFailed)?;
        Ok(())
    }

    fn remove_all(&self, keys: &[&str]) -> Result<(), DbError> {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(DbError::DeleteFailed)?;
        for key in keys {
            tx.execute("DELETE FROM kv WHERE key = ?1", params![key])
                .map_err(DbError::DeleteFailed)?;
        }
        tx.commit().map_err(DbError::DeleteFailed)
    }
}
