use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, ffi::ErrorCode, params};
use serde_json::Value;

use crate::migrations::run_pending;
use crate::state::{map_sqlite_error, open_connection};
use crate::store::{Backend, BackendError, KvBackend, LOCAL_KEY_PREFIX};
use crate::{ClientError, ClientResult};

/// SQLite-backed fallback store. Keys are stored as `store_<table>`.
pub struct LocalStore {
    connection: Connection,
    db_path: PathBuf,
}

impl LocalStore {
    pub fn open(db_path: &Path, max_pages: Option<u32>) -> ClientResult<Self> {
        let mut connection = open_connection(db_path)?;
        run_pending(&mut connection)
            .map_err(|error| ClientError::migration_failed(db_path, &error.to_string()))?;
        let store = Self {
            connection,
            db_path: db_path.to_path_buf(),
        };
        if let Some(pages) = max_pages {
            store.set_max_pages(pages)?;
        }
        Ok(store)
    }

    pub fn open_in_memory() -> ClientResult<Self> {
        let db_path = PathBuf::from(":memory:");
        let mut connection =
            Connection::open_in_memory().map_err(|error| map_sqlite_error(&db_path, &error))?;
        run_pending(&mut connection)
            .map_err(|error| ClientError::migration_failed(&db_path, &error.to_string()))?;
        Ok(Self {
            connection,
            db_path,
        })
    }

    /// Caps the file at `pages` pages. SQLite never lowers the cap below the current size.
    pub fn set_max_pages(&self, pages: u32) -> ClientResult<i64> {
        self.connection
            .query_row(&format!("PRAGMA max_page_count = {pages}"), [], |row| {
                row.get::<_, i64>(0)
            })
            .map_err(|error| map_sqlite_error(&self.db_path, &error))
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Table names currently held locally, without the key prefix.
    pub fn tables(&self) -> Result<Vec<String>, BackendError> {
        let mut statement = self
            .connection
            .prepare("SELECT key FROM local_kv ORDER BY key ASC")
            .map_err(local_error)?;
        let keys = statement
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(local_error)?;

        let mut tables = Vec::new();
        for key in keys {
            let key = key.map_err(local_error)?;
            tables.push(
                key.strip_prefix(LOCAL_KEY_PREFIX)
                    .map(str::to_string)
                    .unwrap_or(key),
            );
        }
        Ok(tables)
    }

    pub fn delete_with_prefix(&mut self, table_prefix: &str) -> Result<usize, BackendError> {
        let prefix = local_key(table_prefix);
        self.connection
            .execute(
                "DELETE FROM local_kv WHERE substr(key, 1, ?2) = ?1",
                params![prefix, prefix.chars().count() as i64],
            )
            .map_err(local_error)
    }

    pub fn clear_all(&mut self) -> Result<usize, BackendError> {
        self.connection
            .execute("DELETE FROM local_kv", [])
            .map_err(local_error)
    }
}

impl KvBackend for LocalStore {
    fn name(&self) -> Backend {
        Backend::Local
    }

    fn get(&mut self, key: &str) -> Result<Option<Value>, BackendError> {
        let raw = self
            .connection
            .query_row(
                "SELECT value FROM local_kv WHERE key = ?1",
                [local_key(key)],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(local_error)?;

        match raw {
            Some(text) => serde_json::from_str::<Value>(&text)
                .map(Some)
                .map_err(|error| BackendError::Serialization(error.to_string())),
            None => Ok(None),
        }
    }

    fn put(&mut self, key: &str, value: &Value) -> Result<(), BackendError> {
        let text = serde_json::to_string(value)
            .map_err(|error| BackendError::Serialization(error.to_string()))?;
        let updated_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

        self.connection
            .execute(
                "INSERT INTO local_kv (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![local_key(key), text, updated_at],
            )
            .map_err(|error| {
                if error.sqlite_error_code() == Some(ErrorCode::DiskFull) {
                    BackendError::CapacityExceeded {
                        key: key.to_string(),
                    }
                } else {
                    local_error(error)
                }
            })?;
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), BackendError> {
        self.connection
            .execute("DELETE FROM local_kv WHERE key = ?1", [local_key(key)])
            .map_err(local_error)?;
        Ok(())
    }
}

fn local_key(table: &str) -> String {
    format!("{LOCAL_KEY_PREFIX}{table}")
}

fn local_error(error: rusqlite::Error) -> BackendError {
    BackendError::Local(error.to_string())
}
