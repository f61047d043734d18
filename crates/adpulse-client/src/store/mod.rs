//! Key-value persistence with remote-first failover to a local SQLite store.
//!
//! Every dashboard entity lives under one key. The remote service addresses it by the
//! bare table name; the local store prefixes it with [`LOCAL_KEY_PREFIX`].

mod failover;
mod local;
mod remote;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub use failover::{ClearSummary, FailoverStore};
pub use local::LocalStore;
pub use remote::{DbCredentials, DisabledRemote, HttpRemoteStore, RemoteStatus};

/// Key that holds the ads API credentials. Always served by the local store.
pub const CONFIG_TABLE: &str = tables::CONFIG;

pub const LOCAL_KEY_PREFIX: &str = "store_";

/// Cached analysis responses, keyed `analysis_cache_<hash>`.
pub const ANALYSIS_CACHE_PREFIX: &str = "analysis_cache_";

pub mod tables {
    pub const USERS: &str = "users";
    pub const CLIENTS: &str = "clients";
    pub const PERFORMANCE_DATA: &str = "performance_data";
    pub const IMPORT_HISTORY: &str = "import_history";
    pub const LOGGED_IN_USER: &str = "logged_in_user";
    pub const CONFIG: &str = "config";
    pub const PROCESSED_FINGERPRINTS: &str = "processed_files_hashes";
    /// Last database credentials accepted by the remote service.
    pub const DB_CREDENTIALS: &str = "db_credentials";
}

/// Keys needed before the remote can be reached. They never leave the local store.
pub fn is_local_only(key: &str) -> bool {
    key == tables::CONFIG || key == tables::DB_CREDENTIALS || key.starts_with(ANALYSIS_CACHE_PREFIX)
}

/// Keys removed by [`FailoverStore::clear_all_data`]. Configuration keys are not listed.
pub const DATA_TABLES: [&str; 6] = [
    tables::USERS,
    tables::CLIENTS,
    tables::PERFORMANCE_DATA,
    tables::IMPORT_HISTORY,
    tables::LOGGED_IN_USER,
    tables::PROCESSED_FINGERPRINTS,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    Remote,
    Local,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Local => "local",
        }
    }
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("remote returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("store is full while writing `{key}`")]
    CapacityExceeded { key: String },
    #[error("local store error: {0}")]
    Local(String),
}

/// One key-value backend. Absence of a key is `Ok(None)`, never an error.
pub trait KvBackend {
    fn name(&self) -> Backend;
    fn get(&mut self, key: &str) -> Result<Option<Value>, BackendError>;
    fn put(&mut self, key: &str, value: &Value) -> Result<(), BackendError>;
    fn delete(&mut self, key: &str) -> Result<(), BackendError>;
}

/// The network side of the failover pair.
pub trait RemoteKv: KvBackend {
    /// Base URL used in status output and connect errors.
    fn endpoint(&self) -> String;
    fn status(&mut self) -> Result<RemoteStatus, BackendError>;
    fn set_credentials(&mut self, credentials: &DbCredentials) -> Result<(), BackendError>;
}
