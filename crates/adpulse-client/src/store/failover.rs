use std::collections::BTreeSet;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::connection::ConnectionState;
use crate::store::{
    ANALYSIS_CACHE_PREFIX, Backend, BackendError, DATA_TABLES, DbCredentials, KvBackend,
    LocalStore, RemoteKv, RemoteStatus, is_local_only, tables,
};
use crate::{ClientError, ClientResult};

#[derive(Debug, Clone, Copy)]
enum Op<'v> {
    Get,
    Put(&'v Value),
    Delete,
}

impl Op<'_> {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Put(_) => "put",
            Self::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClearSummary {
    pub cleared_tables: Vec<String>,
    pub analysis_cache_entries: usize,
    pub local_keys_removed: usize,
}

/// Remote-first key-value store that falls through to [`LocalStore`] on any remote failure.
///
/// Once a remote call fails the session stays on the local store until [`Self::connect`]
/// succeeds again.
pub struct FailoverStore {
    remote: Box<dyn RemoteKv>,
    local: LocalStore,
    state: ConnectionState,
}

impl FailoverStore {
    pub fn new(remote: Box<dyn RemoteKv>, local: LocalStore) -> Self {
        Self {
            remote,
            local,
            state: ConnectionState::new(),
        }
    }

    pub fn connection_state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn endpoint(&self) -> String {
        self.remote.endpoint()
    }

    pub fn local(&self) -> &LocalStore {
        &self.local
    }

    /// Explicit reconnect. With credentials they are sent to the remote first and, once
    /// accepted, kept locally so later sessions can reconnect without them.
    pub fn connect(&mut self, credentials: Option<&DbCredentials>) -> ClientResult<()> {
        let credentials = match credentials {
            Some(value) => Some(value.clone()),
            None => self.get::<Option<DbCredentials>>(tables::DB_CREDENTIALS, None)?,
        };

        match self.try_connect(credentials.as_ref()) {
            Ok(()) => {
                self.state.mark_reachable();
                tracing::info!(endpoint = %self.remote.endpoint(), "connected to remote store");
                if let Some(accepted) = credentials {
                    self.put(tables::DB_CREDENTIALS, &accepted)?;
                }
                Ok(())
            }
            Err(error) => {
                let detail = error.to_string();
                tracing::info!(endpoint = %self.remote.endpoint(), error = %detail, "remote store connect failed");
                self.state.mark_unreachable(detail.clone());
                Err(ClientError::remote_connect_failed(
                    &self.remote.endpoint(),
                    &detail,
                ))
            }
        }
    }

    /// Health reported by the remote service. `None` while the session is on the local store.
    pub fn remote_status(&mut self) -> Option<RemoteStatus> {
        if !self.state.is_reachable() {
            return None;
        }
        match self.remote.status() {
            Ok(status) => Some(status),
            Err(error) => {
                tracing::warn!(error = %error, "remote status check failed");
                self.state.mark_unreachable(error.to_string());
                None
            }
        }
    }

    fn try_connect(&mut self, credentials: Option<&DbCredentials>) -> Result<(), BackendError> {
        if let Some(value) = credentials {
            self.remote.set_credentials(value)?;
        }
        let status = self.remote.status()?;
        if status.connected {
            return Ok(());
        }
        Err(BackendError::Status {
            status: 503,
            body: status
                .error
                .unwrap_or_else(|| "remote database is not connected".to_string()),
        })
    }

    /// Reads `table`, returning `default` when it is absent or does not deserialize.
    pub fn get<T>(&mut self, table: &str, default: T) -> ClientResult<T>
    where
        T: DeserializeOwned,
    {
        let (raw, backend) = match self.route(table, Op::Get) {
            Ok(served) => served,
            Err(BackendError::Serialization(detail)) => {
                tracing::warn!(key = table, backend = "local", error = %detail, "malformed stored value, using default");
                return Ok(default);
            }
            Err(error) => return Err(self.client_error(table, error)),
        };

        match raw {
            None | Some(Value::Null) => Ok(default),
            Some(value) => match serde_json::from_value::<T>(value) {
                Ok(parsed) => Ok(parsed),
                Err(error) => {
                    tracing::warn!(key = table, backend = backend.as_str(), error = %error, "malformed stored value, using default");
                    Ok(default)
                }
            },
        }
    }

    pub fn put<T>(&mut self, table: &str, value: &T) -> ClientResult<Backend>
    where
        T: Serialize + ?Sized,
    {
        let json = serde_json::to_value(value)
            .map_err(|error| ClientError::internal_serialization(&error.to_string()))?;
        self.route(table, Op::Put(&json))
            .map(|(_, backend)| backend)
            .map_err(|error| self.client_error(table, error))
    }

    pub fn delete(&mut self, table: &str) -> ClientResult<Backend> {
        self.route(table, Op::Delete)
            .map(|(_, backend)| backend)
            .map_err(|error| self.client_error(table, error))
    }

    pub fn clear(&mut self, tables: &BTreeSet<String>) -> ClientResult<()> {
        for table in tables {
            self.delete(table)?;
        }
        Ok(())
    }

    /// Removes every dashboard table and cached analysis. Configuration survives.
    pub fn clear_all_data(&mut self) -> ClientResult<ClearSummary> {
        let mut cleared_tables = Vec::new();
        for table in DATA_TABLES {
            if self.delete(table)? == Backend::Remote {
                // Drop any copy written while the remote was unreachable.
                self.local
                    .delete(table)
                    .map_err(|error| self.client_error(table, error))?;
            }
            cleared_tables.push(table.to_string());
        }
        let analysis_cache_entries = self
            .local
            .delete_with_prefix(ANALYSIS_CACHE_PREFIX)
            .map_err(|error| self.client_error(ANALYSIS_CACHE_PREFIX, error))?;

        tracing::info!(tables = cleared_tables.len(), analysis_cache_entries, "cleared dashboard data");
        Ok(ClearSummary {
            cleared_tables,
            analysis_cache_entries,
            local_keys_removed: 0,
        })
    }

    /// Removes everything, including configuration and stored credentials.
    pub fn factory_reset(&mut self) -> ClientResult<ClearSummary> {
        let mut summary = self.clear_all_data()?;
        summary
            .cleared_tables
            .extend([tables::CONFIG.to_string(), tables::DB_CREDENTIALS.to_string()]);
        summary.local_keys_removed = self
            .local
            .clear_all()
            .map_err(|error| self.client_error("*", error))?;
        tracing::info!(local_keys_removed = summary.local_keys_removed, "factory reset complete");
        Ok(summary)
    }

    fn route(&mut self, key: &str, op: Op<'_>) -> Result<(Option<Value>, Backend), BackendError> {
        if self.state.is_reachable() && !is_local_only(key) {
            match perform(self.remote.as_mut(), key, op) {
                Ok(output) => {
                    tracing::debug!(key, op = op.as_str(), backend = "remote", "store operation");
                    return Ok((output, Backend::Remote));
                }
                Err(error) => {
                    tracing::warn!(key, op = op.as_str(), error = %error, "remote store failed, falling back to local store");
                    self.state.mark_unreachable(error.to_string());
                }
            }
        }

        let output = perform(&mut self.local, key, op)?;
        tracing::debug!(key, op = op.as_str(), backend = "local", "store operation");
        Ok((output, Backend::Local))
    }

    fn client_error(&self, table: &str, error: BackendError) -> ClientError {
        match error {
            BackendError::CapacityExceeded { key } => {
                tracing::error!(key = %key, "local store is full");
                ClientError::capacity_exceeded(&key)
            }
            BackendError::Serialization(detail) => ClientError::internal_serialization(&format!(
                "Stored value for `{table}` could not be encoded: {detail}"
            )),
            other => ClientError::local_store_failed(self.local.db_path(), &other.to_string()),
        }
    }
}

fn perform<B>(backend: &mut B, key: &str, op: Op<'_>) -> Result<Option<Value>, BackendError>
where
    B: KvBackend + ?Sized,
{
    match op {
        Op::Get => backend.get(key),
        Op::Put(value) => backend.put(key, value).map(|()| None),
        Op::Delete => backend.delete(key).map(|()| None),
    }
}
