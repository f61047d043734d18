use chrono::{SecondsFormat, Utc};

use crate::ClientResult;
use crate::import::history;
use crate::model::{FingerprintLedger, ImportBatch, PerformanceData};
use crate::repository::Repository;
use crate::store::Backend;

/// Records and ledger an import is about to write, plus the records they replace.
#[derive(Debug, Clone)]
pub(crate) struct PendingMerge {
    pub(crate) previous: PerformanceData,
    pub(crate) records: PerformanceData,
    pub(crate) ledger: FingerprintLedger,
}

/// Writes the history entries, then records and ledger through [`commit`]. If the
/// records or ledger cannot be written the previous history is put back. A failed
/// history write leaves records and ledger untouched, so a merge is never stored
/// without the batch that undoes it.
pub(crate) fn commit_import(
    repository: &mut Repository<'_>,
    pending: &PendingMerge,
    batches: &[ImportBatch],
) -> ClientResult<Backend> {
    let previous_history = repository.import_history()?;
    let history_backend = history::record(repository, batches)?;

    let backend = match commit(repository, &pending.previous, &pending.records, &pending.ledger) {
        Ok(backend) => backend,
        Err(error) => {
            if let Err(restore_error) = repository.save_import_history(&previous_history) {
                tracing::error!(
                    error = %restore_error,
                    "could not restore import history after a failed merge"
                );
            }
            return Err(error);
        }
    };

    if backend != history_backend {
        tracing::warn!(
            history_backend = history_backend.as_str(),
            backend = backend.as_str(),
            "backend changed mid-import, recording history again"
        );
        history::record(repository, batches)?;
    }

    Ok(backend)
}

/// Writes records, then the ledger. The two must never disagree:
///
/// - if the ledger write fails, `previous` records are written back and the ledger
///   error is returned;
/// - if the remote dropped between the two writes, the records are written again so
///   both land on the backend now serving the session.
pub(crate) fn commit(
    repository: &mut Repository<'_>,
    previous: &PerformanceData,
    records: &PerformanceData,
    ledger: &FingerprintLedger,
) -> ClientResult<Backend> {
    let records_backend = repository.save_performance_data(records)?;

    let ledger_backend = match repository.save_processed_fingerprints(ledger) {
        Ok(backend) => backend,
        Err(error) => {
            if let Err(restore_error) = repository.save_performance_data(previous) {
                tracing::error!(
                    error = %restore_error,
                    "could not restore records after a failed ledger write"
                );
            }
            return Err(error);
        }
    };

    if ledger_backend != records_backend {
        tracing::warn!(
            records_backend = records_backend.as_str(),
            ledger_backend = ledger_backend.as_str(),
            "backend changed mid-commit, rewriting records"
        );
        repository.save_performance_data(records)?;
    }

    Ok(ledger_backend)
}

pub(crate) fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::{Value, json};

    use super::commit;
    use crate::model::{FingerprintLedger, PerformanceData};
    use crate::repository::Repository;
    use crate::store::{
        Backend, BackendError, DbCredentials, FailoverStore, KvBackend, LocalStore, RemoteKv,
        RemoteStatus,
    };

    /// Accepts writes until `fail_after` puts have happened, then times out.
    struct FlakyRemote {
        values: BTreeMap<String, Value>,
        puts: usize,
        fail_after: usize,
    }

    impl KvBackend for FlakyRemote {
        fn name(&self) -> Backend {
            Backend::Remote
        }

        fn get(&mut self, key: &str) -> Result<Option<Value>, BackendError> {
            Ok(self.values.get(key).cloned())
        }

        fn put(&mut self, key: &str, value: &Value) -> Result<(), BackendError> {
            if self.puts >= self.fail_after {
                return Err(BackendError::Timeout("slow".to_string()));
            }
            self.puts += 1;
            self.values.insert(key.to_string(), value.clone());
            Ok(())
        }

        fn delete(&mut self, key: &str) -> Result<(), BackendError> {
            self.values.remove(key);
            Ok(())
        }
    }

    impl RemoteKv for FlakyRemote {
        fn endpoint(&self) -> String {
            "flaky".to_string()
        }

        fn status(&mut self) -> Result<RemoteStatus, BackendError> {
            Ok(RemoteStatus {
                connected: true,
                error: None,
            })
        }

        fn set_credentials(&mut self, _credentials: &DbCredentials) -> Result<(), BackendError> {
            Ok(())
        }
    }

    #[test]
    fn records_follow_ledger_to_local_after_mid_commit_failover() {
        let remote = FlakyRemote {
            values: BTreeMap::new(),
            puts: 0,
            fail_after: 1,
        };
        let local = LocalStore::open_in_memory();
        assert!(local.is_ok());
        if let Ok(local) = local {
            let mut store = FailoverStore::new(Box::new(remote), local);
            assert!(store.connect(None).is_ok());

            let mut records = PerformanceData::new();
            records.insert("c1".to_string(), Vec::new());
            let mut ledger = FingerprintLedger::default();
            ledger.insert("c1", "f1");

            let mut repository = Repository::new(&mut store);
            let committed = commit(&mut repository, &PerformanceData::new(), &records, &ledger);
            assert_eq!(committed.ok(), Some(Backend::Local));

            let local_records = store.get("performance_data", json!(null));
            assert_eq!(local_records.ok(), Some(json!({"c1": []})));
            let local_ledger = store.get("processed_files_hashes", json!(null));
            assert_eq!(local_ledger.ok(), Some(json!({"c1": {"f1": true}})));
        }
    }
}
