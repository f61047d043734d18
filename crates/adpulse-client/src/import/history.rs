//! Import history: one [`ImportBatch`] per client that received new records.

use ulid::Ulid;

use crate::ClientResult;
use crate::import::persist::now_timestamp;
use crate::import::{ImportRequest, PipelineOutcome};
use crate::model::{ImportBatch, ImportSource, UndoData};
use crate::repository::Repository;
use crate::store::Backend;

/// Builds batches for every client with new records. Clients whose records were all
/// already seen get no entry.
pub fn batches_for(request: &ImportRequest, outcome: &PipelineOutcome) -> Vec<ImportBatch> {
    let timestamp = now_timestamp();
    outcome
        .clients
        .iter()
        .filter(|result| result.new_records_count > 0)
        .map(|result| ImportBatch {
            id: format!("imp_{}", Ulid::new()),
            timestamp: timestamp.clone(),
            source: request.source,
            file_name: request.file_name.clone(),
            client_name: result.client_name.clone(),
            description: describe(request, result.new_records_count),
            file_hash: request.file_hash.clone(),
            undo_data: UndoData {
                kind: request.source,
                keys: result.undo_keys.clone(),
                client_id: result.client_id.clone(),
            },
            reverted_at: None,
        })
        .collect()
}

/// Prepends `batches` to the stored history, keeping it most recent first.
pub fn record(repository: &mut Repository<'_>, batches: &[ImportBatch]) -> ClientResult<Backend> {
    let mut history = repository.import_history()?;
    history.splice(0..0, batches.iter().cloned());
    let backend = repository.save_import_history(&history)?;
    for batch in batches {
        tracing::info!(
            import_id = %batch.id,
            client_id = %batch.undo_data.client_id,
            new_records = batch.undo_data.keys.len(),
            "recorded import batch"
        );
    }
    Ok(backend)
}

/// Stored history, most recent first.
pub fn list(repository: &mut Repository<'_>) -> ClientResult<Vec<ImportBatch>> {
    repository.import_history()
}

fn describe(request: &ImportRequest, new_records: usize) -> String {
    match request.source {
        ImportSource::Manual => format!("{new_records} new records imported from {}", request.file_name),
        ImportSource::Meta => format!("{new_records} rows synced from the ads API"),
    }
}

#[cfg(test)]
mod tests {
    use super::{batches_for, list, record};
    use crate::import::{ClientImportResult, ImportRequest, PipelineOutcome};
    use crate::model::ImportSource;
    use crate::repository::Repository;
    use crate::store::{DisabledRemote, FailoverStore, LocalStore};

    fn client_result(client_id: &str, keys: &[&str]) -> ClientImportResult {
        ClientImportResult {
            client_id: client_id.to_string(),
            client_name: client_id.to_uppercase(),
            new_records_count: keys.len(),
            duplicate_count: 0,
            stored_records_count: keys.len(),
            undo_keys: keys.iter().map(|key| key.to_string()).collect(),
            records: Vec::new(),
        }
    }

    fn outcome(clients: Vec<ClientImportResult>) -> PipelineOutcome {
        PipelineOutcome {
            dry_run: false,
            rows_read: 0,
            rows_invalid: 0,
            new_records_count: clients.iter().map(|c| c.new_records_count).sum(),
            duplicate_summary: Default::default(),
            unresolved: Vec::new(),
            issues: Vec::new(),
            clients,
            backend: None,
        }
    }

    fn request() -> ImportRequest {
        ImportRequest {
            source: ImportSource::Meta,
            file_name: "Meta API".to_string(),
            file_hash: "api_sync_1".to_string(),
            target_client_id: None,
            dry_run: false,
        }
    }

    #[test]
    fn zero_new_record_clients_get_no_batch() {
        let batches = batches_for(
            &request(),
            &outcome(vec![client_result("c1", &["f1"]), client_result("c2", &[])]),
        );
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].undo_data.client_id, "c1");
        assert_eq!(batches[0].undo_data.keys, vec!["f1".to_string()]);
        assert!(batches[0].id.starts_with("imp_"));
        assert_eq!(batches[0].file_hash, "api_sync_1");
    }

    #[test]
    fn newest_batches_are_listed_first() {
        let local = LocalStore::open_in_memory();
        assert!(local.is_ok());
        if let Ok(local) = local {
            let mut store = FailoverStore::new(Box::new(DisabledRemote), local);
            let mut repository = Repository::new(&mut store);

            let first = batches_for(&request(), &outcome(vec![client_result("c1", &["f1"])]));
            let second = batches_for(&request(), &outcome(vec![client_result("c2", &["f2"])]));
            assert!(record(&mut repository, &first).is_ok());
            assert!(record(&mut repository, &second).is_ok());

            let listed = list(&mut repository);
            assert!(listed.is_ok());
            if let Ok(history) = listed {
                assert_eq!(history.len(), 2);
                assert_eq!(history[0].undo_data.client_id, "c2");
                assert_eq!(history[1].undo_data.client_id, "c1");
            }
        }
    }
}
