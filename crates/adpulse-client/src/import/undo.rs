use std::collections::BTreeSet;

use serde::Serialize;

use crate::import::persist::{commit, now_timestamp};
use crate::repository::Repository;
use crate::{ClientError, ClientResult};

#[derive(Debug, Clone, Serialize)]
pub struct UndoResult {
    pub import_id: String,
    pub client_id: String,
    pub records_removed: usize,
    pub fingerprints_removed: usize,
    pub reverted_at: String,
}

/// Reverts one import batch. Either every fingerprint it added is removed from both the
/// ledger and the client's records, or nothing changes.
pub fn undo_import(repository: &mut Repository<'_>, import_id: &str) -> ClientResult<UndoResult> {
    let mut history = repository.import_history()?;
    let Some(position) = history.iter().position(|batch| batch.id == import_id) else {
        return Err(ClientError::import_id_not_found(import_id));
    };

    let batch = &history[position];
    if batch.is_reverted() {
        return Err(ClientError::undo_conflict(
            import_id,
            batch.undo_data.keys.clone(),
        ));
    }

    let client_id = batch.undo_data.client_id.clone();
    let keys = batch
        .undo_data
        .keys
        .iter()
        .cloned()
        .collect::<BTreeSet<String>>();

    let previous = repository.performance_data()?;
    let mut ledger = repository.processed_fingerprints()?;
    let stored_ids = previous
        .get(&client_id)
        .map(|records| {
            records
                .iter()
                .map(|record| record.unique_id.as_str())
                .collect::<BTreeSet<&str>>()
        })
        .unwrap_or_default();

    let missing = keys
        .iter()
        .filter(|key| !ledger.contains(&client_id, key) || !stored_ids.contains(key.as_str()))
        .cloned()
        .collect::<Vec<String>>();
    if !missing.is_empty() {
        tracing::warn!(import_id, missing = missing.len(), "undo rejected, records already gone");
        return Err(ClientError::undo_conflict(import_id, missing));
    }

    let mut records = previous.clone();
    let mut records_removed = 0;
    if let Some(client_records) = records.get_mut(&client_id) {
        let before = client_records.len();
        client_records.retain(|record| !keys.contains(&record.unique_id));
        records_removed = before - client_records.len();
    }
    for key in &keys {
        ledger.remove(&client_id, key);
    }

    commit(repository, &previous, &records, &ledger)?;

    let reverted_at = now_timestamp();
    history[position].reverted_at = Some(reverted_at.clone());
    repository.save_import_history(&history)?;

    tracing::info!(import_id, client_id = %client_id, records_removed, "import reverted");
    Ok(UndoResult {
        import_id: import_id.to_string(),
        client_id,
        records_removed,
        fingerprints_removed: keys.len(),
        reverted_at,
    })
}

#[cfg(test)]
mod tests {
    use super::undo_import;
    use crate::import::{ImportRequest, RawRecord, run_import};
    use crate::model::{Client, ImportSource};
    use crate::repository::Repository;
    use crate::store::{DisabledRemote, FailoverStore, LocalStore};

    fn raw(ad: &str) -> RawRecord {
        RawRecord {
            account_name: Some("Acme".to_string()),
            ad_name: Some(ad.to_string()),
            day: Some("2026-02-01".to_string()),
            spend: Some("10".to_string()),
            ..RawRecord::default()
        }
    }

    #[test]
    fn unknown_import_id_is_not_found() {
        let local = LocalStore::open_in_memory();
        assert!(local.is_ok());
        if let Ok(local) = local {
            let mut store = FailoverStore::new(Box::new(DisabledRemote), local);
            let mut repository = Repository::new(&mut store);
            let result = undo_import(&mut repository, "imp_missing");
            assert!(result.is_err());
            if let Err(error) = result {
                assert_eq!(error.code, "import_id_not_found");
            }
        }
    }

    #[test]
    fn missing_record_rejects_the_whole_undo() {
        let local = LocalStore::open_in_memory();
        assert!(local.is_ok());
        let Ok(local) = local else {
            return;
        };
        let mut store = FailoverStore::new(Box::new(DisabledRemote), local);
        let mut repository = Repository::new(&mut store);
        let saved = repository.save_clients(&[Client {
            id: "c1".to_string(),
            name: "Acme".to_string(),
            user_id: String::new(),
            ads_account_name: None,
        }]);
        assert!(saved.is_ok());

        let request = ImportRequest {
            source: ImportSource::Manual,
            file_name: "export.csv".to_string(),
            file_hash: "hash".to_string(),
            target_client_id: None,
            dry_run: false,
        };
        let report = run_import(&mut repository, &request, vec![raw("Ad A"), raw("Ad B")]);
        assert!(report.is_ok());
        let Ok(report) = report else {
            return;
        };
        assert_eq!(report.batches.len(), 1);
        let import_id = report.batches[0].id.clone();

        // One of the batch's records disappears outside of undo.
        let mut records = repository.performance_data().unwrap_or_default();
        if let Some(client_records) = records.get_mut("c1") {
            client_records.truncate(1);
        }
        assert!(repository.save_performance_data(&records).is_ok());
        let ledger_before = repository.processed_fingerprints().ok();

        let result = undo_import(&mut repository, &import_id);
        assert_eq!(
            result.err().map(|error| error.code),
            Some("undo_conflict".to_string())
        );

        assert_eq!(repository.processed_fingerprints().ok(), ledger_before);
        assert_eq!(repository.performance_data().ok(), Some(records));
        let history = repository.import_history().unwrap_or_default();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].reverted_at, None);
    }
}
