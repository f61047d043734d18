use std::collections::HashSet;

use crate::import::PreparedRecord;
use crate::model::FingerprintLedger;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum DedupeReason {
    Batch,
    ExistingLedger,
}

#[derive(Debug, Clone)]
pub(crate) struct DuplicateRecord {
    pub(crate) record: PreparedRecord,
    pub(crate) dedupe_reason: DedupeReason,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct DedupeResult {
    pub(crate) new_records: Vec<PreparedRecord>,
    pub(crate) duplicate_records: Vec<DuplicateRecord>,
}

impl DedupeResult {
    pub(crate) fn count(&self, reason: DedupeReason) -> usize {
        self.duplicate_records
            .iter()
            .filter(|duplicate| duplicate.dedupe_reason == reason)
            .count()
    }
}

/// Splits records into new ones and already-seen ones. A record is already seen when its
/// fingerprint is in the client's ledger or occurred earlier in the same batch.
pub(crate) fn partition(records: Vec<PreparedRecord>, ledger: &FingerprintLedger) -> DedupeResult {
    let mut seen_in_batch: HashSet<(String, String)> = HashSet::new();
    let mut result = DedupeResult::default();

    for record in records {
        if ledger.contains(&record.client_id, &record.fingerprint) {
            result.duplicate_records.push(DuplicateRecord {
                record,
                dedupe_reason: DedupeReason::ExistingLedger,
            });
            continue;
        }

        let key = (record.client_id.clone(), record.fingerprint.clone());
        if !seen_in_batch.insert(key) {
            result.duplicate_records.push(DuplicateRecord {
                record,
                dedupe_reason: DedupeReason::Batch,
            });
            continue;
        }

        result.new_records.push(record);
    }

    result
}
