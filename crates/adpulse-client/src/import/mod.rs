pub(crate) mod dedupe;
pub mod fingerprint;
pub mod history;
pub(crate) mod input;
pub mod normalize;
pub(crate) mod parse;
pub(crate) mod persist;
pub(crate) mod resolve;
pub mod sync;
pub mod undo;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::contracts::types::{ImportDuplicateSummary, ImportIssue, UnresolvedRecord};
use crate::import::dedupe::DedupeReason;
use crate::import::fingerprint::{FingerprintInput, fingerprint};
use crate::import::normalize::{collapse_whitespace, normalize_day, parse_count, parse_decimal};
use crate::import::persist::PendingMerge;
use crate::import::resolve::ClientResolver;
use crate::model::{ImportBatch, ImportSource, PerformanceRecord};
use crate::repository::Repository;
use crate::store::Backend;
use crate::{ClientError, ClientResult};

/// One record as received from a file or the ads API. Values are unparsed text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub account_name: Option<String>,
    pub campaign_name: Option<String>,
    pub ad_set_name: Option<String>,
    pub ad_name: Option<String>,
    pub day: Option<String>,
    pub age: Option<String>,
    pub gender: Option<String>,
    pub currency: Option<String>,
    pub spend: Option<String>,
    pub purchases: Option<String>,
    pub purchase_value: Option<String>,
    pub impressions: Option<String>,
    pub reach: Option<String>,
    pub link_clicks: Option<String>,
    pub frequency: Option<String>,
    pub thru_plays: Option<String>,
    pub video_average_play_time: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub source: ImportSource,
    pub file_name: String,
    pub file_hash: String,
    /// Assigns every record to this client id instead of matching account names.
    pub target_client_id: Option<String>,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientImportResult {
    pub client_id: String,
    pub client_name: String,
    pub new_records_count: usize,
    pub duplicate_count: usize,
    /// Client's record count after the merge.
    pub stored_records_count: usize,
    /// Fingerprints this import added, in arrival order.
    pub undo_keys: Vec<String>,
    #[serde(skip)]
    pub records: Vec<PerformanceRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub dry_run: bool,
    pub rows_read: usize,
    pub rows_invalid: usize,
    pub new_records_count: usize,
    pub duplicate_summary: ImportDuplicateSummary,
    pub unresolved: Vec<UnresolvedRecord>,
    pub issues: Vec<ImportIssue>,
    pub clients: Vec<ClientImportResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<Backend>,
}

impl PipelineOutcome {
    pub fn unresolved_count(&self) -> usize {
        self.unresolved.len()
    }
}

/// Pipeline outcome plus the history entries recorded for it.
#[derive(Debug, Clone)]
pub struct ImportReport {
    pub outcome: PipelineOutcome,
    pub batches: Vec<ImportBatch>,
}

#[derive(Debug, Clone)]
pub(crate) struct PreparedRecord {
    pub(crate) row_index: usize,
    pub(crate) client_id: String,
    pub(crate) client_name: String,
    pub(crate) fingerprint: String,
    pub(crate) record: PerformanceRecord,
}

enum Rejection {
    Invalid(ImportIssue),
    Unresolved(UnresolvedRecord),
}

/// Merges `raw` into the stored dataset and records one history entry per client that
/// received new records.
pub fn run_import(
    repository: &mut Repository<'_>,
    request: &ImportRequest,
    raw: Vec<RawRecord>,
) -> ClientResult<ImportReport> {
    let (mut outcome, pending) = plan_merge(repository, request, raw)?;
    let Some(pending) = pending else {
        return Ok(ImportReport {
            outcome,
            batches: Vec::new(),
        });
    };

    let batches = history::batches_for(request, &outcome);
    let backend = persist::commit_import(repository, &pending, &batches)?;
    finish_merge(&mut outcome, &pending, backend);
    Ok(ImportReport { outcome, batches })
}

/// Resolves, fingerprints and deduplicates `raw`, then writes new records and their
/// fingerprints without a history entry. A dry run computes the same counts without
/// writing.
pub fn merge_records(
    repository: &mut Repository<'_>,
    request: &ImportRequest,
    raw: Vec<RawRecord>,
) -> ClientResult<PipelineOutcome> {
    let (mut outcome, pending) = plan_merge(repository, request, raw)?;
    if let Some(pending) = pending {
        let backend = persist::commit(
            repository,
            &pending.previous,
            &pending.records,
            &pending.ledger,
        )?;
        finish_merge(&mut outcome, &pending, backend);
    }
    Ok(outcome)
}

fn finish_merge(outcome: &mut PipelineOutcome, pending: &PendingMerge, backend: Backend) {
    for result in &mut outcome.clients {
        result.stored_records_count = pending.records.get(&result.client_id).map_or(0, Vec::len);
        tracing::info!(
            client_id = %result.client_id,
            new_records = result.new_records_count,
            duplicates = result.duplicate_count,
            backend = backend.as_str(),
            "merged import records"
        );
    }
    outcome.backend = Some(backend);
}

/// Computes the outcome and, when there is something to write, the records and ledger
/// to store.
fn plan_merge(
    repository: &mut Repository<'_>,
    request: &ImportRequest,
    raw: Vec<RawRecord>,
) -> ClientResult<(PipelineOutcome, Option<PendingMerge>)> {
    let clients = repository.clients()?;
    let resolver = match request.target_client_id.as_deref() {
        Some(client_id) => {
            let target = clients
                .iter()
                .find(|client| client.id == client_id)
                .ok_or_else(|| ClientError::client_not_found(client_id))?;
            ClientResolver::forced(&clients, target)
        }
        None => ClientResolver::new(&clients),
    };

    let rows_read = raw.len();
    let mut issues = Vec::new();
    let mut unresolved = Vec::new();
    let mut prepared = Vec::new();
    for (index, raw_record) in raw.into_iter().enumerate() {
        match prepare(index + 1, raw_record, &resolver, request.source) {
            Ok(record) => prepared.push(record),
            Err(Rejection::Invalid(issue)) => issues.push(issue),
            Err(Rejection::Unresolved(record)) => unresolved.push(record),
        }
    }

    let ledger = repository.processed_fingerprints()?;
    let deduped = dedupe::partition(prepared, &ledger);

    let mut arrivals = deduped
        .new_records
        .iter()
        .chain(deduped.duplicate_records.iter().map(|duplicate| &duplicate.record))
        .collect::<Vec<&PreparedRecord>>();
    arrivals.sort_by_key(|record| record.row_index);

    let mut per_client: Vec<ClientImportResult> = Vec::new();
    let mut position_by_client: BTreeMap<String, usize> = BTreeMap::new();
    for record in arrivals {
        if !position_by_client.contains_key(&record.client_id) {
            position_by_client.insert(record.client_id.clone(), per_client.len());
            per_client.push(ClientImportResult {
                client_id: record.client_id.clone(),
                client_name: record.client_name.clone(),
                new_records_count: 0,
                duplicate_count: 0,
                stored_records_count: 0,
                undo_keys: Vec::new(),
                records: Vec::new(),
            });
        }
    }
    for duplicate in &deduped.duplicate_records {
        if let Some(slot) = position_by_client.get(&duplicate.record.client_id) {
            per_client[*slot].duplicate_count += 1;
        }
    }
    for new_record in &deduped.new_records {
        if let Some(slot) = position_by_client.get(&new_record.client_id) {
            let result = &mut per_client[*slot];
            result.new_records_count += 1;
            result.undo_keys.push(new_record.fingerprint.clone());
            result.records.push(new_record.record.clone());
        }
    }

    let duplicate_summary = ImportDuplicateSummary {
        total: deduped.duplicate_records.len(),
        batch: deduped.count(DedupeReason::Batch),
        existing_ledger: deduped.count(DedupeReason::ExistingLedger),
    };
    let new_records_count = deduped.new_records.len();

    let mut outcome = PipelineOutcome {
        dry_run: request.dry_run,
        rows_read,
        rows_invalid: issues.len(),
        new_records_count,
        duplicate_summary,
        unresolved,
        issues,
        clients: per_client,
        backend: None,
    };

    let mut stored = repository.performance_data()?;
    if request.dry_run || new_records_count == 0 {
        for result in &mut outcome.clients {
            let existing = stored.get(&result.client_id).map_or(0, Vec::len);
            result.stored_records_count = if request.dry_run {
                existing + result.new_records_count
            } else {
                existing
            };
        }
        tracing::info!(
            rows_read,
            new_records = new_records_count,
            duplicates = outcome.duplicate_summary.total,
            unresolved = outcome.unresolved_count(),
            dry_run = request.dry_run,
            "import produced no writes"
        );
        return Ok((outcome, None));
    }

    let previous = stored.clone();
    let mut next_ledger = ledger;
    for new_record in deduped.new_records {
        next_ledger.insert(&new_record.client_id, &new_record.fingerprint);
        stored
            .entry(new_record.client_id)
            .or_default()
            .push(new_record.record);
    }

    Ok((
        outcome,
        Some(PendingMerge {
            previous,
            records: stored,
            ledger: next_ledger,
        }),
    ))
}

fn prepare(
    row_index: usize,
    raw: RawRecord,
    resolver: &ClientResolver<'_>,
    source: ImportSource,
) -> Result<PreparedRecord, Rejection> {
    let ad_name = raw.ad_name.as_deref().map(collapse_whitespace).unwrap_or_default();
    if ad_name.is_empty() {
        return Err(Rejection::Invalid(issue(
            row_index,
            "ad_name",
            "missing_required_field",
            "Ad name is required.",
            None,
        )));
    }

    let Some(day) = raw.day.as_deref().and_then(normalize_day) else {
        return Err(Rejection::Invalid(issue(
            row_index,
            "day",
            "invalid_date",
            "Day must be YYYY-MM-DD, DD/MM/YYYY or YYYY/MM/DD.",
            raw.day.clone(),
        )));
    };

    let account_name = raw.account_name.as_deref().map(collapse_whitespace);
    let Some(client) = resolver.resolve(account_name.as_deref()) else {
        return Err(Rejection::Unresolved(UnresolvedRecord {
            row: row_index,
            account_name,
            ad_name,
        }));
    };

    let text = |value: &Option<String>| value.as_deref().map(collapse_whitespace).unwrap_or_default();
    let decimal = |value: &Option<String>| value.as_deref().map(parse_decimal).unwrap_or(0.0);
    let count = |value: &Option<String>| value.as_deref().map(parse_count).unwrap_or(0);

    let age = text(&raw.age);
    let gender = text(&raw.gender).to_lowercase();
    let unique_id = fingerprint(&FingerprintInput {
        client_id: &client.id,
        ad_name: &ad_name,
        day: &day,
        age: &age,
        gender: &gender,
        source,
    });

    let record = PerformanceRecord {
        unique_id: unique_id.clone(),
        client_id: client.id.clone(),
        source,
        account_name: account_name
            .or_else(|| client.ads_account_name.clone())
            .unwrap_or_default(),
        campaign_name: text(&raw.campaign_name),
        ad_set_name: text(&raw.ad_set_name),
        ad_name,
        day,
        age,
        gender,
        currency: text(&raw.currency).to_uppercase(),
        spend: decimal(&raw.spend),
        purchases: count(&raw.purchases),
        purchase_value: decimal(&raw.purchase_value),
        impressions: count(&raw.impressions),
        reach: count(&raw.reach),
        link_clicks: count(&raw.link_clicks),
        frequency: decimal(&raw.frequency),
        thru_plays: count(&raw.thru_plays),
        video_average_play_time: decimal(&raw.video_average_play_time),
    };

    Ok(PreparedRecord {
        row_index,
        client_id: client.id.clone(),
        client_name: client.name.clone(),
        fingerprint: unique_id,
        record,
    })
}

fn issue(
    row: usize,
    field: &str,
    code: &str,
    description: &str,
    received: Option<String>,
) -> ImportIssue {
    ImportIssue {
        row,
        field: field.to_string(),
        code: code.to_string(),
        description: description.to_string(),
        received,
    }
}

pub(crate) fn invalid_input_error(message: &str) -> ClientError {
    ClientError::invalid_argument_with_recovery(
        message,
        vec![
            "Provide CSV or JSON array input via path or stdin.".to_string(),
            format!(
                "Run `{}` to confirm import field requirements.",
                crate::error::IMPORT_HELP_COMMAND
            ),
        ],
    )
    .with_import_help_data(json!({}))
}

#[cfg(test)]
impl PreparedRecord {
    pub(crate) fn for_test(row_index: usize, client_id: &str, fingerprint: &str) -> Self {
        Self {
            row_index,
            client_id: client_id.to_string(),
            client_name: client_id.to_string(),
            fingerprint: fingerprint.to_string(),
            record: PerformanceRecord {
                unique_id: fingerprint.to_string(),
                client_id: client_id.to_string(),
                source: ImportSource::Manual,
                account_name: String::new(),
                campaign_name: String::new(),
                ad_set_name: String::new(),
                ad_name: "ad".to_string(),
                day: "2026-01-01".to_string(),
                age: String::new(),
                gender: String::new(),
                currency: String::new(),
                spend: 0.0,
                purchases: 0,
                purchase_value: 0.0,
                impressions: 0,
                reach: 0,
                link_clicks: 0,
                frequency: 0.0,
                thru_plays: 0,
                video_average_play_time: 0.0,
            },
        }
    }
}
