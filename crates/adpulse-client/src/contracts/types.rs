use serde::Serialize;

use crate::analysis::{AdSummary, AnalysisOutcome};
use crate::connection::ConnectionState;
use crate::connector::DateRange;
use crate::import::PipelineOutcome;
use crate::model::Client;
use crate::store::{Backend, ClearSummary, RemoteStatus};

#[derive(Debug, Clone, Serialize)]
pub struct StatusData {
    pub connection: ConnectionState,
    pub remote_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_status: Option<RemoteStatus>,
    pub local_store_path: String,
    pub schema_version: String,
    pub local_tables: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectData {
    pub endpoint: String,
    pub connection: ConnectionState,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientAddData {
    pub client: Client,
    pub backend: Backend,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientListItem {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ads_account_name: Option<String>,
    pub record_count: usize,
    pub fingerprint_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientListData {
    pub rows: Vec<ClientListItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportIssue {
    pub row: usize,
    pub field: String,
    pub code: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnresolvedRecord {
    pub row: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
    pub ad_name: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportDuplicateSummary {
    pub total: usize,
    pub batch: usize,
    pub existing_ledger: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportNextStep {
    pub label: String,
    pub command: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportAction {
    pub label: String,
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportData {
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub import_ids: Vec<String>,
    pub message: String,
    pub outcome: PipelineOutcome,
    pub next_step: ImportNextStep,
    pub other_actions: Vec<ImportAction>,
    pub connection: ConnectionState,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportSyncData {
    pub client: String,
    pub range: DateRange,
    pub fetched: usize,
    #[serde(flatten)]
    pub import: ImportData,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportListItem {
    pub import_id: String,
    pub timestamp: String,
    pub source: String,
    pub file_name: String,
    pub client_name: String,
    pub description: String,
    pub records: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reverted_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportListData {
    pub rows: Vec<ImportListItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportUndoSummary {
    pub records_removed: usize,
    pub fingerprints_removed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportUndoData {
    pub import_id: String,
    pub client_id: String,
    pub message: String,
    pub summary: ImportUndoSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct DataClearData {
    pub message: String,
    #[serde(flatten)]
    pub summary: ClearSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigShowData {
    pub configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token_hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigSetData {
    pub api_version: String,
    pub access_token_hint: String,
    pub backend: Backend,
}

#[derive(Debug, Clone, Serialize)]
pub struct PerfSummaryData {
    pub client_id: String,
    pub client_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<DateRange>,
    pub record_count: usize,
    pub totals: AdSummary,
    pub ads: Vec<AdSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisOutcome>,
}
