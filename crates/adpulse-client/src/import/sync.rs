use chrono::Utc;

use crate::connector::{DateRange, InsightsConnector};
use crate::import::{ImportReport, ImportRequest, run_import};
use crate::model::{Client, ImportSource};
use crate::repository::Repository;
use crate::{ClientError, ClientResult};

pub const SYNC_FILE_NAME: &str = "Meta API";

#[derive(Debug, Clone)]
pub struct SyncReport {
    pub client: Client,
    pub fetched: usize,
    pub report: ImportReport,
}

/// Pulls insights for one client's ads account and merges them into that client.
pub fn sync_client(
    repository: &mut Repository<'_>,
    connector: &dyn InsightsConnector,
    client_name: &str,
    range: &DateRange,
    dry_run: bool,
) -> ClientResult<SyncReport> {
    let client = find_client(repository, client_name)?;
    let Some(account) = client.ads_account_name.as_deref() else {
        return Err(ClientError::client_missing_ads_account(&client.name));
    };

    let raw = connector.fetch(account, range)?;
    let fetched = raw.len();
    tracing::info!(client_id = %client.id, fetched, "fetched insights");

    let request = ImportRequest {
        source: ImportSource::Meta,
        file_name: SYNC_FILE_NAME.to_string(),
        file_hash: format!("api_sync_{}", Utc::now().timestamp_millis()),
        target_client_id: Some(client.id.clone()),
        dry_run,
    };
    let report = run_import(repository, &request, raw)?;

    Ok(SyncReport {
        client,
        fetched,
        report,
    })
}

/// Case-insensitive lookup by display name.
pub fn find_client(repository: &mut Repository<'_>, name: &str) -> ClientResult<Client> {
    let wanted = name.trim().to_lowercase();
    repository
        .clients()?
        .into_iter()
        .find(|client| client.name.trim().to_lowercase() == wanted)
        .ok_or_else(|| ClientError::client_not_found(name))
}
