use chrono::Utc;

use crate::commands::common::{CommandOptions, Session, import_next_actions, open_session, parse_date_arg};
use crate::connector::{DateRange, GraphInsightsConnector, InsightsConnector};
use crate::contracts::envelope::{SuccessEnvelope, success};
use crate::contracts::types::{
    ImportData, ImportListData, ImportListItem, ImportSyncData, ImportUndoData, ImportUndoSummary,
};
use crate::import::{self, ImportReport, ImportRequest};
use crate::model::ImportSource;
use crate::{ClientError, ClientResult};

/// Days synced when no explicit range is given.
pub const DEFAULT_SYNC_DAYS: i64 = 30;

#[derive(Debug, Clone, Default)]
pub struct ImportCreateOptions<'a> {
    pub path: Option<String>,
    /// Assigns every row to this client instead of matching account names.
    pub client: Option<String>,
    pub dry_run: bool,
    pub stdin_override: Option<String>,
    pub command: CommandOptions<'a>,
}

#[derive(Debug, Clone, Default)]
pub struct ImportSyncOptions<'a> {
    pub client: String,
    pub from: Option<String>,
    pub to: Option<String>,
    pub days: Option<i64>,
    pub dry_run: bool,
    pub command: CommandOptions<'a>,
}

pub fn create(path: Option<String>, dry_run: bool) -> ClientResult<SuccessEnvelope> {
    create_with_options(ImportCreateOptions {
        path,
        dry_run,
        ..ImportCreateOptions::default()
    })
}

#[doc(hidden)]
pub fn create_with_options(options: ImportCreateOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let source = import::input::resolve_source(options.path.as_deref(), options.stdin_override)?;
    let raw = import::parse::parse_source(&source.content)?;
    tracing::debug!(
        source = source.source_kind.as_str(),
        file_name = %source.file_name,
        rows = raw.len(),
        "parsed import source"
    );

    let mut session = open_session(&options.command)?;
    let mut repository = session.repository();
    let target_client_id = match options.client.as_deref() {
        Some(name) => Some(import::sync::find_client(&mut repository, name)?.id),
        None => None,
    };

    let request = ImportRequest {
        source: ImportSource::Manual,
        file_name: source.file_name,
        file_hash: source.file_hash,
        target_client_id,
        dry_run: options.dry_run,
    };
    let report = import::run_import(&mut repository, &request, raw)?;

    let rerun_command = create_rerun_command(options.path.as_deref(), options.client.as_deref());
    let data = import_data(&session, report, options.path, &rerun_command);
    success("import create", data)
}

pub fn sync(client: &str, dry_run: bool) -> ClientResult<SuccessEnvelope> {
    sync_with_options(ImportSyncOptions {
        client: client.to_string(),
        dry_run,
        ..ImportSyncOptions::default()
    })
}

#[doc(hidden)]
pub fn sync_with_options(options: ImportSyncOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let range = sync_range(&options)?;
    let mut session = open_session(&options.command)?;
    let Some(config) = session.repository().ads_api_config()? else {
        return Err(ClientError::ads_api_not_configured());
    };
    let connector = GraphInsightsConnector::new(&config, session.settings.http)?;
    sync_in_session(&mut session, &connector, &options, range)
}

/// Same as [`sync_with_options`] with a caller-supplied connector.
#[doc(hidden)]
pub fn sync_with_connector(
    options: ImportSyncOptions<'_>,
    connector: &dyn InsightsConnector,
) -> ClientResult<SuccessEnvelope> {
    let range = sync_range(&options)?;
    let mut session = open_session(&options.command)?;
    sync_in_session(&mut session, connector, &options, range)
}

fn sync_in_session(
    session: &mut Session,
    connector: &dyn InsightsConnector,
    options: &ImportSyncOptions<'_>,
    range: DateRange,
) -> ClientResult<SuccessEnvelope> {
    let mut repository = session.repository();
    let synced = import::sync::sync_client(
        &mut repository,
        connector,
        &options.client,
        &range,
        options.dry_run,
    )?;

    let rerun_command = format!(
        "adpulse import sync \"{}\" --from {} --to {}",
        synced.client.name, range.since, range.until
    );
    let data = ImportSyncData {
        client: synced.client.name.clone(),
        range,
        fetched: synced.fetched,
        import: import_data(session, synced.report, None, &rerun_command),
    };
    success("import sync", data)
}

pub fn list() -> ClientResult<SuccessEnvelope> {
    list_with_options(&CommandOptions::default())
}

#[doc(hidden)]
pub fn list_with_options(options: &CommandOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let mut session = open_session(options)?;
    let history = import::history::list(&mut session.repository())?;
    let rows = history
        .into_iter()
        .map(|batch| ImportListItem {
            records: batch.undo_data.keys.len(),
            import_id: batch.id,
            timestamp: batch.timestamp,
            source: batch.source.as_str().to_string(),
            file_name: batch.file_name,
            client_name: batch.client_name,
            description: batch.description,
            reverted_at: batch.reverted_at,
        })
        .collect();

    success("import list", ImportListData { rows })
}

pub fn undo(import_id: &str) -> ClientResult<SuccessEnvelope> {
    undo_with_options(import_id, &CommandOptions::default())
}

#[doc(hidden)]
pub fn undo_with_options(
    import_id: &str,
    options: &CommandOptions<'_>,
) -> ClientResult<SuccessEnvelope> {
    let mut session = open_session(options)?;
    let result = import::undo::undo_import(&mut session.repository(), import_id.trim())?;
    success(
        "import undo",
        ImportUndoData {
            import_id: result.import_id,
            client_id: result.client_id,
            message: "Import reverted successfully.".to_string(),
            summary: ImportUndoSummary {
                records_removed: result.records_removed,
                fingerprints_removed: result.fingerprints_removed,
            },
        },
    )
}

fn import_data(
    session: &Session,
    report: ImportReport,
    path: Option<String>,
    rerun_command: &str,
) -> ImportData {
    let outcome = report.outcome;
    let import_ids = report
        .batches
        .iter()
        .map(|batch| batch.id.clone())
        .collect::<Vec<String>>();
    let (next_step, other_actions) = import_next_actions(outcome.dry_run, &import_ids, rerun_command);

    let message = if outcome.dry_run {
        format!(
            "Dry run complete. {} new records would be imported; nothing was written.",
            outcome.new_records_count
        )
    } else if outcome.new_records_count == 0 {
        "No new records found. Nothing was added to the import history.".to_string()
    } else {
        format!(
            "Import complete. {} new records merged across {} import batches.",
            outcome.new_records_count,
            import_ids.len()
        )
    };

    ImportData {
        dry_run: outcome.dry_run,
        path,
        import_ids,
        message,
        outcome,
        next_step,
        other_actions,
        connection: session.store.connection_state().clone(),
    }
}

fn create_rerun_command(path: Option<&str>, client: Option<&str>) -> String {
    let mut command = format!("adpulse import create {}", path.unwrap_or("<path>"));
    if let Some(name) = client {
        command.push_str(&format!(" --client \"{name}\""));
    }
    command
}

fn sync_range(options: &ImportSyncOptions<'_>) -> ClientResult<DateRange> {
    const COMMAND: &str = "import sync";
    if let Some(days) = options.days
        && days < 1
    {
        return Err(ClientError::invalid_argument_for_command(
            "`--days` must be at least 1.",
            Some(COMMAND),
        ));
    }

    match (options.from.as_deref(), options.to.as_deref()) {
        (None, None) => Ok(DateRange::last_days(options.days.unwrap_or(DEFAULT_SYNC_DAYS))),
        (from, to) => {
            let until = match to {
                Some(value) => parse_date_arg(value, "--to", COMMAND)?,
                None => Utc::now().date_naive(),
            };
            let since = match from {
                Some(value) => parse_date_arg(value, "--from", COMMAND)?,
                None => DateRange::last_days(options.days.unwrap_or(DEFAULT_SYNC_DAYS)).since,
            };
            DateRange::new(since, until)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ImportSyncOptions, create_rerun_command, sync_range};

    #[test]
    fn rerun_command_keeps_client_override() {
        assert_eq!(
            create_rerun_command(Some("june.csv"), Some("Acme")),
            "adpulse import create june.csv --client \"Acme\""
        );
        assert_eq!(create_rerun_command(None, None), "adpulse import create <path>");
    }

    #[test]
    fn explicit_sync_range_is_validated() {
        let inverted = sync_range(&ImportSyncOptions {
            from: Some("2026-05-10".to_string()),
            to: Some("2026-05-01".to_string()),
            ..ImportSyncOptions::default()
        });
        assert!(inverted.is_err());

        let range = sync_range(&ImportSyncOptions {
            from: Some("2026-05-01".to_string()),
            to: Some("2026-05-10".to_string()),
            ..ImportSyncOptions::default()
        });
        assert!(range.is_ok());
        if let Ok(range) = range {
            assert!(range.contains("2026-05-05"));
        }

        let zero_days = sync_range(&ImportSyncOptions {
            days: Some(0),
            ..ImportSyncOptions::default()
        });
        assert!(zero_days.is_err());
    }
}
