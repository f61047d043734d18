use std::path::Path;

use serde_json::{Value, json};
use thiserror::Error;

pub(crate) const IMPORT_HELP_COMMAND: &str = "adpulse import create --help";

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ClientError {
    pub code: String,
    pub message: String,
    pub recovery_steps: Vec<String>,
    pub data: Option<Value>,
}

impl ClientError {
    pub fn new(code: &str, message: &str, recovery_steps: Vec<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            recovery_steps,
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_import_help_data(self, data: Value) -> Self {
        self.with_data(merge_import_help_data(data))
    }

    pub fn invalid_argument(message: &str) -> Self {
        Self::invalid_argument_for_command(message, None)
    }

    pub fn invalid_argument_for_command(message: &str, command: Option<&str>) -> Self {
        let help_hint = match command {
            Some(cmd) => format!("Run `adpulse {cmd} --help` for usage."),
            None => "Run `adpulse --help` for usage.".to_string(),
        };
        let error = Self::new("invalid_argument", message, vec![help_hint]);
        if let Some(cmd) = command {
            return error.with_data(json!({
                "command_hint": cmd,
            }));
        }
        error
    }

    pub fn invalid_argument_with_recovery(message: &str, recovery_steps: Vec<String>) -> Self {
        Self::new("invalid_argument", message, recovery_steps)
    }

    pub fn invalid_import_format(message: &str, received_format: &str) -> Self {
        Self::invalid_argument_with_recovery(
            message,
            vec![
                "Provide an ads export as CSV (with a header row) or a JSON array.".to_string(),
                format!("Run `{IMPORT_HELP_COMMAND}` to review accepted columns."),
            ],
        )
        .with_import_help_data(json!({
            "received_format": received_format,
            "supported_formats": ["csv", "json_array"],
        }))
    }

    pub fn import_schema_mismatch(required_columns: Vec<String>, actual_columns: Vec<String>) -> Self {
        Self::new(
            "import_schema_mismatch",
            "The import file is missing columns that identify each record.",
            vec![
                "Include an ad name column and a day column in the export.".to_string(),
                format!("Run `{IMPORT_HELP_COMMAND}` to review accepted column names."),
            ],
        )
        .with_import_help_data(json!({
            "required_columns": required_columns,
            "actual_columns": actual_columns,
        }))
    }

    pub fn import_id_not_found(import_id: &str) -> Self {
        Self::new(
            "import_id_not_found",
            &format!("Import id `{import_id}` was not found."),
            vec![
                "Run adpulse import list to find a valid import id.".to_string(),
                "Retry with adpulse import undo <import_id>.".to_string(),
            ],
        )
        .with_data(json!({
            "import_id": import_id,
        }))
    }

    pub fn undo_conflict(import_id: &str, missing_fingerprints: Vec<String>) -> Self {
        let missing_count = missing_fingerprints.len();
        Self::new(
            "undo_conflict",
            &format!(
                "Import `{import_id}` cannot be undone: {missing_count} of its records are no longer present. Nothing was changed."
            ),
            vec![
                "Run adpulse import list to check whether this import was already reverted."
                    .to_string(),
                "Records removed by an earlier undo or a data clear cannot be undone twice."
                    .to_string(),
            ],
        )
        .with_data(json!({
            "import_id": import_id,
            "missing_count": missing_count,
            "missing_fingerprints": missing_fingerprints,
        }))
    }

    pub fn client_not_found(name: &str) -> Self {
        Self::new(
            "client_not_found",
            &format!("No client named `{name}` exists."),
            vec![
                "Run adpulse client list to see configured clients.".to_string(),
                "Create it with adpulse client add <name> --account <ads account>.".to_string(),
            ],
        )
        .with_data(json!({
            "client": name,
        }))
    }

    pub fn client_already_exists(name: &str) -> Self {
        Self::new(
            "client_already_exists",
            &format!("A client named `{name}` already exists."),
            vec!["Choose a different client name.".to_string()],
        )
    }

    pub fn client_missing_ads_account(name: &str) -> Self {
        Self::new(
            "client_missing_ads_account",
            &format!("Client `{name}` has no ads account configured."),
            vec!["Recreate the client with --account <ads account id>.".to_string()],
        )
    }

    pub fn ads_api_not_configured() -> Self {
        Self::new(
            "ads_api_not_configured",
            "The ads API configuration is not set.",
            vec!["Run adpulse config set-ads --token <access token>.".to_string()],
        )
    }

    pub fn ads_api_request_failed(detail: &str) -> Self {
        Self::new(
            "ads_api_request_failed",
            &format!("The ads API request failed: {detail}"),
            vec![
                "Verify the access token with adpulse config show.".to_string(),
                "Retry adpulse import sync <client> once the API is reachable.".to_string(),
            ],
        )
    }

    pub fn capacity_exceeded(table: &str) -> Self {
        Self::new(
            "capacity_exceeded",
            &format!("The local store is full. Data for table `{table}` could not be saved."),
            vec![
                "Free space with adpulse data clear, then retry.".to_string(),
                "Or raise ADPULSE_LOCAL_MAX_PAGES if a quota is configured.".to_string(),
            ],
        )
        .with_data(json!({
            "table": table,
        }))
    }

    pub fn remote_connect_failed(endpoint: &str, detail: &str) -> Self {
        Self::new(
            "remote_connect_failed",
            &format!("Could not reach the remote store at `{endpoint}`: {detail}"),
            vec![
                "Check ADPULSE_REMOTE_URL and that the remote service is running.".to_string(),
                "Retry adpulse connect with valid database credentials.".to_string(),
                "Data keeps being saved to the local store in the meantime.".to_string(),
            ],
        )
        .with_data(json!({
            "endpoint": endpoint,
        }))
    }

    pub fn internal_serialization(message: &str) -> Self {
        Self::new("internal_serialization_error", message, Vec::new())
    }

    pub fn local_store_permission_denied(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "local_store_permission_denied",
            &format!("Cannot open the local store at `{location}`: {detail}"),
            vec![format!(
                "Grant write access to `{location}` or set `ADPULSE_HOME` to a writable directory."
            )],
        )
    }

    pub fn local_store_locked(path: &Path) -> Self {
        let location = path.display().to_string();
        Self::new(
            "local_store_locked",
            &format!("Local store is locked at `{location}`."),
            vec![format!(
                "Close other adpulse processes using `{location}` so the lock is released."
            )],
        )
    }

    pub fn local_store_corrupt(path: &Path) -> Self {
        let location = path.display().to_string();
        Self::new(
            "local_store_corrupt",
            &format!("Local store appears corrupt at `{location}`."),
            vec![format!(
                "Move `{location}` aside and rerun the command to start with an empty local store."
            )],
        )
    }

    pub fn migration_failed(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "migration_failed",
            &format!("Local store migration failed at `{location}`: {detail}"),
            vec!["Resolve conflicting schema objects referenced in the error details.".to_string()],
        )
    }

    pub fn local_store_init_failed(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "local_store_init_failed",
            &format!("Local store initialization failed at `{location}`: {detail}"),
            Vec::new(),
        )
    }

    pub fn local_store_failed(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "local_store_failed",
            &format!("Local store operation failed at `{location}`: {detail}"),
            vec!["Retry the command.".to_string()],
        )
    }

    pub fn is_internal(&self) -> bool {
        self.code.starts_with("internal_")
            || matches!(
                self.code.as_str(),
                "local_store_permission_denied"
                    | "local_store_locked"
                    | "local_store_corrupt"
                    | "local_store_failed"
                    | "migration_failed"
                    | "local_store_init_failed"
            )
    }
}

fn merge_import_help_data(mut data: Value) -> Value {
    if !data.is_object() {
        data = json!({});
    }

    if let Some(object) = data.as_object_mut() {
        object.insert(
            "help_command".to_string(),
            Value::String(IMPORT_HELP_COMMAND.to_string()),
        );
    }

    data
}

pub type ClientResult<T> = Result<T, ClientError>;
