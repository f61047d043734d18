use crate::commands::common::{CommandOptions, open_session, open_session_without_connect};
use crate::contracts::envelope::{SuccessEnvelope, success};
use crate::contracts::types::{ConnectData, StatusData};
use crate::store::DbCredentials;
use crate::{ClientError, ClientResult};

pub fn status() -> ClientResult<SuccessEnvelope> {
    status_with_options(&CommandOptions::default())
}

#[doc(hidden)]
pub fn status_with_options(options: &CommandOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let mut session = open_session(options)?;
    let remote_status = session.store.remote_status();
    let local_tables = session
        .store
        .local()
        .tables()
        .map_err(|error| {
            ClientError::local_store_failed(&session.setup.db_path, &error.to_string())
        })?;

    success(
        "status",
        StatusData {
            connection: session.store.connection_state().clone(),
            remote_url: session.store.endpoint(),
            remote_status,
            local_store_path: session.setup.db_path.display().to_string(),
            schema_version: session.setup.schema_version.clone(),
            local_tables,
        },
    )
}

pub fn connect(credentials: Option<DbCredentials>) -> ClientResult<SuccessEnvelope> {
    connect_with_options(credentials, &CommandOptions::default())
}

/// Explicit reconnect. Unlike the best-effort attempt every session makes, a failure here
/// is returned to the caller.
#[doc(hidden)]
pub fn connect_with_options(
    credentials: Option<DbCredentials>,
    options: &CommandOptions<'_>,
) -> ClientResult<SuccessEnvelope> {
    let mut session = open_session_without_connect(options)?;
    if session.settings.remote_url.is_none() {
        return Err(ClientError::remote_connect_failed(
            "disabled",
            "no remote URL is configured (ADPULSE_REMOTE_URL is empty or --offline was given)",
        ));
    }
    session.store.connect(credentials.as_ref())?;

    success(
        "connect",
        ConnectData {
            endpoint: session.store.endpoint(),
            connection: session.store.connection_state().clone(),
            message: "Connected to the remote store.".to_string(),
        },
    )
}
