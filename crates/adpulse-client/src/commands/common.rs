use std::path::Path;

use chrono::NaiveDate;

use crate::config::Settings;
use crate::contracts::types::{ImportAction, ImportNextStep};
use crate::repository::Repository;
use crate::setup::{SetupContext, ensure_initialized_with_home_override};
use crate::store::{DisabledRemote, FailoverStore, HttpRemoteStore, LocalStore, RemoteKv};
use crate::{ClientError, ClientResult};

/// Options shared by every command.
#[derive(Debug, Clone, Default)]
pub struct CommandOptions<'a> {
    pub home_override: Option<&'a Path>,
    /// Run on the local store only, without contacting the remote.
    pub offline: bool,
    /// Replaces the environment-derived settings.
    pub settings: Option<Settings>,
}

/// One command's view of the data: the initialized home plus a store that has already
/// tried to reach the remote.
pub struct Session {
    pub setup: SetupContext,
    pub settings: Settings,
    pub store: FailoverStore,
}

impl Session {
    pub fn repository(&mut self) -> Repository<'_> {
        Repository::new(&mut self.store)
    }
}

pub fn open_session(options: &CommandOptions<'_>) -> ClientResult<Session> {
    let mut session = open_session_without_connect(options)?;
    if session.settings.remote_url.is_some() {
        // A failed connect leaves the session on the local store; the state records why.
        let _ = session.store.connect(None);
    }
    Ok(session)
}

pub(crate) fn open_session_without_connect(options: &CommandOptions<'_>) -> ClientResult<Session> {
    let setup = ensure_initialized_with_home_override(options.home_override)?;
    let settings = match (&options.settings, options.offline) {
        (_, true) => Settings::local_only(),
        (Some(settings), false) => settings.clone(),
        (None, false) => Settings::from_env(),
    };

    let local = LocalStore::open(&setup.db_path, settings.local_max_pages)?;
    let remote: Box<dyn RemoteKv> = match settings.remote_url.as_deref() {
        Some(url) => Box::new(HttpRemoteStore::new(url, settings.http)),
        None => Box::new(DisabledRemote),
    };

    Ok(Session {
        setup,
        settings,
        store: FailoverStore::new(remote, local),
    })
}

pub(crate) fn parse_date_arg(value: &str, flag: &str, command: &str) -> ClientResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        ClientError::invalid_argument_for_command(
            &format!("`{flag}` must be a date in YYYY-MM-DD format, got `{value}`."),
            Some(command),
        )
    })
}

pub(crate) fn import_next_actions(
    dry_run: bool,
    import_ids: &[String],
    rerun_command: &str,
) -> (ImportNextStep, Vec<ImportAction>) {
    if dry_run {
        return (
            ImportNextStep {
                label: "Commit this import".to_string(),
                command: rerun_command.to_string(),
            },
            Vec::new(),
        );
    }

    let mut other_actions = Vec::new();
    for id in import_ids {
        other_actions.push(ImportAction {
            label: "Undo this import (destructive)".to_string(),
            command: format!("adpulse import undo {id}"),
            risk: Some("destructive".to_string()),
        });
    }

    (
        ImportNextStep {
            label: "View import list".to_string(),
            command: "adpulse import list".to_string(),
        },
        other_actions,
    )
}

/// Masks all but the last four characters of a secret.
pub(crate) fn secret_hint(secret: &str) -> String {
    let visible = secret
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<char>>()
        .into_iter()
        .rev()
        .collect::<String>();
    if secret.chars().count() <= 4 {
        return "*".repeat(secret.chars().count());
    }
    format!("****{visible}")
}

#[cfg(test)]
mod tests {
    use super::{import_next_actions, parse_date_arg, secret_hint};

    #[test]
    fn dates_must_be_iso() {
        assert!(parse_date_arg("2026-02-03", "--from", "perf summary").is_ok());
        let parsed = parse_date_arg("03/02/2026", "--from", "perf summary");
        assert!(parsed.is_err());
        if let Err(error) = parsed {
            assert_eq!(error.code, "invalid_argument");
            assert!(error.message.contains("--from"));
        }
    }

    #[test]
    fn committed_imports_offer_undo_per_batch() {
        let (next_step, actions) =
            import_next_actions(false, &["imp_1".to_string(), "imp_2".to_string()], "");
        assert_eq!(next_step.command, "adpulse import list");
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[1].command, "adpulse import undo imp_2");
    }

    #[test]
    fn secrets_keep_only_their_tail() {
        assert_eq!(secret_hint("EAAB123456"), "****3456");
        assert_eq!(secret_hint("abc"), "***");
    }
}
