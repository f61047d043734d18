use ulid::Ulid;

use crate::commands::common::{CommandOptions, open_session};
use crate::contracts::envelope::{SuccessEnvelope, success};
use crate::contracts::types::{ClientAddData, ClientListData, ClientListItem};
use crate::import::normalize::collapse_whitespace;
use crate::model::Client;
use crate::{ClientError, ClientResult};

#[derive(Debug, Clone, Default)]
pub struct ClientAddOptions<'a> {
    pub name: String,
    pub ads_account_name: Option<String>,
    pub user_id: Option<String>,
    pub command: CommandOptions<'a>,
}

pub fn add(name: &str, ads_account_name: Option<String>) -> ClientResult<SuccessEnvelope> {
    add_with_options(ClientAddOptions {
        name: name.to_string(),
        ads_account_name,
        user_id: None,
        command: CommandOptions::default(),
    })
}

#[doc(hidden)]
pub fn add_with_options(options: ClientAddOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let name = collapse_whitespace(&options.name);
    if name.is_empty() {
        return Err(ClientError::invalid_argument_for_command(
            "Client name must not be empty.",
            Some("client add"),
        ));
    }

    let mut session = open_session(&options.command)?;
    let mut repository = session.repository();
    let mut clients = repository.clients()?;
    let wanted = name.to_lowercase();
    if clients
        .iter()
        .any(|client| client.name.trim().to_lowercase() == wanted)
    {
        return Err(ClientError::client_already_exists(&name));
    }

    let client = Client {
        id: format!("client_{}", Ulid::new()),
        name,
        user_id: options.user_id.unwrap_or_default(),
        ads_account_name: options
            .ads_account_name
            .map(|account| collapse_whitespace(&account))
            .filter(|account| !account.is_empty()),
    };
    clients.push(client.clone());
    let backend = repository.save_clients(&clients)?;
    tracing::info!(client_id = %client.id, backend = backend.as_str(), "client added");

    success("client add", ClientAddData { client, backend })
}

pub fn list() -> ClientResult<SuccessEnvelope> {
    list_with_options(&CommandOptions::default())
}

#[doc(hidden)]
pub fn list_with_options(options: &CommandOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let mut session = open_session(options)?;
    let mut repository = session.repository();
    let clients = repository.clients()?;
    let performance = repository.performance_data()?;
    let ledger = repository.processed_fingerprints()?;

    let rows = clients
        .into_iter()
        .map(|client| ClientListItem {
            record_count: performance.get(&client.id).map_or(0, Vec::len),
            fingerprint_count: ledger.len(&client.id),
            id: client.id,
            name: client.name,
            ads_account_name: client.ads_account_name,
        })
        .collect();

    success("client list", ClientListData { rows })
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::{ClientAddOptions, add_with_options, list_with_options};
    use crate::commands::common::CommandOptions;

    #[test]
    fn added_clients_are_listed_and_names_stay_unique() {
        let temp = tempdir();
        assert!(temp.is_ok());
        if let Ok(temp) = temp {
            let command = CommandOptions {
                home_override: Some(temp.path()),
                offline: true,
                settings: None,
            };
            let added = add_with_options(ClientAddOptions {
                name: "  Acme   Corp ".to_string(),
                ads_account_name: Some("1234".to_string()),
                user_id: None,
                command: command.clone(),
            });
            assert!(added.is_ok());
            if let Ok(envelope) = added {
                assert_eq!(envelope.data["client"]["name"], "Acme Corp");
                assert_eq!(envelope.data["backend"], "local");
                assert!(
                    envelope.data["client"]["id"]
                        .as_str()
                        .is_some_and(|id| id.starts_with("client_"))
                );
            }

            let duplicate = add_with_options(ClientAddOptions {
                name: "acme corp".to_string(),
                ads_account_name: None,
                user_id: None,
                command: command.clone(),
            });
            assert!(matches!(duplicate, Err(ref error) if error.code == "client_already_exists"));

            let listed = list_with_options(&command);
            assert!(listed.is_ok());
            if let Ok(envelope) = listed {
                assert_eq!(envelope.data["rows"].as_array().map(Vec::len), Some(1));
                assert_eq!(envelope.data["rows"][0]["record_count"], 0);
            }
        }
    }

    #[test]
    fn blank_names_are_rejected() {
        let result = add_with_options(ClientAddOptions {
            name: "   ".to_string(),
            ..ClientAddOptions::default()
        });
        assert!(matches!(result, Err(ref error) if error.code == "invalid_argument"));
    }
}
