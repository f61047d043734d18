use adpulse_client::commands::clients::{self, ClientAddOptions};
use adpulse_client::commands::common::CommandOptions;
use adpulse_client::commands::data::{self, ConfigSetAdsOptions};
use adpulse_client::commands::import::{self, ImportCreateOptions, ImportSyncOptions};
use adpulse_client::commands::perf::{self, PerfSummaryOptions};
use adpulse_client::commands::status;
use adpulse_client::store::DbCredentials;
use adpulse_client::{ClientResult, SuccessEnvelope};

use crate::cli::{
    Cli, ClientCommand, Commands, ConfigCommand, ConnectArgs, DataCommand, ImportCommand, IsoDate,
    PerfCommand,
};

pub fn dispatch(cli: &Cli) -> ClientResult<SuccessEnvelope> {
    let options = CommandOptions {
        offline: cli.global.offline,
        ..CommandOptions::default()
    };
    dispatch_with_options(cli, options)
}

fn dispatch_with_options(cli: &Cli, options: CommandOptions<'_>) -> ClientResult<SuccessEnvelope> {
    match &cli.command {
        Commands::Status => status::status_with_options(&options),
        Commands::Connect(args) => status::connect_with_options(credentials_from(args), &options),
        Commands::Client { command } => match command {
            ClientCommand::Add {
                name,
                ads_account_name,
                user_id,
            } => clients::add_with_options(ClientAddOptions {
                name: name.clone(),
                ads_account_name: ads_account_name.clone(),
                user_id: user_id.clone(),
                command: options,
            }),
            ClientCommand::List => clients::list_with_options(&options),
        },
        Commands::Import { command } => match command {
            ImportCommand::Create {
                path,
                client,
                dry_run,
            } => import::create_with_options(ImportCreateOptions {
                path: path.clone(),
                client: client.clone(),
                dry_run: *dry_run,
                stdin_override: None,
                command: options,
            }),
            ImportCommand::Sync {
                client,
                from,
                to,
                days,
                dry_run,
            } => import::sync_with_options(ImportSyncOptions {
                client: client.clone(),
                from: date_string(from.as_ref()),
                to: date_string(to.as_ref()),
                days: *days,
                dry_run: *dry_run,
                command: options,
            }),
            ImportCommand::List => import::list_with_options(&options),
            ImportCommand::Undo { import_id } => import::undo_with_options(import_id, &options),
        },
        Commands::Data { command } => match command {
            DataCommand::Clear => data::clear_with_options(&options),
            DataCommand::Reset => data::reset_with_options(&options),
        },
        Commands::Config { command } => match command {
            ConfigCommand::SetAds {
                token,
                api_version,
                base_url,
            } => data::config_set_ads_with_options(ConfigSetAdsOptions {
                access_token: token.clone(),
                api_version: api_version.clone(),
                base_url: base_url.clone(),
                command: options,
            }),
            ConfigCommand::Show => data::config_show_with_options(&options),
        },
        Commands::Perf { command } => match command {
            PerfCommand::Summary {
                client,
                from,
                to,
                analyze_url,
            } => perf::summary_with_options(PerfSummaryOptions {
                client: client.clone(),
                from: date_string(from.as_ref()),
                to: date_string(to.as_ref()),
                analyze_url: analyze_url.clone(),
                command: options,
            }),
        },
    }
}

fn date_string(value: Option<&IsoDate>) -> Option<String> {
    value.map(|date| date.as_str().to_string())
}

/// Clap guarantees host, database and user arrive together.
fn credentials_from(args: &ConnectArgs) -> Option<DbCredentials> {
    match (&args.host, &args.database, &args.user) {
        (Some(host), Some(database), Some(user)) => Some(DbCredentials {
            host: host.clone(),
            database: database.clone(),
            user: user.clone(),
            password: args.password.clone().unwrap_or_default(),
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use adpulse_client::commands::common::CommandOptions;

    use super::{credentials_from, dispatch_with_options};
    use crate::cli::{Commands, parse_from};

    fn offline(home: &Path) -> CommandOptions<'_> {
        CommandOptions {
            home_override: Some(home),
            offline: true,
            settings: None,
        }
    }

    #[test]
    fn dispatches_to_expected_command_names() {
        let temp = tempfile::tempdir();
        assert!(temp.is_ok());
        let Ok(temp) = temp else {
            return;
        };
        let home = temp.path().join("adpulse-home");

        let cases: [(&[&str], &str); 5] = [
            (&["adpulse", "status"], "status"),
            (&["adpulse", "client", "add", "Acme"], "client add"),
            (&["adpulse", "client", "list"], "client list"),
            (&["adpulse", "import", "list"], "import list"),
            (&["adpulse", "config", "show"], "config show"),
        ];

        for (args, expected_command) in cases {
            let parsed = parse_from(args);
            assert!(parsed.is_ok());
            if let Ok(cli) = parsed {
                let response = dispatch_with_options(&cli, offline(&home));
                assert!(response.is_ok(), "failed to dispatch: {args:?}");
                if let Ok(success) = response {
                    assert_eq!(success.command, expected_command);
                }
            }
        }
    }

    #[test]
    fn connect_without_flags_carries_no_credentials() {
        let parsed = parse_from(["adpulse", "connect"]);
        assert!(parsed.is_ok());
        if let Ok(cli) = parsed
            && let Commands::Connect(args) = &cli.command
        {
            assert!(credentials_from(args).is_none());
        }
    }

    #[test]
    fn connect_flags_build_credentials() {
        let parsed = parse_from([
            "adpulse",
            "connect",
            "--host",
            "db.internal",
            "--database",
            "adpulse",
            "--user",
            "reporting",
        ]);
        assert!(parsed.is_ok());
        if let Ok(cli) = parsed
            && let Commands::Connect(args) = &cli.command
        {
            let credentials = credentials_from(args);
            assert!(credentials.is_some());
            if let Some(credentials) = credentials {
                assert_eq!(credentials.host, "db.internal");
                assert!(credentials.password.is_empty());
            }
        }
    }
}
