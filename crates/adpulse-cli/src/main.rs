mod cli;
mod dispatch;
mod output;
mod stdout_io;

use std::process::ExitCode;

use adpulse_client::ClientError;
use clap::{Parser, error::ErrorKind};
use stdout_io::write_stdout_text;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "ADPULSE_LOG";

const ROOT_HELP: &str = "AdPulse - ad performance dashboard data layer

Usage:
  adpulse <command>

Start here:
  adpulse status
  adpulse client add <name> --account <ads-account>
  adpulse import create --help
";

const TOP_LEVEL_HELP: &str = "AdPulse - ad performance dashboard data layer

USAGE: adpulse <command> [--json] [--offline]

Set up clients:
  adpulse client add <name> --account <ads-account>     Add a client linked to an ads account
  adpulse client list                                   List clients and stored record counts

Import performance data:
  1. adpulse import create --help                       Read accepted columns and formats
  2. adpulse import create --dry-run <path>             Preview without writing
  3. adpulse import create <path>                       Merge new records
  adpulse import sync <client> [--days 30]              Fetch insights from the ads API
  adpulse import list                                   List past imports
  adpulse import undo <import-id>                       Revert one import

Review performance:
  adpulse perf summary <client> [--from] [--to]         Per-ad totals and ratios
  adpulse perf summary <client> --analyze-url <url>     Also request an analysis

Storage and configuration:
  adpulse status                                        Remote connection and local store details
  adpulse connect [--host --database --user]            Reconnect to the remote store
  adpulse config set-ads --token <token>                Store ads API credentials
  adpulse config show                                   Show ads API configuration
  adpulse data clear                                    Remove data, keep configuration
  adpulse data reset                                    Remove everything

Global flags:
  --json       Emit machine-readable JSON
  --offline    Use the local store only

Logging goes to stderr; set ADPULSE_LOG=debug for more detail.
";

fn main() -> ExitCode {
    init_tracing();
    match run() {
        Ok(code) => code,
        Err(code) => code,
    }
}

/// Diagnostics go to stderr so stdout stays parseable in `--json` mode.
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run() -> Result<ExitCode, ExitCode> {
    let raw_args = std::env::args().collect::<Vec<String>>();
    if raw_args.len() == 1 {
        if write_stdout_text(ROOT_HELP).is_err() {
            return Err(ExitCode::from(2));
        }
        return Ok(ExitCode::SUCCESS);
    }
    let parsed = cli::Cli::try_parse();
    let cli = match parsed {
        Ok(value) => value,
        Err(err) => {
            if matches!(
                err.kind(),
                ErrorKind::DisplayHelp
                    | ErrorKind::DisplayVersion
                    | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
            ) {
                let text = if is_top_level_help_request(&raw_args) {
                    TOP_LEVEL_HELP.to_string()
                } else {
                    err.to_string()
                };
                if write_stdout_text(&text).is_err() {
                    return Err(ExitCode::from(2));
                }
                return Ok(ExitCode::SUCCESS);
            }
            let command_hint = if matches!(
                err.kind(),
                ErrorKind::MissingRequiredArgument
                    | ErrorKind::InvalidValue
                    | ErrorKind::ValueValidation
                    | ErrorKind::WrongNumberOfValues
                    | ErrorKind::UnknownArgument
                    | ErrorKind::InvalidSubcommand
                    | ErrorKind::ArgumentConflict
            ) {
                command_path_from_args(&raw_args)
            } else {
                None
            };
            let clean_message = strip_clap_boilerplate(&err.to_string());
            let parse_error =
                ClientError::invalid_argument_for_command(&clean_message, command_hint.as_deref());
            let mode = infer_requested_output_mode(&raw_args);
            if output::print_failure(&parse_error, mode).is_err() {
                return Err(ExitCode::from(2));
            }
            return Err(ExitCode::from(1));
        }
    };
    let mode = output::mode_for_cli(&cli);
    tracing::debug!(offline = cli.global.offline, ?mode, "dispatching command");

    match dispatch::dispatch(&cli) {
        Ok(success) => {
            if output::print_success(&success, mode).is_err() {
                return Err(ExitCode::from(2));
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(error) => {
            if error.is_internal() {
                tracing::error!(code = %error.code, message = %error.message, "command failed");
            }
            if output::print_failure(&error, mode).is_err() {
                return Err(ExitCode::from(2));
            }
            Err(exit_code_for_error(&error))
        }
    }
}

fn is_top_level_help_request(raw_args: &[String]) -> bool {
    raw_args.len() == 2 && matches!(raw_args[1].as_str(), "--help" | "-h")
}

/// Strips clap's trailing boilerplate (Usage line, "For more information" hint)
/// so our "What to do next" section is the single source of guidance.
fn strip_clap_boilerplate(message: &str) -> String {
    let trimmed = if let Some(pos) = message.find("\n\nUsage:") {
        &message[..pos]
    } else if let Some(pos) = message.find("\nFor more information") {
        &message[..pos]
    } else {
        message
    };
    trimmed.trim_end().to_string()
}

/// Builds the subcommand path from raw CLI args for use in help hints, e.g.
/// "import sync" or "config set-ads".
fn command_path_from_args(raw_args: &[String]) -> Option<String> {
    let non_flags: Vec<&str> = raw_args
        .iter()
        .skip(1)
        .filter(|value| !value.starts_with('-'))
        .map(String::as_str)
        .collect();

    let hint = match non_flags.as_slice() {
        ["status", ..] => "status",
        ["connect", ..] => "connect",
        ["client", "add", ..] => "client add",
        ["client", "list", ..] => "client list",
        ["client", ..] => "client",
        ["import", "create", ..] => "import create",
        ["import", "sync", ..] => "import sync",
        ["import", "list", ..] => "import list",
        ["import", "undo", ..] => "import undo",
        ["import", ..] => "import",
        ["data", "clear", ..] => "data clear",
        ["data", "reset", ..] => "data reset",
        ["data", ..] => "data",
        ["config", "set-ads", ..] => "config set-ads",
        ["config", "show", ..] => "config show",
        ["config", ..] => "config",
        ["perf", "summary", ..] => "perf summary",
        ["perf", ..] => "perf",
        _ => return None,
    };
    Some(hint.to_string())
}

fn exit_code_for_error(error: &ClientError) -> ExitCode {
    if error.is_internal() {
        ExitCode::from(2)
    } else {
        ExitCode::from(1)
    }
}

fn infer_requested_output_mode(raw_args: &[String]) -> output::OutputMode {
    if raw_args.iter().skip(1).any(|value| value == "--json") {
        return output::OutputMode::Json;
    }
    output::OutputMode::Text
}

#[cfg(test)]
mod tests {
    use super::{command_path_from_args, strip_clap_boilerplate};

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn command_hints_follow_the_subcommand_path() {
        assert_eq!(
            command_path_from_args(&args(&["adpulse", "import", "sync", "--days", "x"])),
            Some("import sync".to_string())
        );
        assert_eq!(
            command_path_from_args(&args(&["adpulse", "config", "set-ads", "--json"])),
            Some("config set-ads".to_string())
        );
        assert_eq!(command_path_from_args(&args(&["adpulse", "--json"])), None);
        assert_eq!(command_path_from_args(&args(&["adpulse", "bogus"])), None);
    }

    #[test]
    fn clap_usage_footer_is_removed() {
        let message = "error: unexpected argument '--nope' found\n\nUsage: adpulse import list\n\nFor more information, try '--help'.\n";
        assert_eq!(
            strip_clap_boilerplate(message),
            "error: unexpected argument '--nope' found"
        );
    }
}
