use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsoDate(pub String);

impl IsoDate {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub fn parse_iso_date(value: &str) -> Result<IsoDate, String> {
    if value.len() != 10 {
        return Err("date must use YYYY-MM-DD format".to_string());
    }

    let bytes = value.as_bytes();
    if bytes[4] != b'-' || bytes[7] != b'-' {
        return Err("date must use YYYY-MM-DD format".to_string());
    }

    for index in [0usize, 1, 2, 3, 5, 6, 8, 9] {
        if !bytes[index].is_ascii_digit() {
            return Err("date must use YYYY-MM-DD format".to_string());
        }
    }

    if NaiveDate::parse_from_str(value, "%Y-%m-%d").is_err() {
        return Err("date must use valid calendar values".to_string());
    }

    Ok(IsoDate(value.to_string()))
}

fn parse_sync_days(value: &str) -> Result<i64, String> {
    match value.parse::<i64>() {
        Ok(days) if days >= 1 => Ok(days),
        _ => Err("days must be a whole number of at least 1".to_string()),
    }
}

const IMPORT_CREATE_AFTER_HELP: &str = "\
Import workflow:
  1. adpulse client add \"Acme\" --account \"Acme Ads\"
  2. adpulse import create --dry-run <path>     Preview counts without writing
  3. adpulse import create <path>               Merge new records
  4. adpulse import list                        Review import history
  5. adpulse import undo <import-id>            Revert one batch if needed

Accepted input:
  A CSV export (comma, semicolon or tab delimited) or a JSON array of objects.
  Use `-` or pipe data on stdin to read from standard input.

Required columns:
  Ad name            Also: ad, nombre del anuncio
  Day                Also: date, reporting starts, día, fecha

Matched to clients by:
  Account name       Compared case-insensitively with each client's name and ads account.
                     Pass --client <name> to assign every row to one client instead.

Optional columns:
  Campaign name, Ad set name, Age, Gender, Currency, Amount spent, Purchases,
  Purchases conversion value, Impressions, Reach, Link clicks, Frequency,
  ThruPlays, Video average play time.
  A suffix such as `(EUR)` is ignored. Spanish ads-manager headers are accepted.

Number and date formats:
  1.234,56 and 1,234.56 both read as 1234.56.
  Days may be YYYY-MM-DD, DD/MM/YYYY or YYYY/MM/DD.

Duplicates:
  Each record is fingerprinted from client, ad, day, age, gender and source.
  Records already imported are skipped, so re-running an import is safe.
";

#[derive(Debug, Parser)]
#[command(
    name = "adpulse",
    version,
    about = "ad performance dashboard data layer",
    disable_help_subcommand = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// Emit machine-readable JSON output
    #[arg(long, global = true)]
    pub json: bool,
    /// Skip the remote store and work against local storage only
    #[arg(long, global = true)]
    pub offline: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show remote connection state and local storage details
    Status,
    /// Reconnect to the remote store, optionally supplying database credentials
    Connect(ConnectArgs),
    /// Manage dashboard clients
    #[command(arg_required_else_help = true)]
    Client {
        #[command(subcommand)]
        command: ClientCommand,
    },
    /// Import ad performance records
    #[command(arg_required_else_help = true)]
    Import {
        #[command(subcommand)]
        command: ImportCommand,
    },
    /// Clear or reset stored dashboard data
    #[command(arg_required_else_help = true)]
    Data {
        #[command(subcommand)]
        command: DataCommand,
    },
    /// Manage ads API configuration
    #[command(arg_required_else_help = true)]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Summarize ad performance for one client
    #[command(arg_required_else_help = true)]
    Perf {
        #[command(subcommand)]
        command: PerfCommand,
    },
}

#[derive(Debug, Clone, Args)]
pub struct ConnectArgs {
    /// Database host handed to the remote store
    #[arg(long, requires_all = ["database", "user"])]
    pub host: Option<String>,
    /// Database name
    #[arg(long, requires_all = ["host", "user"])]
    pub database: Option<String>,
    /// Database user
    #[arg(long, requires_all = ["host", "database"])]
    pub user: Option<String>,
    /// Database password
    #[arg(long, requires = "host")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum ClientCommand {
    /// Add a client, optionally linked to an ads account
    Add {
        /// Display name, unique case-insensitively
        name: String,
        /// Ads account id or account name used to match imported rows
        #[arg(long = "account")]
        ads_account_name: Option<String>,
        /// Owning user id
        #[arg(long = "user")]
        user_id: Option<String>,
    },
    /// List clients with their stored record counts
    List,
}

#[derive(Debug, Clone, Subcommand)]
pub enum ImportCommand {
    /// Import an ads-manager CSV or JSON export
    #[command(after_long_help = IMPORT_CREATE_AFTER_HELP)]
    Create {
        /// Path to a CSV or JSON file (use `-` for stdin)
        path: Option<String>,
        /// Assign every row to this client instead of matching account names
        #[arg(long)]
        client: Option<String>,
        /// Report what would be imported without writing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Fetch insights for one client from the ads API and merge them
    Sync {
        /// Client name
        client: String,
        /// First day to fetch (YYYY-MM-DD)
        #[arg(long, value_parser = parse_iso_date)]
        from: Option<IsoDate>,
        /// Last day to fetch (YYYY-MM-DD)
        #[arg(long, value_parser = parse_iso_date)]
        to: Option<IsoDate>,
        /// Number of days up to today, used when no dates are given
        #[arg(long, value_parser = parse_sync_days, conflicts_with_all = ["from", "to"])]
        days: Option<i64>,
        /// Report what would be imported without writing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// List past imports, newest first
    List,
    /// Revert an import and forget its records
    Undo {
        /// The import ID to revert (e.g. imp_01J...)
        import_id: String,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum DataCommand {
    /// Remove all dashboard data but keep configuration
    Clear,
    /// Remove all data, configuration and stored credentials
    Reset,
}

#[derive(Debug, Clone, Subcommand)]
pub enum ConfigCommand {
    /// Store the ads API access token and version
    SetAds {
        /// Ads API access token
        #[arg(long)]
        token: String,
        /// Graph API version, e.g. v19.0
        #[arg(long)]
        api_version: Option<String>,
        /// Alternate ads API base URL
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Show the stored ads API configuration with the token masked
    Show,
}

#[derive(Debug, Clone, Subcommand)]
pub enum PerfCommand {
    /// Aggregate a client's records per ad, optionally requesting an analysis
    Summary {
        /// Client name
        client: String,
        /// Start date filter (YYYY-MM-DD)
        #[arg(long, value_parser = parse_iso_date)]
        from: Option<IsoDate>,
        /// End date filter (YYYY-MM-DD)
        #[arg(long, value_parser = parse_iso_date)]
        to: Option<IsoDate>,
        /// Analysis service that receives the summary
        #[arg(long, env = "ADPULSE_ANALYZE_URL")]
        analyze_url: Option<String>,
    },
}

#[cfg(test)]
pub fn parse_from<I, T>(itr: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(itr)
}
