use crate::cli::Cli;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum OutputMode {
    Text,
    Json,
}

pub fn mode_for_cli(cli: &Cli) -> OutputMode {
    if cli.global.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    }
}
