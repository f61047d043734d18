mod client_text;
mod data_text;
mod error_text;
mod format;
mod import_text;
mod json;
mod mode;
mod perf_text;
mod status_text;

use std::io;

use adpulse_client::{ClientError, SuccessEnvelope};

use crate::stdout_io::write_stdout_line;

pub use mode::{OutputMode, mode_for_cli};

pub fn print_success(success: &SuccessEnvelope, mode: OutputMode) -> io::Result<()> {
    let body = match mode {
        OutputMode::Text => render_text_success(success)?,
        OutputMode::Json => json::render_success_json(success)?,
    };
    write_stdout_line(&body)
}

pub fn print_failure(error: &ClientError, mode: OutputMode) -> io::Result<()> {
    let body = match mode {
        OutputMode::Json => json::render_error_json(error)?,
        OutputMode::Text => error_text::render_error(error),
    };
    write_stdout_line(&body)
}

fn render_text_success(success: &SuccessEnvelope) -> io::Result<String> {
    match success.command.as_str() {
        "status" => status_text::render_status(&success.data),
        "connect" => status_text::render_connect(&success.data),
        "client add" => client_text::render_client_add(&success.data),
        "client list" => client_text::render_client_list(&success.data),
        "import create" => import_text::render_import_create(&success.data),
        "import sync" => import_text::render_import_sync(&success.data),
        "import list" => import_text::render_import_list(&success.data),
        "import undo" => import_text::render_import_undo(&success.data),
        "data clear" | "data reset" => data_text::render_data_clear(&success.data),
        "config set-ads" => data_text::render_config_set(&success.data),
        "config show" => data_text::render_config_show(&success.data),
        "perf summary" => perf_text::render_perf_summary(&success.data),
        _ => Err(io::Error::other(format!(
            "unsupported text output command `{}`",
            success.command
        ))),
    }
}
