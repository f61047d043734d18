use std::fs;
use std::io::{IsTerminal, Read};
use std::path::Path;

use crate::import::fingerprint::content_hash;
use crate::import::invalid_input_error;
use crate::{ClientError, ClientResult};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum SourceKind {
    File,
    Stdin,
}

impl SourceKind {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Stdin => "stdin",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ResolvedSource {
    pub(crate) source_kind: SourceKind,
    /// File name shown in import history (`stdin` for piped input).
    pub(crate) file_name: String,
    pub(crate) content: String,
    pub(crate) file_hash: String,
}

pub(crate) fn resolve_source(
    path: Option<&str>,
    stdin_override: Option<String>,
) -> ClientResult<ResolvedSource> {
    match path {
        Some("-") | None => {
            let stdin_body = read_stdin(stdin_override)?;
            if let Some(stdin_value) = stdin_body
                && !stdin_value.trim().is_empty()
            {
                return Ok(from_content(SourceKind::Stdin, "stdin".to_string(), stdin_value));
            }

            if path.is_some() {
                return Err(invalid_input_error(
                    "Path `-` means stdin input, but stdin was empty. Pipe CSV/JSON input or pass a file path.",
                ));
            }
            Err(invalid_input_error(
                "No import source provided. Pass a file path or pipe input via stdin.",
            ))
        }
        Some(path_value) => {
            let file_body = fs::read_to_string(path_value).map_err(|error| {
                ClientError::invalid_argument_with_recovery(
                    &format!("Could not read import file `{path_value}`: {error}"),
                    vec![
                        "Verify the path exists and is readable.".to_string(),
                        "Rerun adpulse import create <path>.".to_string(),
                    ],
                )
            })?;
            let file_name = Path::new(path_value)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path_value.to_string());
            Ok(from_content(SourceKind::File, file_name, file_body))
        }
    }
}

fn from_content(source_kind: SourceKind, file_name: String, content: String) -> ResolvedSource {
    ResolvedSource {
        source_kind,
        file_name,
        file_hash: content_hash(&content),
        content,
    }
}

fn read_stdin(stdin_override: Option<String>) -> ClientResult<Option<String>> {
    if let Some(value) = stdin_override {
        return Ok(Some(value));
    }

    if std::io::stdin().is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .map_err(|error| {
            ClientError::invalid_argument_with_recovery(
                &format!("Could not read stdin: {error}"),
                vec![
                    "Retry with an explicit file path argument.".to_string(),
                    "Or rerun with valid stdin content.".to_string(),
                ],
            )
        })?;

    if buffer.trim().is_empty() {
        return Ok(None);
    }

    Ok(Some(buffer))
}
