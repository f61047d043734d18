use std::io;

use serde_json::Value;

use super::format::{self, Align, Column, str_field, u64_field};

const PREVIEW_LIMIT: usize = 5;

pub fn render_import_create(data: &Value) -> io::Result<String> {
    let outcome = data
        .get("outcome")
        .ok_or_else(|| io::Error::other("import output requires outcome"))?;
    let dry_run = data
        .get("dry_run")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let mut lines = vec![str_field(data, "message").to_string(), String::new()];
    lines.push("Summary:".to_string());

    let mut entries = Vec::new();
    if let Some(ids) = data.get("import_ids").and_then(Value::as_array)
        && !ids.is_empty()
    {
        let joined = ids
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<&str>>()
            .join(", ");
        entries.push(("Import IDs:", joined));
    }
    entries.push(("Rows read:", u64_field(outcome, "rows_read").to_string()));
    entries.push(("Rows invalid:", u64_field(outcome, "rows_invalid").to_string()));
    entries.push(("New records:", u64_field(outcome, "new_records_count").to_string()));
    if let Some(duplicates) = outcome.get("duplicate_summary") {
        entries.push((
            "Duplicates:",
            format!(
                "{} ({} already imported, {} repeated in this file)",
                u64_field(duplicates, "total"),
                u64_field(duplicates, "existing_ledger"),
                u64_field(duplicates, "batch"),
            ),
        ));
    }
    entries.push((
        "Unmatched rows:",
        outcome
            .get("unresolved")
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
            .to_string(),
    ));
    if let Some(backend) = outcome.get("backend").and_then(Value::as_str) {
        entries.push(("Saved to:", format!("{backend} store")));
    }
    lines.extend(format::key_value_rows(&entries, 2));

    let clients = render_client_results(outcome);
    if !clients.is_empty() {
        lines.push(String::new());
        lines.extend(clients);
    }

    let unresolved = render_unresolved(outcome);
    if !unresolved.is_empty() {
        lines.push(String::new());
        lines.extend(unresolved);
    }

    let issues = render_issues(outcome);
    if !issues.is_empty() {
        lines.push(String::new());
        lines.extend(issues);
    }

    if let Some(note) = render_connection_note(data) {
        lines.push(String::new());
        lines.push(note);
    }

    if dry_run {
        lines.push(String::new());
        lines.push("No records were written because this was a dry run.".to_string());
    }

    lines.push(String::new());
    lines.extend(render_next_actions(data));

    Ok(lines.join("\n"))
}

pub fn render_import_sync(data: &Value) -> io::Result<String> {
    let range = data
        .get("range")
        .ok_or_else(|| io::Error::other("sync output requires range"))?;
    let header = format!(
        "Fetched {} rows for {} ({} to {}).",
        u64_field(data, "fetched"),
        str_field(data, "client"),
        str_field(range, "since"),
        str_field(range, "until"),
    );
    let body = render_import_create(data)?;
    Ok(format!("{header}\n{body}"))
}

pub fn render_import_list(data: &Value) -> io::Result<String> {
    let rows = data
        .get("rows")
        .and_then(Value::as_array)
        .ok_or_else(|| io::Error::other("import list output requires rows"))?;

    if rows.is_empty() {
        return Ok([
            "No imports yet.",
            "",
            "Next step:",
            "  adpulse import create --help",
        ]
        .join("\n"));
    }

    let columns = [
        Column {
            name: "Import ID",
            align: Align::Left,
        },
        Column {
            name: "Imported (UTC)",
            align: Align::Left,
        },
        Column {
            name: "Client",
            align: Align::Left,
        },
        Column {
            name: "Source",
            align: Align::Left,
        },
        Column {
            name: "File",
            align: Align::Left,
        },
        Column {
            name: "Records",
            align: Align::Right,
        },
        Column {
            name: "Status",
            align: Align::Left,
        },
    ];
    let table_rows = rows
        .iter()
        .map(|row| {
            let status = if row.get("reverted_at").and_then(Value::as_str).is_some() {
                "reverted"
            } else {
                "active"
            };
            vec![
                str_field(row, "import_id").to_string(),
                short_timestamp(str_field(row, "timestamp")),
                str_field(row, "client_name").to_string(),
                str_field(row, "source").to_string(),
                str_field(row, "file_name").to_string(),
                format::group_thousands(u64_field(row, "records")),
                status.to_string(),
            ]
        })
        .collect::<Vec<Vec<String>>>();

    let mut lines = vec![format!("Imports ({}):", rows.len()), String::new()];
    lines.extend(format::render_table(
        &columns,
        &table_rows,
        format::terminal_width(),
    ));
    lines.push(String::new());
    lines.push("Undo an import:".to_string());
    lines.push("  adpulse import undo <import-id>".to_string());
    Ok(lines.join("\n"))
}

pub fn render_import_undo(data: &Value) -> io::Result<String> {
    let summary = data
        .get("summary")
        .ok_or_else(|| io::Error::other("import undo output requires summary"))?;

    let mut lines = vec![str_field(data, "message").to_string(), String::new()];
    lines.push("Summary:".to_string());
    lines.extend(format::key_value_rows(
        &[
            ("Import ID:", str_field(data, "import_id").to_string()),
            ("Client ID:", str_field(data, "client_id").to_string()),
            (
                "Records removed:",
                u64_field(summary, "records_removed").to_string(),
            ),
            (
                "Fingerprints freed:",
                u64_field(summary, "fingerprints_removed").to_string(),
            ),
        ],
        2,
    ));
    lines.push(String::new());
    lines.push("Next step:".to_string());
    lines.push("  Review the remaining imports:".to_string());
    lines.push("  adpulse import list".to_string());
    Ok(lines.join("\n"))
}

fn render_client_results(outcome: &Value) -> Vec<String> {
    let Some(clients) = outcome.get("clients").and_then(Value::as_array) else {
        return Vec::new();
    };
    if clients.is_empty() {
        return Vec::new();
    }

    let columns = [
        Column {
            name: "Client",
            align: Align::Left,
        },
        Column {
            name: "New",
            align: Align::Right,
        },
        Column {
            name: "Duplicates",
            align: Align::Right,
        },
        Column {
            name: "Stored",
            align: Align::Right,
        },
    ];
    let rows = clients
        .iter()
        .map(|client| {
            vec![
                str_field(client, "client_name").to_string(),
                u64_field(client, "new_records_count").to_string(),
                u64_field(client, "duplicate_count").to_string(),
                format::group_thousands(u64_field(client, "stored_records_count")),
            ]
        })
        .collect::<Vec<Vec<String>>>();

    let mut lines = vec!["Per client:".to_string()];
    lines.extend(format::render_table(&columns, &rows, format::terminal_width()));
    lines
}

fn render_unresolved(outcome: &Value) -> Vec<String> {
    let Some(unresolved) = outcome.get("unresolved").and_then(Value::as_array) else {
        return Vec::new();
    };
    if unresolved.is_empty() {
        return Vec::new();
    }

    let mut lines = vec!["Rows without a matching client:".to_string()];
    for record in unresolved.iter().take(PREVIEW_LIMIT) {
        let account = record
            .get("account_name")
            .and_then(Value::as_str)
            .unwrap_or("(no account name)");
        lines.push(format!(
            "  - row {}: {account} / {}",
            u64_field(record, "row"),
            str_field(record, "ad_name"),
        ));
    }
    if unresolved.len() > PREVIEW_LIMIT {
        lines.push(format!("  ... and {} more", unresolved.len() - PREVIEW_LIMIT));
    }
    lines.push(
        "  Add the client with `adpulse client add <name> --account <account>` or rerun with --client."
            .to_string(),
    );
    lines
}

fn render_issues(outcome: &Value) -> Vec<String> {
    let Some(issues) = outcome.get("issues").and_then(Value::as_array) else {
        return Vec::new();
    };
    if issues.is_empty() {
        return Vec::new();
    }

    let mut lines = vec!["Skipped rows:".to_string()];
    for issue in issues.iter().take(PREVIEW_LIMIT) {
        let received = issue
            .get("received")
            .and_then(Value::as_str)
            .map(|value| format!(" (received `{value}`)"))
            .unwrap_or_default();
        lines.push(format!(
            "  - row {} {}: {}{received}",
            u64_field(issue, "row"),
            str_field(issue, "field"),
            str_field(issue, "description"),
        ));
    }
    if issues.len() > PREVIEW_LIMIT {
        lines.push(format!("  ... and {} more", issues.len() - PREVIEW_LIMIT));
    }
    lines
}

fn render_connection_note(data: &Value) -> Option<String> {
    let connection = data.get("connection")?;
    if str_field(connection, "status") == "reachable" {
        return None;
    }
    let mut note = "Remote store unreachable; changes were kept in the local store.".to_string();
    if let Some(error) = connection.get("last_error").and_then(Value::as_str) {
        note.push_str(&format!(" Last error: {error}"));
    }
    Some(note)
}

fn render_next_actions(data: &Value) -> Vec<String> {
    let mut lines = vec!["Next step:".to_string()];
    if let Some(next_step) = data.get("next_step") {
        lines.push(format!("  {}:", str_field(next_step, "label")));
        lines.push(format!("  {}", str_field(next_step, "command")));
    }

    let actions = data
        .get("other_actions")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    if actions.is_empty() {
        return lines;
    }

    lines.push(String::new());
    lines.push("Other actions:".to_string());
    for action in &actions {
        let label = str_field(action, "label");
        let command = str_field(action, "command");
        if str_field(action, "risk") == "destructive" {
            lines.push(format!("  - {label} (destructive): {command}"));
        } else {
            lines.push(format!("  - {label}: {command}"));
        }
    }
    lines
}

/// `2026-03-01T10:15:42.123Z` becomes `2026-03-01 10:15`.
fn short_timestamp(value: &str) -> String {
    let trimmed = value.get(..16).unwrap_or(value);
    trimmed.replacen('T', " ", 1)
}
