use std::io;

use serde_json::Value;

use super::format::{self, Align, Column, str_field, u64_field};

pub fn render_client_add(data: &Value) -> io::Result<String> {
    let client = data
        .get("client")
        .ok_or_else(|| io::Error::other("client add output requires client"))?;

    let mut entries = vec![
        ("ID:", str_field(client, "id").to_string()),
        ("Name:", str_field(client, "name").to_string()),
    ];
    if let Some(account) = client.get("ads_account_name").and_then(Value::as_str) {
        entries.push(("Ads account:", account.to_string()));
    }
    entries.push(("Saved to:", format!("{} store", str_field(data, "backend"))));

    let mut lines = vec!["Client added.".to_string(), String::new()];
    lines.extend(format::key_value_rows(&entries, 2));
    lines.push(String::new());
    lines.push("Next step:".to_string());
    lines.push("  Import records for this client:".to_string());
    lines.push("  adpulse import create <path>".to_string());
    Ok(lines.join("\n"))
}

pub fn render_client_list(data: &Value) -> io::Result<String> {
    let rows = data
        .get("rows")
        .and_then(Value::as_array)
        .ok_or_else(|| io::Error::other("client list output requires rows"))?;

    if rows.is_empty() {
        return Ok([
            "No clients yet.",
            "",
            "Next step:",
            "  adpulse client add <name> --account <ads-account>",
        ]
        .join("\n"));
    }

    let columns = [
        Column {
            name: "Name",
            align: Align::Left,
        },
        Column {
            name: "Ads account",
            align: Align::Left,
        },
        Column {
            name: "Records",
            align: Align::Right,
        },
        Column {
            name: "Fingerprints",
            align: Align::Right,
        },
        Column {
            name: "ID",
            align: Align::Left,
        },
    ];
    let table_rows = rows
        .iter()
        .map(|row| {
            vec![
                str_field(row, "name").to_string(),
                row.get("ads_account_name")
                    .and_then(Value::as_str)
                    .unwrap_or("-")
                    .to_string(),
                format::group_thousands(u64_field(row, "record_count")),
                format::group_thousands(u64_field(row, "fingerprint_count")),
                str_field(row, "id").to_string(),
            ]
        })
        .collect::<Vec<Vec<String>>>();

    let mut lines = vec![format!("Clients ({}):", rows.len()), String::new()];
    lines.extend(format::render_table(
        &columns,
        &table_rows,
        format::terminal_width(),
    ));
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::render_client_list;

    #[test]
    fn client_list_renders_table() {
        let data = json!({
            "rows": [{
                "id": "client_1",
                "name": "Acme",
                "record_count": 1200,
                "fingerprint_count": 1200
            }]
        });
        let rendered = render_client_list(&data);
        assert!(rendered.is_ok());
        if let Ok(text) = rendered {
            assert!(text.starts_with("Clients (1):"));
            assert!(text.contains("Ads account"));
            assert!(text.contains("1,200"));
            assert!(text.contains("client_1"));
        }
    }
}
