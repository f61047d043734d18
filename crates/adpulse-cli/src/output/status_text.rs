use std::io;

use serde_json::Value;

use super::format::{self, str_field};

pub fn render_status(data: &Value) -> io::Result<String> {
    let connection = data
        .get("connection")
        .ok_or_else(|| io::Error::other("status output requires connection"))?;

    let mut entries = vec![
        ("Remote URL:", str_field(data, "remote_url").to_string()),
        ("Connection:", str_field(connection, "status").to_string()),
    ];
    if let Some(error) = connection.get("last_error").and_then(Value::as_str) {
        entries.push(("Last error:", error.to_string()));
    }
    if let Some(remote) = data.get("remote_status") {
        let database = if remote.get("connected").and_then(Value::as_bool) == Some(true) {
            "connected".to_string()
        } else {
            match remote.get("error").and_then(Value::as_str) {
                Some(error) => format!("not connected ({error})"),
                None => "not connected".to_string(),
            }
        };
        entries.push(("Remote database:", database));
    }
    entries.push(("Local store:", str_field(data, "local_store_path").to_string()));
    entries.push(("Schema version:", str_field(data, "schema_version").to_string()));

    let tables = data
        .get("local_tables")
        .and_then(Value::as_array)
        .map(|tables| {
            tables
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<&str>>()
                .join(", ")
        })
        .unwrap_or_default();
    entries.push((
        "Local keys:",
        if tables.is_empty() {
            "(none)".to_string()
        } else {
            tables
        },
    ));

    let mut lines = vec!["AdPulse status".to_string(), String::new()];
    lines.extend(format::key_value_rows(&entries, 2));

    if str_field(connection, "status") != "reachable" {
        lines.push(String::new());
        lines.push("Working from the local store. Reconnect with:".to_string());
        lines.push("  adpulse connect".to_string());
    }

    Ok(lines.join("\n"))
}

pub fn render_connect(data: &Value) -> io::Result<String> {
    let connection = data
        .get("connection")
        .ok_or_else(|| io::Error::other("connect output requires connection"))?;

    let mut lines = vec![str_field(data, "message").to_string(), String::new()];
    lines.extend(format::key_value_rows(
        &[
            ("Remote URL:", str_field(data, "endpoint").to_string()),
            ("Connection:", str_field(connection, "status").to_string()),
        ],
        2,
    ));
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::render_status;

    #[test]
    fn unreachable_status_suggests_reconnect() {
        let data = json!({
            "connection": {"status": "unreachable", "last_error": "connection refused"},
            "remote_url": "http://localhost:3001/api",
            "local_store_path": "/tmp/adpulse/local-store.db",
            "schema_version": "v1",
            "local_tables": ["clients", "config"]
        });
        let rendered = render_status(&data);
        assert!(rendered.is_ok());
        if let Ok(text) = rendered {
            assert!(text.contains("Connection:"));
            assert!(text.contains("unreachable"));
            assert!(text.contains("Last error:"));
            assert!(text.contains("clients, config"));
            assert!(text.contains("adpulse connect"));
        }
    }

    #[test]
    fn reachable_status_reports_database_state() {
        let data = json!({
            "connection": {"status": "reachable", "last_error": null},
            "remote_url": "http://localhost:3001/api",
            "remote_status": {"connected": false, "error": "password authentication failed"},
            "local_store_path": "/tmp/adpulse/local-store.db",
            "schema_version": "v1",
            "local_tables": []
        });
        let rendered = render_status(&data);
        assert!(rendered.is_ok());
        if let Ok(text) = rendered {
            assert!(text.contains("not connected (password authentication failed)"));
            assert!(text.contains("(none)"));
            assert!(!text.contains("Reconnect with"));
        }
    }
}
