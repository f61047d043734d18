use std::io;

use serde_json::Value;

use super::format::{self, str_field, u64_field};

pub fn render_data_clear(data: &Value) -> io::Result<String> {
    let tables = data
        .get("cleared_tables")
        .and_then(Value::as_array)
        .map(|tables| {
            tables
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<&str>>()
                .join(", ")
        })
        .unwrap_or_default();

    let mut lines = vec![str_field(data, "message").to_string(), String::new()];
    lines.extend(format::key_value_rows(
        &[
            ("Tables cleared:", tables),
            (
                "Cached analyses:",
                u64_field(data, "analysis_cache_entries").to_string(),
            ),
            (
                "Local keys removed:",
                u64_field(data, "local_keys_removed").to_string(),
            ),
        ],
        2,
    ));
    Ok(lines.join("\n"))
}

pub fn render_config_show(data: &Value) -> io::Result<String> {
    if data.get("configured").and_then(Value::as_bool) != Some(true) {
        return Ok([
            "Ads API is not configured.",
            "",
            "Next step:",
            "  adpulse config set-ads --token <access-token>",
        ]
        .join("\n"));
    }

    let mut entries = vec![
        ("API version:", str_field(data, "api_version").to_string()),
        ("Access token:", str_field(data, "access_token_hint").to_string()),
    ];
    if let Some(base_url) = data.get("base_url").and_then(Value::as_str) {
        entries.push(("Base URL:", base_url.to_string()));
    }

    let mut lines = vec!["Ads API configuration".to_string(), String::new()];
    lines.extend(format::key_value_rows(&entries, 2));
    Ok(lines.join("\n"))
}

pub fn render_config_set(data: &Value) -> io::Result<String> {
    let mut lines = vec!["Ads API configuration saved.".to_string(), String::new()];
    lines.extend(format::key_value_rows(
        &[
            ("API version:", str_field(data, "api_version").to_string()),
            ("Access token:", str_field(data, "access_token_hint").to_string()),
            ("Saved to:", format!("{} store", str_field(data, "backend"))),
        ],
        2,
    ));
    lines.push(String::new());
    lines.push("Next step:".to_string());
    lines.push("  Fetch recent insights for a client:".to_string());
    lines.push("  adpulse import sync <client>".to_string());
    Ok(lines.join("\n"))
}
