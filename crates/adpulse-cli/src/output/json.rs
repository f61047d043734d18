use std::io;

use adpulse_client::{ClientError, SuccessEnvelope, error_envelope};
use serde::Serialize;
use serde_json::{Value, json};

const JSON_VERSION: &str = "v1";

/// `import list` prints a bare array of rows; everything else is wrapped in the
/// `{ ok, version, data }` envelope.
pub fn render_success_json(success: &SuccessEnvelope) -> io::Result<String> {
    let value = match success.command.as_str() {
        "import list" => render_import_list_json(&success.data),
        _ => json!({
            "ok": true,
            "version": JSON_VERSION,
            "data": success.data.clone(),
        }),
    };

    serialize_json_pretty(&value)
}

pub fn render_error_json(error: &ClientError) -> io::Result<String> {
    serialize_json_pretty(&error_envelope(error))
}

fn render_import_list_json(data: &Value) -> Value {
    let mut rows = data
        .get("rows")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    rows.sort_by(|left, right| {
        value_string(right, "timestamp")
            .cmp(&value_string(left, "timestamp"))
            .then_with(|| value_string(right, "import_id").cmp(&value_string(left, "import_id")))
    });

    Value::Array(rows)
}

fn value_string(row: &Value, key: &str) -> String {
    row.get(key)
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string()
}

fn serialize_json_pretty<T>(value: &T) -> io::Result<String>
where
    T: Serialize,
{
    serde_json::to_string_pretty(value).map_err(io::Error::other)
}
