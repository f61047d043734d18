use std::io;

use serde_json::Value;

use super::format::{self, Align, Column, f64_field, str_field, u64_field};

pub fn render_perf_summary(data: &Value) -> io::Result<String> {
    let totals = data
        .get("totals")
        .ok_or_else(|| io::Error::other("perf summary output requires totals"))?;

    let range = match data.get("range") {
        Some(range) => format!("{} to {}", str_field(range, "since"), str_field(range, "until")),
        None => "all time".to_string(),
    };
    let mut lines = vec![
        format!("Performance for {} ({range})", str_field(data, "client_name")),
        String::new(),
    ];

    if u64_field(data, "record_count") == 0 {
        lines.push("No records in this range.".to_string());
        lines.push(String::new());
        lines.push("Next step:".to_string());
        lines.push("  adpulse import create <path>".to_string());
        return Ok(lines.join("\n"));
    }

    lines.push("Totals:".to_string());
    lines.extend(format::key_value_rows(
        &[
            ("Records:", u64_field(data, "record_count").to_string()),
            ("Spend:", format::money(f64_field(totals, "spend"))),
            ("Purchases:", format::group_thousands(u64_field(totals, "purchases"))),
            ("Purchase value:", format::money(f64_field(totals, "purchase_value"))),
            ("Impressions:", format::group_thousands(u64_field(totals, "impressions"))),
            ("Link clicks:", format::group_thousands(u64_field(totals, "link_clicks"))),
            ("ROAS:", format!("{:.2}", f64_field(totals, "roas"))),
            ("CPA:", format::money(f64_field(totals, "cpa"))),
            ("CPM:", format::money(f64_field(totals, "cpm"))),
            ("CTR:", format!("{:.2}%", f64_field(totals, "ctr"))),
        ],
        2,
    ));

    let ads = data
        .get("ads")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    if !ads.is_empty() {
        let columns = [
            Column {
                name: "Ad",
                align: Align::Left,
            },
            Column {
                name: "Days",
                align: Align::Right,
            },
            Column {
                name: "Spend",
                align: Align::Right,
            },
            Column {
                name: "Purchases",
                align: Align::Right,
            },
            Column {
                name: "ROAS",
                align: Align::Right,
            },
            Column {
                name: "CPA",
                align: Align::Right,
            },
            Column {
                name: "CTR",
                align: Align::Right,
            },
        ];
        let rows = ads
            .iter()
            .map(|ad| {
                vec![
                    str_field(ad, "ad_name").to_string(),
                    u64_field(ad, "days").to_string(),
                    format::money(f64_field(ad, "spend")),
                    format::group_thousands(u64_field(ad, "purchases")),
                    format!("{:.2}", f64_field(ad, "roas")),
                    format::money(f64_field(ad, "cpa")),
                    format!("{:.2}%", f64_field(ad, "ctr")),
                ]
            })
            .collect::<Vec<Vec<String>>>();

        lines.push(String::new());
        lines.push("By ad (highest spend first):".to_string());
        lines.extend(format::render_table(&columns, &rows, format::terminal_width()));
    }

    if let Some(analysis) = data.get("analysis") {
        lines.push(String::new());
        lines.extend(render_analysis(analysis));
    }

    Ok(lines.join("\n"))
}

fn render_analysis(analysis: &Value) -> Vec<String> {
    let mut lines = vec!["Analysis:".to_string()];
    match str_field(analysis, "status") {
        "parsed" => {
            let result = analysis.get("result").cloned().unwrap_or(Value::Null);
            let pretty = serde_json::to_string_pretty(&result).unwrap_or_default();
            lines.extend(pretty.lines().map(|line| format!("  {line}")));
        }
        _ => {
            lines.push(format!("  Unavailable: {}", str_field(analysis, "reason")));
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::render_perf_summary;

    #[test]
    fn summary_shows_totals_ads_and_analysis() {
        let data = json!({
            "client_id": "client_1",
            "client_name": "Acme",
            "range": {"since": "2026-05-01", "until": "2026-05-31"},
            "record_count": 2,
            "totals": {"ad_name": "", "days": 1, "spend": 32.0, "purchases": 4, "purchase_value": 160.0,
                       "impressions": 2000, "reach": 0, "link_clicks": 50, "thru_plays": 0,
                       "frequency": 0.0, "roas": 5.0, "cpa": 8.0, "cpm": 16.0, "ctr": 2.5},
            "ads": [{"ad_name": "Summer Carousel", "days": 1, "spend": 20.5, "purchases": 2,
                     "roas": 3.9, "cpa": 10.25, "ctr": 2.5}],
            "analysis": {"status": "failed", "reason": "analysis response is not valid JSON"}
        });
        let rendered = render_perf_summary(&data);
        assert!(rendered.is_ok());
        if let Ok(text) = rendered {
            assert!(text.starts_with("Performance for Acme (2026-05-01 to 2026-05-31)"));
            assert!(text.contains("2,000"));
            assert!(text.contains("Summer Carousel"));
            assert!(text.contains("Unavailable: analysis response is not valid JSON"));
        }
    }

    #[test]
    fn empty_range_says_so() {
        let data = json!({
            "client_id": "client_1",
            "client_name": "Acme",
            "record_count": 0,
            "totals": {},
            "ads": []
        });
        let rendered = render_perf_summary(&data);
        assert!(rendered.is_ok());
        if let Ok(text) = rendered {
            assert!(text.contains("(all time)"));
            assert!(text.contains("No records in this range."));
        }
    }
}
