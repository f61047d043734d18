use std::cmp;

use serde_json::Value;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Align {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy)]
pub struct Column<'a> {
    pub name: &'a str,
    pub align: Align,
}

const INDENT: usize = 2;
const COLUMN_GAP: usize = 2;
const MIN_COLUMN_WIDTH: usize = 6;

pub fn terminal_width() -> usize {
    let from_env = std::env::var("COLUMNS")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(120);
    cmp::max(from_env, 40)
}

pub fn key_value_rows(entries: &[(&str, String)], indent: usize) -> Vec<String> {
    let label_width = entries
        .iter()
        .map(|(label, _)| label.chars().count())
        .max()
        .unwrap_or(0);
    let padding = " ".repeat(indent);

    entries
        .iter()
        .map(|(label, value)| format!("{padding}{label:<label_width$}  {value}"))
        .collect()
}

/// Renders an indented table. Left-aligned columns are shortened with `...`, widest
/// first, until the table fits in `max_width`.
pub fn render_table(columns: &[Column<'_>], rows: &[Vec<String>], max_width: usize) -> Vec<String> {
    if columns.is_empty() {
        return Vec::new();
    }

    let mut widths = columns
        .iter()
        .map(|column| column.name.chars().count())
        .collect::<Vec<usize>>();
    for row in rows {
        for (index, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(index) {
                *width = cmp::max(*width, cell.chars().count());
            }
        }
    }

    let budget = max_width
        .saturating_sub(INDENT)
        .saturating_sub(COLUMN_GAP * columns.len().saturating_sub(1));
    while widths.iter().sum::<usize>() > budget {
        let widest = widths
            .iter()
            .enumerate()
            .filter(|(index, width)| {
                columns[*index].align == Align::Left && **width > MIN_COLUMN_WIDTH
            })
            .max_by_key(|(_, width)| **width)
            .map(|(index, _)| index);
        let Some(index) = widest else {
            break;
        };
        widths[index] -= 1;
    }

    let header = columns
        .iter()
        .map(|column| column.name.to_string())
        .collect::<Vec<String>>();
    let mut lines = vec![format_row(columns, &header, &widths)];
    lines.extend(rows.iter().map(|row| format_row(columns, row, &widths)));
    lines
}

fn format_row(columns: &[Column<'_>], cells: &[String], widths: &[usize]) -> String {
    let pieces = columns
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(index, (column, width))| {
            let value = truncate(cells.get(index).map(String::as_str).unwrap_or(""), *width);
            match column.align {
                Align::Left => format!("{value:<width$}"),
                Align::Right => format!("{value:>width$}"),
            }
        })
        .collect::<Vec<String>>();

    format!("{}{}", " ".repeat(INDENT), pieces.join("  "))
        .trim_end()
        .to_string()
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    if width <= 3 {
        return value.chars().take(width).collect();
    }
    let kept = value.chars().take(width - 3).collect::<String>();
    format!("{kept}...")
}

/// Groups the integer part with commas: `1234567` becomes `1,234,567`.
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

pub fn money(value: f64) -> String {
    let rounded = (value.abs() * 100.0).round() as u64;
    let sign = if value < 0.0 && rounded > 0 { "-" } else { "" };
    format!("{sign}{}.{:02}", group_thousands(rounded / 100), rounded % 100)
}

pub fn str_field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or("")
}

pub fn u64_field(value: &Value, key: &str) -> u64 {
    value.get(key).and_then(Value::as_u64).unwrap_or(0)
}

pub fn f64_field(value: &Value, key: &str) -> f64 {
    value.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::{Align, Column, group_thousands, key_value_rows, money, render_table};

    #[test]
    fn key_value_rows_align_labels() {
        let rows = key_value_rows(
            &[("Status:", "reachable".to_string()), ("Remote URL:", "x".to_string())],
            2,
        );
        assert_eq!(rows[0], "  Status:      reachable");
        assert_eq!(rows[1], "  Remote URL:  x");
    }

    #[test]
    fn tables_shrink_left_columns_to_fit() {
        let columns = [
            Column {
                name: "Ad",
                align: Align::Left,
            },
            Column {
                name: "Spend",
                align: Align::Right,
            },
        ];
        let rows = vec![vec!["A very long ad name that will not fit".to_string(), "12.50".to_string()]];
        let lines = render_table(&columns, &rows, 30);
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|line| line.chars().count() <= 30));
        assert!(lines[1].contains("..."));
        assert!(lines[1].ends_with("12.50"));
    }

    #[test]
    fn money_and_counts_are_grouped() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
        assert_eq!(money(1234.567), "1,234.57");
        assert_eq!(money(-0.001), "0.00");
        assert_eq!(money(-5.5), "-5.50");
    }
}
