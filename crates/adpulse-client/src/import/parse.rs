use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::import::{RawRecord, invalid_input_error};
use crate::{ClientError, ClientResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    AccountName,
    CampaignName,
    AdSetName,
    AdName,
    Day,
    Age,
    Gender,
    Currency,
    Spend,
    Purchases,
    PurchaseValue,
    Impressions,
    Reach,
    LinkClicks,
    Frequency,
    ThruPlays,
    VideoAveragePlayTime,
}

/// Header aliases after [`header_key`] folding. Covers English and Spanish ads-manager
/// exports and the camelCase keys of stored records.
const HEADER_ALIASES: [(Field, &[&str]); 17] = [
    (
        Field::AccountName,
        &["accountname", "account", "nombredelacuenta", "cuenta"],
    ),
    (
        Field::CampaignName,
        &["campaignname", "campaign", "nombredelacampaña", "nombredelacampana", "campaña"],
    ),
    (
        Field::AdSetName,
        &["adsetname", "adset", "nombredelconjuntodeanuncios", "conjuntodeanuncios"],
    ),
    (Field::AdName, &["adname", "ad", "nombredelanuncio", "anuncio"]),
    (
        Field::Day,
        &["day", "date", "día", "dia", "fecha", "reportingstarts", "iniciodelinforme", "datestart"],
    ),
    (Field::Age, &["age", "edad"]),
    (Field::Gender, &["gender", "sexo", "género", "genero"]),
    (Field::Currency, &["currency", "divisa", "moneda"]),
    (
        Field::Spend,
        &["spend", "amountspent", "importegastado", "gasto"],
    ),
    (Field::Purchases, &["purchases", "compras"]),
    (
        Field::PurchaseValue,
        &[
            "purchasevalue",
            "purchasesconversionvalue",
            "valordeconversióndecompras",
            "valordeconversiondecompras",
        ],
    ),
    (Field::Impressions, &["impressions", "impresiones"]),
    (Field::Reach, &["reach", "alcance"]),
    (
        Field::LinkClicks,
        &["linkclicks", "inlinelinkclicks", "clicsenelenlace"],
    ),
    (Field::Frequency, &["frequency", "frecuencia"]),
    (
        Field::ThruPlays,
        &["thruplays", "thruplay", "reproduccionesdethruplay"],
    ),
    (
        Field::VideoAveragePlayTime,
        &[
            "videoaverageplaytime",
            "tiempodereproducciónpromediodelvideo",
            "tiempodereproduccionpromediodelvideo",
        ],
    ),
];

pub(crate) const REQUIRED_COLUMNS: [&str; 2] = ["ad_name", "day"];

pub(crate) fn parse_source(content: &str) -> ClientResult<Vec<RawRecord>> {
    let trimmed = content.trim_start_matches('\u{feff}').trim();
    if trimmed.is_empty() {
        return Err(invalid_input_error("Import source is empty."));
    }

    if looks_like_ndjson(trimmed) {
        return Err(ClientError::invalid_import_format(
            "NDJSON is not supported. Provide a JSON array or CSV.",
            "ndjson",
        ));
    }

    if trimmed.starts_with('[') {
        return parse_json_array(trimmed);
    }

    if serde_json::from_str::<Value>(trimmed).is_ok() {
        return Err(ClientError::invalid_import_format(
            "JSON input must be a top-level array of record objects.",
            "json_non_array",
        ));
    }

    if let Some(delimiter) = detect_delimiter(trimmed) {
        return parse_csv(trimmed, delimiter);
    }

    Err(ClientError::invalid_import_format(
        "Unsupported import format. Provide a JSON array or CSV with headers.",
        "unknown",
    ))
}

fn parse_json_array(content: &str) -> ClientResult<Vec<RawRecord>> {
    let parsed = serde_json::from_str::<Value>(content)
        .map_err(|_| invalid_input_error("Invalid JSON input. Provide a valid JSON array."))?;

    let Some(items) = parsed.as_array() else {
        return Err(invalid_input_error(
            "JSON input must be a top-level array of record objects.",
        ));
    };

    let mut records = Vec::with_capacity(items.len());
    for item in items {
        let Some(object) = item.as_object() else {
            return Err(invalid_input_error(
                "JSON array entries must all be objects with record fields.",
            ));
        };
        records.push(record_from_object(object));
    }

    Ok(records)
}

fn record_from_object(object: &Map<String, Value>) -> RawRecord {
    let mut record = RawRecord::default();
    for (key, value) in object {
        if let Some(field) = field_for_header(key) {
            assign(&mut record, field, read_optional_string(value));
        }
    }
    record
}

fn parse_csv(content: &str, delimiter: u8) -> ClientResult<Vec<RawRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|_| invalid_input_error("CSV header row is missing or unreadable."))?
        .iter()
        .map(|value| value.trim().to_string())
        .collect::<Vec<String>>();

    let fields_by_index = headers
        .iter()
        .enumerate()
        .filter_map(|(index, header)| field_for_header(header).map(|field| (index, field)))
        .collect::<HashMap<usize, Field>>();

    let has = |wanted: Field| fields_by_index.values().any(|field| *field == wanted);
    if !has(Field::AdName) || !has(Field::Day) {
        return Err(ClientError::import_schema_mismatch(
            REQUIRED_COLUMNS.iter().map(|name| name.to_string()).collect(),
            headers,
        ));
    }

    let mut records = Vec::new();
    for result_row in reader.records() {
        let row =
            result_row.map_err(|_| invalid_input_error("CSV rows are malformed or not UTF-8."))?;
        let mut record = RawRecord::default();
        for (index, field) in &fields_by_index {
            let value = row
                .get(*index)
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string);
            assign(&mut record, *field, value);
        }
        records.push(record);
    }

    Ok(records)
}

/// Folds a header to lowercase letters and digits, dropping any `(...)` suffix such as
/// a currency code.
fn header_key(header: &str) -> String {
    let base = header.split('(').next().unwrap_or(header);
    base.chars()
        .flat_map(char::to_lowercase)
        .filter(|character| character.is_alphanumeric())
        .collect()
}

fn field_for_header(header: &str) -> Option<Field> {
    let key = header_key(header);
    HEADER_ALIASES
        .iter()
        .find(|(_, aliases)| aliases.contains(&key.as_str()))
        .map(|(field, _)| *field)
}

fn assign(record: &mut RawRecord, field: Field, value: Option<String>) {
    if value.is_none() {
        return;
    }
    let slot = match field {
        Field::AccountName => &mut record.account_name,
        Field::CampaignName => &mut record.campaign_name,
        Field::AdSetName => &mut record.ad_set_name,
        Field::AdName => &mut record.ad_name,
        Field::Day => &mut record.day,
        Field::Age => &mut record.age,
        Field::Gender => &mut record.gender,
        Field::Currency => &mut record.currency,
        Field::Spend => &mut record.spend,
        Field::Purchases => &mut record.purchases,
        Field::PurchaseValue => &mut record.purchase_value,
        Field::Impressions => &mut record.impressions,
        Field::Reach => &mut record.reach,
        Field::LinkClicks => &mut record.link_clicks,
        Field::Frequency => &mut record.frequency,
        Field::ThruPlays => &mut record.thru_plays,
        Field::VideoAveragePlayTime => &mut record.video_average_play_time,
    };
    *slot = value;
}

fn read_optional_string(value: &Value) -> Option<String> {
    if value.is_null() {
        return None;
    }

    if let Some(string_value) = value.as_str() {
        let trimmed = string_value.trim();
        return (!trimmed.is_empty()).then(|| trimmed.to_string());
    }

    if let Some(integer) = value.as_i64() {
        return Some(integer.to_string());
    }

    if let Some(number_value) = value.as_f64() {
        return Some(number_value.to_string());
    }

    Some(value.to_string())
}

fn looks_like_ndjson(content: &str) -> bool {
    let lines = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<&str>>();
    if lines.len() < 2 {
        return false;
    }

    lines.iter().all(|line| {
        let parsed = serde_json::from_str::<Value>(line.trim());
        if let Ok(value) = parsed {
            return value.is_object();
        }
        false
    })
}

fn detect_delimiter(content: &str) -> Option<u8> {
    let first_line = content.lines().find(|line| !line.trim().is_empty())?;
    [b',', b';', b'\t']
        .into_iter()
        .map(|delimiter| (delimiter, first_line.matches(delimiter as char).count()))
        .filter(|(_, count)| *count > 0)
        .max_by_key(|(_, count)| *count)
        .map(|(delimiter, _)| delimiter)
}
