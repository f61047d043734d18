//! Per-ad aggregation and tolerant handling of an external analysis service.
//!
//! The analysis service is a black box: it gets a performance summary and answers with
//! JSON text. An empty or unparseable answer fails that one call and nothing else.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::config::{HttpConfig, build_http_client};
use crate::connector::DateRange;
use crate::model::PerformanceRecord;
use crate::store::{ANALYSIS_CACHE_PREFIX, FailoverStore};
use crate::{ClientError, ClientResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AdSummary {
    pub ad_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub campaign_name: String,
    pub days: usize,
    pub spend: f64,
    pub purchases: u64,
    pub purchase_value: f64,
    pub impressions: u64,
    pub reach: u64,
    pub link_clicks: u64,
    pub thru_plays: u64,
    /// Impression-weighted average.
    pub frequency: f64,
    /// Purchase value over spend.
    pub roas: f64,
    /// Spend per purchase.
    pub cpa: f64,
    /// Spend per thousand impressions.
    pub cpm: f64,
    /// Link clicks over impressions, as a percentage.
    pub ctr: f64,
}

#[derive(Default)]
struct Accumulator {
    campaign_name: String,
    days: BTreeSet<String>,
    spend: f64,
    purchases: u64,
    purchase_value: f64,
    impressions: u64,
    reach: u64,
    link_clicks: u64,
    thru_plays: u64,
    weighted_frequency: f64,
}

impl Accumulator {
    fn add(&mut self, record: &PerformanceRecord) {
        if self.campaign_name.is_empty() {
            self.campaign_name = record.campaign_name.clone();
        }
        self.days.insert(record.day.clone());
        self.spend += record.spend;
        self.purchases += record.purchases;
        self.purchase_value += record.purchase_value;
        self.impressions += record.impressions;
        self.reach += record.reach;
        self.link_clicks += record.link_clicks;
        self.thru_plays += record.thru_plays;
        self.weighted_frequency += record.frequency * record.impressions as f64;
    }

    fn finish(self, ad_name: String) -> AdSummary {
        let impressions = self.impressions as f64;
        AdSummary {
            ad_name,
            campaign_name: self.campaign_name,
            days: self.days.len(),
            spend: self.spend,
            purchases: self.purchases,
            purchase_value: self.purchase_value,
            impressions: self.impressions,
            reach: self.reach,
            link_clicks: self.link_clicks,
            thru_plays: self.thru_plays,
            frequency: ratio(self.weighted_frequency, impressions),
            roas: ratio(self.purchase_value, self.spend),
            cpa: ratio(self.spend, self.purchases as f64),
            cpm: ratio(self.spend * 1000.0, impressions),
            ctr: ratio(self.link_clicks as f64 * 100.0, impressions),
        }
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Aggregates records per ad name, highest spend first. Records outside `range` are
/// skipped.
pub fn summarize_by_ad(records: &[PerformanceRecord], range: Option<&DateRange>) -> Vec<AdSummary> {
    let mut by_ad: BTreeMap<String, Accumulator> = BTreeMap::new();
    for record in records
        .iter()
        .filter(|record| range.is_none_or(|range| range.contains(&record.day)))
    {
        by_ad.entry(record.ad_name.clone()).or_default().add(record);
    }

    let mut summaries = by_ad
        .into_iter()
        .map(|(ad_name, accumulator)| accumulator.finish(ad_name))
        .collect::<Vec<AdSummary>>();
    summaries.sort_by(|left, right| right.spend.total_cmp(&left.spend));
    summaries
}

/// Totals across every record in range, reported under the ad name `total`.
pub fn summarize_total(records: &[PerformanceRecord], range: Option<&DateRange>) -> AdSummary {
    let mut accumulator = Accumulator::default();
    for record in records
        .iter()
        .filter(|record| range.is_none_or(|range| range.contains(&record.day)))
    {
        accumulator.add(record);
    }
    accumulator.campaign_name = String::new();
    accumulator.finish("total".to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    Parsed { result: Value },
    Failed { reason: String },
}

impl AnalysisOutcome {
    pub fn is_parsed(&self) -> bool {
        matches!(self, Self::Parsed { .. })
    }
}

/// Interprets an analysis response. Code fences around JSON are removed first.
pub fn parse_analysis_response(text: &str) -> AnalysisOutcome {
    let trimmed = strip_code_fence(text.trim());
    if trimmed.is_empty() {
        return AnalysisOutcome::Failed {
            reason: "analysis service returned an empty response".to_string(),
        };
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Null) => AnalysisOutcome::Failed {
            reason: "analysis service returned null".to_string(),
        },
        Ok(result) => AnalysisOutcome::Parsed { result },
        Err(error) => AnalysisOutcome::Failed {
            reason: format!("analysis response is not valid JSON: {error}"),
        },
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string (`json`) on the opening fence line.
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

pub trait AnalysisService {
    /// Sends a summary and returns the raw response text.
    fn analyze(&self, summary: &Value) -> ClientResult<String>;
}

/// Posts the summary as JSON to a configured endpoint.
pub struct HttpAnalysisService {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpAnalysisService {
    pub fn new(url: &str, http: HttpConfig) -> Self {
        Self {
            client: build_http_client(http),
            url: url.to_string(),
        }
    }
}

impl AnalysisService for HttpAnalysisService {
    fn analyze(&self, summary: &Value) -> ClientResult<String> {
        let response = self
            .client
            .post(&self.url)
            .json(summary)
            .send()
            .map_err(|error| analysis_failed(&error.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(analysis_failed(&format!("HTTP {}", status.as_u16())));
        }
        response
            .text()
            .map_err(|error| analysis_failed(&error.to_string()))
    }
}

fn analysis_failed(detail: &str) -> ClientError {
    ClientError::new(
        "analysis_request_failed",
        &format!("The analysis service request failed: {detail}"),
        vec!["Retry later; stored data is unaffected.".to_string()],
    )
}

/// Runs one analysis, served from the local cache when the same summary was analyzed
/// before. Never fails: problems come back as [`AnalysisOutcome::Failed`].
pub fn request_analysis(
    store: &mut FailoverStore,
    service: &dyn AnalysisService,
    summary: &Value,
) -> AnalysisOutcome {
    let cache_key = cache_key(summary);
    if let Ok(Some(cached)) = store.get::<Option<Value>>(&cache_key, None) {
        tracing::debug!(key = %cache_key, "analysis served from cache");
        return AnalysisOutcome::Parsed { result: cached };
    }

    let outcome = match service.analyze(summary) {
        Ok(text) => parse_analysis_response(&text),
        Err(error) => AnalysisOutcome::Failed {
            reason: error.message,
        },
    };

    match &outcome {
        AnalysisOutcome::Parsed { result } => {
            if let Err(error) = store.put(&cache_key, result) {
                tracing::warn!(key = %cache_key, error = %error, "could not cache analysis");
            }
        }
        AnalysisOutcome::Failed { reason } => {
            tracing::warn!(reason = %reason, "analysis failed");
        }
    }
    outcome
}

fn cache_key(summary: &Value) -> String {
    let digest = Sha256::digest(summary.to_string().as_bytes());
    format!("{ANALYSIS_CACHE_PREFIX}{}", &hex::encode(digest)[..16])
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use serde_json::{Value, json};

    use super::{
        AnalysisOutcome, AnalysisService, parse_analysis_response, request_analysis,
        summarize_by_ad,
    };
    use crate::model::{ImportSource, PerformanceRecord};
    use crate::store::{DisabledRemote, FailoverStore, LocalStore};
    use crate::{ClientError, ClientResult};

    fn record(ad_name: &str, day: &str, spend: f64, value: f64, impressions: u64) -> PerformanceRecord {
        PerformanceRecord {
            unique_id: format!("{ad_name}-{day}"),
            client_id: "c1".to_string(),
            source: ImportSource::Manual,
            account_name: String::new(),
            campaign_name: "Launch".to_string(),
            ad_set_name: String::new(),
            ad_name: ad_name.to_string(),
            day: day.to_string(),
            age: String::new(),
            gender: String::new(),
            currency: "EUR".to_string(),
            spend,
            purchases: 2,
            purchase_value: value,
            impressions,
            reach: impressions / 2,
            link_clicks: impressions / 100,
            frequency: 2.0,
            thru_plays: 0,
            video_average_play_time: 0.0,
        }
    }

    #[test]
    fn ads_are_aggregated_and_sorted_by_spend() {
        let records = vec![
            record("Small", "2026-01-01", 5.0, 10.0, 1000),
            record("Big", "2026-01-01", 50.0, 200.0, 10_000),
            record("Big", "2026-01-02", 50.0, 0.0, 10_000),
        ];
        let summaries = summarize_by_ad(&records, None);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].ad_name, "Big");
        assert_eq!(summaries[0].days, 2);
        assert_eq!(summaries[0].roas, 2.0);
        assert_eq!(summaries[0].cpa, 25.0);
        assert_eq!(summaries[0].cpm, 5.0);
        assert_eq!(summaries[0].ctr, 1.0);
        assert_eq!(summaries[0].frequency, 2.0);
    }

    #[test]
    fn empty_fenced_and_malformed_responses() {
        assert!(matches!(
            parse_analysis_response("   "),
            AnalysisOutcome::Failed { .. }
        ));
        assert!(matches!(
            parse_analysis_response("I think the ads are fine"),
            AnalysisOutcome::Failed { .. }
        ));
        assert_eq!(
            parse_analysis_response("```json\n{\"verdict\": \"scale\"}\n```"),
            AnalysisOutcome::Parsed {
                result: json!({"verdict": "scale"})
            }
        );
        assert!(matches!(
            parse_analysis_response("```json\n{\"verdict\": \n```"),
            AnalysisOutcome::Failed { .. }
        ));
    }

    struct CountingService {
        calls: Cell<usize>,
        response: ClientResult<String>,
    }

    impl AnalysisService for CountingService {
        fn analyze(&self, _summary: &Value) -> ClientResult<String> {
            self.calls.set(self.calls.get() + 1);
            self.response.clone()
        }
    }

    #[test]
    fn parsed_results_are_cached_and_failures_are_not() {
        let local = LocalStore::open_in_memory();
        assert!(local.is_ok());
        if let Ok(local) = local {
            let mut store = FailoverStore::new(Box::new(DisabledRemote), local);
            let summary = json!({"ads": [{"ad_name": "Big"}]});

            let failing = CountingService {
                calls: Cell::new(0),
                response: Err(ClientError::new("analysis_request_failed", "down", Vec::new())),
            };
            assert!(!request_analysis(&mut store, &failing, &summary).is_parsed());
            assert!(!request_analysis(&mut store, &failing, &summary).is_parsed());
            assert_eq!(failing.calls.get(), 2);

            let working = CountingService {
                calls: Cell::new(0),
                response: Ok("{\"verdict\": \"scale\"}".to_string()),
            };
            assert!(request_analysis(&mut store, &working, &summary).is_parsed());
            assert!(request_analysis(&mut store, &working, &summary).is_parsed());
            assert_eq!(working.calls.get(), 1);
        }
    }
}
