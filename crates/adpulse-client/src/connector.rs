//! Ads-platform insights connector.
//!
//! The import pipeline only sees [`RawRecord`]s; how they are fetched is up to the
//! [`InsightsConnector`] implementation.

use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::config::{HttpConfig, build_http_client};
use crate::import::RawRecord;
use crate::model::{AdsApiConfig, DEFAULT_ADS_API_VERSION};
use crate::{ClientError, ClientResult};

pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.facebook.com";

const INSIGHT_FIELDS: &str = "account_name,account_currency,campaign_name,adset_name,ad_name,\
spend,impressions,reach,frequency,inline_link_clicks,actions,action_values,\
video_thruplay_watched_actions,video_avg_time_watched_actions";

const PURCHASE_ACTION_TYPES: [&str; 3] = [
    "purchase",
    "omni_purchase",
    "offsite_conversion.fb_pixel_purchase",
];

/// Upper bound on followed paging cursors for one fetch.
const MAX_PAGES: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub since: NaiveDate,
    pub until: NaiveDate,
}

impl DateRange {
    pub fn new(since: NaiveDate, until: NaiveDate) -> ClientResult<Self> {
        if since > until {
            return Err(ClientError::invalid_argument(&format!(
                "Date range start {since} is after its end {until}."
            )));
        }
        Ok(Self { since, until })
    }

    /// The `days` days ending today.
    pub fn last_days(days: i64) -> Self {
        let until = Utc::now().date_naive();
        Self {
            since: until - Duration::days(days.max(1) - 1),
            until,
        }
    }

    pub fn contains(&self, day: &str) -> bool {
        NaiveDate::parse_from_str(day, "%Y-%m-%d")
            .map(|date| date >= self.since && date <= self.until)
            .unwrap_or(false)
    }
}

pub trait InsightsConnector {
    /// Daily per-ad rows for `account_id` within `range`, broken down by age and gender.
    fn fetch(&self, account_id: &str, range: &DateRange) -> ClientResult<Vec<RawRecord>>;
}

#[derive(Debug, Deserialize)]
struct InsightsPage {
    #[serde(default)]
    data: Vec<Value>,
    #[serde(default)]
    paging: Option<Paging>,
}

#[derive(Debug, Deserialize)]
struct Paging {
    #[serde(default)]
    next: Option<String>,
}

pub struct GraphInsightsConnector {
    client: reqwest::blocking::Client,
    base_url: String,
    api_version: String,
    access_token: String,
}

impl GraphInsightsConnector {
    pub fn new(config: &AdsApiConfig, http: HttpConfig) -> ClientResult<Self> {
        if config.access_token.trim().is_empty() {
            return Err(ClientError::ads_api_not_configured());
        }
        let api_version = if config.api_version.trim().is_empty() {
            DEFAULT_ADS_API_VERSION.to_string()
        } else {
            config.api_version.trim().to_string()
        };
        Ok(Self {
            client: build_http_client(http),
            base_url: config
                .base_url
                .as_deref()
                .unwrap_or(DEFAULT_GRAPH_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            api_version,
            access_token: config.access_token.trim().to_string(),
        })
    }

    fn insights_url(&self, account_id: &str) -> String {
        let account = account_id.trim().trim_start_matches("act_");
        format!(
            "{}/{}/act_{account}/insights",
            self.base_url, self.api_version
        )
    }

    fn fetch_page(&self, request: reqwest::blocking::RequestBuilder) -> ClientResult<InsightsPage> {
        let response = request
            .send()
            .map_err(|error| ClientError::ads_api_request_failed(&describe_reqwest_error(&error)))?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|error| ClientError::ads_api_request_failed(&error.to_string()))?;
        if !status.is_success() {
            return Err(ClientError::ads_api_request_failed(&api_error_message(
                status.as_u16(),
                &body,
            )));
        }
        serde_json::from_str::<InsightsPage>(&body).map_err(|error| {
            ClientError::ads_api_request_failed(&format!("unexpected insights payload: {error}"))
        })
    }
}

impl InsightsConnector for GraphInsightsConnector {
    fn fetch(&self, account_id: &str, range: &DateRange) -> ClientResult<Vec<RawRecord>> {
        let time_range = json!({
            "since": range.since.format("%Y-%m-%d").to_string(),
            "until": range.until.format("%Y-%m-%d").to_string(),
        })
        .to_string();

        let first = self.client.get(self.insights_url(account_id)).query(&[
            ("access_token", self.access_token.as_str()),
            ("level", "ad"),
            ("time_increment", "1"),
            ("breakdowns", "age,gender"),
            ("fields", INSIGHT_FIELDS),
            ("time_range", time_range.as_str()),
            ("limit", "500"),
        ]);

        let mut records = Vec::new();
        let mut page = self.fetch_page(first)?;
        for _ in 0..MAX_PAGES {
            records.extend(page.data.iter().map(raw_from_insight));
            let Some(next) = page.paging.and_then(|paging| paging.next) else {
                return Ok(records);
            };
            tracing::debug!(fetched = records.len(), "following insights paging cursor");
            page = self.fetch_page(self.client.get(next))?;
        }

        tracing::warn!(fetched = records.len(), "stopped following insights paging cursors");
        Ok(records)
    }
}

fn raw_from_insight(item: &Value) -> RawRecord {
    RawRecord {
        account_name: text(item, "account_name"),
        campaign_name: text(item, "campaign_name"),
        ad_set_name: text(item, "adset_name"),
        ad_name: text(item, "ad_name"),
        day: text(item, "date_start"),
        age: text(item, "age"),
        gender: text(item, "gender"),
        currency: text(item, "account_currency"),
        spend: text(item, "spend"),
        purchases: action_value(item, "actions", &PURCHASE_ACTION_TYPES),
        purchase_value: action_value(item, "action_values", &PURCHASE_ACTION_TYPES),
        impressions: text(item, "impressions"),
        reach: text(item, "reach"),
        link_clicks: text(item, "inline_link_clicks"),
        frequency: text(item, "frequency"),
        thru_plays: action_value(item, "video_thruplay_watched_actions", &["video_view"]),
        video_average_play_time: action_value(
            item,
            "video_avg_time_watched_actions",
            &["video_view"],
        ),
    }
}

fn text(item: &Value, field: &str) -> Option<String> {
    match item.get(field)? {
        Value::String(value) => Some(value.clone()),
        Value::Number(value) => Some(value.to_string()),
        _ => None,
    }
}

/// First entry of an `[{action_type, value}]` list whose type is in `action_types`,
/// preferring earlier types.
fn action_value(item: &Value, field: &str, action_types: &[&str]) -> Option<String> {
    let actions = item.get(field)?.as_array()?;
    action_types.iter().find_map(|wanted| {
        actions
            .iter()
            .find(|action| action.get("action_type").and_then(Value::as_str) == Some(*wanted))
            .and_then(|action| text(action, "value"))
    })
}

fn api_error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .map(|message| format!("HTTP {status}: {message}"))
        .unwrap_or_else(|| format!("HTTP {status}"))
}

fn describe_reqwest_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        format!("request timed out: {error}")
    } else if error.is_connect() {
        format!("could not connect: {error}")
    } else {
        error.to_string()
    }
}
