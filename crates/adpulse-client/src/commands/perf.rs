use chrono::Utc;
use serde_json::json;

use crate::analysis::{
    AnalysisService, HttpAnalysisService, request_analysis, summarize_by_ad, summarize_total,
};
use crate::commands::common::{CommandOptions, open_session, parse_date_arg};
use crate::connector::DateRange;
use crate::contracts::envelope::{SuccessEnvelope, success};
use crate::contracts::types::PerfSummaryData;
use crate::import::sync::find_client;
use crate::{ClientError, ClientResult};

#[derive(Debug, Clone, Default)]
pub struct PerfSummaryOptions<'a> {
    pub client: String,
    pub from: Option<String>,
    pub to: Option<String>,
    /// Analysis endpoint that receives the summary; no analysis is requested without it.
    pub analyze_url: Option<String>,
    pub command: CommandOptions<'a>,
}

pub fn summary(
    client: &str,
    from: Option<String>,
    to: Option<String>,
) -> ClientResult<SuccessEnvelope> {
    summary_with_options(PerfSummaryOptions {
        client: client.to_string(),
        from,
        to,
        ..PerfSummaryOptions::default()
    })
}

#[doc(hidden)]
pub fn summary_with_options(options: PerfSummaryOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let service = options
        .analyze_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(|url| {
            let http = options
                .command
                .settings
                .as_ref()
                .map(|settings| settings.http)
                .unwrap_or_default();
            HttpAnalysisService::new(url, http)
        });
    summary_with_service(
        &options,
        service.as_ref().map(|service| service as &dyn AnalysisService),
    )
}

/// Same as [`summary_with_options`] with a caller-supplied analysis service.
#[doc(hidden)]
pub fn summary_with_service(
    options: &PerfSummaryOptions<'_>,
    service: Option<&dyn AnalysisService>,
) -> ClientResult<SuccessEnvelope> {
    let range = summary_range(options)?;
    let mut session = open_session(&options.command)?;
    let mut repository = session.repository();
    let client = find_client(&mut repository, &options.client)?;
    let performance = repository.performance_data()?;
    let records = performance.get(&client.id).map_or(&[][..], Vec::as_slice);

    let record_count = records
        .iter()
        .filter(|record| range.as_ref().is_none_or(|range| range.contains(&record.day)))
        .count();
    let totals = summarize_total(records, range.as_ref());
    let ads = summarize_by_ad(records, range.as_ref());

    let analysis = match service {
        Some(service) if record_count > 0 => {
            let payload = json!({
                "client": client.name,
                "range": range,
                "totals": totals,
                "ads": ads,
            });
            Some(request_analysis(&mut session.store, service, &payload))
        }
        _ => None,
    };

    success(
        "perf summary",
        PerfSummaryData {
            client_id: client.id,
            client_name: client.name,
            range,
            record_count,
            totals,
            ads,
            analysis,
        },
    )
}

fn summary_range(options: &PerfSummaryOptions<'_>) -> ClientResult<Option<DateRange>> {
    const COMMAND: &str = "perf summary";
    if options.from.is_none() && options.to.is_none() {
        return Ok(None);
    }
    let since = match options.from.as_deref() {
        Some(value) => parse_date_arg(value, "--from", COMMAND)?,
        None => chrono::NaiveDate::MIN,
    };
    let until = match options.to.as_deref() {
        Some(value) => parse_date_arg(value, "--to", COMMAND)?,
        None => Utc::now().date_naive(),
    };
    DateRange::new(since, until)
        .map(Some)
        .map_err(|error| ClientError::invalid_argument_for_command(&error.message, Some(COMMAND)))
}
