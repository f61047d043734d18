use crate::commands::common::{CommandOptions, open_session, secret_hint};
use crate::contracts::envelope::{SuccessEnvelope, success};
use crate::contracts::types::{ConfigSetData, ConfigShowData, DataClearData};
use crate::model::{AdsApiConfig, DEFAULT_ADS_API_VERSION};
use crate::{ClientError, ClientResult};

#[derive(Debug, Clone, Default)]
pub struct ConfigSetAdsOptions<'a> {
    pub access_token: String,
    pub api_version: Option<String>,
    /// Overrides the ads API host, mainly for tests and proxies.
    pub base_url: Option<String>,
    pub command: CommandOptions<'a>,
}

/// Removes every dashboard table and cached analysis; the ads API configuration stays.
pub fn clear() -> ClientResult<SuccessEnvelope> {
    clear_with_options(&CommandOptions::default())
}

#[doc(hidden)]
pub fn clear_with_options(options: &CommandOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let mut session = open_session(options)?;
    let summary = session.store.clear_all_data()?;
    success(
        "data clear",
        DataClearData {
            message: "All dashboard data was cleared. Configuration was kept.".to_string(),
            summary,
        },
    )
}

/// Factory reset: removes all data, configuration and stored credentials.
pub fn reset() -> ClientResult<SuccessEnvelope> {
    reset_with_options(&CommandOptions::default())
}

#[doc(hidden)]
pub fn reset_with_options(options: &CommandOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let mut session = open_session(options)?;
    let summary = session.store.factory_reset()?;
    success(
        "data reset",
        DataClearData {
            message: "Factory reset complete. All data and configuration were removed."
                .to_string(),
            summary,
        },
    )
}

pub fn config_set_ads(
    access_token: &str,
    api_version: Option<String>,
) -> ClientResult<SuccessEnvelope> {
    config_set_ads_with_options(ConfigSetAdsOptions {
        access_token: access_token.to_string(),
        api_version,
        ..ConfigSetAdsOptions::default()
    })
}

#[doc(hidden)]
pub fn config_set_ads_with_options(options: ConfigSetAdsOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let access_token = options.access_token.trim().to_string();
    if access_token.is_empty() {
        return Err(ClientError::invalid_argument_for_command(
            "`--token` must not be empty.",
            Some("config set-ads"),
        ));
    }
    let api_version = options
        .api_version
        .map(|version| version.trim().to_string())
        .filter(|version| !version.is_empty())
        .unwrap_or_else(|| DEFAULT_ADS_API_VERSION.to_string());

    let mut session = open_session(&options.command)?;
    let config = AdsApiConfig {
        access_token,
        api_version: api_version.clone(),
        base_url: options.base_url.filter(|url| !url.trim().is_empty()),
    };
    let backend = session.repository().save_ads_api_config(&config)?;

    success(
        "config set-ads",
        ConfigSetData {
            api_version,
            access_token_hint: secret_hint(&config.access_token),
            backend,
        },
    )
}

pub fn config_show() -> ClientResult<SuccessEnvelope> {
    config_show_with_options(&CommandOptions::default())
}

#[doc(hidden)]
pub fn config_show_with_options(options: &CommandOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let mut session = open_session(options)?;
    let data = match session.repository().ads_api_config()? {
        Some(config) => ConfigShowData {
            configured: true,
            api_version: Some(config.api_version),
            access_token_hint: Some(secret_hint(&config.access_token)),
            base_url: config.base_url,
        },
        None => ConfigShowData {
            configured: false,
            api_version: None,
            access_token_hint: None,
            base_url: None,
        },
    };
    success("config show", data)
}
