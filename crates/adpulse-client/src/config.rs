//! Environment-driven settings for the remote store and the local fallback.

use std::time::Duration;

pub const DEFAULT_REMOTE_URL: &str = "http://localhost:3001/api";

/// HTTP client timeouts shared by the remote store and the ads connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpConfig {
    /// Request timeout in milliseconds (0 disables it).
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds (0 disables it).
    pub connect_timeout_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            connect_timeout_ms: 3_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Base URL of the remote key-value service; `None` runs local-only.
    pub remote_url: Option<String>,
    pub http: HttpConfig,
    /// SQLite page quota for the local store.
    pub local_max_pages: Option<u32>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            remote_url: Some(DEFAULT_REMOTE_URL.to_string()),
            http: HttpConfig::default(),
            local_max_pages: None,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::default().with_overrides(|name| std::env::var(name).ok())
    }

    /// Settings with no remote configured, used for offline sessions.
    pub fn local_only() -> Self {
        Self {
            remote_url: None,
            ..Self::default()
        }
    }

    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("ADPULSE_REMOTE_URL") {
            let trimmed = url.trim();
            self.remote_url = if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.trim_end_matches('/').to_string())
            };
        }
        if let Some(parsed) = lookup("ADPULSE_REMOTE_TIMEOUT_MS").and_then(|v| v.parse::<u64>().ok())
        {
            self.http.timeout_ms = parsed;
        }
        if let Some(parsed) =
            lookup("ADPULSE_REMOTE_CONNECT_TIMEOUT_MS").and_then(|v| v.parse::<u64>().ok())
        {
            self.http.connect_timeout_ms = parsed;
        }
        if let Some(parsed) = lookup("ADPULSE_LOCAL_MAX_PAGES").and_then(|v| v.parse::<u32>().ok())
        {
            self.local_max_pages = Some(parsed.max(1));
        }
        self
    }
}

pub fn build_http_client(config: HttpConfig) -> reqwest::blocking::Client {
    let mut builder = reqwest::blocking::Client::builder();
    if config.timeout_ms > 0 {
        builder = builder.timeout(Duration::from_millis(config.timeout_ms));
    }
    if config.connect_timeout_ms > 0 {
        builder = builder.connect_timeout(Duration::from_millis(config.connect_timeout_ms));
    }

    builder.build().unwrap_or_else(|err| {
        tracing::warn!("Failed to build HTTP client, using defaults: {err}");
        reqwest::blocking::Client::new()
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{DEFAULT_REMOTE_URL, Settings};

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<String, String>>();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_point_at_local_service() {
        let settings = Settings::default().with_overrides(lookup_from(&[]));
        assert_eq!(settings.remote_url.as_deref(), Some(DEFAULT_REMOTE_URL));
        assert_eq!(settings.http.timeout_ms, 10_000);
        assert_eq!(settings.local_max_pages, None);
    }

    #[test]
    fn empty_remote_url_disables_remote() {
        let settings = Settings::default().with_overrides(lookup_from(&[("ADPULSE_REMOTE_URL", " ")]));
        assert!(settings.remote_url.is_none());
    }

    #[test]
    fn overrides_apply_and_invalid_numbers_are_ignored() {
        let settings = Settings::default().with_overrides(lookup_from(&[
            ("ADPULSE_REMOTE_URL", "https://kv.example.com/api/"),
            ("ADPULSE_REMOTE_TIMEOUT_MS", "250"),
            ("ADPULSE_REMOTE_CONNECT_TIMEOUT_MS", "soon"),
            ("ADPULSE_LOCAL_MAX_PAGES", "0"),
        ]));
        assert_eq!(
            settings.remote_url.as_deref(),
            Some("https://kv.example.com/api")
        );
        assert_eq!(settings.http.timeout_ms, 250);
        assert_eq!(settings.http.connect_timeout_ms, 3_000);
        assert_eq!(settings.local_max_pages, Some(1));
    }
}
