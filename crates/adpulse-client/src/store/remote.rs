use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{HttpConfig, build_http_client};
use crate::store::{Backend, BackendError, KvBackend, RemoteKv};

/// Health of the database behind the remote service, as reported by `GET /status`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RemoteStatus {
    pub connected: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DbCredentials {
    pub host: String,
    pub database: String,
    pub user: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
struct ValueResponse {
    #[serde(default)]
    value: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct SuccessResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Client for the remote key-value service (`/kv/{key}`, `/status`, `/set-credentials`).
pub struct HttpRemoteStore {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpRemoteStore {
    pub fn new(base_url: &str, http: HttpConfig) -> Self {
        Self {
            client: build_http_client(http),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn kv_url(&self, key: &str) -> String {
        format!("{}/kv/{key}", self.base_url)
    }

    fn read_json<T: for<'de> Deserialize<'de>>(
        response: reqwest::blocking::Response,
    ) -> Result<T, BackendError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }
        response
            .json::<T>()
            .map_err(|error| BackendError::Serialization(error.to_string()))
    }

    fn expect_success(response: reqwest::blocking::Response) -> Result<(), BackendError> {
        let status = response.status().as_u16();
        let parsed: SuccessResponse = Self::read_json(response)?;
        if parsed.success {
            Ok(())
        } else {
            Err(BackendError::Status {
                status,
                body: parsed
                    .error
                    .unwrap_or_else(|| "remote reported success=false".to_string()),
            })
        }
    }
}

impl KvBackend for HttpRemoteStore {
    fn name(&self) -> Backend {
        Backend::Remote
    }

    fn get(&mut self, key: &str) -> Result<Option<Value>, BackendError> {
        let response = self
            .client
            .get(self.kv_url(key))
            .send()
            .map_err(map_reqwest_error)?;
        let parsed: ValueResponse = Self::read_json(response)?;
        Ok(parsed.value.filter(|value| !value.is_null()))
    }

    fn put(&mut self, key: &str, value: &Value) -> Result<(), BackendError> {
        let response = self
            .client
            .post(self.kv_url(key))
            .json(value)
            .send()
            .map_err(map_reqwest_error)?;
        Self::expect_success(response)
    }

    fn delete(&mut self, key: &str) -> Result<(), BackendError> {
        let response = self
            .client
            .delete(self.kv_url(key))
            .send()
            .map_err(map_reqwest_error)?;
        Self::expect_success(response)
    }
}

impl RemoteKv for HttpRemoteStore {
    fn endpoint(&self) -> String {
        self.base_url.clone()
    }

    fn status(&mut self) -> Result<RemoteStatus, BackendError> {
        let response = self
            .client
            .get(format!("{}/status", self.base_url))
            .send()
            .map_err(map_reqwest_error)?;
        Self::read_json(response)
    }

    fn set_credentials(&mut self, credentials: &DbCredentials) -> Result<(), BackendError> {
        let response = self
            .client
            .post(format!("{}/set-credentials", self.base_url))
            .json(credentials)
            .send()
            .map_err(map_reqwest_error)?;
        if response.status().is_success() {
            return Self::expect_success(response);
        }
        // The service answers 500 with `{ success: false, error }` when the database refuses.
        let status = response.status().as_u16();
        let body = response.text().unwrap_or_default();
        let detail = serde_json::from_str::<SuccessResponse>(&body)
            .ok()
            .and_then(|parsed| parsed.error)
            .unwrap_or(body);
        Err(BackendError::Status {
            status,
            body: detail,
        })
    }
}

/// Remote used when no URL is configured. Every call fails, so the session runs on the
/// local store.
#[derive(Debug, Default)]
pub struct DisabledRemote;

const DISABLED: &str = "remote store is disabled (ADPULSE_REMOTE_URL is empty)";

impl KvBackend for DisabledRemote {
    fn name(&self) -> Backend {
        Backend::Remote
    }

    fn get(&mut self, _key: &str) -> Result<Option<Value>, BackendError> {
        Err(BackendError::Connect(DISABLED.to_string()))
    }

    fn put(&mut self, _key: &str, _value: &Value) -> Result<(), BackendError> {
        Err(BackendError::Connect(DISABLED.to_string()))
    }

    fn delete(&mut self, _key: &str) -> Result<(), BackendError> {
        Err(BackendError::Connect(DISABLED.to_string()))
    }
}

impl RemoteKv for DisabledRemote {
    fn endpoint(&self) -> String {
        "disabled".to_string()
    }

    fn status(&mut self) -> Result<RemoteStatus, BackendError> {
        Err(BackendError::Connect(DISABLED.to_string()))
    }

    fn set_credentials(&mut self, _credentials: &DbCredentials) -> Result<(), BackendError> {
        Err(BackendError::Connect(DISABLED.to_string()))
    }
}

fn map_reqwest_error(error: reqwest::Error) -> BackendError {
    if error.is_timeout() {
        BackendError::Timeout(error.to_string())
    } else if error.is_connect() {
        BackendError::Connect(error.to_string())
    } else if error.is_decode() {
        BackendError::Serialization(error.to_string())
    } else {
        BackendError::Transport(error.to_string())
    }
}
