//! Client configuration.
//!
//! Options can be built in code, loaded from YAML, and overridden through
//! environment variables:
//!
//! - `GROONGA_CLIENT_URL`
//! - `GROONGA_CLIENT_READ_TIMEOUT` (seconds; negative means unbounded)
//! - `GROONGA_CLIENT_CONNECT_TIMEOUT` (seconds)
//! - `GROONGA_CLIENT_USER_AGENT`
//! - `GROONGA_CLIENT_CHUNK` (`1` or `true`)

use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const DEFAULT_URL: &str = "http://127.0.0.1:10041";

pub fn default_user_agent() -> String {
    format!("groonga-client/{}", env!("CARGO_PKG_VERSION"))
}

/// Peer verification policy for HTTPS endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifyMode {
    None,
    Peer,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TlsOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify_mode: Option<VerifyMode>,
    /// PEM bundle of trusted certificate authorities.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_file: Option<PathBuf>,
    /// Directory of PEM certificate authorities.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientOptions {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default)]
    pub tls: TlsOptions,
    /// Seconds any single read may wait for response data. Absent or
    /// negative means no limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_timeout: Option<f64>,
    /// Seconds allowed for establishing the connection. Absent or negative
    /// keeps the HTTP library's default of 30 seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout: Option<f64>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Send load payloads with chunked transfer-encoding.
    #[serde(default)]
    pub chunk: bool,
}

fn default_url() -> String {
    DEFAULT_URL.to_string()
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            url: default_url(),
            tls: TlsOptions::default(),
            read_timeout: None,
            connect_timeout: None,
            user_agent: default_user_agent(),
            chunk: false,
        }
    }
}

impl ClientOptions {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid client options: {}", e),
                ErrorContext::new().with_source("config"),
            )
        })
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration_with_context(
                format!("cannot read options file: {}", e),
                ErrorContext::new()
                    .with_details(path.display().to_string())
                    .with_source("config"),
            )
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Apply `GROONGA_CLIENT_*` environment overrides.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = env::var("GROONGA_CLIENT_URL") {
            self.url = url;
        }
        if let Some(timeout) = env::var("GROONGA_CLIENT_READ_TIMEOUT")
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
        {
            self.read_timeout = Some(timeout);
        }
        if let Some(timeout) = env::var("GROONGA_CLIENT_CONNECT_TIMEOUT")
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
        {
            self.connect_timeout = Some(timeout);
        }
        if let Ok(user_agent) = env::var("GROONGA_CLIENT_USER_AGENT") {
            self.user_agent = user_agent;
        }
        if let Ok(chunk) = env::var("GROONGA_CLIENT_CHUNK") {
            self.chunk = matches!(chunk.as_str(), "1" | "true" | "yes");
        }
        self
    }

    pub fn parsed_url(&self) -> Result<Url> {
        Url::parse(&self.url).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid endpoint URL: {}", e),
                ErrorContext::new()
                    .with_field_path("url")
                    .with_source("config"),
            )
        })
    }

    /// `None` when no limit applies (absent, negative or not finite).
    pub fn effective_read_timeout(&self) -> Option<Duration> {
        seconds(self.read_timeout)
    }

    pub fn effective_connect_timeout(&self) -> Option<Duration> {
        seconds(self.connect_timeout)
    }
}

fn seconds(value: Option<f64>) -> Option<Duration> {
    value
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}
