//! Provider configuration.
//!
//! The provider block is optional in its entirety. Each setting is resolved
//! from the block first and from the environment second:
//!
//! | Block attribute   | Environment variable | Default                    |
//! |-------------------|----------------------|----------------------------|
//! | `api_key`         | `SENDGRID_API_KEY`   | none, required             |
//! | `host`            | `SENDGRID_HOST`      | `https://api.sendgrid.com` |
//! | `subuser`         | `SENDGRID_SUBUSER`   | none                       |
//! | `timeout_seconds` |                      | 30                         |

use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::error::ProviderError;
use crate::schema::{Attribute, Diagnostic, Schema};

/// Environment variable holding the API key.
pub const ENV_API_KEY: &str = "SENDGRID_API_KEY";
/// Environment variable overriding the API host.
pub const ENV_HOST: &str = "SENDGRID_HOST";
/// Environment variable naming the subuser to act on behalf of.
pub const ENV_SUBUSER: &str = "SENDGRID_SUBUSER";

/// The public SendGrid API.
pub const DEFAULT_HOST: &str = "https://api.sendgrid.com";
/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Resolved provider configuration.
#[derive(Debug)]
pub struct ProviderConfig {
    /// The SendGrid API key.
    pub api_key: SecretString,
    /// Base URL of the SendGrid API.
    pub host: Url,
    /// Subuser sent in the `on-behalf-of` header.
    pub subuser: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// The provider block as written by the user.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProviderBlock {
    api_key: Option<String>,
    host: Option<String>,
    subuser: Option<String>,
    timeout_seconds: Option<i64>,
}

impl ProviderConfig {
    /// Configuration for the default host.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Ok(Self {
            api_key: SecretString::from(api_key.into()),
            host: parse_host(DEFAULT_HOST)?,
            subuser: None,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Resolve configuration from a provider block, falling back to the
    /// process environment.
    pub fn from_config(config: &Value) -> Result<Self, ProviderError> {
        Self::resolve(config, |name| std::env::var(name).ok())
    }

    /// Resolve configuration from a provider block, falling back to `env`.
    pub fn resolve<F>(config: &Value, env: F) -> Result<Self, ProviderError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let block = parse_block(config)?;
        let lookup = |configured: Option<String>, var: &str| {
            non_empty(configured).or_else(|| non_empty(env(var)))
        };

        let api_key = lookup(block.api_key, ENV_API_KEY).ok_or_else(|| {
            ProviderError::Configuration(format!(
                "an API key is required: set `api_key` in the provider block or {}",
                ENV_API_KEY
            ))
        })?;

        let host = match lookup(block.host, ENV_HOST) {
            Some(host) => parse_host(&host)?,
            None => parse_host(DEFAULT_HOST)?,
        };

        let timeout = match block.timeout_seconds {
            None => DEFAULT_TIMEOUT,
            Some(secs) if secs > 0 => Duration::from_secs(secs.unsigned_abs()),
            Some(secs) => {
                return Err(ProviderError::Configuration(format!(
                    "timeout_seconds must be positive, got {}",
                    secs
                )))
            }
        };

        Ok(Self {
            api_key: SecretString::from(api_key),
            host,
            subuser: lookup(block.subuser, ENV_SUBUSER),
            timeout,
        })
    }

    /// Set the subuser to act on behalf of.
    pub fn with_subuser(mut self, subuser: impl Into<String>) -> Self {
        self.subuser = Some(subuser.into());
        self
    }

    /// Set the API host.
    pub fn with_host(mut self, host: Url) -> Self {
        self.host = host;
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Schema of the provider block.
    pub fn schema() -> Schema {
        Schema::v0()
            .with_description("Manages SendGrid account configuration")
            .with_attribute(
                "api_key",
                Attribute::optional_string()
                    .sensitive()
                    .with_description(format!("SendGrid API key. Defaults to {}", ENV_API_KEY)),
            )
            .with_attribute(
                "host",
                Attribute::optional_string()
                    .with_description(format!("API base URL. Defaults to {}", DEFAULT_HOST)),
            )
            .with_attribute(
                "subuser",
                Attribute::optional_string()
                    .with_description("Subuser to manage, sent as the on-behalf-of header"),
            )
            .with_attribute(
                "timeout_seconds",
                Attribute::optional_int64().with_description("Per-request timeout in seconds"),
            )
    }

    /// Checks on the provider block beyond its schema.
    ///
    /// The API key may come from the environment at configure time, so its
    /// absence is not reported here.
    pub fn validate(config: &Value) -> Vec<Diagnostic> {
        let block = match parse_block(config) {
            Ok(block) => block,
            // Type errors are reported by schema validation.
            Err(_) => return Vec::new(),
        };

        let mut diagnostics = Vec::new();
        if let Some(host) = non_empty(block.host) {
            if let Err(err) = parse_host(&host) {
                diagnostics.push(
                    Diagnostic::error("Invalid host")
                        .with_detail(err.message().to_string())
                        .with_attribute("host"),
                );
            }
        }
        if let Some(secs) = block.timeout_seconds.filter(|secs| *secs <= 0) {
            diagnostics.push(
                Diagnostic::error("Invalid timeout")
                    .with_detail(format!("timeout_seconds must be positive, got {}", secs))
                    .with_attribute("timeout_seconds"),
            );
        }
        diagnostics
    }
}

fn parse_block(config: &Value) -> Result<ProviderBlock, ProviderError> {
    if config.is_null() {
        return Ok(ProviderBlock::default());
    }
    serde_json::from_value(config.clone())
        .map_err(|e| ProviderError::Configuration(format!("invalid provider block: {}", e)))
}

fn parse_host(host: &str) -> Result<Url, ProviderError> {
    let url = Url::parse(host)
        .map_err(|e| ProviderError::Configuration(format!("invalid host {:?}: {}", host, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ProviderError::Configuration(format!(
            "host must be an http or https URL, got {:?}",
            host
        )));
    }
    Ok(url)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
