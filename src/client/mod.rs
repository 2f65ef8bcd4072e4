//! SendGrid v3 REST client
//!
//! Wraps `reqwest::Client` with bearer authentication, the optional
//! `on-behalf-of` subuser header, URL construction and SendGrid's error
//! envelope. Endpoint groups (api keys, alerts, etc.) are implemented as
//! inherent methods in separate files.

mod alerts;
mod api_keys;
mod error;
mod settings;
mod teammates;
mod whitelabel;

pub use alerts::{Alert, AlertRequest};
pub use api_keys::ApiKey;
pub use error::Error;
pub use settings::{BouncePurgeSettings, ClickTrackingSettings, EnforcedTlsSettings};
pub use teammates::{Invitation, PendingTeammate, Teammate};
pub use whitelabel::{
    AuthenticatedDomain, BrandedLink, DnsRecord, DomainIp, DomainUpdate, NewAuthenticatedDomain,
    NewBrandedLink, RecordValidation, ValidationResult,
};

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::config::ProviderConfig;

const USER_AGENT: &str = concat!("terraform-provider-sendgrid/", env!("CARGO_PKG_VERSION"));

/// Header SendGrid uses to scope a request to a subuser.
pub const ON_BEHALF_OF: &str = "on-behalf-of";

/// HTTP client for the SendGrid v3 API.
#[derive(Debug, Clone)]
pub struct SendGridClient {
    http: reqwest::Client,
    base_url: Url,
}

impl SendGridClient {
    /// Build a client from resolved provider configuration.
    pub fn new(config: &ProviderConfig) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key.expose_secret()))
            .map_err(|_| Error::InvalidHeader("API key contains invalid characters".into()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        if let Some(subuser) = &config.subuser {
            let value = HeaderValue::from_str(subuser)
                .map_err(|_| Error::InvalidHeader(format!("invalid subuser {:?}", subuser)))?;
            headers.insert(ON_BEHALF_OF, value);
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?;

        Ok(Self::from_reqwest(config.host.clone(), http))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    ///
    /// The caller is responsible for authentication headers.
    pub fn from_reqwest(base_url: Url, http: reqwest::Client) -> Self {
        Self { http, base_url }
    }

    /// The API base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}/v3/{segments...}`. Segments are percent-encoded.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.set_query(None);
        url.path_segments_mut()
            .map_err(|_| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .push("v3")
            .extend(segments);
        Ok(url)
    }

    // ── Request helpers ──────────────────────────────────────────────

    pub(crate) async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);
        let resp = self.http.get(url).send().await?;
        Self::parse(resp).await
    }

    pub(crate) async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, Error> {
        debug!("POST {}", url);
        let resp = self.http.post(url).json(body).send().await?;
        Self::parse(resp).await
    }

    /// POST without a body.
    pub(crate) async fn post_empty<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("POST {}", url);
        let resp = self.http.post(url).send().await?;
        Self::parse(resp).await
    }

    pub(crate) async fn patch<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, Error> {
        debug!("PATCH {}", url);
        let resp = self.http.patch(url).json(body).send().await?;
        Self::parse(resp).await
    }

    pub(crate) async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, Error> {
        debug!("PUT {}", url);
        let resp = self.http.put(url).json(body).send().await?;
        Self::parse(resp).await
    }

    /// DELETE, ignoring any response body.
    pub(crate) async fn delete(&self, url: Url) -> Result<(), Error> {
        debug!("DELETE {}", url);
        let resp = self.http.delete(url).send().await?;
        Self::check(resp).await?;
        Ok(())
    }

    /// Turn a non-success response into [`Error::Api`].
    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, Error> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await?;
        let (message, field) = parse_error_body(&body).unwrap_or_else(|| {
            let message = if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                body.clone()
            };
            (message, None)
        });
        debug!(status = status.as_u16(), %message, "SendGrid request failed");

        Err(Error::Api {
            status: status.as_u16(),
            message,
            field,
        })
    }

    async fn parse<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let resp = Self::check(resp).await?;
        let body = resp.text().await?;
        // Some endpoints answer 204 with no content.
        let body = if body.trim().is_empty() { "null" } else { body.as_str() };
        serde_json::from_str(body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: body.to_string(),
        })
    }
}

/// SendGrid's error envelope: `{"errors": [{"field": ..., "message": ...}]}`.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    errors: Vec<ErrorItem>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorItem {
    #[serde(default)]
    field: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

fn parse_error_body(body: &str) -> Option<(String, Option<String>)> {
    let envelope: ErrorEnvelope = serde_json::from_str(body).ok()?;
    if envelope.errors.is_empty() {
        return envelope.error.map(|message| (message, None));
    }

    let messages: Vec<String> = envelope
        .errors
        .iter()
        .map(|item| match (&item.field, &item.message) {
            (Some(field), Some(message)) => format!("{}: {}", field, message),
            (None, Some(message)) => message.clone(),
            (Some(field), None) => format!("{}: invalid", field),
            (None, None) => "unknown error".to_string(),
        })
        .collect();
    let field = envelope.errors.into_iter().find_map(|item| item.field);
    Some((messages.join("; "), field))
}
