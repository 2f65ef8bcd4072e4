// Sender authentication (domain) and link branding endpoints
//
// Both live under /v3/whitelabel and report their DNS records as an object
// keyed by record name.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Error, SendGridClient};

/// A DNS record SendGrid asks the user to publish.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Whether the record resolved as expected at the last check.
    #[serde(default)]
    pub valid: bool,
    /// Record type, e.g. `cname` or `txt`.
    #[serde(rename = "type", default)]
    pub record_type: String,
    /// Record name to create.
    #[serde(default)]
    pub host: String,
    /// Record value.
    #[serde(default)]
    pub data: String,
}

/// IPs come back as plain strings or as `{"ip": ...}` objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DomainIp {
    /// A bare address.
    Address(String),
    /// An address object.
    Detailed {
        /// The address.
        ip: String,
    },
}

impl DomainIp {
    /// The address, whichever form it came in.
    pub fn address(&self) -> &str {
        match self {
            Self::Address(ip) | Self::Detailed { ip } => ip,
        }
    }
}

/// An authenticated sending domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedDomain {
    /// Domain id.
    pub id: i64,
    /// Root domain.
    pub domain: String,
    /// Subdomain used for the sending records.
    #[serde(default)]
    pub subdomain: Option<String>,
    /// IPs attached to the domain.
    #[serde(default)]
    pub ips: Vec<DomainIp>,
    /// Whether a custom SPF record is used.
    #[serde(default)]
    pub custom_spf: bool,
    /// Whether this is the default sending domain.
    #[serde(rename = "default", default)]
    pub is_default: bool,
    /// Whether SendGrid manages SPF and DKIM through CNAMEs.
    #[serde(default)]
    pub automatic_security: bool,
    /// Whether every DNS record validated.
    #[serde(default)]
    pub valid: bool,
    /// DNS records keyed by name.
    #[serde(default)]
    pub dns: BTreeMap<String, DnsRecord>,
}

/// Body for `POST /v3/whitelabel/domains`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewAuthenticatedDomain {
    /// Root domain.
    pub domain: String,
    /// Subdomain for the sending records. Chosen by SendGrid when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subdomain: Option<String>,
    /// IPs to attach.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ips: Vec<String>,
    /// Use a custom SPF record.
    pub custom_spf: bool,
    /// Make this the default sending domain.
    #[serde(rename = "default")]
    pub is_default: bool,
    /// Let SendGrid manage SPF and DKIM.
    pub automatic_security: bool,
    /// Custom DKIM selector.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_dkim_selector: Option<String>,
}

/// The attributes of an authenticated domain that can change in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DomainUpdate {
    /// Make this the default sending domain.
    #[serde(rename = "default")]
    pub is_default: bool,
    /// Use a custom SPF record.
    pub custom_spf: bool,
}

/// A branded link domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandedLink {
    /// Link branding id.
    pub id: i64,
    /// Root domain.
    pub domain: String,
    /// Subdomain links are rewritten to.
    #[serde(default)]
    pub subdomain: Option<String>,
    /// Whether this is the default link branding.
    #[serde(rename = "default", default)]
    pub is_default: bool,
    /// Whether every DNS record validated.
    #[serde(default)]
    pub valid: bool,
    /// DNS records keyed by name.
    #[serde(default)]
    pub dns: BTreeMap<String, DnsRecord>,
}

/// Body for `POST /v3/whitelabel/links`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewBrandedLink {
    /// Root domain.
    pub domain: String,
    /// Subdomain for rewritten links. Chosen by SendGrid when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subdomain: Option<String>,
    /// Make this the default link branding.
    #[serde(rename = "default")]
    pub is_default: bool,
}

#[derive(Debug, Serialize)]
struct LinkUpdate {
    #[serde(rename = "default")]
    is_default: bool,
}

/// The outcome of asking SendGrid to check the published DNS records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Id of the validated domain or link branding.
    pub id: i64,
    /// Whether every record validated.
    pub valid: bool,
    /// Per-record outcome keyed by record name.
    #[serde(default)]
    pub validation_results: BTreeMap<String, RecordValidation>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordValidation {
    /// Whether the record validated.
    #[serde(default)]
    pub valid: bool,
    /// Why the record failed, when it did.
    #[serde(default)]
    pub reason: Option<String>,
}

impl ValidationResult {
    /// `(record name, reason)` for every record that failed.
    pub fn failures(&self) -> Vec<(String, String)> {
        self.validation_results
            .iter()
            .filter(|(_, result)| !result.valid)
            .map(|(name, result)| {
                let reason = result
                    .reason
                    .clone()
                    .unwrap_or_else(|| "record is not valid".to_string());
                (name.clone(), reason)
            })
            .collect()
    }
}

impl SendGridClient {
    /// `POST /v3/whitelabel/domains`
    pub async fn create_domain(
        &self,
        request: &NewAuthenticatedDomain,
    ) -> Result<AuthenticatedDomain, Error> {
        let url = self.endpoint(&["whitelabel", "domains"])?;
        debug!(domain = %request.domain, "authenticating domain");
        self.post(url, request).await
    }

    /// `GET /v3/whitelabel/domains/{id}`
    pub async fn get_domain(&self, id: i64) -> Result<AuthenticatedDomain, Error> {
        let url = self.endpoint(&["whitelabel", "domains", &id.to_string()])?;
        self.get(url).await
    }

    /// `PATCH /v3/whitelabel/domains/{id}`
    pub async fn update_domain(
        &self,
        id: i64,
        update: &DomainUpdate,
    ) -> Result<AuthenticatedDomain, Error> {
        let url = self.endpoint(&["whitelabel", "domains", &id.to_string()])?;
        debug!(id, "updating authenticated domain");
        self.patch(url, update).await
    }

    /// `DELETE /v3/whitelabel/domains/{id}`
    pub async fn delete_domain(&self, id: i64) -> Result<(), Error> {
        let url = self.endpoint(&["whitelabel", "domains", &id.to_string()])?;
        debug!(id, "deleting authenticated domain");
        self.delete(url).await
    }

    /// `POST /v3/whitelabel/domains/{id}/validate`
    pub async fn validate_domain(&self, id: i64) -> Result<ValidationResult, Error> {
        let url = self.endpoint(&["whitelabel", "domains", &id.to_string(), "validate"])?;
        debug!(id, "validating authenticated domain");
        self.post_empty(url).await
    }

    /// `POST /v3/whitelabel/links`
    pub async fn create_link(&self, request: &NewBrandedLink) -> Result<BrandedLink, Error> {
        let url = self.endpoint(&["whitelabel", "links"])?;
        debug!(domain = %request.domain, "branding link domain");
        self.post(url, request).await
    }

    /// `GET /v3/whitelabel/links/{id}`
    pub async fn get_link(&self, id: i64) -> Result<BrandedLink, Error> {
        let url = self.endpoint(&["whitelabel", "links", &id.to_string()])?;
        self.get(url).await
    }

    /// `PATCH /v3/whitelabel/links/{id}`
    pub async fn update_link(&self, id: i64, is_default: bool) -> Result<BrandedLink, Error> {
        let url = self.endpoint(&["whitelabel", "links", &id.to_string()])?;
        debug!(id, is_default, "updating branded link");
        self.patch(url, &LinkUpdate { is_default }).await
    }

    /// `DELETE /v3/whitelabel/links/{id}`
    pub async fn delete_link(&self, id: i64) -> Result<(), Error> {
        let url = self.endpoint(&["whitelabel", "links", &id.to_string()])?;
        debug!(id, "deleting branded link");
        self.delete(url).await
    }

    /// `POST /v3/whitelabel/links/{id}/validate`
    pub async fn validate_link(&self, id: i64) -> Result<ValidationResult, Error> {
        let url = self.endpoint(&["whitelabel", "links", &id.to_string(), "validate"])?;
        debug!(id, "validating branded link");
        self.post_empty(url).await
    }
}
