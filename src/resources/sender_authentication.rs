use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

use super::{decode, encode, found, gone_ok, numeric_id, require_id, Resource};
use crate::client::{
    AuthenticatedDomain, DnsRecord, DomainIp, DomainUpdate, NewAuthenticatedDomain,
    SendGridClient,
};
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Schema};

const TYPE_NAME: &str = "sendgrid_sender_authentication";

/// One entry of the computed `dns` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct DnsRecordState {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub host: String,
    pub data: String,
    pub valid: bool,
}

/// Object type of a `dns` list entry.
pub(crate) fn dns_record_type() -> AttributeType {
    AttributeType::object([
        ("name", AttributeType::String),
        ("type", AttributeType::String),
        ("host", AttributeType::String),
        ("data", AttributeType::String),
        ("valid", AttributeType::Bool),
    ])
}

/// Flatten SendGrid's record map into a list ordered by record name.
pub(crate) fn dns_records(dns: BTreeMap<String, DnsRecord>) -> Vec<DnsRecordState> {
    dns.into_iter()
        .map(|(name, record)| DnsRecordState {
            name,
            record_type: record.record_type,
            host: record.host,
            data: record.data,
            valid: record.valid,
        })
        .collect()
}

/// `sendgrid_sender_authentication` state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct SenderAuthenticationState {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub subdomain: Option<String>,
    #[serde(default)]
    pub ips: Option<Vec<String>>,
    #[serde(default)]
    pub custom_spf: Option<bool>,
    #[serde(default)]
    pub is_default: Option<bool>,
    #[serde(default)]
    pub automatic_security: Option<bool>,
    #[serde(default)]
    pub custom_dkim_selector: Option<String>,
    #[serde(default)]
    pub valid: Option<bool>,
    #[serde(default)]
    pub dns: Option<Vec<DnsRecordState>>,
}

impl SenderAuthenticationState {
    /// State for a domain as SendGrid reports it. `known` supplies values the
    /// API does not echo back.
    pub(crate) fn from_api(domain: AuthenticatedDomain, known: &Self) -> Self {
        let mut ips: Vec<String> = domain.ips.iter().map(DomainIp::address).map(str::to_string).collect();
        ips.sort();
        Self {
            id: Some(domain.id.to_string()),
            domain: domain.domain,
            subdomain: domain.subdomain,
            // An unset optional set stays unset rather than becoming empty.
            ips: if ips.is_empty() && known.ips.is_none() { None } else { Some(ips) },
            custom_spf: Some(domain.custom_spf),
            is_default: Some(domain.is_default),
            automatic_security: Some(domain.automatic_security),
            custom_dkim_selector: known.custom_dkim_selector.clone(),
            valid: Some(domain.valid),
            dns: Some(dns_records(domain.dns)),
        }
    }
}

/// Domain authentication (DKIM/SPF) for sending domains.
pub struct SenderAuthenticationResource;

#[async_trait]
impl Resource for SenderAuthenticationResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("An authenticated sending domain")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute(
                "domain",
                Attribute::required_string()
                    .with_force_new()
                    .with_description("The domain to authenticate"),
            )
            .with_attribute(
                "subdomain",
                Attribute::optional_computed_string()
                    .with_force_new()
                    .with_description("Subdomain used for the DNS records. Generated when unset"),
            )
            .with_attribute(
                "ips",
                Attribute::string_set(AttributeFlags::optional())
                    .with_force_new()
                    .with_description("IPs to include in the SPF record"),
            )
            .with_attribute(
                "custom_spf",
                Attribute::optional_bool().with_default(Value::Bool(false)),
            )
            .with_attribute(
                "is_default",
                Attribute::optional_bool()
                    .with_default(Value::Bool(false))
                    .with_description("Use this domain when no other matches"),
            )
            .with_attribute(
                "automatic_security",
                Attribute::optional_bool()
                    .with_default(Value::Bool(true))
                    .with_force_new()
                    .with_description("Let SendGrid manage the DKIM and SPF records"),
            )
            .with_attribute(
                "custom_dkim_selector",
                Attribute::optional_string().with_force_new(),
            )
            .with_attribute(
                "valid",
                Attribute::computed_bool().with_description("Whether the DNS records were verified"),
            )
            .with_attribute(
                "dns",
                Attribute::new(AttributeType::list(dns_record_type()), AttributeFlags::computed())
                    .with_description("DNS records to publish, ordered by name"),
            )
    }

    #[instrument(skip_all, fields(resource = TYPE_NAME))]
    async fn create(&self, client: &SendGridClient, planned: Value) -> Result<Value, ProviderError> {
        let planned: SenderAuthenticationState = decode(planned)?;
        let request = NewAuthenticatedDomain {
            domain: planned.domain.clone(),
            subdomain: planned.subdomain.clone(),
            ips: planned.ips.clone().unwrap_or_default(),
            custom_spf: planned.custom_spf.unwrap_or(false),
            is_default: planned.is_default.unwrap_or(false),
            automatic_security: planned.automatic_security.unwrap_or(true),
            custom_dkim_selector: planned.custom_dkim_selector.clone(),
        };
        let domain = client.create_domain(&request).await?;
        info!(id = domain.id, domain = %domain.domain, "authenticated domain");
        encode(&SenderAuthenticationState::from_api(domain, &planned))
    }

    #[instrument(skip_all, fields(resource = TYPE_NAME))]
    async fn read(&self, client: &SendGridClient, state: Value) -> Result<Option<Value>, ProviderError> {
        let state: SenderAuthenticationState = decode(state)?;
        let id = numeric_id(&require_id(state.id.as_deref(), TYPE_NAME)?, TYPE_NAME)?;
        match found(client.get_domain(id).await)? {
            Some(domain) => Ok(Some(encode(&SenderAuthenticationState::from_api(domain, &state))?)),
            None => Ok(None),
        }
    }

    #[instrument(skip_all, fields(resource = TYPE_NAME))]
    async fn update(
        &self,
        client: &SendGridClient,
        prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        let prior: SenderAuthenticationState = decode(prior)?;
        let planned: SenderAuthenticationState = decode(planned)?;
        let id = numeric_id(&require_id(prior.id.as_deref(), TYPE_NAME)?, TYPE_NAME)?;
        let update = DomainUpdate {
            is_default: planned.is_default.unwrap_or(false),
            custom_spf: planned.custom_spf.unwrap_or(false),
        };
        let domain = client.update_domain(id, &update).await?;
        encode(&SenderAuthenticationState::from_api(domain, &planned))
    }

    #[instrument(skip_all, fields(resource = TYPE_NAME))]
    async fn delete(&self, client: &SendGridClient, state: Value) -> Result<(), ProviderError> {
        let state: SenderAuthenticationState = decode(state)?;
        let id = numeric_id(&require_id(state.id.as_deref(), TYPE_NAME)?, TYPE_NAME)?;
        gone_ok(client.delete_domain(id).await)?;
        info!(id, "deleted authenticated domain");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate;
    use serde_json::json;

    fn domain() -> AuthenticatedDomain {
        serde_json::from_value(json!({
            "id": 12,
            "domain": "example.com",
            "subdomain": "em",
            "ips": [{"ip": "192.0.2.9"}, "192.0.2.1"],
            "custom_spf": false,
            "default": true,
            "automatic_security": true,
            "valid": false,
            "dns": {
                "mail_cname": {"valid": false, "type": "cname", "host": "em.example.com", "data": "u1.wl.sendgrid.net"},
                "dkim1": {"valid": true, "type": "cname", "host": "s1._domainkey.example.com", "data": "s1.domainkey.u1.wl.sendgrid.net"}
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_dns_records_sorted_by_name() {
        let state = SenderAuthenticationState::from_api(domain(), &SenderAuthenticationState::default());
        let names: Vec<_> = state.dns.unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["dkim1", "mail_cname"]);
        assert_eq!(state.ips, Some(vec!["192.0.2.1".to_string(), "192.0.2.9".to_string()]));
    }

    #[test]
    fn test_known_values_carried() {
        let known = SenderAuthenticationState {
            custom_dkim_selector: Some("s9".into()),
            ..Default::default()
        };
        let state = SenderAuthenticationState::from_api(domain(), &known);
        assert_eq!(state.custom_dkim_selector.as_deref(), Some("s9"));
        assert_eq!(state.id.as_deref(), Some("12"));
    }

    #[test]
    fn test_empty_ips_stay_unset() {
        let mut remote = domain();
        remote.ips.clear();
        let state = SenderAuthenticationState::from_api(remote, &SenderAuthenticationState::default());
        assert!(state.ips.is_none());
    }

    #[test]
    fn test_state_matches_schema_types() {
        let state = encode(&SenderAuthenticationState::from_api(
            domain(),
            &SenderAuthenticationState::default(),
        ))
        .unwrap();
        // State values type-check against the schema once read-only fields are dropped.
        let schema = SenderAuthenticationResource.schema();
        let configurable: serde_json::Map<_, _> = state
            .as_object()
            .unwrap()
            .iter()
            .filter(|(name, _)| !schema.attributes[name.as_str()].is_computed_only())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        assert!(validate(&schema, &Value::Object(configurable)).is_empty());
    }
}
