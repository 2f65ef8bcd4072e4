use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, instrument};

use super::{decode, encode, gone_ok, reported_scopes, Resource};
use crate::client::{PendingTeammate, SendGridClient, Teammate};
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeFlags, Diagnostic, Schema};

const TYPE_NAME: &str = "sendgrid_teammate";

/// `sendgrid_teammate` state. The id is the teammate's email.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct TeammateState {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub is_admin: Option<bool>,
    #[serde(default)]
    pub scopes: Option<Vec<String>>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub user_type: Option<String>,
    #[serde(default)]
    pub pending: Option<bool>,
}

impl TeammateState {
    fn email(&self) -> Result<String, ProviderError> {
        self.email
            .as_deref()
            .or(self.id.as_deref())
            .filter(|email| !email.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ProviderError::Validation(format!("{} state has no email", TYPE_NAME)))
    }

    fn is_admin(&self) -> bool {
        self.is_admin.unwrap_or(false)
    }

    /// Scopes to send. Admins get every scope and SendGrid rejects explicit ones.
    fn requested_scopes(&self) -> Vec<String> {
        if self.is_admin() {
            Vec::new()
        } else {
            self.scopes.clone().unwrap_or_default()
        }
    }

    /// Scopes to record. Admins keep whatever was configured.
    fn recorded_scopes(&self, reported: Vec<String>, is_admin: bool) -> Option<Vec<String>> {
        if is_admin {
            Some(self.scopes.clone().unwrap_or_default())
        } else {
            Some(reported_scopes(reported, self.scopes.as_deref()))
        }
    }

    /// State for an accepted teammate, given the state it replaces.
    pub(crate) fn accepted(&self, teammate: Teammate) -> Self {
        Self {
            id: Some(teammate.email.clone()),
            scopes: self.recorded_scopes(teammate.scopes, teammate.is_admin),
            is_admin: Some(teammate.is_admin),
            email: Some(teammate.email),
            username: Some(teammate.username),
            first_name: teammate.first_name,
            last_name: teammate.last_name,
            user_type: teammate.user_type,
            pending: Some(false),
        }
    }

    /// State for an invite that has not been accepted yet.
    pub(crate) fn invited(&self, invite: PendingTeammate) -> Self {
        Self {
            id: Some(invite.email.clone()),
            scopes: self.recorded_scopes(invite.scopes, invite.is_admin),
            is_admin: Some(invite.is_admin),
            email: Some(invite.email),
            username: None,
            first_name: None,
            last_name: None,
            user_type: None,
            pending: Some(true),
        }
    }
}

/// Where a teammate currently stands in SendGrid.
pub(crate) enum Membership {
    Accepted(Teammate),
    Pending(PendingTeammate),
}

/// Accepted users are checked before pending invites.
pub(crate) async fn lookup_teammate(client: &SendGridClient, email: &str) -> Result<Option<Membership>, ProviderError> {
    if let Some(teammate) = client.find_teammate(email).await? {
        return Ok(Some(Membership::Accepted(teammate)));
    }
    Ok(client
        .find_pending_teammate(email)
        .await?
        .map(Membership::Pending))
}

/// Teammates, invited by email.
pub struct TeammateResource;

impl TeammateResource {
    async fn invite(
        &self,
        client: &SendGridClient,
        planned: &TeammateState,
    ) -> Result<Value, ProviderError> {
        let email = planned.email()?;
        let invitation = client
            .invite_teammate(&email, &planned.requested_scopes(), planned.is_admin())
            .await?;
        info!(email = %invitation.email, "invited teammate");

        let pending = PendingTeammate {
            email: invitation.email,
            token: invitation.token.unwrap_or_default(),
            scopes: invitation.scopes,
            is_admin: invitation.is_admin,
            expiration_date: None,
        };
        encode(&planned.invited(pending))
    }
}

#[async_trait]
impl Resource for TeammateResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("A teammate with access to the account")
            .with_attribute("id", Attribute::computed_string().with_description("The teammate's email"))
            .with_attribute("email", Attribute::required_string().with_force_new())
            .with_attribute(
                "is_admin",
                Attribute::optional_bool()
                    .with_default(Value::Bool(false))
                    .with_description("Grant every scope"),
            )
            .with_attribute(
                "scopes",
                Attribute::string_set(AttributeFlags::optional_computed())
                    .with_description("Permissions for non-admin teammates"),
            )
            .with_attribute("username", Attribute::computed_string())
            .with_attribute("first_name", Attribute::computed_string())
            .with_attribute("last_name", Attribute::computed_string())
            .with_attribute("user_type", Attribute::computed_string())
            .with_attribute(
                "pending",
                Attribute::computed_bool().with_description("The invite has not been accepted yet"),
            )
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let is_admin = config.get("is_admin").and_then(Value::as_bool).unwrap_or(false);
        let has_scopes = config
            .get("scopes")
            .and_then(Value::as_array)
            .is_some_and(|scopes| !scopes.is_empty());

        if is_admin && has_scopes {
            vec![Diagnostic::warning("Scopes ignored for admin teammates")
                .with_detail("Admins are granted every scope; the configured scopes are kept in state only")
                .with_attribute("scopes")]
        } else {
            Vec::new()
        }
    }

    fn import_seed(&self, id: &str) -> Value {
        json!({ "id": id, "email": id })
    }

    #[instrument(skip_all, fields(resource = TYPE_NAME))]
    async fn create(&self, client: &SendGridClient, planned: Value) -> Result<Value, ProviderError> {
        let planned: TeammateState = decode(planned)?;
        self.invite(client, &planned).await
    }

    #[instrument(skip_all, fields(resource = TYPE_NAME))]
    async fn read(&self, client: &SendGridClient, state: Value) -> Result<Option<Value>, ProviderError> {
        let state: TeammateState = decode(state)?;
        let email = state.email()?;
        let refreshed = match lookup_teammate(client, &email).await? {
            Some(Membership::Accepted(teammate)) => state.accepted(teammate),
            Some(Membership::Pending(invite)) => state.invited(invite),
            None => return Ok(None),
        };
        Ok(Some(encode(&refreshed)?))
    }

    #[instrument(skip_all, fields(resource = TYPE_NAME))]
    async fn update(
        &self,
        client: &SendGridClient,
        _prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        let planned: TeammateState = decode(planned)?;
        let email = planned.email()?;

        match lookup_teammate(client, &email).await? {
            Some(Membership::Accepted(teammate)) => {
                let updated = client
                    .update_teammate(
                        &teammate.username,
                        &planned.requested_scopes(),
                        planned.is_admin(),
                    )
                    .await?;
                encode(&planned.accepted(Teammate {
                    // The update response may omit profile fields.
                    first_name: updated.first_name.or(teammate.first_name),
                    last_name: updated.last_name.or(teammate.last_name),
                    user_type: updated.user_type.or(teammate.user_type),
                    ..updated
                }))
            }
            Some(Membership::Pending(invite)) => {
                debug!("re-sending pending invite");
                client.delete_pending_teammate(&invite.token).await?;
                self.invite(client, &planned).await
            }
            None => Err(ProviderError::NotFound(format!(
                "teammate {} no longer exists",
                email
            ))),
        }
    }

    #[instrument(skip_all, fields(resource = TYPE_NAME))]
    async fn delete(&self, client: &SendGridClient, state: Value) -> Result<(), ProviderError> {
        let state: TeammateState = decode(state)?;
        let email = state.email()?;
        match lookup_teammate(client, &email).await? {
            Some(Membership::Accepted(teammate)) => {
                gone_ok(client.delete_teammate(&teammate.username).await)?
            }
            Some(Membership::Pending(invite)) => {
                gone_ok(client.delete_pending_teammate(&invite.token).await)?
            }
            None => {}
        }
        info!(%email, "deleted teammate");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn teammate(is_admin: bool, scopes: &[&str]) -> Teammate {
        Teammate {
            username: "dev".into(),
            email: "dev@example.com".into(),
            first_name: Some("Dee".into()),
            last_name: Some("Vee".into()),
            user_type: Some(if is_admin { "admin" } else { "teammate" }.into()),
            is_admin,
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_admin_keeps_configured_scopes() {
        let prior = TeammateState {
            email: Some("dev@example.com".into()),
            is_admin: Some(true),
            scopes: Some(vec!["mail.send".into()]),
            ..Default::default()
        };
        let state = prior.accepted(teammate(true, &["mail.send", "alerts.read", "user.profile.read"]));
        assert_eq!(state.scopes, Some(vec!["mail.send".to_string()]));
        assert_eq!(state.pending, Some(false));
        assert_eq!(state.username.as_deref(), Some("dev"));
    }

    #[test]
    fn test_non_admin_reports_remote_scopes() {
        let prior = TeammateState {
            email: Some("dev@example.com".into()),
            scopes: Some(vec!["mail.send".into()]),
            ..Default::default()
        };
        let state = prior.accepted(teammate(false, &["mail.send", "alerts.read", "2fa_required"]));
        assert_eq!(
            state.scopes,
            Some(vec!["alerts.read".to_string(), "mail.send".to_string()])
        );
    }

    #[test]
    fn test_admin_requests_no_scopes() {
        let planned = TeammateState {
            is_admin: Some(true),
            scopes: Some(vec!["mail.send".into()]),
            ..Default::default()
        };
        assert!(planned.requested_scopes().is_empty());
    }

    #[test]
    fn test_admin_scopes_warning() {
        let diagnostics = TeammateResource.validate(
            &json!({"email": "dev@example.com", "is_admin": true, "scopes": ["mail.send"]}),
        );
        assert_eq!(diagnostics.len(), 1);
        assert!(!diagnostics[0].is_error());

        assert!(TeammateResource
            .validate(&json!({"email": "dev@example.com", "scopes": ["mail.send"]}))
            .is_empty());
    }

    #[test]
    fn test_import_seed_sets_email() {
        let seed = TeammateResource.import_seed("dev@example.com");
        assert_eq!(seed["email"], "dev@example.com");
        assert_eq!(seed["id"], "dev@example.com");
    }
}
