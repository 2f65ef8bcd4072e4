// API key endpoints
//
// The secret is only returned by create. Single-key reads come back wrapped
// in a `result` array on some accounts and bare on others.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Error, SendGridClient};

/// An API key as reported by SendGrid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKey {
    /// Key id.
    pub api_key_id: String,
    /// Display name.
    pub name: String,
    /// Granted scopes, including the implicit 2FA scopes.
    #[serde(default)]
    pub scopes: Vec<String>,
    /// The secret, present only in the create response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct ApiKeyRequest<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    scopes: Option<&'a [String]>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiKeyEnvelope {
    Wrapped { result: Vec<ApiKey> },
    Bare(ApiKey),
}

impl SendGridClient {
    /// Create an API key. Without scopes SendGrid grants full access.
    ///
    /// `POST /v3/api_keys`
    pub async fn create_api_key(
        &self,
        name: &str,
        scopes: Option<&[String]>,
    ) -> Result<ApiKey, Error> {
        let url = self.endpoint(&["api_keys"])?;
        debug!(name, "creating api key");
        self.post(url, &ApiKeyRequest { name, scopes }).await
    }

    /// `GET /v3/api_keys/{id}`
    pub async fn get_api_key(&self, id: &str) -> Result<ApiKey, Error> {
        let url = self.endpoint(&["api_keys", id])?;
        match self.get(url).await? {
            ApiKeyEnvelope::Bare(key) => Ok(key),
            ApiKeyEnvelope::Wrapped { result } => result
                .into_iter()
                .next()
                .ok_or_else(|| Error::not_found(format!("API key {} not found", id))),
        }
    }

    /// Rename an API key, replacing its scopes when given.
    ///
    /// `PUT /v3/api_keys/{id}` with scopes, `PATCH` without.
    pub async fn update_api_key(
        &self,
        id: &str,
        name: &str,
        scopes: Option<&[String]>,
    ) -> Result<ApiKey, Error> {
        let url = self.endpoint(&["api_keys", id])?;
        debug!(id, name, "updating api key");
        let body = ApiKeyRequest { name, scopes };
        match scopes {
            Some(_) => self.put(url, &body).await,
            None => self.patch(url, &body).await,
        }
    }

    /// `DELETE /v3/api_keys/{id}`
    pub async fn delete_api_key(&self, id: &str) -> Result<(), Error> {
        let url = self.endpoint(&["api_keys", id])?;
        debug!(id, "deleting api key");
        self.delete(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shapes() {
        let wrapped: ApiKeyEnvelope = serde_json::from_str(
            r#"{"result":[{"api_key_id":"abc","name":"ci","scopes":["mail.send"]}]}"#,
        )
        .unwrap();
        assert!(matches!(wrapped, ApiKeyEnvelope::Wrapped { ref result } if result.len() == 1));

        let bare: ApiKeyEnvelope =
            serde_json::from_str(r#"{"api_key_id":"abc","name":"ci"}"#).unwrap();
        match bare {
            ApiKeyEnvelope::Bare(key) => {
                assert_eq!(key.api_key_id, "abc");
                assert!(key.scopes.is_empty());
                assert!(key.api_key.is_none());
            }
            other => panic!("unexpected envelope {:?}", other),
        }
    }

    #[test]
    fn test_request_omits_missing_scopes() {
        let body = serde_json::to_value(ApiKeyRequest {
            name: "ci",
            scopes: None,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"name": "ci"}));
    }
}
