// Teammate endpoints
//
// Teammates are addressed by username once they accept their invite, and by
// invite token while pending. Both lists are searched by email.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Error, SendGridClient};

const PAGE_SIZE: usize = 500;

/// An accepted teammate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teammate {
    /// Login name; the path key for teammate endpoints.
    pub username: String,
    /// Email address.
    pub email: String,
    /// First name.
    #[serde(default)]
    pub first_name: Option<String>,
    /// Last name.
    #[serde(default)]
    pub last_name: Option<String>,
    /// `admin`, `owner` or `teammate`.
    #[serde(default)]
    pub user_type: Option<String>,
    /// Whether the teammate has full access.
    #[serde(default)]
    pub is_admin: bool,
    /// Only populated by the single-teammate endpoint.
    #[serde(default)]
    pub scopes: Vec<String>,
}

/// An invite that has not been accepted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTeammate {
    /// Invited address.
    pub email: String,
    /// Invite token, used to resend or revoke.
    pub token: String,
    /// Scopes the invite grants.
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Whether the invite grants full access.
    #[serde(default)]
    pub is_admin: bool,
    /// When the invite expires, as a Unix timestamp.
    #[serde(default)]
    pub expiration_date: Option<i64>,
}

/// The response to sending an invite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    /// Address to invite.
    pub email: String,
    /// Invite token. Set in responses.
    #[serde(default)]
    pub token: Option<String>,
    /// Scopes to grant.
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Grant full access.
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Debug, Serialize)]
struct InviteRequest<'a> {
    email: &'a str,
    scopes: &'a [String],
    is_admin: bool,
}

#[derive(Debug, Serialize)]
struct TeammateUpdate<'a> {
    scopes: &'a [String],
    is_admin: bool,
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    result: Vec<T>,
}

impl SendGridClient {
    /// List every accepted teammate, following pagination.
    ///
    /// `GET /v3/teammates?limit=&offset=`
    pub async fn list_teammates(&self) -> Result<Vec<Teammate>, Error> {
        let mut teammates = Vec::new();
        loop {
            let mut url = self.endpoint(&["teammates"])?;
            url.query_pairs_mut()
                .append_pair("limit", &PAGE_SIZE.to_string())
                .append_pair("offset", &teammates.len().to_string());

            let page: Page<Teammate> = self.get(url).await?;
            let count = page.result.len();
            teammates.extend(page.result);
            if count < PAGE_SIZE {
                break;
            }
        }
        debug!(count = teammates.len(), "listed teammates");
        Ok(teammates)
    }

    /// `GET /v3/teammates/{username}`
    pub async fn get_teammate(&self, username: &str) -> Result<Teammate, Error> {
        let url = self.endpoint(&["teammates", username])?;
        self.get(url).await
    }

    /// Find an accepted teammate by email, with scopes filled in.
    pub async fn find_teammate(&self, email: &str) -> Result<Option<Teammate>, Error> {
        let listed = self
            .list_teammates()
            .await?
            .into_iter()
            .find(|t| t.email.eq_ignore_ascii_case(email));
        match listed {
            Some(t) => self.get_teammate(&t.username).await.map(Some),
            None => Ok(None),
        }
    }

    /// `GET /v3/teammates/pending`
    pub async fn list_pending_teammates(&self) -> Result<Vec<PendingTeammate>, Error> {
        let url = self.endpoint(&["teammates", "pending"])?;
        let page: Page<PendingTeammate> = self.get(url).await?;
        Ok(page.result)
    }

    /// Find a pending invite by email.
    pub async fn find_pending_teammate(
        &self,
        email: &str,
    ) -> Result<Option<PendingTeammate>, Error> {
        Ok(self
            .list_pending_teammates()
            .await?
            .into_iter()
            .find(|t| t.email.eq_ignore_ascii_case(email)))
    }

    /// Send an invite. Admin invites must carry no scopes.
    ///
    /// `POST /v3/teammates`
    pub async fn invite_teammate(
        &self,
        email: &str,
        scopes: &[String],
        is_admin: bool,
    ) -> Result<Invitation, Error> {
        let url = self.endpoint(&["teammates"])?;
        debug!(email, is_admin, "inviting teammate");
        self.post(
            url,
            &InviteRequest {
                email,
                scopes,
                is_admin,
            },
        )
        .await
    }

    /// `PATCH /v3/teammates/{username}`
    pub async fn update_teammate(
        &self,
        username: &str,
        scopes: &[String],
        is_admin: bool,
    ) -> Result<Teammate, Error> {
        let url = self.endpoint(&["teammates", username])?;
        debug!(username, is_admin, "updating teammate");
        self.patch(url, &TeammateUpdate { scopes, is_admin }).await
    }

    /// `DELETE /v3/teammates/{username}`
    pub async fn delete_teammate(&self, username: &str) -> Result<(), Error> {
        let url = self.endpoint(&["teammates", username])?;
        debug!(username, "deleting teammate");
        self.delete(url).await
    }

    /// `DELETE /v3/teammates/pending/{token}`
    pub async fn delete_pending_teammate(&self, token: &str) -> Result<(), Error> {
        let url = self.endpoint(&["teammates", "pending", token])?;
        debug!("deleting pending invite");
        self.delete(url).await
    }
}
