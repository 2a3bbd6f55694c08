use anyhow::{Context, anyhow};
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiError;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gate in front of post creation.
pub enum IdentityVerifier {
    /// No identity provider configured; every write is accepted.
    Disabled,
    Firebase(FirebaseVerifier),
}

pub struct FirebaseVerifier {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<Account>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Account {
    local_id: String,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct LookupFailure {
    error: FailureDetail,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct FailureDetail {
    message: String,
}

impl IdentityVerifier {
    /// Checks that `token` belongs to the account `uid`.
    pub async fn authorize(&self, token: Option<&str>, uid: &str) -> Result<(), ApiError> {
        let verifier = match self {
            IdentityVerifier::Disabled => return Ok(()),
            IdentityVerifier::Firebase(verifier) => verifier,
        };

        let token = token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ApiError::Unauthorized("Missing identity token".to_owned()))?;

        let verified_uid = verifier.lookup(token).await?;
        if verified_uid != uid {
            return Err(ApiError::Forbidden(format!(
                "Identity token does not belong to `{uid}`"
            )));
        }

        Ok(())
    }
}

impl FirebaseVerifier {
    pub fn new(client: reqwest::Client, base_url: String, api_key: String) -> Self {
        Self {
            client,
            base_url,
            api_key,
        }
    }

    async fn lookup(&self, token: &str) -> Result<String, ApiError> {
        let response = self
            .client
            .post(format!(
                "{}/accounts:lookup",
                self.base_url.trim_end_matches('/')
            ))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&json!({ "idToken": token }))
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("Failed to send request to identity provider")?;

        let status = response.status();
        if status.is_client_error() {
            let failure: LookupFailure = response.json().await.unwrap_or_default();
            if failure.error.message.starts_with("API key not valid") {
                return Err(anyhow!("Identity provider rejected the configured API key").into());
            }
            return Err(ApiError::Unauthorized(format!(
                "Identity token rejected ({status})"
            )));
        }

        let lookup: LookupResponse = response
            .error_for_status()
            .map_err(reqwest::Error::without_url)
            .context("Identity provider error")?
            .json()
            .await
            .map_err(reqwest::Error::without_url)
            .context("Failed to parse identity provider response")?;

        lookup
            .users
            .into_iter()
            .next()
            .map(|account| account.local_id)
            .ok_or_else(|| ApiError::Unauthorized("Identity token has no account".to_owned()))
    }
}
