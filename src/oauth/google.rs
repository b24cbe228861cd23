use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use super::{FederatedProfile, FederatedTokens, IdentityProvider, OAuthError};
use crate::config::GoogleConfig;

const SCOPES: &str = "openid email profile";

/// Google OAuth2 adapter.
#[derive(Clone)]
pub struct GoogleProvider {
    client: reqwest::Client,
    auth_url: Url,
    config: GoogleConfig,
}

impl GoogleProvider {
    pub fn new(config: GoogleConfig) -> anyhow::Result<Self> {
        let auth_url = Url::parse(&config.auth_url)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("snapbook/1.0")
            .build()?;
        Ok(Self {
            client,
            auth_url,
            config,
        })
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn name(&self) -> &str {
        "google"
    }

    fn authorization_url(&self, state: &str) -> String {
        let mut url = self.auth_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_url)
            .append_pair("response_type", "code")
            .append_pair("scope", SCOPES)
            .append_pair("access_type", "offline")
            .append_pair("state", state);
        url.into()
    }

    async fn exchange_code(&self, code: &str) -> Result<FederatedTokens, OAuthError> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_url", self.config.redirect_url.as_str()),
            // Google reads `redirect_uri`
            ("redirect_uri", self.config.redirect_url.as_str()),
        ];

        let resp = self
            .client
            .post(&self.config.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| OAuthError::TokenExchangeFailed(e.without_url().to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(status = %status, "google token endpoint rejected the code");
            return Err(OAuthError::TokenExchangeFailed(format!(
                "token endpoint returned {}",
                status
            )));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| OAuthError::TokenExchangeFailed(e.without_url().to_string()))?;
        serde_json::from_str(&body).map_err(|e| OAuthError::MalformedTokenResponse(e.to_string()))
    }

    async fn fetch_profile(&self, tokens: &FederatedTokens) -> Result<FederatedProfile, OAuthError> {
        let resp = self
            .client
            .get(&self.config.userinfo_url)
            .query(&[("alt", "json"), ("access_token", tokens.access_token.as_str())])
            .bearer_auth(&tokens.id_token)
            .send()
            .await
            .map_err(|e| OAuthError::ProfileFetchFailed(e.without_url().to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(status = %status, "google userinfo endpoint rejected the token");
            return Err(OAuthError::ProfileFetchFailed(format!(
                "profile endpoint returned {}",
                status
            )));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| OAuthError::ProfileFetchFailed(e.without_url().to_string()))?;
        let profile: FederatedProfile = serde_json::from_str(&body)
            .map_err(|e| OAuthError::MalformedProfileResponse(e.to_string()))?;
        // the email is the reconciliation key
        if profile.email.trim().is_empty() {
            return Err(OAuthError::MalformedProfileResponse(
                "profile has no email".into(),
            ));
        }
        Ok(profile)
    }
}
