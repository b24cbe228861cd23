//! Federated identity: authorization-code exchange and profile lookup.
//!
//! Workflow for one login:
//! 1. Redirect the browser to `authorization_url(state)`
//! 2. Provider calls back with `?code=...&state=...`
//! 3. `exchange_code(code)` → access token + identity token
//! 4. `fetch_profile(tokens)` → `FederatedProfile`
//!
//! Each call is a single attempt. Failures are returned to the caller.

pub mod google;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("could not retrieve token: {0}")]
    TokenExchangeFailed(String),

    #[error("malformed token response: {0}")]
    MalformedTokenResponse(String),

    #[error("could not retrieve user: {0}")]
    ProfileFetchFailed(String),

    #[error("malformed profile response: {0}")]
    MalformedProfileResponse(String),
}

/// Tokens returned by the provider's token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct FederatedTokens {
    pub access_token: String,
    pub id_token: String,
}

/// Profile returned by the provider. Lives for one callback only.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FederatedProfile {
    pub id: String,
    pub email: String,
    pub verified_email: bool,
    pub name: String,
    pub given_name: String,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Provider tag stored on users created through this provider.
    fn name(&self) -> &str;

    /// Consent-screen URL; `state` is echoed back on the callback.
    fn authorization_url(&self, state: &str) -> String;

    async fn exchange_code(&self, code: &str) -> Result<FederatedTokens, OAuthError>;

    async fn fetch_profile(&self, tokens: &FederatedTokens) -> Result<FederatedProfile, OAuthError>;
}
