//! OAuth callback: map a federated identity onto a local user and issue a
//! session token for it.
//!
//! Stages, each terminal on failure:
//!
//! | stage            | failure                    | status class |
//! |------------------|----------------------------|--------------|
//! | start            | `MissingAuthorizationCode` | unauthorized |
//! | token exchanged  | `FederatedExchangeFailed`  | bad gateway  |
//! | profile fetched  | `FederatedProfileFailed`   | bad gateway  |
//! | reconciled       | `UserCreationFailed` / `UserUpdateFailed` | internal |
//! | token issued     | `TokenIssuanceFailed`      | internal     |

use std::sync::Arc;

use thiserror::Error;

use super::jwt::TokenIssuer;
use super::{AuthError, Role};
use crate::models::user::User;
use crate::oauth::{FederatedProfile, IdentityProvider, OAuthError};
use crate::store::{Repository, StoreError};

#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("authorization code not provided")]
    MissingAuthorizationCode,

    #[error("federated token exchange failed: {0}")]
    FederatedExchangeFailed(#[source] OAuthError),

    #[error("federated profile lookup failed: {0}")]
    FederatedProfileFailed(#[source] OAuthError),

    #[error("could not create user: {0}")]
    UserCreationFailed(#[source] StoreError),

    #[error("could not update user: {0}")]
    UserUpdateFailed(#[source] StoreError),

    #[error("could not issue token: {0}")]
    TokenIssuanceFailed(#[source] AuthError),
}

/// Successful end state of a callback.
#[derive(Debug, Clone)]
pub struct ReconciledLogin {
    pub token: String,
    pub user: User,
    /// `true` when the callback created the local user.
    pub created: bool,
}

#[derive(Clone)]
pub struct IdentityReconciler {
    provider: Arc<dyn IdentityProvider>,
    users: Arc<dyn Repository<User>>,
    issuer: TokenIssuer,
}

impl IdentityReconciler {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        users: Arc<dyn Repository<User>>,
        issuer: TokenIssuer,
    ) -> Self {
        Self {
            provider,
            users,
            issuer,
        }
    }

    pub fn provider(&self) -> &dyn IdentityProvider {
        self.provider.as_ref()
    }

    pub async fn complete(&self, code: &str) -> Result<ReconciledLogin, CallbackError> {
        if code.is_empty() {
            return Err(CallbackError::MissingAuthorizationCode);
        }

        let tokens = self
            .provider
            .exchange_code(code)
            .await
            .map_err(CallbackError::FederatedExchangeFailed)?;

        let profile = self
            .provider
            .fetch_profile(&tokens)
            .await
            .map_err(CallbackError::FederatedProfileFailed)?;

        if !profile.verified_email {
            tracing::warn!(email = %profile.email, provider = self.provider.name(), "federated email is not verified");
        }

        let (user, created) = self.reconcile(&profile).await?;

        let token = self
            .issuer
            .issue(&user.email, Role::Member)
            .await
            .map_err(CallbackError::TokenIssuanceFailed)?;

        tracing::info!(
            email = %user.email,
            provider = self.provider.name(),
            created,
            "federated login reconciled"
        );

        Ok(ReconciledLogin {
            token,
            user,
            created,
        })
    }

    async fn reconcile(&self, profile: &FederatedProfile) -> Result<(User, bool), CallbackError> {
        let existing = self
            .users
            .find_one_by_email(&profile.email)
            .await
            .map_err(CallbackError::UserUpdateFailed)?;

        let existing = match existing {
            Some(user) => user,
            None => {
                let fresh = User::federated(&profile.name, &profile.email, self.provider.name());
                match self.users.add_one(&fresh).await {
                    Ok(user) => return Ok((user, true)),
                    // a concurrent callback created the row first
                    Err(StoreError::Conflict(_)) => self
                        .users
                        .find_one_by_email(&profile.email)
                        .await
                        .map_err(CallbackError::UserCreationFailed)?
                        .ok_or_else(|| {
                            CallbackError::UserCreationFailed(StoreError::NotFound(
                                profile.email.clone(),
                            ))
                        })?,
                    Err(e) => return Err(CallbackError::UserCreationFailed(e)),
                }
            }
        };

        let mut user = existing;
        user.logged_out = false;
        let user = self
            .users
            .update_one(&user)
            .await
            .map_err(CallbackError::UserUpdateFailed)?;
        Ok((user, false))
    }
}
