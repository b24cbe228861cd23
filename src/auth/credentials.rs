//! Email/password flows for customers and administrators, and logout.

use std::sync::Arc;

use thiserror::Error;

use super::jwt::TokenIssuer;
use super::password::{hash_password, verify_password};
use super::session::SessionRegistry;
use super::{AuthError, Role};
use crate::models::admin::Administrator;
use crate::models::user::User;
use crate::store::{Repository, StoreError};

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("missing input: {0}")]
    MissingInput(&'static str),

    /// Unknown email and wrong password are deliberately indistinguishable.
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("email is already registered")]
    EmailTaken,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub token: String,
    pub user: User,
}

#[derive(Clone)]
pub struct LocalAuthenticator {
    users: Arc<dyn Repository<User>>,
    admins: Arc<dyn Repository<Administrator>>,
    sessions: Arc<dyn SessionRegistry>,
    issuer: TokenIssuer,
}

fn require<'a>(value: &'a str, field: &'static str) -> Result<&'a str, CredentialError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CredentialError::MissingInput(field));
    }
    Ok(value)
}

impl LocalAuthenticator {
    pub fn new(
        users: Arc<dyn Repository<User>>,
        admins: Arc<dyn Repository<Administrator>>,
        sessions: Arc<dyn SessionRegistry>,
        issuer: TokenIssuer,
    ) -> Self {
        Self {
            users,
            admins,
            sessions,
            issuer,
        }
    }

    pub async fn register_customer(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Registration, CredentialError> {
        let name = require(name, "name")?;
        let email = require(email, "email")?;
        if password.is_empty() {
            return Err(CredentialError::MissingInput("password"));
        }

        let hash = hash_password(password).await?;
        let user = match self.users.add_one(&User::local(name, email, hash)).await {
            Ok(user) => user,
            Err(StoreError::Conflict(_)) => return Err(CredentialError::EmailTaken),
            Err(e) => return Err(e.into()),
        };

        let token = self.issuer.issue(&user.email, Role::Member).await?;
        tracing::info!(email = %user.email, "customer registered");
        Ok(Registration { token, user })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<String, CredentialError> {
        let email = require(email, "email")?;

        let mut user = self
            .users
            .find_one_by_email(email)
            .await?
            .ok_or(CredentialError::InvalidCredentials)?;
        // federated-only accounts have no local password
        let hash = user
            .password
            .as_deref()
            .ok_or(CredentialError::InvalidCredentials)?;
        if !verify_password(password, hash).await? {
            tracing::debug!(email = %email, "password mismatch");
            return Err(CredentialError::InvalidCredentials);
        }

        if user.logged_out {
            user.logged_out = false;
            user = self.users.update_one(&user).await?;
        }

        Ok(self.issuer.issue(&user.email, Role::Member).await?)
    }

    pub async fn admin_login(&self, email: &str, password: &str) -> Result<String, CredentialError> {
        let email = require(email, "email")?;

        let mut admin = self
            .admins
            .find_one_by_email(email)
            .await?
            .ok_or(CredentialError::InvalidCredentials)?;
        if !verify_password(password, &admin.password).await? {
            tracing::warn!(email = %email, "administrator password mismatch");
            return Err(CredentialError::InvalidCredentials);
        }

        if admin.logged_out {
            admin.logged_out = false;
            admin = self.admins.update_one(&admin).await?;
        }

        Ok(self.issuer.issue(&admin.email, Role::Administrator).await?)
    }

    pub async fn create_administrator(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Administrator, CredentialError> {
        let email = require(email, "email")?;
        if password.is_empty() {
            return Err(CredentialError::MissingInput("password"));
        }

        let hash = hash_password(password).await?;
        match self.admins.add_one(&Administrator::new(email, hash)).await {
            Ok(admin) => Ok(admin),
            Err(StoreError::Conflict(_)) => Err(CredentialError::EmailTaken),
            Err(e) => Err(e.into()),
        }
    }

    /// Drop the session for `token` and flag the user as logged out.
    pub async fn logout_user(&self, token: &str, user: &User) -> Result<(), CredentialError> {
        self.revoke(token).await?;
        let mut user = user.clone();
        user.logged_out = true;
        self.users.update_one(&user).await?;
        tracing::info!(email = %user.email, "user logged out");
        Ok(())
    }

    pub async fn logout_admin(
        &self,
        token: &str,
        admin: &Administrator,
    ) -> Result<(), CredentialError> {
        self.revoke(token).await?;
        let mut admin = admin.clone();
        admin.logged_out = true;
        self.admins.update_one(&admin).await?;
        tracing::info!(email = %admin.email, "administrator logged out");
        Ok(())
    }

    async fn revoke(&self, token: &str) -> Result<(), AuthError> {
        if !self.sessions.revoke(token).await? {
            tracing::debug!("logout for a session that was already gone");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::TokenValidator;
    use crate::auth::session::MemorySessionRegistry;
    use crate::config::{JwtConfig, SessionConfig};
    use crate::store::memory::MemoryRepository;

    struct Harness {
        auth: LocalAuthenticator,
        validator: TokenValidator,
        users: MemoryRepository<User>,
        admins: MemoryRepository<Administrator>,
    }

    fn harness() -> Harness {
        let jwt = JwtConfig {
            secret: "credentials-secret".into(),
            issuer: "snapbook-test".into(),
            expiration_minutes: 60,
            leeway_secs: 5,
        };
        let session = SessionConfig {
            ttl_secs: 3600,
            require_live_session: true,
        };
        let sessions: Arc<dyn SessionRegistry> = Arc::new(MemorySessionRegistry::new());
        let users = MemoryRepository::<User>::new();
        let admins = MemoryRepository::<Administrator>::new();
        let issuer = TokenIssuer::new(&jwt, &session, sessions.clone());
        Harness {
            auth: LocalAuthenticator::new(
                Arc::new(users.clone()),
                Arc::new(admins.clone()),
                sessions.clone(),
                issuer,
            ),
            validator: TokenValidator::new(&jwt, &session, sessions),
            users,
            admins,
        }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let h = harness();
        let reg = h
            .auth
            .register_customer("Ann", "ann@x.com", "hunter2")
            .await
            .unwrap();
        assert!(reg.user.provider.is_none());
        assert!(h.validator.authorize(&reg.token, Role::Member).await.is_ok());

        let token = h.auth.login("ann@x.com", "hunter2").await.unwrap();
        let claims = h.validator.authorize(&token, Role::Member).await.unwrap();
        assert_eq!(claims.email, "ann@x.com");
    }

    #[tokio::test]
    async fn test_register_rejects_duplicate_and_blank_fields() {
        let h = harness();
        h.auth
            .register_customer("Ann", "ann@x.com", "hunter2")
            .await
            .unwrap();

        assert!(matches!(
            h.auth
                .register_customer("Ann", "ann@x.com", "other")
                .await
                .unwrap_err(),
            CredentialError::EmailTaken
        ));
        assert!(matches!(
            h.auth.register_customer("Ann", "  ", "pw").await.unwrap_err(),
            CredentialError::MissingInput("email")
        ));
        assert_eq!(h.users.len(), 1);
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let h = harness();
        h.auth
            .register_customer("Ann", "ann@x.com", "hunter2")
            .await
            .unwrap();
        h.users
            .add_one(&User::federated("Bo", "bo@gmail.com", "google"))
            .await
            .unwrap();

        let wrong_pw = h.auth.login("ann@x.com", "nope").await.unwrap_err();
        let unknown = h.auth.login("zed@x.com", "hunter2").await.unwrap_err();
        let federated = h.auth.login("bo@gmail.com", "hunter2").await.unwrap_err();

        for err in [wrong_pw, unknown, federated] {
            assert!(matches!(err, CredentialError::InvalidCredentials));
        }
    }

    #[tokio::test]
    async fn test_logout_revokes_session_and_flags_user() {
        let h = harness();
        let reg = h
            .auth
            .register_customer("Ann", "ann@x.com", "hunter2")
            .await
            .unwrap();

        h.auth.logout_user(&reg.token, &reg.user).await.unwrap();

        assert!(h.users.get("ann@x.com").unwrap().logged_out);
        assert!(matches!(
            h.validator
                .authorize(&reg.token, Role::Member)
                .await
                .unwrap_err(),
            AuthError::SessionRevoked
        ));

        // logging in again clears the flag
        h.auth.login("ann@x.com", "hunter2").await.unwrap();
        assert!(!h.users.get("ann@x.com").unwrap().logged_out);
    }

    #[tokio::test]
    async fn test_admin_login_issues_admin_token() {
        let h = harness();
        h.auth
            .create_administrator("root@x.com", "s3cret")
            .await
            .unwrap();
        assert_eq!(h.admins.len(), 1);

        let token = h.auth.admin_login("root@x.com", "s3cret").await.unwrap();
        let claims = h
            .validator
            .authorize(&token, Role::Administrator)
            .await
            .unwrap();
        assert!(claims.is_admin);

        assert!(matches!(
            h.auth.admin_login("root@x.com", "wrong").await.unwrap_err(),
            CredentialError::InvalidCredentials
        ));
        // a customer cannot use the admin login
        h.auth
            .register_customer("Ann", "ann@x.com", "hunter2")
            .await
            .unwrap();
        assert!(matches!(
            h.auth.admin_login("ann@x.com", "hunter2").await.unwrap_err(),
            CredentialError::InvalidCredentials
        ));
    }
}
