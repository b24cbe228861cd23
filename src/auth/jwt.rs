//! Credential issuance and validation.
//!
//! Tokens are HS256 JWTs carrying the subject email, the admin flag, the
//! issuer, `iat` and `exp`. Every issued token is mirrored in the session
//! registry so that logout can revoke it before `exp`.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::session::SessionRegistry;
use super::{AuthError, Role, RoleMismatch};
use crate::config::{JwtConfig, SessionConfig};

/// Decoded credential payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject email.
    #[serde(rename = "sub")]
    pub email: String,
    pub is_admin: bool,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn role(&self) -> Role {
        Role::from_admin_flag(self.is_admin)
    }
}

/// Whether validation also requires a live session registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPolicy {
    /// Signature, expiry and role only. Logout does not invalidate the token
    /// before `exp`.
    Stateless,
    /// Additionally require the token to be present in the registry.
    RequireLiveSession,
}

impl SessionPolicy {
    pub fn from_flag(require_live_session: bool) -> Self {
        if require_live_session {
            SessionPolicy::RequireLiveSession
        } else {
            SessionPolicy::Stateless
        }
    }
}

#[derive(Clone)]
pub struct TokenIssuer {
    secret: String,
    issuer: String,
    lifetime: chrono::Duration,
    session_ttl: Duration,
    registry: Arc<dyn SessionRegistry>,
}

impl TokenIssuer {
    pub fn new(
        jwt: &JwtConfig,
        session: &SessionConfig,
        registry: Arc<dyn SessionRegistry>,
    ) -> Self {
        Self {
            secret: jwt.secret.clone(),
            issuer: jwt.issuer.clone(),
            lifetime: chrono::Duration::minutes(jwt.expiration_minutes),
            session_ttl: Duration::from_secs(session.ttl_secs),
            registry,
        }
    }

    /// Sign a credential for `email` and register it as a live session.
    pub async fn issue(&self, email: &str, role: Role) -> Result<String, AuthError> {
        self.issue_at(email, role, Utc::now()).await
    }

    pub(crate) async fn issue_at(
        &self,
        email: &str,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        if email.is_empty() {
            return Err(AuthError::MissingInput("subject email"));
        }
        if self.secret.is_empty() {
            return Err(AuthError::Signing("signing secret is not configured".into()));
        }

        let claims = Claims {
            email: email.to_string(),
            is_admin: role.is_admin(),
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AuthError::Signing(e.to_string()))?;

        self.registry
            .register(&token, email, self.session_ttl)
            .await?;

        tracing::debug!(email = %email, role = %role, exp = claims.exp, "issued session token");
        Ok(token)
    }

    pub fn token_lifetime(&self) -> chrono::Duration {
        self.lifetime
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }
}

#[derive(Clone)]
pub struct TokenValidator {
    secret: String,
    issuer: String,
    leeway_secs: u64,
    policy: SessionPolicy,
    registry: Arc<dyn SessionRegistry>,
}

impl TokenValidator {
    pub fn new(
        jwt: &JwtConfig,
        session: &SessionConfig,
        registry: Arc<dyn SessionRegistry>,
    ) -> Self {
        Self {
            secret: jwt.secret.clone(),
            issuer: jwt.issuer.clone(),
            leeway_secs: jwt.leeway_secs,
            policy: SessionPolicy::from_flag(session.require_live_session),
            registry,
        }
    }

    pub fn policy(&self) -> SessionPolicy {
        self.policy
    }

    /// Verify signature, expiry and role. Does not touch the registry.
    pub fn validate(&self, token: &str, expected: Role) -> Result<Claims, AuthError> {
        self.validate_at(token, expected, Utc::now())
    }

    pub(crate) fn validate_at(
        &self,
        token: &str,
        expected: Role,
        now: DateTime<Utc>,
    ) -> Result<Claims, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingInput("token"));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        // expiry is checked below against `now` so the clock stays injectable
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = self.leeway_secs;
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_required_spec_claims(&["sub", "iss", "iat", "exp"]);

        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(classify_decode_error)?
        .claims;

        if claims.exp + (self.leeway_secs as i64) < now.timestamp() {
            return Err(AuthError::Expired);
        }

        match (expected, claims.role()) {
            (Role::Administrator, Role::Member) => {
                Err(AuthError::RoleMismatch(RoleMismatch::AdministratorRequired))
            }
            (Role::Member, Role::Administrator) => {
                Err(AuthError::RoleMismatch(RoleMismatch::AdministratorOnMemberPath))
            }
            _ => Ok(claims),
        }
    }

    /// `validate`, then enforce the session policy against the registry.
    pub async fn authorize(&self, token: &str, expected: Role) -> Result<Claims, AuthError> {
        let claims = self.validate(token, expected)?;

        if self.policy == SessionPolicy::RequireLiveSession {
            match self.registry.lookup(token).await? {
                Some(email) if email == claims.email => {}
                Some(_) => {
                    tracing::warn!(email = %claims.email, "session registry subject does not match token");
                    return Err(AuthError::SessionRevoked);
                }
                None => return Err(AuthError::SessionRevoked),
            }
        }

        Ok(claims)
    }
}

fn classify_decode_error(err: jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::InvalidSignature
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::InvalidAlgorithmName
        | ErrorKind::MissingAlgorithm => AuthError::InvalidSignature,
        ErrorKind::ExpiredSignature => AuthError::Expired,
        _ => AuthError::MalformedClaims,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::{MemorySessionRegistry, RegistryError};
    use async_trait::async_trait;
    use chrono::TimeZone;

    const SECRET: &str = "test-secret-for-hs256";

    fn jwt_config() -> JwtConfig {
        JwtConfig {
            secret: SECRET.to_string(),
            issuer: "snapbook-test".to_string(),
            expiration_minutes: 60,
            leeway_secs: 5,
        }
    }

    fn session_config(require_live_session: bool) -> SessionConfig {
        SessionConfig {
            ttl_secs: 3600,
            require_live_session,
        }
    }

    fn pair(require_live_session: bool) -> (TokenIssuer, TokenValidator, MemorySessionRegistry) {
        let registry = MemorySessionRegistry::new();
        let shared: Arc<dyn SessionRegistry> = Arc::new(registry.clone());
        let session = session_config(require_live_session);
        (
            TokenIssuer::new(&jwt_config(), &session, shared.clone()),
            TokenValidator::new(&jwt_config(), &session, shared),
            registry,
        )
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    struct FailingRegistry;

    #[async_trait]
    impl SessionRegistry for FailingRegistry {
        async fn register(&self, _: &str, _: &str, _: Duration) -> Result<(), RegistryError> {
            Err(RegistryError::Unavailable("connection refused".into()))
        }
        async fn lookup(&self, _: &str) -> Result<Option<String>, RegistryError> {
            Err(RegistryError::Unavailable("connection refused".into()))
        }
        async fn revoke(&self, _: &str) -> Result<bool, RegistryError> {
            Err(RegistryError::Unavailable("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn test_issue_then_validate_member() {
        let (issuer, validator, _) = pair(false);
        let token = issuer.issue("a@x.com", Role::Member).await.unwrap();

        let claims = validator.validate(&token, Role::Member).unwrap();
        assert_eq!(claims.email, "a@x.com");
        assert!(!claims.is_admin);
        assert_eq!(claims.iss, "snapbook-test");
        assert_eq!(claims.exp - claims.iat, 60 * 60);
    }

    #[tokio::test]
    async fn test_issue_then_validate_administrator() {
        let (issuer, validator, _) = pair(false);
        let token = issuer.issue("root@x.com", Role::Administrator).await.unwrap();

        let claims = validator.validate(&token, Role::Administrator).unwrap();
        assert_eq!(claims.email, "root@x.com");
        assert_eq!(claims.role(), Role::Administrator);
    }

    #[tokio::test]
    async fn test_token_has_three_segments() {
        let (issuer, _, _) = pair(false);
        let token = issuer.issue("a@x.com", Role::Member).await.unwrap();
        assert_eq!(token.split('.').count(), 3);
    }

    #[tokio::test]
    async fn test_member_token_on_admin_path_is_rejected() {
        let (issuer, validator, _) = pair(false);
        let token = issuer.issue("a@x.com", Role::Member).await.unwrap();

        let err = validator.validate(&token, Role::Administrator).unwrap_err();
        assert!(matches!(
            err,
            AuthError::RoleMismatch(RoleMismatch::AdministratorRequired)
        ));
    }

    #[tokio::test]
    async fn test_admin_token_on_member_path_is_rejected() {
        let (issuer, validator, _) = pair(false);
        let token = issuer.issue("root@x.com", Role::Administrator).await.unwrap();

        let err = validator.validate(&token, Role::Member).unwrap_err();
        assert!(matches!(
            err,
            AuthError::RoleMismatch(RoleMismatch::AdministratorOnMemberPath)
        ));
        assert!(err.to_string().contains("/admin path"));
    }

    #[tokio::test]
    async fn test_expiry_boundaries_honour_leeway() {
        let (issuer, validator, _) = pair(false);
        let token = issuer.issue_at("a@x.com", Role::Member, t0()).await.unwrap();
        let exp = t0() + chrono::Duration::minutes(60);

        // one second before expiry
        assert!(validator
            .validate_at(&token, Role::Member, exp - chrono::Duration::seconds(1))
            .is_ok());
        // inside the leeway window
        assert!(validator
            .validate_at(&token, Role::Member, exp + chrono::Duration::seconds(5))
            .is_ok());
        // past expiry plus leeway
        let err = validator
            .validate_at(&token, Role::Member, exp + chrono::Duration::seconds(6))
            .unwrap_err();
        assert!(matches!(err, AuthError::Expired));
        assert!(err.to_string().contains("token refreshing is needed"));
    }

    #[tokio::test]
    async fn test_expiry_is_checked_before_role() {
        let (issuer, validator, _) = pair(false);
        let token = issuer.issue_at("a@x.com", Role::Member, t0()).await.unwrap();
        let later = t0() + chrono::Duration::days(1);

        let err = validator
            .validate_at(&token, Role::Administrator, later)
            .unwrap_err();
        assert!(matches!(err, AuthError::Expired));
    }

    #[tokio::test]
    async fn test_tampered_signature_is_rejected() {
        let (issuer, validator, _) = pair(false);
        let token = issuer.issue("a@x.com", Role::Member).await.unwrap();

        let mut chars: Vec<char> = token.chars().collect();
        let last = chars.len() - 1;
        chars[last] = if chars[last] == 'A' { 'B' } else { 'A' };
        let tampered: String = chars.into_iter().collect();

        let err = validator.validate(&tampered, Role::Member).unwrap_err();
        assert!(matches!(err, AuthError::InvalidSignature));
    }

    #[tokio::test]
    async fn test_token_signed_with_other_secret_is_rejected() {
        let (issuer, _, _) = pair(false);
        let token = issuer.issue("a@x.com", Role::Member).await.unwrap();

        let other = JwtConfig {
            secret: "another-secret".to_string(),
            ..jwt_config()
        };
        let validator = TokenValidator::new(
            &other,
            &session_config(false),
            Arc::new(MemorySessionRegistry::new()),
        );
        let err = validator.validate(&token, Role::Member).unwrap_err();
        assert!(matches!(err, AuthError::InvalidSignature));
    }

    #[test]
    fn test_non_hs256_algorithm_is_rejected() {
        let (_, validator, _) = pair(false);
        let now = Utc::now().timestamp();
        let claims = Claims {
            email: "a@x.com".into(),
            is_admin: false,
            iss: "snapbook-test".into(),
            iat: now,
            exp: now + 600,
        };
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        let err = validator.validate(&token, Role::Member).unwrap_err();
        assert!(matches!(err, AuthError::InvalidSignature));
    }

    #[test]
    fn test_untyped_claims_are_malformed() {
        let (_, validator, _) = pair(false);
        let now = Utc::now().timestamp();
        // is_admin has the wrong type
        let payload = serde_json::json!({
            "sub": "a@x.com",
            "is_admin": "yes",
            "iss": "snapbook-test",
            "iat": now,
            "exp": now + 600,
        });
        let token = encode(
            &Header::new(Algorithm::HS256),
            &payload,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        let err = validator.validate(&token, Role::Member).unwrap_err();
        assert!(matches!(err, AuthError::MalformedClaims));
    }

    #[test]
    fn test_foreign_issuer_is_malformed() {
        let (_, validator, _) = pair(false);
        let now = Utc::now().timestamp();
        let claims = Claims {
            email: "a@x.com".into(),
            is_admin: false,
            iss: "someone-else".into(),
            iat: now,
            exp: now + 600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        let err = validator.validate(&token, Role::Member).unwrap_err();
        assert!(matches!(err, AuthError::MalformedClaims));
    }

    #[test]
    fn test_garbage_token_is_malformed() {
        let (_, validator, _) = pair(false);
        let err = validator.validate("not-a-jwt", Role::Member).unwrap_err();
        assert!(matches!(err, AuthError::MalformedClaims));
    }

    #[tokio::test]
    async fn test_issue_registers_session_with_subject() {
        let (issuer, _, registry) = pair(false);
        let token = issuer.issue("a@x.com", Role::Member).await.unwrap();

        assert_eq!(
            registry.lookup(&token).await.unwrap().as_deref(),
            Some("a@x.com")
        );
    }

    #[tokio::test]
    async fn test_issue_fails_when_registry_write_fails() {
        let registry: Arc<dyn SessionRegistry> = Arc::new(FailingRegistry);
        let issuer = TokenIssuer::new(&jwt_config(), &session_config(false), registry);

        let err = issuer.issue("a@x.com", Role::Member).await.unwrap_err();
        assert!(matches!(err, AuthError::Registry(_)));
    }

    #[tokio::test]
    async fn test_issue_requires_email_and_secret() {
        let (issuer, _, _) = pair(false);
        assert!(matches!(
            issuer.issue("", Role::Member).await.unwrap_err(),
            AuthError::MissingInput(_)
        ));

        let unsigned = JwtConfig {
            secret: String::new(),
            ..jwt_config()
        };
        let issuer = TokenIssuer::new(
            &unsigned,
            &session_config(false),
            Arc::new(MemorySessionRegistry::new()),
        );
        assert!(matches!(
            issuer.issue("a@x.com", Role::Member).await.unwrap_err(),
            AuthError::Signing(_)
        ));
    }

    #[tokio::test]
    async fn test_strict_policy_rejects_revoked_session() {
        let (issuer, validator, registry) = pair(true);
        let token = issuer.issue("a@x.com", Role::Member).await.unwrap();

        assert!(validator.authorize(&token, Role::Member).await.is_ok());

        registry.revoke(&token).await.unwrap();
        let err = validator.authorize(&token, Role::Member).await.unwrap_err();
        assert!(matches!(err, AuthError::SessionRevoked));
        // the stateless check alone still passes
        assert!(validator.validate(&token, Role::Member).is_ok());
    }

    #[tokio::test]
    async fn test_stateless_policy_ignores_registry() {
        let (issuer, validator, registry) = pair(false);
        let token = issuer.issue("a@x.com", Role::Member).await.unwrap();
        registry.revoke(&token).await.unwrap();

        assert_eq!(validator.policy(), SessionPolicy::Stateless);
        assert!(validator.authorize(&token, Role::Member).await.is_ok());
    }

    #[tokio::test]
    async fn test_strict_policy_rejects_mismatched_subject() {
        let (issuer, validator, registry) = pair(true);
        let token = issuer.issue("a@x.com", Role::Member).await.unwrap();
        registry
            .register(&token, "mallory@x.com", Duration::from_secs(60))
            .await
            .unwrap();

        let err = validator.authorize(&token, Role::Member).await.unwrap_err();
        assert!(matches!(err, AuthError::SessionRevoked));
    }
}
