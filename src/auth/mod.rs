//! Authentication core: token issuance/validation, the session registry,
//! password hashing and federated identity reconciliation.

pub mod credentials;
pub mod jwt;
pub mod password;
pub mod reconcile;
pub mod session;

use std::fmt;

use thiserror::Error;

use self::session::RegistryError;

/// Capability carried by a credential.
///
/// Only two roles exist and the wire format is a boolean (`is_admin`), but
/// call sites go through this type so a richer role set stays local to
/// `jwt.rs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Member,
    Administrator,
}

impl Role {
    pub fn from_admin_flag(is_admin: bool) -> Self {
        if is_admin {
            Role::Administrator
        } else {
            Role::Member
        }
    }

    pub fn is_admin(self) -> bool {
        matches!(self, Role::Administrator)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Member => f.write_str("member"),
            Role::Administrator => f.write_str("administrator"),
        }
    }
}

/// Which side of a role check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleMismatch {
    /// An administrator endpoint was called with a member token.
    AdministratorRequired,
    /// A member endpoint was called with an administrator token.
    AdministratorOnMemberPath,
}

impl fmt::Display for RoleMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoleMismatch::AdministratorRequired => {
                f.write_str("the email provided is not an administrator email")
            }
            RoleMismatch::AdministratorOnMemberPath => f.write_str(
                "the email provided is an administrator email, please use the /admin path instead",
            ),
        }
    }
}

/// Errors raised while issuing or validating credentials.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing input: {0}")]
    MissingInput(&'static str),

    #[error("token signing failed: {0}")]
    Signing(String),

    #[error("session registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("the session has expired, token refreshing is needed")]
    Expired,

    #[error("{0}")]
    RoleMismatch(RoleMismatch),

    #[error("malformed credential: unknown claim type, cannot proceed")]
    MalformedClaims,

    #[error("the session has been logged out, please sign in again")]
    SessionRevoked,

    #[error("password hashing failed: {0}")]
    Password(String),
}
