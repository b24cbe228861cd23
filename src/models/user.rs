use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::EmailKeyed;

/// Local user identity. `email` is unique and is the reconciliation key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// Federated provider tag (e.g. "google"); `None` for local sign-ups.
    pub provider: Option<String>,
    /// bcrypt hash. Federated users have none.
    #[serde(skip_serializing, default)]
    pub password: Option<String>,
    pub logged_out: bool,
    pub profile_picture_key: Option<String>,
}

impl User {
    /// A customer registered with email and password.
    pub fn local(name: &str, email: &str, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            provider: None,
            password: Some(password_hash),
            logged_out: false,
            profile_picture_key: None,
        }
    }

    /// A user first seen through a federated identity provider.
    pub fn federated(name: &str, email: &str, provider: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            provider: Some(provider.to_string()),
            password: None,
            logged_out: false,
            profile_picture_key: None,
        }
    }
}

impl EmailKeyed for User {
    fn email(&self) -> &str {
        &self.email
    }
}
