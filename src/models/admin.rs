use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::EmailKeyed;

/// Operator account. Tokens issued for administrators carry `is_admin = true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Administrator {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub logged_out: bool,
}

impl Administrator {
    pub fn new(email: &str, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password: password_hash,
            logged_out: false,
        }
    }
}

impl EmailKeyed for Administrator {
    fn email(&self) -> &str {
        &self.email
    }
}
