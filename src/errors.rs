use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::auth::credentials::CredentialError;
use crate::auth::reconcile::CallbackError;
use crate::auth::AuthError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("missing bearer token")]
    MissingToken,

    #[error("{0}")]
    Unauthorized(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Credentials(#[from] CredentialError),

    #[error(transparent)]
    Callback(#[from] CallbackError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, &'static str, String) {
        match self {
            AppError::MissingToken => (
                StatusCode::UNAUTHORIZED,
                "authentication_error",
                "missing_token",
                self.to_string(),
            ),
            AppError::Unauthorized(msg) => (
                StatusCode::UNAUTHORIZED,
                "authentication_error",
                "unauthorized",
                msg.clone(),
            ),
            AppError::Auth(e) => auth_parts(e),
            AppError::Credentials(e) => credential_parts(e),
            AppError::Callback(e) => callback_parts(e),
            AppError::Store(e) => internal(e),
            AppError::Internal(e) => internal(e),
        }
    }
}

fn internal(e: &dyn std::fmt::Display) -> (StatusCode, &'static str, &'static str, String) {
    tracing::error!("Internal error: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        "internal_server_error",
        "internal server error".to_string(),
    )
}

fn auth_parts(e: &AuthError) -> (StatusCode, &'static str, &'static str, String) {
    match e {
        AuthError::MissingInput(_) => (
            StatusCode::BAD_REQUEST,
            "invalid_request_error",
            "missing_input",
            e.to_string(),
        ),
        AuthError::InvalidSignature => (
            StatusCode::UNAUTHORIZED,
            "authentication_error",
            "invalid_signature",
            e.to_string(),
        ),
        AuthError::Expired => (
            StatusCode::UNAUTHORIZED,
            "authentication_error",
            "token_expired",
            e.to_string(),
        ),
        AuthError::MalformedClaims => (
            StatusCode::UNAUTHORIZED,
            "authentication_error",
            "malformed_token",
            e.to_string(),
        ),
        AuthError::SessionRevoked => (
            StatusCode::UNAUTHORIZED,
            "authentication_error",
            "session_revoked",
            e.to_string(),
        ),
        AuthError::RoleMismatch(_) => (
            StatusCode::BAD_REQUEST,
            "permission_error",
            "role_mismatch",
            e.to_string(),
        ),
        AuthError::Signing(_) | AuthError::Registry(_) | AuthError::Password(_) => internal(e),
    }
}

fn credential_parts(e: &CredentialError) -> (StatusCode, &'static str, &'static str, String) {
    match e {
        CredentialError::MissingInput(_) => (
            StatusCode::BAD_REQUEST,
            "invalid_request_error",
            "missing_input",
            e.to_string(),
        ),
        CredentialError::InvalidCredentials => (
            StatusCode::UNAUTHORIZED,
            "authentication_error",
            "invalid_credentials",
            e.to_string(),
        ),
        CredentialError::EmailTaken => (
            StatusCode::CONFLICT,
            "invalid_request_error",
            "email_taken",
            e.to_string(),
        ),
        CredentialError::Auth(inner) => auth_parts(inner),
        CredentialError::Store(inner) => internal(inner),
    }
}

fn callback_parts(e: &CallbackError) -> (StatusCode, &'static str, &'static str, String) {
    match e {
        CallbackError::MissingAuthorizationCode => (
            StatusCode::UNAUTHORIZED,
            "authentication_error",
            "missing_authorization_code",
            e.to_string(),
        ),
        CallbackError::FederatedExchangeFailed(_) | CallbackError::FederatedProfileFailed(_) => {
            tracing::warn!("federated provider error: {}", e);
            (
                StatusCode::BAD_GATEWAY,
                "upstream_error",
                "identity_provider_failed",
                "the identity provider could not complete the sign-in".to_string(),
            )
        }
        CallbackError::UserCreationFailed(_)
        | CallbackError::UserUpdateFailed(_)
        | CallbackError::TokenIssuanceFailed(_) => internal(e),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, code, msg) = self.parts();

        let body = Json(json!({
            "error": {
                "message": msg,
                "type": error_type,
                "code": code,
            }
        }));

        (status, body).into_response()
    }
}
