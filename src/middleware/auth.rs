//! Bearer-token gates for member and administrator routes.
//!
//! On success the request carries a [`Session`] plus the loaded `User` or
//! `Administrator` as extensions for the handlers.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::auth::jwt::Claims;
use crate::auth::Role;
use crate::errors::AppError;
use crate::AppState;

/// The validated credential behind the current request.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub claims: Claims,
}

fn bearer_token(req: &Request) -> Result<String, AppError> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or(AppError::MissingToken)
}

pub async fn require_user(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&req)?;
    let claims = state.validator.authorize(&token, Role::Member).await?;

    let user = state
        .users
        .find_one_by_email(&claims.email)
        .await?
        .ok_or_else(|| AppError::Unauthorized("user no longer exists".into()))?;
    if user.logged_out {
        return Err(AppError::Unauthorized(
            "the session has been logged out, please sign in again".into(),
        ));
    }

    req.extensions_mut().insert(Session { token, claims });
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&req)?;
    let claims = state
        .validator
        .authorize(&token, Role::Administrator)
        .await?;

    let admin = state
        .admins
        .find_one_by_email(&claims.email)
        .await?
        .ok_or_else(|| AppError::Unauthorized("administrator no longer exists".into()))?;
    if admin.logged_out {
        tracing::warn!(email = %admin.email, "administrator token used after logout");
        return Err(AppError::Unauthorized(
            "the session has been logged out, please sign in again".into(),
        ));
    }

    req.extensions_mut().insert(Session { token, claims });
    req.extensions_mut().insert(admin);
    Ok(next.run(req).await)
}
