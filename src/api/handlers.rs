use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::middleware::auth::Session;
use crate::models::admin::Administrator;
use crate::models::user::User;
use crate::AppState;

// ── Request / Response DTOs ──────────────────────────────────

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct GoogleLoginParams {
    /// Frontend path to return to after the callback.
    pub state: Option<String>,
}

#[derive(Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub status: &'static str,
    pub token: String,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub status: &'static str,
    pub token: String,
    pub user: User,
}

#[derive(Serialize)]
pub struct AuthorizationUrlResponse {
    pub status: &'static str,
    pub url: String,
}

#[derive(Serialize)]
pub struct CallbackResponse {
    pub status: &'static str,
    pub token: String,
    pub redirect: String,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

/// Only same-origin paths are accepted as post-login redirects.
fn sanitize_return_path(state: Option<&str>) -> String {
    match state {
        // browsers treat a leading "/\" like "//"
        Some(path)
            if path.starts_with('/') && !path.starts_with("//") && !path.starts_with("/\\") =>
        {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}

// ── Handlers ─────────────────────────────────────────────────

pub async fn register_customer(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let reg = state
        .local
        .register_customer(&req.name, &req.email, &req.password)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            status: "success",
            token: reg.token,
            user: reg.user,
        }),
    ))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let token = state.local.login(&req.email, &req.password).await?;
    Ok(Json(TokenResponse {
        status: "success",
        token,
    }))
}

pub async fn admin_login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let token = state.local.admin_login(&req.email, &req.password).await?;
    Ok(Json(TokenResponse {
        status: "success",
        token,
    }))
}

pub async fn google_login(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GoogleLoginParams>,
) -> Json<AuthorizationUrlResponse> {
    let return_path = sanitize_return_path(params.state.as_deref());
    Json(AuthorizationUrlResponse {
        status: "success",
        url: state.reconciler.provider().authorization_url(&return_path),
    })
}

pub async fn google_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Result<Json<CallbackResponse>, AppError> {
    let code = params.code.unwrap_or_default();
    let login = state.reconciler.complete(&code).await?;
    Ok(Json(CallbackResponse {
        status: "success",
        token: login.token,
        redirect: sanitize_return_path(params.state.as_deref()),
    }))
}

pub async fn me(Extension(user): Extension<User>) -> Json<User> {
    Json(user)
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Extension(user): Extension<User>,
) -> Result<Json<StatusResponse>, AppError> {
    state.local.logout_user(&session.token, &user).await?;
    Ok(Json(StatusResponse { status: "success" }))
}

pub async fn admin_logout(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Extension(admin): Extension<Administrator>,
) -> Result<Json<StatusResponse>, AppError> {
    state.local.logout_admin(&session.token, &admin).await?;
    Ok(Json(StatusResponse { status: "success" }))
}
