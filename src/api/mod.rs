use std::sync::Arc;

use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::middleware::auth::{require_admin, require_user};
use crate::AppState;

pub mod handlers;

/// Build the HTTP router.
///
/// `/authen` is public, `/users` requires a member token and `/admin`
/// (except its login) requires an administrator token.
pub fn router(state: Arc<AppState>) -> Router {
    let authen = Router::new()
        .route("/v1/register/customer", post(handlers::register_customer))
        .route("/v1/login", post(handlers::login))
        .route("/v1/google/login", post(handlers::google_login))
        .route("/v1/google/callback", get(handlers::google_callback));

    let users = Router::new()
        .route("/v1/me", get(handlers::me))
        .route("/v1/logout", put(handlers::logout))
        .layer(middleware::from_fn_with_state(state.clone(), require_user));

    let admin = Router::new()
        .route("/v1/logout", put(handlers::admin_logout))
        .layer(middleware::from_fn_with_state(state.clone(), require_admin))
        // added after the layer, so it stays public
        .route("/v1/login", post(handlers::admin_login));

    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .nest("/authen", authen)
        .nest("/users", users)
        .nest("/admin", admin)
        .fallback(fallback_404)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn fallback_404() -> StatusCode {
    StatusCode::NOT_FOUND
}
