//! snapbook: authentication and session service for the photographer
//! booking marketplace.
//!
//! The binary in `main.rs` wires these modules to Postgres, Redis and Google;
//! tests wire them to the in-memory store and registry.

use std::sync::Arc;

pub mod api;
pub mod auth;
pub mod config;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod oauth;
pub mod store;

use auth::credentials::LocalAuthenticator;
use auth::jwt::{TokenIssuer, TokenValidator};
use auth::reconcile::IdentityReconciler;
use auth::session::SessionRegistry;
use models::admin::Administrator;
use models::user::User;
use oauth::IdentityProvider;
use store::Repository;

/// Shared application state passed to handlers and middleware.
pub struct AppState {
    pub users: Arc<dyn Repository<User>>,
    pub admins: Arc<dyn Repository<Administrator>>,
    pub validator: TokenValidator,
    pub local: LocalAuthenticator,
    pub reconciler: IdentityReconciler,
}

impl AppState {
    pub fn new(
        config: &config::Config,
        users: Arc<dyn Repository<User>>,
        admins: Arc<dyn Repository<Administrator>>,
        sessions: Arc<dyn SessionRegistry>,
        provider: Arc<dyn IdentityProvider>,
    ) -> Self {
        let issuer = TokenIssuer::new(&config.jwt, &config.session, sessions.clone());
        let validator = TokenValidator::new(&config.jwt, &config.session, sessions.clone());
        let local = LocalAuthenticator::new(
            users.clone(),
            admins.clone(),
            sessions,
            issuer.clone(),
        );
        let reconciler = IdentityReconciler::new(provider, users.clone(), issuer);

        Self {
            users,
            admins,
            validator,
            local,
            reconciler,
        }
    }
}
