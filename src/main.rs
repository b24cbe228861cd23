use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use clap::Parser;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use snapbook::auth::session::{RedisSessionRegistry, SessionRegistry};
use snapbook::oauth::google::GoogleProvider;
use snapbook::store::postgres::PgStore;
use snapbook::{api, config, AppState};

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "snapbook=debug,tower_http=debug".into()),
    );
    let json = std::env::var("SNAPBOOK_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let cfg = config::load()?;
    let args = cli::Cli::parse();

    let result = match args.command {
        Some(cli::Commands::Serve { port }) => {
            let port = port.unwrap_or(cfg.port);
            run_server(cfg, port).await
        }
        Some(cli::Commands::Admin { command }) => handle_admin_command(&cfg, command).await,
        Some(cli::Commands::Session { command }) => handle_session_command(&cfg, command).await,
        None => {
            let port = cfg.port;
            run_server(cfg, port).await
        }
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

/// Connect every backend. Migrations always run so that CLI commands work on
/// a fresh database too.
async fn build_state(cfg: &config::Config) -> anyhow::Result<Arc<AppState>> {
    tracing::info!("Connecting to database...");
    let db = PgStore::connect(&cfg.database_url).await?;
    tracing::info!("Running migrations...");
    db.migrate().await?;

    tracing::info!("Connecting to Redis...");
    let sessions = RedisSessionRegistry::connect(&cfg.redis_url).await?;
    let google = GoogleProvider::new(cfg.google.clone())?;

    Ok(Arc::new(AppState::new(
        cfg,
        Arc::new(db.users()),
        Arc::new(db.admins()),
        Arc::new(sessions),
        Arc::new(google),
    )))
}

async fn run_server(cfg: config::Config, port: u16) -> anyhow::Result<()> {
    if cfg.session.ttl_shorter_than(&cfg.jwt) {
        tracing::warn!(
            ttl_secs = cfg.session.ttl_secs,
            expiration_minutes = cfg.jwt.expiration_minutes,
            "session TTL is shorter than the token lifetime; sessions will end before token expiry"
        );
    }

    let origin = HeaderValue::from_str(&cfg.frontend_origin)
        .with_context(|| format!("invalid SNAPBOOK_FRONTEND_ORIGIN: {}", cfg.frontend_origin))?;
    let state = build_state(&cfg).await?;

    let app = api::router(state)
        .layer(
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
                .allow_credentials(true),
        )
        .layer(axum::middleware::from_fn(request_id_middleware));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("snapbook listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Middleware: injects a unique X-Request-Id into every response.
async fn request_id_middleware(
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let req_id = uuid::Uuid::new_v4().to_string();
    let mut resp = next.run(req).await;
    if let Ok(val) = HeaderValue::from_str(&req_id) {
        resp.headers_mut().insert("x-request-id", val);
    }
    resp
}

async fn handle_admin_command(cfg: &config::Config, cmd: cli::AdminCommands) -> anyhow::Result<()> {
    match cmd {
        cli::AdminCommands::Create { email, password } => {
            let state = build_state(cfg).await?;
            let admin = state
                .local
                .create_administrator(&email, &password)
                .await
                .context("failed to create administrator")?;
            println!("Created administrator {} ({})", admin.email, admin.id);
        }
    }
    Ok(())
}

async fn handle_session_command(
    cfg: &config::Config,
    cmd: cli::SessionCommands,
) -> anyhow::Result<()> {
    match cmd {
        cli::SessionCommands::Revoke { token } => {
            let sessions = RedisSessionRegistry::connect(&cfg.redis_url).await?;
            if sessions.revoke(&token).await? {
                println!("Session revoked");
            } else {
                println!("No live session for that token");
            }
        }
    }
    Ok(())
}
