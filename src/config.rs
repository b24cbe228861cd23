const PLACEHOLDER_SECRET: &str = "CHANGE_ME_JWT_SECRET";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub redis_url: String,
    /// Allowed CORS origin for the web frontend.
    pub frontend_origin: String,
    pub jwt: JwtConfig,
    pub session: SessionConfig,
    pub google: GoogleConfig,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    /// Lifetime written into the `exp` claim.
    pub expiration_minutes: i64,
    /// Clock-skew tolerance applied to the expiry check.
    pub leeway_secs: u64,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// TTL of a session registry entry. Independent of the token's `exp`.
    pub ttl_secs: u64,
    /// When set, a token is only accepted while its registry entry is live,
    /// which makes logout effective before `exp`.
    pub require_live_session: bool,
}

impl SessionConfig {
    /// With the strict policy, a registry TTL shorter than the token lifetime
    /// cuts sessions off before `exp`.
    pub fn ttl_shorter_than(&self, jwt: &JwtConfig) -> bool {
        self.require_live_session && (self.ttl_secs as i64) < jwt.expiration_minutes * 60
    }
}

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub timeout_secs: u64,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_url: String::new(),
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".into(),
            token_url: "https://oauth2.googleapis.com/token".into(),
            userinfo_url: "https://www.googleapis.com/oauth2/v1/userinfo".into(),
            timeout_secs: 30,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();

    let secret = env_or("SNAPBOOK_JWT_SECRET", PLACEHOLDER_SECRET);

    if secret == PLACEHOLDER_SECRET || secret.is_empty() {
        let env_mode = std::env::var("SNAPBOOK_ENV")
            .or_else(|_| std::env::var("RUST_ENV"))
            .unwrap_or_default();
        if env_mode == "production" {
            anyhow::bail!(
                "SNAPBOOK_JWT_SECRET is not set. \
                 Set a long random secret before running in production."
            );
        }
        tracing::warn!("SNAPBOOK_JWT_SECRET is not set, using insecure placeholder");
    }

    let defaults = GoogleConfig::default();

    Ok(Config {
        port: env_parse("SNAPBOOK_PORT", 8080),
        database_url: env_or("DATABASE_URL", "postgres://localhost/snapbook"),
        redis_url: env_or("REDIS_URL", "redis://127.0.0.1:6379"),
        frontend_origin: env_or("SNAPBOOK_FRONTEND_ORIGIN", "http://localhost:3000"),
        jwt: JwtConfig {
            secret,
            issuer: env_or("SNAPBOOK_JWT_ISSUER", "snapbook"),
            expiration_minutes: env_parse("SNAPBOOK_JWT_EXPIRATION_MINUTES", 60),
            leeway_secs: env_parse("SNAPBOOK_JWT_LEEWAY_SECS", 5),
        },
        session: SessionConfig {
            ttl_secs: env_parse("SNAPBOOK_SESSION_TTL_SECS", 3600),
            require_live_session: env_parse("SNAPBOOK_REQUIRE_LIVE_SESSION", true),
        },
        google: GoogleConfig {
            client_id: env_or("GOOGLE_CLIENT_ID", ""),
            client_secret: env_or("GOOGLE_CLIENT_SECRET", ""),
            redirect_url: env_or("GOOGLE_REDIRECT_URL", ""),
            auth_url: env_or("GOOGLE_AUTH_URL", &defaults.auth_url),
            token_url: env_or("GOOGLE_TOKEN_URL", &defaults.token_url),
            userinfo_url: env_or("GOOGLE_USERINFO_URL", &defaults.userinfo_url),
            timeout_secs: env_parse("GOOGLE_HTTP_TIMEOUT_SECS", defaults.timeout_secs),
        },
    })
}
