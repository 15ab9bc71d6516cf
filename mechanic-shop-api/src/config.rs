/// Configuration management for the API server
///
/// Loads configuration from environment variables (and a `.env` file when
/// present) into a typed struct.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `API_PRODUCTION`: Enables HSTS (default: false)
/// - `CORS_ORIGINS`: Comma-separated allowed origins (default: `*`)
/// - `DATABASE_URL`: PostgreSQL connection string; when unset the server
///   runs on the in-memory store
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `JWT_SECRET`: Secret key for token signing (required, >= 32 chars)
/// - `JWT_TTL_SECONDS`: Token lifetime (default: 3600)
/// - `TICKET_LIST_CACHE_SECONDS`: TTL of the cached ticket list (default: 60)
/// - `RATE_LIMIT_CREATE_TICKET`, `RATE_LIMIT_UPDATE_TICKET`,
///   `RATE_LIMIT_DELETE_TICKET`, `RATE_LIMIT_ASSIGN_MECHANIC`,
///   `RATE_LIMIT_REMOVE_MECHANIC`: requests per hour;
///   `RATE_LIMIT_LOGIN`: requests per minute
/// - `RUST_LOG`: Log filter (default: `mechanic_shop_api=debug,tower_http=debug`)
///
/// # Example
///
/// ```no_run
/// use mechanic_shop_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use anyhow::Context;
use mechanic_shop_shared::auth::jwt::DEFAULT_TTL_SECONDS;
use mechanic_shop_shared::policy::{cache::DEFAULT_TTL, Quota, RouteQuotas};
use std::{env, str::FromStr, time::Duration};

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,

    /// `None` selects the in-memory store
    pub database: Option<DatabaseConfig>,

    pub jwt: JwtConfig,

    pub policy: PolicyConfig,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Production mode adds HSTS
    pub production: bool,

    /// Allowed CORS origins; `*` means permissive
    pub cors_origins: Vec<String>,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for token signing
    ///
    /// IMPORTANT: This must be kept secret and should be at least 32 bytes.
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,

    pub ttl_seconds: i64,
}

/// Rate limits and caching
#[derive(Debug, Clone)]
pub struct PolicyConfig {
    pub ticket_list_ttl: Duration,
    pub quotas: RouteQuotas,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            ticket_list_ttl: DEFAULT_TTL,
            quotas: RouteQuotas::default(),
        }
    }
}

fn parse_env<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{} has an invalid value: {}", key, raw)),
        Err(_) => Ok(default),
    }
}

fn quota_env(key: &str, default: Quota) -> anyhow::Result<Quota> {
    let limit = parse_env(key, default.limit)?;
    Ok(Quota::new(limit, default.window))
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if `JWT_SECRET` is missing or too short, or if any
    /// variable has an unparseable value.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = parse_env("API_PORT", 8080u16)?;
        let production = parse_env("API_PRODUCTION", false)?;
        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let database = match env::var("DATABASE_URL") {
            Ok(url) if !url.trim().is_empty() => Some(DatabaseConfig {
                url,
                max_connections: parse_env("DATABASE_MAX_CONNECTIONS", 10u32)?,
            }),
            _ => None,
        };

        let secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;
        if secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }
        let ttl_seconds = parse_env("JWT_TTL_SECONDS", DEFAULT_TTL_SECONDS)?;

        let defaults = RouteQuotas::default();
        let policy = PolicyConfig {
            ticket_list_ttl: Duration::from_secs(parse_env(
                "TICKET_LIST_CACHE_SECONDS",
                DEFAULT_TTL.as_secs(),
            )?),
            quotas: RouteQuotas {
                create_ticket: quota_env("RATE_LIMIT_CREATE_TICKET", defaults.create_ticket)?,
                update_ticket: quota_env("RATE_LIMIT_UPDATE_TICKET", defaults.update_ticket)?,
                delete_ticket: quota_env("RATE_LIMIT_DELETE_TICKET", defaults.delete_ticket)?,
                assign_mechanic: quota_env("RATE_LIMIT_ASSIGN_MECHANIC", defaults.assign_mechanic)?,
                remove_mechanic: quota_env("RATE_LIMIT_REMOVE_MECHANIC", defaults.remove_mechanic)?,
                login: quota_env("RATE_LIMIT_LOGIN", defaults.login)?,
            },
        };

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                production,
                cors_origins,
            },
            database,
            jwt: JwtConfig {
                secret,
                ttl_seconds,
            },
            policy,
        })
    }

    /// Local configuration on the in-memory store with default policies
    pub fn local(jwt_secret: impl Into<String>) -> Self {
        Self {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                production: false,
                cors_origins: vec!["*".to_string()],
            },
            database: None,
            jwt: JwtConfig {
                secret: jwt_secret.into(),
                ttl_seconds: DEFAULT_TTL_SECONDS,
            },
            policy: PolicyConfig::default(),
        }
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}
