use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use parley_api::pagination::PaginationSettings;
use parley_api::tokens::TokenSettings;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub tokens: TokenSettings,
    pub pagination: PaginationSettings,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let jwt_secret = std::env::var("PARLEY_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("PARLEY_JWT_SECRET is unset or still a placeholder");
        }

        let host = std::env::var("PARLEY_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = env_or("PARLEY_PORT", 8000)?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", host, port))?;

        let db_path = db_path_from_env();

        let mut tokens = TokenSettings::new(jwt_secret);
        tokens.access_ttl = Duration::from_secs(env_or("PARLEY_ACCESS_TOKEN_TTL_SECS", 300)?);
        tokens.refresh_ttl = Duration::from_secs(env_or("PARLEY_REFRESH_TOKEN_TTL_SECS", 86_400)?);

        let pagination = PaginationSettings {
            default_limit: env_or("PARLEY_PAGE_SIZE", 10)?,
            max_limit: env_or("PARLEY_MAX_PAGE_SIZE", 100)?,
        };
        if pagination.default_limit == 0 || pagination.max_limit < pagination.default_limit {
            bail!("PARLEY_PAGE_SIZE must be positive and no larger than PARLEY_MAX_PAGE_SIZE");
        }

        Ok(Self {
            addr,
            db_path,
            tokens,
            pagination,
        })
    }
}

/// The database location alone; admin commands that never touch tokens
/// need nothing else.
pub fn db_path_from_env() -> PathBuf {
    std::env::var("PARLEY_DB_PATH")
        .unwrap_or_else(|_| "parley.db".into())
        .into()
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw.parse().with_context(|| format!("invalid {}: {:?}", key, raw)),
        Err(_) => Ok(default),
    }
}
