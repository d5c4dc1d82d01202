use std::fmt;
use std::net::{AddrParseError, SocketAddr};
use std::num::ParseIntError;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use interfaces_github_oauth::{ClientSecret, OAuthAppConfig};
use interfaces_github_user::{GitHubApiConfig, RetryPolicy};
use thiserror::Error;
use url::Url;
use zeroize::{Zeroize, ZeroizeOnDrop};
use utils_trace::TraceConfig;

const DEFAULT_OAUTH_BASE_URL: &str = "https://github.com";
const DEFAULT_API_BASE_URL: &str = "https://api.github.com";
const DEFAULT_SCOPE: &str = "read:user repo";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_CALLBACK_PATH: &str = "/github/callback";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("MissingVar: {name} is not set")]
    MissingVar { name: &'static str },

    #[error("InvalidNumber: {name}={value}: {source}")]
    InvalidNumber {
        name: &'static str,
        value: String,
        source: ParseIntError,
    },

    #[error("NotPositive: {name} must be greater than zero")]
    NotPositive { name: &'static str },

    #[error("InvalidUrl: {name}: {source}")]
    InvalidUrl {
        name: &'static str,
        source: url::ParseError,
    },

    #[error("NotABaseUrl: {name} must be an absolute http(s) URL")]
    NotABaseUrl { name: &'static str },

    #[error("InvalidAddr: {name}={value}: {source}")]
    InvalidAddr {
        name: &'static str,
        value: String,
        source: AddrParseError,
    },

    #[error("InvalidCallbackPath: {value} must be an absolute path other than / and /health")]
    InvalidCallbackPath { value: String },

    #[error("DatabaseUrl: cannot build a connection URL from DATABASE_* parts")]
    DatabaseUrl,
}

/// Postgres connection string. May embed a password, so `Debug` hides it.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DatabaseUrl(String);

impl DatabaseUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for DatabaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DatabaseUrl(<redacted>)")
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: DatabaseUrl,
    pub pool_size: u32,
    pub connection_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub callback_path: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub oauth: OAuthAppConfig,
    pub github_api: GitHubApiConfig,
    pub database: DatabaseConfig,
    pub http: HttpClientConfig,
    pub server: ServerConfig,
    pub trace: TraceConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let oauth = OAuthAppConfig {
            client_id: env.required("CLIENT_ID")?,
            client_secret: ClientSecret::new(env.required("CLIENT_SECRET")?),
            redirect_uri: env.required("REDIRECT_URI")?,
            scope: Some(
                env.optional("GITHUB_OAUTH_SCOPE")
                    .unwrap_or_else(|| DEFAULT_SCOPE.to_string()),
            ),
            base_url: env.base_url("GITHUB_OAUTH_BASE_URL", DEFAULT_OAUTH_BASE_URL)?,
        };

        let github_api = GitHubApiConfig {
            base_url: env.base_url("GITHUB_API_BASE_URL", DEFAULT_API_BASE_URL)?,
            max_pages: env.positive("GITHUB_MAX_PAGES", 50)?,
            retry: RetryPolicy {
                max_retries: env.number("GITHUB_MAX_RETRIES", 3)?,
                ..RetryPolicy::default()
            },
        };

        let database = DatabaseConfig {
            url: database_url(&env)?,
            pool_size: env.positive("DATABASE_POOL_SIZE", 5)?,
            connection_timeout: Duration::from_secs(
                env.positive("DATABASE_CONNECT_TIMEOUT_SECS", 5)?,
            ),
        };

        let http = HttpClientConfig {
            timeout: Duration::from_secs(env.positive("HTTP_TIMEOUT_SECS", 10)?),
            connect_timeout: Duration::from_secs(env.positive("HTTP_CONNECT_TIMEOUT_SECS", 5)?),
        };

        let bind_addr = env
            .optional("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let callback_path = env
            .optional("CALLBACK_PATH")
            .unwrap_or_else(|| DEFAULT_CALLBACK_PATH.to_string());
        if !callback_path.starts_with('/') || matches!(callback_path.as_str(), "/" | "/health") {
            return Err(ConfigError::InvalidCallbackPath {
                value: callback_path,
            });
        }
        let server = ServerConfig {
            bind_addr: bind_addr
                .parse()
                .map_err(|source| ConfigError::InvalidAddr {
                    name: "BIND_ADDR",
                    value: bind_addr.clone(),
                    source,
                })?,
            callback_path,
        };

        let trace = TraceConfig {
            level: env
                .optional("LOG_LEVEL")
                .unwrap_or_else(|| TraceConfig::default().level),
            log_file: env.optional("LOG_FILE").map(PathBuf::from),
        };

        Ok(Self {
            oauth,
            github_api,
            database,
            http,
            server,
            trace,
        })
    }
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, name: &'static str) -> Option<String> {
        (self.0)(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, name: &'static str) -> Result<String, ConfigError> {
        self.optional(name).ok_or(ConfigError::MissingVar { name })
    }

    fn number<T>(&self, name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr<Err = ParseIntError>,
    {
        match self.optional(name) {
            Some(value) => value
                .parse()
                .map_err(|source| ConfigError::InvalidNumber {
                    name,
                    value,
                    source,
                }),
            None => Ok(default),
        }
    }

    fn positive<T>(&self, name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr<Err = ParseIntError> + Default + PartialEq,
    {
        let value = self.number(name, default)?;
        if value == T::default() {
            return Err(ConfigError::NotPositive { name });
        }
        Ok(value)
    }

    fn base_url(&self, name: &'static str, default: &str) -> Result<Url, ConfigError> {
        let raw = self.optional(name).unwrap_or_else(|| default.to_string());
        let url = Url::parse(&raw).map_err(|source| ConfigError::InvalidUrl { name, source })?;
        if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::NotABaseUrl { name });
        }
        Ok(url)
    }
}

/// `DATABASE_URL` wins; otherwise the URL is assembled from the discrete
/// `DATABASE_*` variables with proper escaping of the credentials.
fn database_url<F>(env: &Env<F>) -> Result<DatabaseUrl, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = env.optional("DATABASE_URL") {
        return Ok(DatabaseUrl::new(url));
    }

    let host = env.required("DATABASE_HOST")?;
    let port: u16 = env.positive("DATABASE_PORT", 5432)?;
    let name = env.required("DATABASE_NAME")?;
    let username = env.required("DATABASE_USERNAME")?;
    let password = env.optional("DATABASE_PASSWORD");

    let mut url = Url::parse(&format!("postgres://{host}")).map_err(|source| {
        ConfigError::InvalidUrl {
            name: "DATABASE_HOST",
            source,
        }
    })?;
    url.set_port(Some(port))
        .map_err(|()| ConfigError::DatabaseUrl)?;
    url.set_username(&username)
        .map_err(|()| ConfigError::DatabaseUrl)?;
    url.set_password(password.as_deref())
        .map_err(|()| ConfigError::DatabaseUrl)?;
    url.set_path(&name);

    Ok(DatabaseUrl::new(url))
}
