/// Configuration management for the auth service
use crate::error::{AuthError, AuthResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Interface to bind, `SERVER_HOST`
    pub hostname: String,
    /// TCP port, `SERVER_PORT`
    pub port: u16,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database file; created on first start
    pub database_path: PathBuf,
    /// Upper bound of the sqlx pool
    pub max_connections: u32,
}

/// Token and credential configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Shared HS256 secret, valid for the whole process lifetime
    pub secret_key: String,
    /// Access token lifetime in seconds
    pub access_token_ttl_secs: i64,
    /// Refresh token lifetime in seconds
    pub refresh_token_ttl_secs: i64,
    /// Let `/restore_token` accept an access token that has only expired
    pub rotation_accepts_expired_access: bool,
    /// How long past its expiry an access token is still accepted for rotation
    pub rotation_grace_secs: i64,
    /// Fixed one-time code for development setups; code login is disabled when unset
    pub static_auth_code: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directives
    pub level: String,
    /// Emit JSON lines instead of human readable output
    pub json: bool,
}

pub const DEFAULT_ACCESS_TOKEN_TTL_SECS: i64 = 60 * 60;
pub const DEFAULT_REFRESH_TOKEN_TTL_SECS: i64 = 30 * 24 * 60 * 60;
pub const DEFAULT_LOG_FILTER: &str = "auth_service=debug,tower_http=debug";
/// Longest accepted token lifetime or rotation grace, ten years
pub const MAX_TOKEN_LIFETIME_SECS: i64 = 10 * 365 * 24 * 60 * 60;

/// Read an integer variable, falling back to `default` when it is unset
fn env_number<T: std::str::FromStr>(key: &str, default: T) -> AuthResult<T> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| AuthError::Config(format!("Invalid {}", key))),
        Err(_) => Ok(default),
    }
}

/// Read a boolean variable. Accepts `true`/`false` and `1`/`0` in any case.
fn env_bool(key: &str, default: bool) -> AuthResult<bool> {
    let Ok(value) = env::var(key) else {
        return Ok(default);
    };

    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(AuthError::Config(format!("Invalid {}", key))),
    }
}

impl ServerConfig {
    /// Load the env file `name` from directory `path`, then read the environment.
    ///
    /// A missing file is not an error; the environment alone may be enough.
    pub fn load(path: &Path, name: &str) -> AuthResult<Self> {
        let file = path.join(name);
        if file.exists() {
            dotenv::from_path(&file).map_err(|e| {
                AuthError::Config(format!("Failed to read {}: {}", file.display(), e))
            })?;
        }

        Self::from_env()
    }

    /// Load configuration from environment variables
    pub fn from_env() -> AuthResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| AuthError::Config("Invalid port number".to_string()))?;

        let database_path: PathBuf = env::var("DATABASE_PATH")
            .unwrap_or_else(|_| "./data/auth.sqlite".to_string())
            .into();
        let max_connections = env_number("DATABASE_MAX_CONNECTIONS", 10)?;

        let secret_key = env::var("SECRET_KEY")
            .map_err(|_| AuthError::Config("SECRET_KEY required".to_string()))?;
        let access_token_ttl_secs =
            env_number("ACCESS_TOKEN_TTL_SECS", DEFAULT_ACCESS_TOKEN_TTL_SECS)?;
        let refresh_token_ttl_secs =
            env_number("REFRESH_TOKEN_TTL_SECS", DEFAULT_REFRESH_TOKEN_TTL_SECS)?;
        let rotation_accepts_expired_access = env_bool("ROTATION_ACCEPTS_EXPIRED_ACCESS", true)?;
        // one access lifetime unless configured
        let rotation_grace_secs = env_number("ROTATION_GRACE_SECS", access_token_ttl_secs)?;
        let static_auth_code = env::var("STATIC_AUTH_CODE")
            .ok()
            .filter(|code| !code.trim().is_empty());

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());
        let log_json = env::var("LOG_FORMAT")
            .map(|format| format.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Ok(ServerConfig {
            service: ServiceConfig { hostname, port },
            storage: StorageConfig {
                database_path,
                max_connections,
            },
            authentication: AuthConfig {
                secret_key,
                access_token_ttl_secs,
                refresh_token_ttl_secs,
                rotation_accepts_expired_access,
                rotation_grace_secs,
                static_auth_code,
            },
            logging: LoggingConfig {
                level: log_level,
                json: log_json,
            },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> AuthResult<()> {
        if self.service.hostname.is_empty() {
            return Err(AuthError::Config("Hostname cannot be empty".to_string()));
        }

        let auth = &self.authentication;
        if auth.secret_key.is_empty() {
            return Err(AuthError::Config("SECRET_KEY cannot be empty".to_string()));
        }
        if auth.secret_key.len() < 32 {
            tracing::warn!("SECRET_KEY is shorter than 32 characters");
        }

        if auth.access_token_ttl_secs <= 0 || auth.refresh_token_ttl_secs <= 0 {
            return Err(AuthError::Config("Token lifetimes must be positive".to_string()));
        }
        if auth.access_token_ttl_secs > MAX_TOKEN_LIFETIME_SECS
            || auth.refresh_token_ttl_secs > MAX_TOKEN_LIFETIME_SECS
        {
            return Err(AuthError::Config(format!(
                "Token lifetimes cannot exceed {} seconds",
                MAX_TOKEN_LIFETIME_SECS
            )));
        }
        if auth.access_token_ttl_secs >= auth.refresh_token_ttl_secs {
            return Err(AuthError::Config(
                "Access token lifetime must be shorter than refresh token lifetime".to_string(),
            ));
        }

        if auth.rotation_grace_secs < 0 || auth.rotation_grace_secs > MAX_TOKEN_LIFETIME_SECS {
            return Err(AuthError::Config(
                "ROTATION_GRACE_SECS must be between 0 and the maximum token lifetime".to_string(),
            ));
        }

        if self.storage.max_connections == 0 {
            return Err(AuthError::Config("DATABASE_MAX_CONNECTIONS must be at least 1".to_string()));
        }

        Ok(())
    }
}
