use serde::Deserialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    #[serde(default = "default_token_lifetime")]
    pub token_lifetime_minutes: u64,
    /// HMAC key used to sign and verify JWTs.
    ///
    /// Prefer loading this via the `JWT_SECRET_KEY` environment variable.
    /// Read once at startup; changing it invalidates every issued token.
    ///
    /// **Minimum length:** 32 characters.
    pub jwt_secret: Option<String>,
    /// First path segments that bypass the bearer check.
    #[serde(default = "default_public_paths")]
    pub public_paths: Vec<String>,
    /// Interval between sweeps of expired revocation records; 0 disables.
    #[serde(default = "default_revocation_sweep")]
    pub revocation_sweep_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Environment variable that overrides `auth.jwt_secret`.
pub const JWT_SECRET_ENV: &str = "JWT_SECRET_KEY";

/// Upper bound on `auth.token_lifetime_minutes`: one year.
pub const MAX_TOKEN_LIFETIME_MINUTES: u64 = 365 * 24 * 60;

impl ServerConfig {
    /// Full bind address, e.g. `"127.0.0.1:8080"`
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl AuthConfig {
    /// Token lifetime converted to seconds; `None` on overflow.
    pub fn token_lifetime_secs(&self) -> Option<u64> {
        self.token_lifetime_minutes.checked_mul(60)
    }

    /// Resolve the JWT secret with `JWT_SECRET_KEY` env-var taking priority
    /// over the config file field.
    ///
    /// Returns `None` when neither source is set (startup treats this as a
    /// hard error).
    pub fn resolved_jwt_secret(&self) -> Option<String> {
        self.jwt_secret_with_override(std::env::var(JWT_SECRET_ENV).ok())
    }

    /// Same resolution as [`resolved_jwt_secret`](Self::resolved_jwt_secret)
    /// with the environment value passed in.
    pub fn jwt_secret_with_override(&self, env_value: Option<String>) -> Option<String> {
        env_value
            .filter(|s| !s.is_empty())
            .or_else(|| self.jwt_secret.clone())
            .filter(|s| !s.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Serde defaults
// ---------------------------------------------------------------------------

pub fn default_bind() -> String {
    "127.0.0.1".to_string()
}

pub fn default_port() -> u16 {
    8080
}

pub fn default_request_timeout() -> u64 {
    30
}

pub fn default_max_connections() -> u32 {
    5
}

pub fn default_token_lifetime() -> u64 {
    5
}

pub fn default_public_paths() -> Vec<String> {
    vec!["auth".to_string(), "health".to_string()]
}

pub fn default_revocation_sweep() -> u64 {
    300
}

pub fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [database]
        url = "sqlite::memory:"

        [auth]
        jwt_secret = "0123456789abcdef0123456789abcdef"
    "#;

    #[test]
    fn minimal_config_fills_defaults() {
        let cfg: AppConfig = toml::from_str(MINIMAL).unwrap();
        assert_eq!(cfg.server.addr(), "127.0.0.1:8080");
        assert_eq!(cfg.server.request_timeout_secs, 30);
        assert_eq!(cfg.database.max_connections, 5);
        assert_eq!(cfg.auth.token_lifetime_minutes, 5);
        assert_eq!(cfg.auth.token_lifetime_secs(), Some(300));
        assert_eq!(cfg.auth.public_paths, vec!["auth", "health"]);
        assert_eq!(cfg.auth.revocation_sweep_secs, 300);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn lifetime_overflow_is_none() {
        let mut cfg: AppConfig = toml::from_str(MINIMAL).unwrap();
        cfg.auth.token_lifetime_minutes = u64::MAX;
        assert_eq!(cfg.auth.token_lifetime_secs(), None);
    }

    #[test]
    fn env_value_overrides_file_secret() {
        let cfg: AppConfig = toml::from_str(MINIMAL).unwrap();
        assert_eq!(
            cfg.auth.jwt_secret_with_override(Some("from-env".into())).as_deref(),
            Some("from-env")
        );
        assert_eq!(
            cfg.auth.jwt_secret_with_override(Some(String::new())).as_deref(),
            Some("0123456789abcdef0123456789abcdef")
        );
        assert_eq!(
            cfg.auth.jwt_secret_with_override(None).as_deref(),
            Some("0123456789abcdef0123456789abcdef")
        );
    }

    #[test]
    fn no_secret_anywhere_is_none() {
        let mut cfg: AppConfig = toml::from_str(MINIMAL).unwrap();
        cfg.auth.jwt_secret = None;
        assert_eq!(cfg.auth.jwt_secret_with_override(None), None);
    }

    #[test]
    fn missing_auth_section_is_a_parse_error() {
        let err = toml::from_str::<AppConfig>("[database]\nurl = \"x\"").unwrap_err();
        assert!(err.to_string().contains("auth"));
    }
}
