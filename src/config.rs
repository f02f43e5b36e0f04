//! Global configuration parsing, validation, and credential loading.

use std::env;
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use serde::Deserialize;
use sqlx::postgres::PgSslMode;
use tracing::warn;

use crate::{AppError, Result};

/// Nested `PostgreSQL` connection settings.
///
/// The password is loaded at runtime via OS keychain or environment
/// variables, not from the TOML config file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Server hostname or address.
    pub host: String,
    /// Server port.
    #[serde(default = "default_db_port")]
    pub port: u16,
    /// Role name used to authenticate.
    pub user: String,
    /// Database name.
    pub database: String,
    /// TLS mode: `disable`, `allow`, `prefer`, `require`, `verify-ca`,
    /// or `verify-full`.
    #[serde(default = "default_ssl_mode")]
    pub ssl_mode: String,
    /// Minimum number of pooled connections kept open.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Maximum number of pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Seconds to wait for a free connection before erroring.
    #[serde(default = "default_acquire_timeout_seconds")]
    pub acquire_timeout_seconds: u64,
    /// Role password (populated at runtime).
    #[serde(skip)]
    pub password: String,
}

impl DatabaseConfig {
    /// Interpret the configured `ssl_mode` string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the value is not a recognized mode.
    pub fn ssl_mode(&self) -> Result<PgSslMode> {
        match self.ssl_mode.as_str() {
            "disable" => Ok(PgSslMode::Disable),
            "allow" => Ok(PgSslMode::Allow),
            "prefer" => Ok(PgSslMode::Prefer),
            "require" => Ok(PgSslMode::Require),
            "verify-ca" => Ok(PgSslMode::VerifyCa),
            "verify-full" => Ok(PgSslMode::VerifyFull),
            other => Err(AppError::Config(format!(
                "unrecognized ssl_mode \"{other}\""
            ))),
        }
    }
}

/// Nested settings for the external asset-hosting service.
///
/// The API key is loaded at runtime via OS keychain or environment
/// variables; when absent, uploads degrade to "no URL" instead of failing.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct UploadConfig {
    /// Upload endpoint URL.
    #[serde(default = "default_upload_endpoint")]
    pub endpoint: String,
    /// Hosting-service API key (populated at runtime, may stay empty).
    #[serde(skip)]
    pub api_key: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint: default_upload_endpoint(),
            api_key: String::new(),
        }
    }
}

fn default_db_port() -> u16 {
    5432
}

fn default_ssl_mode() -> String {
    "require".into()
}

fn default_min_connections() -> u32 {
    1
}

fn default_max_connections() -> u32 {
    20
}

fn default_acquire_timeout_seconds() -> u64 {
    30
}

fn default_upload_endpoint() -> String {
    "https://api.imgbb.com/1/upload".into()
}

fn default_http_host() -> String {
    "127.0.0.1".into()
}

fn default_http_port() -> u16 {
    8080
}

/// Global configuration parsed from `recordkeeper.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Address the HTTP listener binds to.
    #[serde(default = "default_http_host")]
    pub http_host: String,
    /// Port the HTTP listener binds to.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// `PostgreSQL` connection settings.
    pub database: DatabaseConfig,
    /// Asset-hosting service settings.
    #[serde(default)]
    pub upload: UploadConfig,
    /// Shared password gating all record operations (populated at runtime).
    #[serde(skip)]
    pub web_password: String,
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string and validate it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load secrets from OS keychain with env-var fallback.
    ///
    /// Tries the `recordkeeper` keyring service first, then falls back to
    /// `DB_PASSWORD` / `WEB_PASSWORD` / `IMGBB_API_KEY` environment
    /// variables. The upload API key is optional; the other two are not.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if neither keychain nor env vars provide
    /// the database password or the shared web password.
    pub async fn load_credentials(&mut self) -> Result<()> {
        self.database.password = load_credential("db_password", "DB_PASSWORD").await?;
        self.web_password = load_credential("web_password", "WEB_PASSWORD").await?;
        self.upload.api_key = load_credential_opt("imgbb_api_key", "IMGBB_API_KEY")
            .await?
            .unwrap_or_default();
        Ok(())
    }

    /// Socket address for the HTTP listener.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `http_host` is not a valid IP address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .http_host
            .parse()
            .map_err(|err| AppError::Config(format!("http_host invalid: {err}")))?;
        Ok(SocketAddr::new(ip, self.http_port))
    }

    fn validate(&self) -> Result<()> {
        if self.database.host.trim().is_empty() {
            return Err(AppError::Config("database.host must not be empty".into()));
        }
        if self.database.user.trim().is_empty() {
            return Err(AppError::Config("database.user must not be empty".into()));
        }
        if self.database.database.trim().is_empty() {
            return Err(AppError::Config(
                "database.database must not be empty".into(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(AppError::Config(
                "database.max_connections must be greater than zero".into(),
            ));
        }
        if self.database.min_connections > self.database.max_connections {
            return Err(AppError::Config(
                "database.min_connections must not exceed max_connections".into(),
            ));
        }
        self.database.ssl_mode()?;
        self.bind_addr()?;
        Ok(())
    }
}

/// Load a single required credential from OS keychain with env-var fallback.
async fn load_credential(keyring_key: &str, env_key: &str) -> Result<String> {
    load_credential_opt(keyring_key, env_key)
        .await?
        .ok_or_else(|| {
            AppError::Config(format!(
                "credential {keyring_key} not found in keychain or {env_key} env var"
            ))
        })
}

/// Load a credential if present in the OS keychain or environment.
async fn load_credential_opt(keyring_key: &str, env_key: &str) -> Result<Option<String>> {
    let key = keyring_key.to_owned();

    // Try OS keychain first via spawn_blocking (keyring is synchronous I/O).
    let keychain_result = tokio::task::spawn_blocking(move || {
        keyring::Entry::new("recordkeeper", &key).and_then(|entry| entry.get_password())
    })
    .await
    .map_err(|err| AppError::Config(format!("keychain task panicked: {err}")))?;

    match keychain_result {
        Ok(value) if !value.is_empty() => return Ok(Some(value)),
        Ok(_) => {
            warn!(key = keyring_key, "keychain entry is empty, trying env var");
        }
        Err(err) => {
            warn!(
                key = keyring_key,
                ?err,
                "keychain lookup failed, trying env var"
            );
        }
    }

    // Fallback to environment variable.
    Ok(env::var(env_key).ok().filter(|value| !value.is_empty()))
}
