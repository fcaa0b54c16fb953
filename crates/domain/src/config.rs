//! Relay configuration types
//!
//! The configuration is resolved once at startup by the loader in
//! `porelay-infra` and passed by value into the core; nothing here is
//! globally mutable. The surface mirrors the operator-facing config file:
//!
//! ```toml
//! environment = "uat"
//!
//! [api.uat]
//! url = "https://uat.partner.example/ws/SendData"
//!
//! [api.production]
//! url = "https://partner.example/ws/SendData"
//!
//! [token]
//! issuer = "acme-integrations"
//! customer_id = "ACME-0042"
//! private_key_path = "keys/partner_signing.pem"
//!
//! [paths]
//! input = "data/input"
//! output = "data/output"
//! archive_success = "data/archive/success"
//! archive_error = "data/archive/error"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_MAX_ATTEMPTS, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_RETENTION_DAYS,
    DEFAULT_RETRY_BACKOFF_SECS, DEFAULT_TOKEN_EXPIRY_MINUTES,
};

/// Deployment environment the relay submits to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Uat,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Uat => "uat",
            Environment::Production => "production",
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One remote endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    pub url: String,
}

/// Endpoint per environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEndpoints {
    pub uat: Endpoint,
    pub production: Endpoint,
}

/// Token issuance settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Issuer identity placed in the `iss` claim.
    pub issuer: String,
    /// Customer identifier placed in the `sub` claim.
    pub customer_id: String,
    /// RSA private key PEM used for RS256 signing.
    pub private_key_path: PathBuf,
    #[serde(default = "default_expiry_minutes")]
    pub expiry_minutes: u32,
}

fn default_expiry_minutes() -> u32 {
    DEFAULT_TOKEN_EXPIRY_MINUTES
}

/// The four directories the relay works against. Each must exist and be
/// writable; the core treats them as opaque paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryLayout {
    pub input: PathBuf,
    pub output: PathBuf,
    pub archive_success: PathBuf,
    pub archive_error: PathBuf,
}

/// Submission timeout and retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpSettings {
    #[serde(default = "default_timeout_secs")]
    pub timeout_seconds: u64,
    /// Total attempts (initial try + retries).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base delay before the first retry; doubles per subsequent retry.
    #[serde(default = "default_backoff_secs")]
    pub retry_backoff_seconds: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_backoff_secs() -> u64 {
    DEFAULT_RETRY_BACKOFF_SECS
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            retry_backoff_seconds: default_backoff_secs(),
        }
    }
}

/// Archive cleanup policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionSettings {
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_retention_days() -> u32 {
    DEFAULT_RETENTION_DAYS
}

impl Default for RetentionSettings {
    fn default() -> Self {
        Self { retention_days: default_retention_days() }
    }
}

/// Log level per environment (UAT is typically chattier than production).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogLevels {
    #[serde(default = "default_uat_level")]
    pub uat: String,
    #[serde(default = "default_production_level")]
    pub production: String,
}

fn default_uat_level() -> String {
    "debug".to_string()
}

fn default_production_level() -> String {
    "info".to_string()
}

impl Default for LogLevels {
    fn default() -> Self {
        Self { uat: default_uat_level(), production: default_production_level() }
    }
}

/// Immutable relay configuration, resolved once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    pub environment: Environment,
    pub api: ApiEndpoints,
    pub token: TokenConfig,
    pub paths: DirectoryLayout,
    #[serde(default)]
    pub http: HttpSettings,
    #[serde(default)]
    pub archive: RetentionSettings,
    #[serde(default)]
    pub logging: LogLevels,
}

impl RelayConfig {
    /// Endpoint URL for the selected environment.
    pub fn endpoint_url(&self) -> &str {
        match self.environment {
            Environment::Uat => &self.api.uat.url,
            Environment::Production => &self.api.production.url,
        }
    }

    /// Log level for the selected environment.
    pub fn log_level(&self) -> &str {
        match self.environment {
            Environment::Uat => &self.logging.uat,
            Environment::Production => &self.logging.production,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_seconds)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.http.retry_backoff_seconds)
    }
}
