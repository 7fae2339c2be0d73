//! Process configuration.
//!
//! Loaded once at startup from a TOML file, with `OCSP_`-prefixed
//! environment variables overriding individual scalar fields (mirroring the
//! layered config-file-plus-env pattern used across the surrounding
//! ecosystem). The result is frozen into `Arc<AppConfig>` and never mutated
//! again; nothing past startup holds a `&mut AppConfig`.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct IssuerConfig {
    pub cert_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    pub dsn: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub url: String,
    #[serde(default = "default_cache_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_cache_timeout_ms() -> u64 {
    200
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    #[serde(default = "default_path_prefix")]
    pub path_prefix: String,
    #[serde(default = "default_max_age_seconds")]
    pub max_age_seconds: u32,
    #[serde(default)]
    pub request_timeout_ms: u64,
    #[serde(default = "default_shutdown_stop_timeout_ms")]
    pub shutdown_stop_timeout_ms: u64,
    pub issuers: Vec<IssuerConfig>,
    #[serde(default)]
    pub serial_prefixes: Vec<String>,
    pub db: Option<DbConfig>,
    pub cache: Option<CacheConfig>,
    pub static_file: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    pub metrics_listen_addr: Option<SocketAddr>,
}

fn default_path_prefix() -> String {
    "/".to_string()
}

fn default_max_age_seconds() -> u32 {
    3_600
}

fn default_shutdown_stop_timeout_ms() -> u64 {
    10_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load from a TOML file, then apply any `OCSP_*` environment overrides,
    /// then validate. Fatal on any of: unreadable/unparsable file, no
    /// configured issuers, an issuer cert that can't be read, or both `db`
    /// and `static_file` left unset.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let mut config: AppConfig =
            toml::from_str(&raw).with_context(|| format!("parsing config file {}", path.display()))?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(addr) = std::env::var("OCSP_LISTEN_ADDR") {
            if let Ok(parsed) = addr.parse() {
                self.listen_addr = parsed;
            }
        }
        if let Ok(level) = std::env::var("OCSP_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Ok(timeout) = std::env::var("OCSP_REQUEST_TIMEOUT_MS") {
            if let Ok(parsed) = timeout.parse() {
                self.request_timeout_ms = parsed;
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.issuers.is_empty() && self.static_file.is_none() {
            anyhow::bail!("config must list at least one issuer certificate, or set static_file");
        }
        for issuer in &self.issuers {
            if !issuer.cert_path.is_file() {
                anyhow::bail!(
                    "issuer certificate not readable: {}",
                    issuer.cert_path.display()
                );
            }
        }
        if self.db.is_none() && self.static_file.is_none() {
            anyhow::bail!("config must set either [db] or static_file");
        }
        Ok(())
    }
}
