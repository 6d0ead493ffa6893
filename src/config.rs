//! Runtime configuration read from the environment (`.env` is loaded by the binaries).

use crate::error::{Result, VidsqlError};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    /// `DATABASE_URL`; wins over the individual parts when set.
    pub url_override: Option<String>,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn url(&self) -> String {
        match &self.url_override {
            Some(url) => url.clone(),
            None => format!(
                "postgresql://{}:{}@{}:{}/{}",
                self.user, self.password, self.host, self.port, self.database
            ),
        }
    }

    /// Connection target without credentials, for logs.
    pub fn display_target(&self) -> String {
        let url = self.url();
        match url.rsplit_once('@') {
            Some((_, target)) => target.to_string(),
            None => url,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LlmConfig {
    /// Unset means no primary generator.
    pub base_url: Option<String>,
    pub model: String,
    pub timeout: Duration,
    pub max_concurrency: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub query_timeout: Duration,
    pub llm: LlmConfig,
    pub auto_load_data: bool,
    pub data_file: PathBuf,
    pub storage_wait_retries: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let database = DatabaseConfig {
            host: text("DB_HOST", "localhost"),
            port: parse_var(&lookup, "DB_PORT", 5432)?,
            user: text("POSTGRES_USER", "postgres"),
            password: lookup("POSTGRES_PASSWORD").unwrap_or_default(),
            database: text("POSTGRES_DB", "tg_bot"),
            url_override: lookup("DATABASE_URL").filter(|v| !v.trim().is_empty()),
            max_connections: parse_var(&lookup, "DB_MAX_CONNECTIONS", 10)?,
        };

        let llm = LlmConfig {
            base_url: lookup("LLM_BASE_URL").filter(|v| !v.trim().is_empty()),
            model: text("LLM_MODEL", "sqlcoder"),
            timeout: Duration::from_secs(parse_var(&lookup, "LLM_TIMEOUT_SECS", 60)?),
            max_concurrency: parse_var(&lookup, "LLM_MAX_CONCURRENCY", 1)?,
        };

        Ok(Self {
            database,
            query_timeout: Duration::from_secs(parse_var(&lookup, "QUERY_TIMEOUT_SECS", 30)?),
            llm,
            auto_load_data: parse_flag(&lookup, "AUTO_LOAD_DATA", true)?,
            data_file: PathBuf::from(text("DATA_FILE", "videos.json")),
            storage_wait_retries: parse_var(&lookup, "STORAGE_WAIT_RETRIES", 30)?,
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| VidsqlError::Config(format!("{}={:?}: {}", key, raw, e))),
        _ => Ok(default),
    }
}

fn parse_flag<F>(lookup: &F, key: &str, default: bool) -> Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|v| v.trim().to_lowercase()) {
        None => Ok(default),
        Some(v) if v.is_empty() => Ok(default),
        Some(v) => match v.as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(VidsqlError::Config(format!("{}={:?}: expected a boolean", key, v))),
        },
    }
}
