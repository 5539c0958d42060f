//! Configuration management following 12-factor app principles
//!
//! Runtime settings are loaded from environment variables (and an optional
//! `.env` file). Transform-service settings live next to the service in
//! `retouch-gateway`.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Output format for the tracing subscriber
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(anyhow::anyhow!(
                "Unknown LOG_FORMAT: {}. Supported formats: pretty, json",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Tracing filter directive
    pub rust_log: String,

    /// Subscriber output format
    pub log_format: LogFormat,

    /// Directory exported artifacts are written to
    pub export_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rust_log: "retouch=info".to_string(),
            log_format: LogFormat::Pretty,
            export_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        let defaults = Self::default();

        let log_format = match env::var("LOG_FORMAT") {
            Ok(value) => value.parse()?,
            Err(_) => defaults.log_format,
        };

        Ok(Self {
            rust_log: env::var("RUST_LOG").unwrap_or(defaults.rust_log),
            log_format,
            export_dir: env::var("EXPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.export_dir),
        })
    }
}
