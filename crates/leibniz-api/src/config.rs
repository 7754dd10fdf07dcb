//! Server configuration read from the environment at startup.

use std::net::SocketAddr;
use std::path::PathBuf;

use leibniz_story::domain::graph::{AvailabilitySource, DanglingPolicy};

use crate::error::AppError;

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Interface to bind (`HOST`, default `0.0.0.0`).
    pub host: String,
    /// Port to bind (`PORT`, default `3000`).
    pub port: u16,
    /// Postgres connection string (`DATABASE_URL`). In-memory storage when
    /// unset.
    pub database_url: Option<String>,
    /// YAML story file replacing the built-in story (`STORY_CONTENT_PATH`).
    pub story_content_path: Option<PathBuf>,
    /// `STORY_DANGLING_POLICY`: `warn` (default) or `reject`.
    pub dangling_policy: DanglingPolicy,
    /// `STORY_AVAILABILITY_SOURCE`: `connections` (default) or
    /// `choice-targets`.
    pub availability_source: AvailabilitySource,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 3000,
            database_url: None,
            story_content_path: None,
            dangling_policy: DanglingPolicy::default(),
            availability_source: AvailabilitySource::default(),
        }
    }
}

impl Config {
    /// Reads configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable is present but invalid.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, which maps a variable name to
    /// its value.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable is present but invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match non_empty("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|e| AppError::Config(format!("PORT must be a valid u16: {e}")))?,
            None => defaults.port,
        };

        let dangling_policy = match non_empty("STORY_DANGLING_POLICY").as_deref() {
            None => defaults.dangling_policy,
            Some("warn") => DanglingPolicy::Warn,
            Some("reject") => DanglingPolicy::Reject,
            Some(other) => {
                return Err(AppError::Config(format!(
                    "STORY_DANGLING_POLICY must be warn or reject, got {other}"
                )));
            }
        };

        let availability_source = match non_empty("STORY_AVAILABILITY_SOURCE").as_deref() {
            None => defaults.availability_source,
            Some("connections") => AvailabilitySource::Connections,
            Some("choice-targets") => AvailabilitySource::ChoiceTargets,
            Some(other) => {
                return Err(AppError::Config(format!(
                    "STORY_AVAILABILITY_SOURCE must be connections or choice-targets, got {other}"
                )));
            }
        };

        Ok(Self {
            host: non_empty("HOST").unwrap_or(defaults.host),
            port,
            database_url: non_empty("DATABASE_URL"),
            story_content_path: non_empty("STORY_CONTENT_PATH").map(PathBuf::from),
            dangling_policy,
            availability_source,
        })
    }

    /// The socket address to listen on.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `host:port` is not a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))
    }
}
