// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration for mindservice-server.

use std::net::SocketAddr;
use std::path::PathBuf;

use mindservice_core::orchestrator::DEFAULT_MAX_CONCURRENT_RUNS;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 8000;
/// Default lifetime of issued tokens, in hours.
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 12;

/// Server configuration loaded from environment variables.
#[derive(Clone)]
pub struct Config {
    /// Client id accepted by token issuance
    pub client_id: String,
    /// Client secret accepted by token issuance
    pub client_secret: String,
    /// HS256 signing secret for access tokens
    pub jwt_secret: String,
    /// Root of run-scoped storage
    pub data_dir: PathBuf,
    /// HTTP listen address
    pub http_addr: SocketAddr,
    /// Lifetime of issued tokens, in hours
    pub token_ttl_hours: i64,
    /// Size of the background calculation pool
    pub max_concurrent_runs: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| lookup(name).ok_or(ConfigError::MissingEnvVar(name));

        let client_id = required("CLIENT_ID")?;
        let client_secret = required("CLIENT_SECRET")?;
        let jwt_secret = required("MINDSERVICE_JWT_SECRET")?;

        let data_dir = PathBuf::from(lookup("TMP_FILE").unwrap_or_else(|| ".data".to_string()));

        let port: u16 = match lookup("MINDSERVICE_PORT") {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidPort)?,
            None => DEFAULT_PORT,
        };
        let http_addr = SocketAddr::from(([0, 0, 0, 0], port));

        let token_ttl_hours = parse_number(
            &lookup,
            "MINDSERVICE_TOKEN_TTL_HOURS",
            DEFAULT_TOKEN_TTL_HOURS,
        )?;
        let max_concurrent_runs = parse_number(
            &lookup,
            "MINDSERVICE_MAX_CONCURRENT_RUNS",
            DEFAULT_MAX_CONCURRENT_RUNS,
        )?;

        Ok(Self {
            client_id,
            client_secret,
            jwt_secret,
            data_dir,
            http_addr,
            token_ttl_hours,
            max_concurrent_runs,
        })
    }
}

fn parse_number<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
        None => Ok(default),
    }
}

// Secrets stay out of logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("client_id", &self.client_id)
            .field("data_dir", &self.data_dir)
            .field("http_addr", &self.http_addr)
            .field("token_ttl_hours", &self.token_ttl_hours)
            .field("max_concurrent_runs", &self.max_concurrent_runs)
            .finish_non_exhaustive()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),
    /// The port number is invalid.
    #[error("Invalid port number")]
    InvalidPort,
    /// A numeric setting could not be parsed.
    #[error("Invalid value for {name}: {value:?}")]
    InvalidNumber {
        /// Variable name.
        name: &'static str,
        /// Raw value.
        value: String,
    },
}
