//! # Pagient Configuration System
//!
//! Layered, validated configuration for the reconciliation engine.
//!
//! ## Architecture
//!
//! - **Base file**: `<config_dir>/pagient.toml` (required)
//! - **Environment overrides**: `<config_dir>/pagient.<env>.toml` (optional)
//! - **Process environment**: `PAGIENT__SECTION__KEY` variables win over both files
//!
//! Configuration is loaded once at startup and handed to constructors.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pagient_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let interval = manager.config().poller.polling_interval();
//! let room = &manager.config().bridge.room_label;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::system;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring `pagient.toml`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PagientConfig {
    /// Patient database connection and pooling
    pub database: DatabaseConfig,

    /// Where the external waiting queue is read from
    pub bridge: BridgeConfig,

    /// Paging gateway endpoint and credentials
    pub easy_call: EasyCallConfig,

    #[serde(default)]
    pub poller: PollerConfig,

    #[serde(default)]
    pub events: EventsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout_seconds")]
    pub acquire_timeout_seconds: u64,
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_seconds)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BridgeConfig {
    /// Room (state) code whose waiting queue is watched
    pub room_label: String,

    /// How many queue slots ahead to watch; `0` watches the whole queue
    #[serde(default)]
    pub queue_limit: u32,

    pub source: QueueSourceConfig,
}

impl BridgeConfig {
    /// The limit handed to the queue source, `None` when unlimited
    pub fn queue_limit(&self) -> Option<u32> {
        (self.queue_limit > 0).then_some(self.queue_limit)
    }
}

/// Queue source variant, selected by `kind`
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueueSourceConfig {
    /// Room-assignment tables in the practice-management SQL Server database
    SqlServer(SqlServerSourceConfig),
    /// Room-assignment tables replicated into PostgreSQL
    Postgres {
        url: String,
        #[serde(default = "default_source_max_connections")]
        max_connections: u32,
    },
    /// JSON endpoint serving the queue of a room
    Http {
        url: String,
        #[serde(default = "default_queue_source_timeout_ms")]
        timeout_ms: u64,
    },
}

/// Connection settings of the practice-management SQL Server database
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct SqlServerSourceConfig {
    pub host: String,
    #[serde(default = "default_sql_server_port")]
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    /// TLS towards the server; the practice databases usually run without
    #[serde(default)]
    pub encrypt: bool,
    /// Upper bound for connecting and reading the queue
    #[serde(default = "default_queue_source_timeout_ms")]
    pub timeout_ms: u64,
}

impl SqlServerSourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl QueueSourceConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SqlServer(_) => "sql_server",
            Self::Postgres { .. } => "postgres",
            Self::Http { .. } => "http",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EasyCallConfig {
    pub url: String,
    pub user: String,
    pub password: String,
    /// Transmitter port on the EasyCall gateway
    #[serde(default)]
    pub port: u32,
    #[serde(default = "default_dispatch_timeout_ms")]
    pub timeout_ms: u64,
}

impl EasyCallConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_polling_interval_ms")]
    pub polling_interval_ms: u64,
}

impl PollerConfig {
    pub fn polling_interval(&self) -> Duration {
        Duration::from_millis(self.polling_interval_ms)
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            polling_interval_ms: system::DEFAULT_POLLING_INTERVAL_MS,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EventsConfig {
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: system::DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}

fn default_max_connections() -> u32 {
    10
}

fn default_source_max_connections() -> u32 {
    2
}

fn default_sql_server_port() -> u16 {
    1433
}

fn default_acquire_timeout_seconds() -> u64 {
    30
}

fn default_queue_source_timeout_ms() -> u64 {
    system::DEFAULT_QUEUE_SOURCE_TIMEOUT_MS
}

fn default_dispatch_timeout_ms() -> u64 {
    system::DEFAULT_DISPATCH_TIMEOUT_MS
}

fn default_polling_interval_ms() -> u64 {
    system::DEFAULT_POLLING_INTERVAL_MS
}

fn default_channel_capacity() -> usize {
    system::DEFAULT_EVENT_CHANNEL_CAPACITY
}

fn default_true() -> bool {
    true
}

impl PagientConfig {
    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "database.url",
                "database configuration",
            ));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigurationError::invalid_value(
                "database.max_connections",
                "0",
                "pool size must be greater than 0",
            ));
        }

        if self.database.acquire_timeout_seconds == 0 {
            return Err(ConfigurationError::invalid_value(
                "database.acquire_timeout_seconds",
                "0",
                "acquire timeout must be greater than 0",
            ));
        }

        if self.bridge.room_label.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "bridge.room_label",
                "bridge configuration",
            ));
        }

        self.validate_queue_source()?;

        if self.easy_call.url.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "easy_call.url",
                "easy_call configuration",
            ));
        }

        if self.easy_call.timeout_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "easy_call.timeout_ms",
                "0",
                "dispatch timeout must be greater than 0",
            ));
        }

        if self.poller.polling_interval_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "poller.polling_interval_ms",
                "0",
                "polling interval must be greater than 0",
            ));
        }

        if self.events.channel_capacity == 0 {
            return Err(ConfigurationError::invalid_value(
                "events.channel_capacity",
                "0",
                "broadcast channel capacity must be greater than 0",
            ));
        }

        Ok(())
    }

    fn validate_queue_source(&self) -> Result<(), ConfigurationError> {
        let required = |field: &str, value: &str| {
            if value.trim().is_empty() {
                Err(ConfigurationError::missing_required_field(
                    format!("bridge.source.{field}"),
                    "bridge configuration",
                ))
            } else {
                Ok(())
            }
        };
        let positive = |field: &str, value: u64| {
            if value == 0 {
                Err(ConfigurationError::invalid_value(
                    format!("bridge.source.{field}"),
                    "0",
                    "must be greater than 0",
                ))
            } else {
                Ok(())
            }
        };

        match &self.bridge.source {
            QueueSourceConfig::SqlServer(sql_server) => {
                required("host", &sql_server.host)?;
                required("database", &sql_server.database)?;
                required("user", &sql_server.user)?;
                positive("port", u64::from(sql_server.port))?;
                positive("timeout_ms", sql_server.timeout_ms)
            }
            QueueSourceConfig::Postgres {
                url,
                max_connections,
            } => {
                required("url", url)?;
                positive("max_connections", u64::from(*max_connections))
            }
            QueueSourceConfig::Http { url, timeout_ms } => {
                required("url", url)?;
                positive("timeout_ms", *timeout_ms)
            }
        }
    }
}
