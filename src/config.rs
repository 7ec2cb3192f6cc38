use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

/// Application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Environment (dev, staging, prod)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Deadline for a single websocket write
    #[serde(default = "default_write_wait_secs")]
    pub write_wait_secs: u64,

    /// Read-idle timeout, reset by every inbound frame (pongs included)
    #[serde(default = "default_pong_wait_secs")]
    pub pong_wait_secs: u64,

    /// Keep-alive ping period, must be shorter than the pong wait
    #[serde(default = "default_ping_period_secs")]
    pub ping_period_secs: u64,

    /// Time between sending a close frame and dropping the transport
    #[serde(default = "default_close_grace_secs")]
    pub close_grace_secs: u64,

    /// Maximum inbound message size in bytes
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
}

/// Timings and limits used by every connection driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayConfig {
    pub write_wait: Duration,
    pub pong_wait: Duration,
    pub ping_period: Duration,
    pub close_grace: Duration,
    pub max_message_size: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            write_wait: Duration::from_secs(default_write_wait_secs()),
            pong_wait: Duration::from_secs(default_pong_wait_secs()),
            ping_period: Duration::from_secs(default_ping_period_secs()),
            close_grace: Duration::from_secs(default_close_grace_secs()),
            max_message_size: default_max_message_size(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables or app.env file
    pub fn load() -> Result<Self, ConfigError> {
        // Try to load from app.env file first
        if std::path::Path::new("app.env").exists() {
            dotenvy::from_filename("app.env").ok();
        } else {
            // Fallback to .env file
            dotenvy::dotenv().ok();
        }

        Self::from_env()
    }

    /// Read the configuration from the process environment only
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars())
    }

    /// Read the configuration from an explicit set of variables
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        match envy::from_iter::<_, Config>(vars) {
            Ok(config) => {
                info!("Configuration loaded successfully");
                Ok(config)
            }
            Err(e) => {
                error!("Failed to load configuration: {}", e);
                Err(ConfigError::Env(e))
            }
        }
    }

    /// Get the full server address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if running in development mode
    pub fn is_development(&self) -> bool {
        self.environment.to_lowercase() == "dev" || self.environment.to_lowercase() == "development"
    }

    /// Build the connection timings, rejecting a ping period that would let
    /// the read-idle timeout expire between two probes.
    pub fn relay_config(&self) -> Result<RelayConfig, ConfigError> {
        if self.ping_period_secs == 0 || self.ping_period_secs >= self.pong_wait_secs {
            return Err(ConfigError::InvalidKeepAlive {
                ping_period_secs: self.ping_period_secs,
                pong_wait_secs: self.pong_wait_secs,
            });
        }
        Ok(RelayConfig {
            write_wait: Duration::from_secs(self.write_wait_secs),
            pong_wait: Duration::from_secs(self.pong_wait_secs),
            ping_period: Duration::from_secs(self.ping_period_secs),
            close_grace: Duration::from_secs(self.close_grace_secs),
            max_message_size: self.max_message_size,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            write_wait_secs: default_write_wait_secs(),
            pong_wait_secs: default_pong_wait_secs(),
            ping_period_secs: default_ping_period_secs(),
            close_grace_secs: default_close_grace_secs(),
            max_message_size: default_max_message_size(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    Env(#[from] envy::Error),
    #[error("ping period ({ping_period_secs}s) must be non-zero and shorter than the pong wait ({pong_wait_secs}s)")]
    InvalidKeepAlive {
        ping_period_secs: u64,
        pong_wait_secs: u64,
    },
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_write_wait_secs() -> u64 {
    10
}

fn default_pong_wait_secs() -> u64 {
    60
}

fn default_ping_period_secs() -> u64 {
    default_pong_wait_secs() * 9 / 10
}

fn default_close_grace_secs() -> u64 {
    10
}

fn default_max_message_size() -> usize {
    8192
}
