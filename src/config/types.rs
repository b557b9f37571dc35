//! Configuration types

use serde::{Deserialize, Serialize};

use crate::common::types::MarketDataType;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Gateway connection configuration
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// General application settings
    #[serde(default)]
    pub settings: AppSettings,
}

/// Gateway connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Gateway host name
    #[serde(default = "default_host")]
    pub host: String,
    /// Gateway API port
    #[serde(default = "default_port")]
    pub port: u16,
    /// API client id; a random one is used when unset
    #[serde(default)]
    pub client_id: Option<i32>,
    /// Market data tier requested before each subscription
    #[serde(default)]
    pub market_data_type: MarketDataType,
    /// Bound on the post-connect readiness wait in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
    /// Maximum accepted inbound message length in bytes
    #[serde(default = "default_max_message_len")]
    pub max_message_len: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            client_id: None,
            market_data_type: MarketDataType::default(),
            connect_timeout_ms: default_connect_timeout(),
            max_message_len: default_max_message_len(),
        }
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    4001
}

fn default_connect_timeout() -> u64 {
    1000
}

fn default_max_message_len() -> usize {
    crate::gateway::messages::MAX_MSG_LEN
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Time unit of the position poll schedule in milliseconds
    #[serde(default = "default_poll_unit")]
    pub poll_unit_ms: u64,
    /// Clear accumulated positions when a new snapshot is requested
    #[serde(default)]
    pub clear_positions_on_request: bool,
    /// Hard timeout for position requests in seconds (unbounded when unset)
    #[serde(default)]
    pub positions_timeout_seconds: Option<u64>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            poll_unit_ms: default_poll_unit(),
            clear_positions_on_request: false,
            positions_timeout_seconds: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_poll_unit() -> u64 {
    1000
}
