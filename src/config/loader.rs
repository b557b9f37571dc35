//! Configuration loader

use config::{Config, Environment, File};
use std::path::Path;

use super::types::AppConfig;
use crate::common::errors::{BridgeError, Result};

/// Load configuration from file and environment variables
///
/// Priority (highest to lowest):
/// 1. Environment variables (`IBKR_HOST`, `IBKR_PORT`, `IBKR_CLIENT_ID`)
/// 2. Environment variables prefixed with `APP__` (e.g. `APP__GATEWAY__PORT`)
/// 3. Configuration file (TOML format)
/// 4. Default values
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let mut builder = Config::builder();

    if let Some(path) = config_path {
        if Path::new(path).exists() {
            builder = builder.add_source(File::with_name(path).required(false));
        }
    }

    builder = builder.add_source(
        Environment::with_prefix("APP")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    for (var, key) in [
        ("IBKR_HOST", "gateway.host"),
        ("IBKR_PORT", "gateway.port"),
        ("IBKR_CLIENT_ID", "gateway.client_id"),
    ] {
        if let Ok(value) = std::env::var(var) {
            builder = builder
                .set_override(key, value)
                .map_err(|e| BridgeError::Configuration(e.to_string()))?;
        }
    }

    let config = builder
        .build()
        .map_err(|e| BridgeError::Configuration(e.to_string()))?;

    config
        .try_deserialize()
        .map_err(|e| BridgeError::Configuration(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_config_from_toml_file() {
        let path = std::env::temp_dir().join(format!("gateway_bridge_{}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[gateway]\nport = 7497\nclient_id = 12\n\n[settings]\nclear_positions_on_request = true"
        )
        .unwrap();

        let config = load_config(path.to_str()).unwrap();
        std::fs::remove_file(&path).ok();

        if std::env::var("IBKR_PORT").is_err() {
            assert_eq!(config.gateway.port, 7497);
        }
        if std::env::var("IBKR_CLIENT_ID").is_err() {
            assert_eq!(config.gateway.client_id, Some(12));
        }
        assert!(config.settings.clear_positions_on_request);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = load_config(Some("/nonexistent/gateway_bridge.toml")).unwrap();
        assert_eq!(config.settings.poll_unit_ms, 1000);
    }
}
