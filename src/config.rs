//! Configuration for the Dhara monitor
//!
//! Loads configuration from a TOML file. Every section is optional and falls
//! back to the defaults of the deployed current-sensor network (receive on
//! 5005, broadcast status on 5006).

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Top-level application configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Rules installed at startup, in textual form (`"Ia > 5"`)
    pub filters: Vec<String>,
    pub network: NetworkConfig,
    pub notify: NotifyConfig,
    pub events: EventsConfig,
    pub logging: LoggingConfig,
}

/// Receive socket configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Interface address to bind (`0.0.0.0` for all interfaces)
    pub bind_address: String,
    /// UDP port current readings arrive on (0 picks an ephemeral port)
    pub receive_port: u16,
    /// Receive timeout used to observe shutdown, in milliseconds
    pub read_timeout_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            receive_port: 5005,
            read_timeout_ms: 100,
        }
    }
}

impl NetworkConfig {
    /// `bind_address:receive_port`
    pub fn receive_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.receive_port)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms.max(1))
    }
}

/// Outbound status notification configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Send a UDP status message on every state transition
    pub enabled: bool,
    /// Destination address (broadcast by default)
    pub broadcast_address: String,
    /// Destination port
    pub send_port: u16,
    /// Local address of the sending socket
    pub bind_address: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            broadcast_address: "255.255.255.255".to_string(),
            send_port: 5006,
            bind_address: "0.0.0.0".to_string(),
        }
    }
}

impl NotifyConfig {
    /// `broadcast_address:send_port`
    pub fn target_address(&self) -> String {
        format!("{}:{}", self.broadcast_address, self.send_port)
    }
}

/// Transition event subscription configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Queue capacity per subscriber; events beyond it are dropped
    pub channel_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: crate::state::publisher::DEFAULT_EVENT_CAPACITY,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` wins
    pub level: String,
    /// Interval of the statistics log line, 0 disables it
    pub stats_interval_secs: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            stats_interval_secs: 10,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Example
    /// ```no_run
    /// use dhara::config::Config;
    ///
    /// let config = Config::load("dhara.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| crate::error::Error::Serialization(e.to_string()))?;
        fs::write(path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.network.receive_address(), "0.0.0.0:5005");
        assert_eq!(config.notify.target_address(), "255.255.255.255:5006");
        assert!(config.notify.enabled);
        assert_eq!(config.network.read_timeout(), Duration::from_millis(100));
        assert_eq!(config.logging.level, "info");
        assert!(config.filters.is_empty());
    }

    #[test]
    fn test_partial_toml() {
        let config = Config::from_toml(
            r#"
            filters = ["Ia > 5", "Ih<12"]

            [network]
            receive_port = 6005

            [notify]
            enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(config.filters, vec!["Ia > 5", "Ih<12"]);
        assert_eq!(config.network.receive_port, 6005);
        assert_eq!(config.network.bind_address, "0.0.0.0");
        assert!(!config.notify.enabled);
        assert_eq!(config.notify.send_port, 5006);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_empty_toml() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn test_invalid_toml() {
        let result = Config::from_toml("[network]\nreceive_port = \"five\"");
        assert!(matches!(result, Err(crate::error::Error::Config(_))));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dhara.toml");

        let mut config = Config::default();
        config.filters.push("Ic = 7".to_string());
        config.network.receive_port = 7005;
        config.logging.stats_interval_secs = 0;
        config.save(&path).unwrap();

        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_from_tempfile() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[logging]\nlevel = \"debug\"").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.stats_interval_secs, 10);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/dhara.toml");
        assert!(matches!(result, Err(crate::error::Error::Io(_))));
    }
}
