//! Configuration for SetuLink roles
//!
//! Loads configuration from a TOML file. Defaults match the fixed protocol
//! values (ports 1160/1120/1110/1150, 20 ms and 500 ms send cadences,
//! 500 ms watchdogs); overriding them is mainly useful for bench setups and
//! loopback tests where the well-known ports are taken.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::protocol::constants::{
    DEFAULT_CLIENT_TO_FMS_PORT, DEFAULT_CLIENT_TO_ROBOT_PORT, DEFAULT_FMS_SEND_INTERVAL_MS,
    DEFAULT_FMS_TO_CLIENT_PORT, DEFAULT_ROBOT_SEND_INTERVAL_MS, DEFAULT_ROBOT_TO_CLIENT_PORT,
    DEFAULT_WATCHDOG_TIMEOUT_MS,
};

/// Top-level link configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LinkConfig {
    pub ports: PortConfig,
    pub timing: TimingConfig,
    pub addresses: AddressConfig,
    /// Timezone abbreviation carried in the date/timezone block
    pub timezone: String,
}

/// UDP port assignments (fixed by the protocol version)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PortConfig {
    /// Client sends to the FMS on this port
    pub client_to_fms: u16,
    /// FMS sends to a client on this port (client listens here)
    pub fms_to_client: u16,
    /// Client sends to the robot on this port (robot listens here)
    pub client_to_robot: u16,
    /// Robot sends to a client on this port (client listens here)
    pub robot_to_client: u16,
}

/// Send cadences and liveness timeout
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimingConfig {
    /// Client->robot send interval in milliseconds
    pub robot_send_interval_ms: u64,
    /// Client->FMS send interval in milliseconds
    pub fms_send_interval_ms: u64,
    /// Per-link watchdog timeout in milliseconds
    pub watchdog_timeout_ms: u64,
}

/// Optional custom peer addresses; unset means protocol defaults apply
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AddressConfig {
    /// Overrides the team-number-derived robot address
    pub custom_robot: Option<String>,
    /// Overrides FMS address latching
    pub custom_fms: Option<String>,
}

impl LinkConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: LinkConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Protocol-default configuration
    pub fn protocol_defaults() -> Self {
        Self {
            ports: PortConfig {
                client_to_fms: DEFAULT_CLIENT_TO_FMS_PORT,
                fms_to_client: DEFAULT_FMS_TO_CLIENT_PORT,
                client_to_robot: DEFAULT_CLIENT_TO_ROBOT_PORT,
                robot_to_client: DEFAULT_ROBOT_TO_CLIENT_PORT,
            },
            timing: TimingConfig {
                robot_send_interval_ms: DEFAULT_ROBOT_SEND_INTERVAL_MS,
                fms_send_interval_ms: DEFAULT_FMS_SEND_INTERVAL_MS,
                watchdog_timeout_ms: DEFAULT_WATCHDOG_TIMEOUT_MS,
            },
            addresses: AddressConfig::default(),
            timezone: "UTC".to_string(),
        }
    }

    pub fn robot_send_interval(&self) -> Duration {
        Duration::from_millis(self.timing.robot_send_interval_ms)
    }

    pub fn fms_send_interval(&self) -> Duration {
        Duration::from_millis(self.timing.fms_send_interval_ms)
    }

    pub fn watchdog_timeout(&self) -> Duration {
        Duration::from_millis(self.timing.watchdog_timeout_ms)
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self::protocol_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_defaults() {
        let config = LinkConfig::protocol_defaults();
        assert_eq!(config.ports.client_to_fms, 1160);
        assert_eq!(config.ports.fms_to_client, 1120);
        assert_eq!(config.ports.client_to_robot, 1110);
        assert_eq!(config.ports.robot_to_client, 1150);
        assert_eq!(config.timing.robot_send_interval_ms, 20);
        assert_eq!(config.timing.fms_send_interval_ms, 500);
        assert_eq!(config.timing.watchdog_timeout_ms, 500);
        assert!(config.addresses.custom_robot.is_none());
        assert_eq!(config.timezone, "UTC");
    }

    #[test]
    fn test_toml_serialization() {
        let config = LinkConfig::protocol_defaults();
        let toml_string = toml::to_string_pretty(&config).unwrap();

        assert!(toml_string.contains("[ports]"));
        assert!(toml_string.contains("[timing]"));
        assert!(toml_string.contains("[addresses]"));
        assert!(toml_string.contains("client_to_robot = 1110"));
        assert!(toml_string.contains("robot_send_interval_ms = 20"));
    }

    #[test]
    fn test_toml_deserialization() {
        let toml_content = r#"
timezone = "EST"

[ports]
client_to_fms = 2160
fms_to_client = 2120
client_to_robot = 2110
robot_to_client = 2150

[timing]
robot_send_interval_ms = 10
fms_send_interval_ms = 250
watchdog_timeout_ms = 300

[addresses]
custom_robot = "10.12.34.2"
"#;

        let config: LinkConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.ports.client_to_robot, 2110);
        assert_eq!(config.timing.watchdog_timeout_ms, 300);
        assert_eq!(config.addresses.custom_robot.as_deref(), Some("10.12.34.2"));
        assert!(config.addresses.custom_fms.is_none());
        assert_eq!(config.timezone, "EST");
        assert_eq!(config.watchdog_timeout(), Duration::from_millis(300));
    }
}
