//! Configuration management for netconverge

use crate::arp::AnnounceTiming;
use crate::error::{NetconvergeError, NetconvergeResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main netconverge configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetconvergeConfig {
    /// Files written and directories scanned
    #[serde(default)]
    pub paths: ConfigPaths,
    /// Gratuitous ARP timing
    #[serde(default)]
    pub arp: ArpSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigPaths {
    /// DHCP client configuration
    #[serde(default = "default_dhclient_conf")]
    pub dhclient_conf: PathBuf,
    /// Static interface configuration (ifupdown)
    #[serde(default = "default_interfaces")]
    pub interfaces: PathBuf,
    /// Resolver configuration
    #[serde(default = "default_resolv_conf")]
    pub resolv_conf: PathBuf,
    /// Directory with one entry per network device
    #[serde(default = "default_net_class_dir")]
    pub net_class_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArpSettings {
    /// Announcement rounds over all networks
    #[serde(default = "default_arp_rounds")]
    pub rounds: u32,
    /// Device existence poll interval (milliseconds)
    #[serde(default = "default_arp_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Pause after each announcement (milliseconds)
    #[serde(default = "default_arp_wait_interval_ms")]
    pub wait_interval_ms: u64,
}

fn default_dhclient_conf() -> PathBuf {
    PathBuf::from("/etc/dhcp3/dhclient.conf")
}

fn default_interfaces() -> PathBuf {
    PathBuf::from("/etc/network/interfaces")
}

fn default_resolv_conf() -> PathBuf {
    PathBuf::from("/etc/resolv.conf")
}

fn default_net_class_dir() -> PathBuf {
    PathBuf::from("/sys/class/net")
}

fn default_arp_rounds() -> u32 {
    6
}

fn default_arp_poll_interval_ms() -> u64 {
    100
}

fn default_arp_wait_interval_ms() -> u64 {
    100
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self {
            dhclient_conf: default_dhclient_conf(),
            interfaces: default_interfaces(),
            resolv_conf: default_resolv_conf(),
            net_class_dir: default_net_class_dir(),
        }
    }
}

impl Default for ArpSettings {
    fn default() -> Self {
        Self {
            rounds: default_arp_rounds(),
            poll_interval_ms: default_arp_poll_interval_ms(),
            wait_interval_ms: default_arp_wait_interval_ms(),
        }
    }
}

impl ArpSettings {
    pub fn timing(&self) -> AnnounceTiming {
        AnnounceTiming {
            rounds: self.rounds,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            wait_interval: Duration::from_millis(self.wait_interval_ms),
        }
    }
}

impl NetconvergeConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> NetconvergeResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| NetconvergeError::ConfigError(format!("Failed to read config: {}", e)))?;

        Self::parse(&content)
    }

    /// Load configuration from file, or defaults if it does not exist
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> NetconvergeResult<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn parse(content: &str) -> NetconvergeResult<Self> {
        toml::from_str(content)
            .map_err(|e| NetconvergeError::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> NetconvergeResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| NetconvergeError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path.as_ref(), content)
            .map_err(|e| NetconvergeError::ConfigError(format!("Failed to write config: {}", e)))?;

        Ok(())
    }
}
