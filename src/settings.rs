//! Declared network settings
//!
//! Settings are produced by the infrastructure layer and are read-only input
//! to convergence. The JSON provider covers the CLI; agents embedding the
//! library supply their own [`SettingsProvider`].

use crate::error::{NetconvergeError, NetconvergeResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Purpose name for the network that supplies DNS servers
pub const DEFAULT_FOR_DNS: &str = "dns";
/// Purpose name for the network that carries the default route
pub const DEFAULT_FOR_GATEWAY: &str = "gateway";

/// One declared network
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    pub ip: String,
    pub netmask: String,
    /// Hardware address of the device this network belongs to
    pub mac: String,
    pub gateway: String,
    /// DNS servers in configured priority order
    pub dns: Vec<String>,
    /// Purposes this network is the default for (e.g. "dns", "gateway")
    pub default: Vec<String>,
}

impl NetworkSettings {
    pub fn is_default_for(&self, purpose: &str) -> bool {
        self.default.iter().any(|p| p == purpose)
    }

    pub fn is_default_for_dns(&self) -> bool {
        self.is_default_for(DEFAULT_FOR_DNS)
    }

    pub fn is_default_for_gateway(&self) -> bool {
        self.is_default_for(DEFAULT_FOR_GATEWAY)
    }
}

/// Named networks, iterated in name order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Networks(BTreeMap<String, NetworkSettings>);

impl Networks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, network: NetworkSettings) {
        self.0.insert(name.into(), network);
    }

    pub fn get(&self, name: &str) -> Option<&NetworkSettings> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &NetworkSettings)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First network designated default for `purpose`, if any
    pub fn default_network_for(&self, purpose: &str) -> Option<&NetworkSettings> {
        self.0.values().find(|n| n.is_default_for(purpose))
    }

    /// DNS servers of the default-for-DNS network, in reverse order
    ///
    /// dhclient `prepend` directives each insert at the front, so emitting the
    /// reversed list restores the configured priority. resolv.conf is written
    /// from the same list.
    pub fn dns_servers(&self) -> Vec<String> {
        self.default_network_for(DEFAULT_FOR_DNS)
            .map(|n| n.dns.iter().rev().cloned().collect())
            .unwrap_or_default()
    }
}

impl FromIterator<(String, NetworkSettings)> for Networks {
    fn from_iter<I: IntoIterator<Item = (String, NetworkSettings)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Source of declared networks
pub trait SettingsProvider: Send + Sync {
    fn networks(&self) -> &Networks;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SettingsDocument {
    #[serde(default)]
    networks: Networks,
}

/// Settings read from a JSON document of the form `{"networks": {...}}`
#[derive(Debug, Clone)]
pub struct JsonSettingsProvider {
    path: PathBuf,
    networks: Networks,
}

impl JsonSettingsProvider {
    /// Load settings from file
    pub fn load<P: AsRef<Path>>(path: P) -> NetconvergeResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| NetconvergeError::ConfigError(
                format!("Failed to read settings {}: {}", path.display(), e)
            ))?;

        let networks = Self::parse(&content)?;
        Ok(Self { path: path.to_path_buf(), networks })
    }

    /// Parse a settings document
    pub fn parse(content: &str) -> NetconvergeResult<Networks> {
        let doc: SettingsDocument = serde_json::from_str(content)?;
        Ok(doc.networks)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsProvider for JsonSettingsProvider {
    fn networks(&self) -> &Networks {
        &self.networks
    }
}

impl SettingsProvider for Networks {
    fn networks(&self) -> &Networks {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network(dns: &[&str], default: &[&str]) -> NetworkSettings {
        NetworkSettings {
            dns: dns.iter().map(|s| s.to_string()).collect(),
            default: default.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_dns_servers_reversed() {
        let mut networks = Networks::new();
        networks.insert("default", network(&["8.8.8.8", "8.8.4.4", "1.1.1.1"], &["dns", "gateway"]));

        assert_eq!(networks.dns_servers(), vec!["1.1.1.1", "8.8.4.4", "8.8.8.8"]);
    }

    #[test]
    fn test_dns_servers_without_default_network() {
        let mut networks = Networks::new();
        networks.insert("a", network(&["8.8.8.8"], &[]));
        networks.insert("b", network(&["1.1.1.1"], &["gateway"]));

        assert!(networks.default_network_for(DEFAULT_FOR_DNS).is_none());
        assert!(networks.dns_servers().is_empty());
    }

    #[test]
    fn test_first_default_network_wins() {
        let mut networks = Networks::new();
        networks.insert("b-second", network(&["2.2.2.2"], &["dns"]));
        networks.insert("a-first", network(&["1.1.1.1"], &["dns"]));

        assert_eq!(networks.dns_servers(), vec!["1.1.1.1"]);
    }

    #[test]
    fn test_default_flags() {
        let n = network(&[], &["gateway"]);
        assert!(n.is_default_for_gateway());
        assert!(!n.is_default_for_dns());
    }

    #[test]
    fn test_parse_settings_document() {
        let json = r#"{
            "networks": {
                "default": {
                    "ip": "10.0.0.5",
                    "netmask": "255.255.255.0",
                    "mac": "aa:bb",
                    "gateway": "10.0.0.1",
                    "dns": ["8.8.8.8", "8.8.4.4"],
                    "default": ["dns", "gateway"]
                },
                "backend": { "ip": "192.168.1.10", "netmask": "255.255.0.0" }
            }
        }"#;

        let networks = JsonSettingsProvider::parse(json).unwrap();
        assert_eq!(networks.len(), 2);

        let names: Vec<_> = networks.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["backend", "default"]);

        let backend = networks.get("backend").unwrap();
        assert!(backend.dns.is_empty());
        assert!(backend.mac.is_empty());
        assert_eq!(networks.dns_servers(), vec!["8.8.4.4", "8.8.8.8"]);
    }

    #[test]
    fn test_parse_invalid_document() {
        let err = JsonSettingsProvider::parse("{ not json").unwrap_err();
        assert!(matches!(err, NetconvergeError::ParseError(_)));
    }
}
