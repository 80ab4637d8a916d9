//! Networks resolved against the devices present on the host

use crate::error::NetconvergeResult;
use crate::settings::NetworkSettings;
use crate::validation;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// A declared network bound to a device, with derived addressing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedNetwork {
    pub settings: NetworkSettings,
    /// Empty when no device carries the declared hardware address
    pub device: String,
    pub network_address: String,
    pub broadcast_address: String,
    pub has_default_gateway: bool,
}

impl ResolvedNetwork {
    pub fn resolve(settings: &NetworkSettings, device: Option<&str>) -> NetconvergeResult<Self> {
        let (network, broadcast) = network_and_broadcast(&settings.ip, &settings.netmask)?;

        Ok(Self {
            settings: settings.clone(),
            device: device.unwrap_or_default().to_string(),
            network_address: network.to_string(),
            broadcast_address: broadcast.to_string(),
            // Every resolved network is rendered with its gateway; see DESIGN.md
            has_default_gateway: true,
        })
    }

    pub fn ip(&self) -> &str {
        &self.settings.ip
    }

    pub fn is_device_resolved(&self) -> bool {
        !self.device.is_empty()
    }
}

/// Network and broadcast addresses for an IPv4 address and netmask
pub fn network_and_broadcast(ip: &str, netmask: &str) -> NetconvergeResult<(Ipv4Addr, Ipv4Addr)> {
    let ip = u32::from(validation::parse_ipv4(ip)?);
    let mask = u32::from(validation::parse_ipv4(netmask)?);

    let network = ip & mask;
    let broadcast = network | !mask;

    Ok((Ipv4Addr::from(network), Ipv4Addr::from(broadcast)))
}
