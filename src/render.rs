//! Configuration file rendering
//!
//! Produces the literal contents of the dhclient configuration, the ifupdown
//! interfaces file and resolv.conf. Output is byte-stable for identical input so
//! convergence can compare it against what is already on disk.

use crate::error::{NetconvergeResult, ResultExt};
use crate::network::ResolvedNetwork;
use crate::validation::sanitize_config_value;

/// First line of every generated file
pub const GENERATED_HEADER: &str = "# Generated by bosh-agent";

const DHCP_PREAMBLE: &str = "
option rfc3442-classless-static-routes code 121 = array of unsigned integer 8;

send host-name \"<hostname>\";

request subnet-mask, broadcast-address, time-offset, routers,
\tdomain-name, domain-name-servers, domain-search, host-name,
\tnetbios-name-servers, netbios-scope, interface-mtu,
\trfc3442-classless-static-routes, ntp-servers;

";

const LOOPBACK_STANZA: &str = "auto lo\niface lo inet loopback\n";

/// dhclient.conf with one `prepend domain-name-servers` line per server, in list order
pub fn render_dhcp_config(dns_servers: &[String]) -> NetconvergeResult<String> {
    let mut conf = String::new();
    conf.push_str(GENERATED_HEADER);
    conf.push('\n');
    conf.push_str(DHCP_PREAMBLE);

    for server in dns_servers {
        let server = sanitize_config_value(server).context("Rendering DNS server")?;
        conf.push_str(&format!("prepend domain-name-servers {};\n", server));
    }

    Ok(conf)
}

/// /etc/network/interfaces: loopback first, then one static stanza per network
pub fn render_network_interfaces(networks: &[ResolvedNetwork]) -> NetconvergeResult<String> {
    let mut conf = String::new();
    conf.push_str(GENERATED_HEADER);
    conf.push('\n');
    conf.push_str(LOOPBACK_STANZA);

    for network in networks {
        let device = sanitize_config_value(&network.device).context("Rendering device name")?;
        let ip = sanitize_config_value(network.ip()).context("Rendering address")?;
        let netmask = sanitize_config_value(&network.settings.netmask).context("Rendering netmask")?;

        conf.push_str(&format!("\nauto {}\n", device));
        conf.push_str(&format!("iface {} inet static\n", device));
        conf.push_str(&format!("    address {}\n", ip));
        conf.push_str(&format!("    network {}\n", network.network_address));
        conf.push_str(&format!("    netmask {}\n", netmask));
        conf.push_str(&format!("    broadcast {}\n", network.broadcast_address));

        // No trailing newline; the next stanza opens with one
        if network.has_default_gateway {
            let gateway = sanitize_config_value(&network.settings.gateway).context("Rendering gateway")?;
            conf.push_str(&format!("    gateway {}", gateway));
        }
    }

    Ok(conf)
}

/// resolv.conf with one `nameserver` line per server, in list order
pub fn render_resolv_conf(dns_servers: &[String]) -> NetconvergeResult<String> {
    let mut conf = String::new();
    conf.push_str(GENERATED_HEADER);
    conf.push('\n');

    for server in dns_servers {
        let server = sanitize_config_value(server).context("Rendering DNS server")?;
        conf.push_str(&format!("nameserver {}\n", server));
    }

    Ok(conf)
}
