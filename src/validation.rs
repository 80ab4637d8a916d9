//! Input validation and sanitization
//!
//! Values coming from settings end up verbatim in line-oriented configuration
//! files, so anything that could break a line is rejected before rendering.

use crate::error::{NetconvergeError, NetconvergeResult};
use std::net::Ipv4Addr;

/// Maximum length for configuration values
const MAX_CONFIG_VALUE_LEN: usize = 255;

/// Parse an IPv4 address or netmask
pub fn parse_ipv4(value: &str) -> NetconvergeResult<Ipv4Addr> {
    value.trim().parse::<Ipv4Addr>()
        .map_err(|_| NetconvergeError::InvalidParameter(
            format!("Invalid IPv4 address: {}", value)
        ))
}

/// Sanitize a value that is about to be embedded in a configuration file
///
/// Empty values are allowed; an unresolved device renders with an empty name.
pub fn sanitize_config_value(value: &str) -> NetconvergeResult<&str> {
    // Check for control characters
    if value.chars().any(|c| c.is_control() && c != '\t') {
        return Err(NetconvergeError::Render(
            "Configuration value contains invalid control characters".to_string()
        ));
    }

    // Check for null bytes
    if value.contains('\0') {
        return Err(NetconvergeError::Render(
            "Configuration value contains null byte".to_string()
        ));
    }

    if value.len() > MAX_CONFIG_VALUE_LEN {
        return Err(NetconvergeError::Render(
            format!("Configuration value too long (max {} characters)", MAX_CONFIG_VALUE_LEN)
        ));
    }

    Ok(value)
}
