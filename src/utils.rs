// src/utils.rs
use std::net::{IpAddr, SocketAddr, SocketAddrV4};

use tokio::net::lookup_host;

/// Resolves a configured host name or address to an IPv4 socket address.
///
/// The SA-MP query packet embeds the server's IPv4 octets, so IPv6-only
/// hosts are rejected.
pub async fn resolve_ipv4(address: &str, port: u16) -> Result<SocketAddrV4, String> {
    if let Ok(ip) = address.parse::<IpAddr>() {
        return match ip {
            IpAddr::V4(v4) => Ok(SocketAddrV4::new(v4, port)),
            IpAddr::V6(_) => Err("IPv6 addresses are not supported".to_string()),
        };
    }

    let resolved = lookup_host((address, port))
        .await
        .map_err(|e| format!("Failed to resolve {}: {}", address, e))?;

    for addr in resolved {
        if let SocketAddr::V4(v4) = addr {
            return Ok(v4);
        }
    }

    Err(format!("{} has no IPv4 address", address))
}
