//! Applying [`NetworkConfig`] to collaborators
//!
//! Each collaborator receives its own network settings at construction. The HTTP client
//! gets resolver overrides and egress settings through its builder, the yt-dlp process
//! gets equivalent command-line flags.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::config::NetworkConfig;
use crate::error::{Error, Result};

/// Configure a reqwest client builder from the network settings
///
/// # Errors
///
/// Returns [`Error::Config`] when the proxy URL is malformed.
pub fn configure_client(
    mut builder: reqwest::ClientBuilder,
    network: &NetworkConfig,
) -> Result<reqwest::ClientBuilder> {
    for (host, addrs) in &network.dns_overrides {
        // reqwest ignores the port of an override address
        let addrs: Vec<SocketAddr> = addrs
            .iter()
            .filter(|ip| !network.force_ipv4 || ip.is_ipv4())
            .map(|ip| SocketAddr::new(*ip, 0))
            .collect();
        if !addrs.is_empty() {
            builder = builder.resolve_to_addrs(host, &addrs);
        }
    }

    if let Some(proxy) = &network.proxy {
        let proxy = reqwest::Proxy::all(proxy).map_err(|e| Error::Config {
            message: format!("invalid proxy URL: {e}"),
            key: Some("proxy".into()),
        })?;
        builder = builder.proxy(proxy);
    }

    // Binding to an IPv4 address restricts the client to IPv4 peers
    let local = match network.source_address {
        Some(addr) => Some(addr),
        None if network.force_ipv4 => Some(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
        None => None,
    };
    if local.is_some() {
        builder = builder.local_address(local);
    }

    Ok(builder)
}

/// yt-dlp flags equivalent to the network settings
///
/// yt-dlp has no resolver override flag; hosts in
/// [`dns_overrides`](NetworkConfig::dns_overrides) resolve through the system resolver.
pub fn ytdlp_args(network: &NetworkConfig) -> Vec<String> {
    let mut args = Vec::new();

    if let Some(proxy) = &network.proxy {
        args.push("--proxy".to_string());
        args.push(proxy.clone());
    }

    if let Some(addr) = network.source_address {
        args.push("--source-address".to_string());
        args.push(addr.to_string());
    }

    if network.force_ipv4 {
        args.push("--force-ipv4".to_string());
    }

    args
}
