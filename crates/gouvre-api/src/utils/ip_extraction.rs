//! Client IP extraction for the address whitelist.
//!
//! `X-Forwarded-For` is only consulted when the server is configured to sit behind trusted
//! proxies; otherwise any client could claim a whitelisted address.

use axum::http::HeaderMap;
use std::net::{IpAddr, SocketAddr};

/// Resolve the client address.
///
/// With `trusted_proxy_count == 0` this is the socket peer. With N trusted proxies the
/// client is the N-th entry from the right of the `X-Forwarded-For` chain, the address the
/// outermost trusted proxy received the request from. Anything to the left of it came from
/// the client and is ignored. If the chain is too short or unparsable, the socket peer is
/// used instead.
pub fn extract_client_ip(
    headers: &HeaderMap,
    socket_addr: Option<&SocketAddr>,
    trusted_proxy_count: usize,
) -> Option<IpAddr> {
    if trusted_proxy_count > 0 {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| extract_from_forwarded_for(value, trusted_proxy_count));
        if forwarded.is_some() {
            return forwarded;
        }
    }

    socket_addr.map(|addr| addr.ip())
}

/// Each trusted proxy appends the address it received the request from, so with
/// `client -> P1 -> P2 -> server` the header reads `client, P1` and the client sits
/// `trusted_proxy_count` entries from the right.
fn extract_from_forwarded_for(header_value: &str, trusted_proxy_count: usize) -> Option<IpAddr> {
    let ips: Vec<&str> = header_value
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();

    if trusted_proxy_count == 0 || ips.len() < trusted_proxy_count {
        return None;
    }

    let client_ip_pos = ips.len() - trusted_proxy_count;
    ips.get(client_ip_pos)?.parse().ok()
}
