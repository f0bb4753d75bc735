use crate::error::HttpAppError;
use crate::utils::ip_extraction::extract_client_ip;
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use gouvre_core::{AppError, Config};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Who may issue links. An empty list disables that check.
#[derive(Clone, Debug, Default)]
pub struct WhitelistState {
    pub tokens: Vec<String>,
    pub ips: Vec<IpAddr>,
    pub trusted_proxy_count: usize,
}

impl WhitelistState {
    pub fn from_config(config: &Config) -> Result<Self, anyhow::Error> {
        let ips = config
            .whitelisted_ips
            .iter()
            .map(|ip| {
                ip.parse::<IpAddr>()
                    .map_err(|_| anyhow::anyhow!("Invalid address in WHITELISTED_IPS: {}", ip))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            tokens: config.whitelisted_tokens.clone(),
            ips,
            trusted_proxy_count: config.trusted_proxy_count,
        })
    }

    fn token_allowed(&self, token: Option<&str>) -> bool {
        if self.tokens.is_empty() {
            return true;
        }
        match token {
            Some(token) => self.tokens.iter().any(|allowed| secure_compare(token, allowed)),
            None => false,
        }
    }

    fn ip_allowed(&self, ip: Option<IpAddr>) -> bool {
        if self.ips.is_empty() {
            return true;
        }
        ip.is_some_and(|ip| self.ips.contains(&ip))
    }
}

fn secure_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
}

/// Guards the link-issuing routes: the bearer token and the client address must both be
/// whitelisted.
pub async fn whitelist_middleware(
    State(whitelist): State<Arc<WhitelistState>>,
    request: Request,
    next: Next,
) -> Response {
    if !whitelist.token_allowed(bearer_token(&request)) {
        tracing::debug!("Rejected request with missing or unknown bearer token");
        return HttpAppError(AppError::NotAuthorized(
            "Invalid authorization token".to_string(),
        ))
        .into_response();
    }

    let socket_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client_ip = extract_client_ip(
        request.headers(),
        socket_addr.as_ref(),
        whitelist.trusted_proxy_count,
    );

    if !whitelist.ip_allowed(client_ip) {
        tracing::debug!(client_ip = ?client_ip, "Rejected request from address not on whitelist");
        return HttpAppError(AppError::NotAuthorized("Not on ip whitelist".to_string()))
            .into_response();
    }

    next.run(request).await
}
