use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, Extensions, HeaderMap},
};
use std::{
    convert::Infallible,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::Arc,
};

/// Reverse proxies whose forwarding headers are believed.
///
/// Installed as a request extension (`Extension(TrustedProxies::new(..))`).
/// When absent or empty, only the socket peer identifies the caller.
#[derive(Debug, Clone, Default)]
pub struct TrustedProxies(Arc<Vec<IpAddr>>);

impl TrustedProxies {
    pub fn new(proxies: Vec<IpAddr>) -> Self {
        Self(Arc::new(proxies))
    }

    pub fn contains(&self, ip: &IpAddr) -> bool {
        self.0.contains(ip)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Resolve the caller's IP address.
///
/// The connection peer is authoritative unless it is a trusted proxy. Behind
/// a trusted proxy, `X-Forwarded-For` is walked from the right and the first
/// hop that is not itself a trusted proxy wins; entries left of it are
/// client-supplied and ignored. `X-Real-IP` is used only when a trusted
/// proxy sent no `X-Forwarded-For`.
pub fn resolve_client_ip(headers: &HeaderMap, extensions: &Extensions) -> Option<IpAddr> {
    let peer = extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())?;

    let trusted = match extensions.get::<TrustedProxies>() {
        Some(trusted) if trusted.contains(&peer) => trusted,
        _ => return Some(peer),
    };

    if let Some(forwarded) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        let mut hop = peer;
        for entry in forwarded.rsplit(',') {
            match entry.trim().parse::<IpAddr>() {
                Ok(ip) if trusted.contains(&ip) => hop = ip,
                Ok(ip) => return Some(ip),
                // Garbage in the chain: stop at the last hop we can vouch for
                Err(_) => break,
            }
        }
        return Some(hop);
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
        .or(Some(peer))
}

/// Extractor for the caller's IP. Falls back to `0.0.0.0` when nothing
/// identifies the peer, so every unidentified caller shares one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub IpAddr);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match resolve_client_ip(&parts.headers, &parts.extensions) {
            Some(ip) => Ok(ClientIp(ip)),
            None => {
                tracing::warn!("Could not determine client IP");
                Ok(ClientIp(IpAddr::V4(Ipv4Addr::UNSPECIFIED)))
            }
        }
    }
}
