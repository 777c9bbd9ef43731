//! Client address and protocol as seen through trusted proxies.

use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::HeaderMap;
use axum::http::request::Parts;

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Client address and protocol resolved by the trust-proxy middleware.
///
/// With `n` trusted hops the client is the address `n` positions to the left
/// of the peer in the `X-Forwarded-For` chain, or the left-most entry when
/// the chain is shorter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardedInfo {
    /// Resolved client address.
    pub client_ip: Option<IpAddr>,
    /// Address of the directly connected peer.
    pub peer_ip: Option<IpAddr>,
    /// `http` or `https`.
    pub protocol: String,
}

impl ForwardedInfo {
    /// Resolves the client from the headers and the connected peer.
    pub fn resolve(headers: &HeaderMap, peer_ip: Option<IpAddr>, trusted_hops: usize) -> Self {
        if trusted_hops == 0 {
            return Self {
                client_ip: peer_ip,
                peer_ip,
                protocol: "http".to_owned(),
            };
        }

        // Right-most entry is the address our trusted proxy saw.
        let chain: Vec<IpAddr> = headers
            .get_all(X_FORWARDED_FOR)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .filter_map(|entry| entry.trim().parse().ok())
            .collect();

        let client_ip = match chain.len() {
            0 => peer_ip,
            len => Some(chain[len - trusted_hops.min(len)]),
        };

        let protocol = headers
            .get(X_FORWARDED_PROTO)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(|value| value.trim().to_ascii_lowercase())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| "http".to_owned());

        Self {
            client_ip,
            peer_ip,
            protocol,
        }
    }

    /// Whether the client connected over TLS.
    #[inline]
    pub fn is_secure(&self) -> bool {
        self.protocol == "https"
    }
}

impl<S> FromRequestParts<S> for ForwardedInfo
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(info) = parts.extensions.get::<Self>() {
            return Ok(info.clone());
        }

        let peer_ip = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());
        Ok(Self::resolve(&parts.headers, peer_ip, 0))
    }
}
