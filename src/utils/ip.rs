use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::{request::Parts, HeaderMap};

/// Stored in `activity_logs.ip_address` when no address can be determined.
pub const UNKNOWN_IP: &str = "unknown";

/// Best-effort client address for the audit trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub Option<IpAddr>);

impl ClientIp {
    pub fn as_log_value(&self) -> String {
        self.0
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| UNKNOWN_IP.to_string())
    }
}

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let connect_info = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(ClientIp(extract_client_ip(&parts.headers, connect_info)))
    }
}

/// First parseable `x-forwarded-for` hop, then `x-real-ip`, then the socket peer.
pub fn extract_client_ip(headers: &HeaderMap, connect_info: Option<SocketAddr>) -> Option<IpAddr> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .find_map(|part| part.parse::<IpAddr>().ok())
        });

    forwarded
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<IpAddr>().ok())
        })
        .or_else(|| connect_info.map(|addr| addr.ip()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn prefers_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("garbage, 203.0.113.7, 10.0.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.1"));
        let ip = extract_client_ip(&headers, None).unwrap();
        assert_eq!(ip.to_string(), "203.0.113.7");
    }

    #[test]
    fn falls_back_to_real_ip_then_socket() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.1"));
        assert_eq!(
            extract_client_ip(&headers, None).unwrap().to_string(),
            "198.51.100.1"
        );

        let socket: SocketAddr = "127.0.0.1:5555".parse().unwrap();
        assert_eq!(
            extract_client_ip(&HeaderMap::new(), Some(socket))
                .unwrap()
                .to_string(),
            "127.0.0.1"
        );
    }

    #[test]
    fn unknown_when_nothing_is_available() {
        let ip = ClientIp(extract_client_ip(&HeaderMap::new(), None));
        assert_eq!(ip.as_log_value(), UNKNOWN_IP);
    }
}
