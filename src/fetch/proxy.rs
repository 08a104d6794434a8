// src/fetch/proxy.rs
// =============================================================================
// Helpers for the SOCKS proxy (normally the local Tor daemon).
//
// - proxy_url: turns "127.0.0.1:9050" into "socks5h://127.0.0.1:9050"
// - probe:     one TCP connect at startup to tell the user early that
//              Tor is not listening
//
// The "h" in socks5h matters: host names are resolved by the proxy, which is
// the only way .onion addresses resolve at all, and it keeps DNS lookups off
// the local network.
//
// A failed probe only produces a warning. Each page fetch will then fail with
// a connection error and be logged, which is the documented behaviour.
// =============================================================================

use std::time::Duration;
use tokio::net::TcpStream;
use url::Url;

// SOCKS has no well-known port in the url crate's table
const SOCKS_DEFAULT_PORT: u16 = 1080;

pub fn proxy_url(endpoint: &str) -> String {
    let endpoint = endpoint.trim();
    if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("socks5h://{}", endpoint)
    }
}

// Host and port we would open a TCP connection to
fn socket_target(endpoint: &str) -> Option<(String, u16)> {
    let url = Url::parse(&proxy_url(endpoint)).ok()?;
    let host = url.host_str()?.trim_matches(|c| c == '[' || c == ']').to_string();
    let port = url.port_or_known_default().unwrap_or(SOCKS_DEFAULT_PORT);
    Some((host, port))
}

// Returns true if something accepts TCP connections on the endpoint
pub async fn probe(endpoint: &str, timeout: Duration) -> bool {
    let Some((host, port)) = socket_target(endpoint) else {
        log::debug!("Cannot derive a socket address from proxy endpoint {}", endpoint);
        return false;
    };

    match tokio::time::timeout(timeout, TcpStream::connect((host.as_str(), port))).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            log::debug!("Proxy probe {}:{} failed: {}", host, port, e);
            false
        }
        Err(_) => {
            log::debug!("Proxy probe {}:{} timed out", host, port);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn test_bare_endpoint_becomes_socks5h() {
        assert_eq!(proxy_url("127.0.0.1:9050"), "socks5h://127.0.0.1:9050");
    }

    #[test]
    fn test_explicit_scheme_is_kept() {
        assert_eq!(proxy_url("socks5://10.0.0.2:9150"), "socks5://10.0.0.2:9150");
    }

    #[test]
    fn test_socket_target() {
        assert_eq!(
            socket_target("127.0.0.1:9050"),
            Some(("127.0.0.1".to_string(), 9050))
        );
        assert_eq!(
            socket_target("socks5h://localhost"),
            Some(("localhost".to_string(), 1080))
        );
    }

    #[tokio::test]
    async fn test_probe_open_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = listener.local_addr().unwrap().to_string();
        assert!(probe(&endpoint, Duration::from_secs(2)).await);
    }

    #[tokio::test]
    async fn test_probe_closed_port() {
        assert!(!probe("127.0.0.1:1", Duration::from_secs(2)).await);
    }
}
