//! Listener binding and the local healthcheck used by the binary.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::Config;

/// Parse an explicit `BIND_ADDRESS`, adding brackets to bare IPv6 addresses.
pub fn listen_addr(bind_address: &str, port: u16) -> anyhow::Result<SocketAddr> {
    let bind_str = if bind_address.contains(':') && !bind_address.starts_with('[') {
        format!("[{bind_address}]:{port}")
    } else {
        format!("{bind_address}:{port}")
    };
    bind_str
        .parse()
        .with_context(|| format!("Invalid BIND_ADDRESS: {bind_str}"))
}

/// Bind the API listener; `auto` prefers dual-stack.
pub async fn bind_listener(config: &Config) -> anyhow::Result<TcpListener> {
    if config.bind_address == "auto" {
        if let Ok(listener) = TcpListener::bind(("::", config.port)).await {
            info!("Auto-detected dual-stack support, using [::]");
            return Ok(listener);
        }
        info!("IPv6 not available, falling back to IPv4 (0.0.0.0)");
        return TcpListener::bind(("0.0.0.0", config.port))
            .await
            .context("Failed to bind API listener");
    }

    let addr = listen_addr(&config.bind_address, config.port)?;
    TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind API listener on {addr}"))
}

/// Local health URLs, IPv4 first.
pub fn healthcheck_urls(port: u16) -> [String; 2] {
    [
        format!("http://127.0.0.1:{port}/health"),
        format!("http://[::1]:{port}/health"),
    ]
}

/// GET `/health` on the local API; returns the URL that answered with success.
pub async fn check_health(port: u16, timeout: Duration) -> anyhow::Result<Option<String>> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;

    for url in healthcheck_urls(port) {
        match client.get(&url).send().await {
            Ok(response) if response.status().is_success() => return Ok(Some(url)),
            Ok(response) => warn!(url = %url, status = %response.status(), "Healthcheck returned failure"),
            Err(e) => warn!(url = %url, error = %e, "Healthcheck request failed"),
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listen_addr_brackets_ipv6() {
        let addr = listen_addr("::1", 5000).unwrap();
        assert!(addr.is_ipv6());
        assert_eq!(addr.to_string(), "[::1]:5000");

        let addr = listen_addr("[::]", 5000).unwrap();
        assert!(addr.is_ipv6());
        assert_eq!(addr.port(), 5000);
    }

    #[test]
    fn test_listen_addr_ipv4_and_invalid() {
        assert_eq!(listen_addr("127.0.0.1", 8080).unwrap().to_string(), "127.0.0.1:8080");

        let err = listen_addr("localhost", 8080).unwrap_err();
        assert!(err.to_string().contains("Invalid BIND_ADDRESS"));
    }

    #[test]
    fn test_healthcheck_urls_try_ipv4_first() {
        let urls = healthcheck_urls(5050);
        assert_eq!(urls[0], "http://127.0.0.1:5050/health");
        assert_eq!(urls[1], "http://[::1]:5050/health");
    }

    #[tokio::test]
    async fn test_bind_listener_explicit_ipv4() {
        let config = Config {
            bind_address: "127.0.0.1".into(),
            port: 0,
            ..Config::default()
        };
        let listener = bind_listener(&config).await.unwrap();
        let addr = listener.local_addr().unwrap();
        assert!(addr.ip().is_loopback());
        assert!(addr.is_ipv4());
        assert_ne!(addr.port(), 0);
    }

    #[tokio::test]
    async fn test_bind_listener_auto_uses_unspecified_address() {
        let config = Config {
            port: 0,
            ..Config::default()
        };
        assert_eq!(config.bind_address, "auto");
        let listener = bind_listener(&config).await.unwrap();
        assert!(listener.local_addr().unwrap().ip().is_unspecified());
    }

    #[tokio::test]
    async fn test_bind_listener_rejects_bad_address() {
        let config = Config {
            bind_address: "not-an-ip".into(),
            port: 0,
            ..Config::default()
        };
        assert!(bind_listener(&config).await.is_err());
    }
}
