//! Server configuration loaded from the environment

use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Default bind host
pub const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// Default bind port
pub const DEFAULT_PORT: u16 = 8888;

/// Where the mock server listens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    /// Bind host
    pub host: IpAddr,
    /// Bind port; `0` picks a free port
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST,
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    /// Load from `MOCK_SERVER_HOST` and `MOCK_SERVER_PORT`
    ///
    /// Missing or unparsable values fall back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            host: lookup("MOCK_SERVER_HOST")
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_HOST),
            port: lookup("MOCK_SERVER_PORT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_PORT),
        }
    }

    /// The socket address to bind
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_when_unset() {
        let config = ServerConfig::from_lookup(|_| None);
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.addr().to_string(), "127.0.0.1:8888");
    }

    #[test]
    fn test_values_from_lookup() {
        let vars = HashMap::from([
            ("MOCK_SERVER_HOST", "0.0.0.0"),
            ("MOCK_SERVER_PORT", "9000"),
        ]);
        let config = ServerConfig::from_lookup(|key| vars.get(key).map(ToString::to_string));

        assert_eq!(config.addr().to_string(), "0.0.0.0:9000");
    }

    #[test]
    fn test_invalid_port_falls_back() {
        let config = ServerConfig::from_lookup(|key| {
            (key == "MOCK_SERVER_PORT").then(|| "not-a-port".to_string())
        });
        assert_eq!(config.port, DEFAULT_PORT);
    }
}
