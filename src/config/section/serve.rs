//! `[serve]` section configuration.
//!
//! Contains development server settings.
//!
//! # Example
//!
//! ```toml
//! [serve]
//! interface = "127.0.0.1"     # Network interface (127.0.0.1 = localhost only)
//! port = 3000                 # HTTP port number
//! ws_port = 35729             # Live-reload WebSocket port
//! live_reload = true          # Inject the reload client into pages
//! ```
//!
//! Use `interface = "0.0.0.0"` to make the server accessible from LAN.
//! Both ports are starting points: the next free port is taken if busy.

use std::net::{IpAddr, Ipv4Addr};

use serde::{Deserialize, Serialize};

/// Development server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Network interface to bind.
    /// - `127.0.0.1` (default): localhost only
    /// - `0.0.0.0`: all interfaces (LAN accessible)
    pub interface: IpAddr,

    /// HTTP port number.
    pub port: u16,

    /// WebSocket port for the live-reload channel.
    pub ws_port: u16,

    /// Inject the live-reload client into HTML responses.
    pub live_reload: bool,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 3000,
            ws_port: 35729,
            live_reload: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

    use crate::config::test_parse_config;

    #[test]
    fn test_serve_config() {
        let config = test_parse_config(
            "[serve]\ninterface = \"0.0.0.0\"\nport = 8080\nws_port = 9000\nlive_reload = false",
        );

        assert_eq!(
            config.serve.interface,
            IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0))
        );
        assert_eq!(config.serve.port, 8080);
        assert_eq!(config.serve.ws_port, 9000);
        assert!(!config.serve.live_reload);
    }

    #[test]
    fn test_serve_config_defaults() {
        let config = test_parse_config("");

        assert_eq!(
            config.serve.interface,
            IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
        );
        assert_eq!(config.serve.port, 3000);
        assert_eq!(config.serve.ws_port, 35729);
        assert!(config.serve.live_reload);
    }

    #[test]
    fn test_serve_config_ipv6() {
        let config = test_parse_config("[serve]\ninterface = \"::1\"");
        assert_eq!(
            config.serve.interface,
            IpAddr::V6(Ipv6Addr::new(0, 0, 0, 0, 0, 0, 0, 1))
        );
    }

    #[test]
    fn test_serve_config_partial_override() {
        let config = test_parse_config("[serve]\nport = 4000");

        assert_eq!(config.serve.port, 4000);
        assert_eq!(config.serve.ws_port, 35729);
        assert!(config.serve.live_reload);
    }
}
