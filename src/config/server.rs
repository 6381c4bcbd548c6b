//! Listener and handler configuration types

use crate::socks::DEFAULT_BUFFER_SIZE;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Default per-operation timeout in seconds
fn default_timeout() -> u64 {
    10
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

/// Listener configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to listen on, e.g. "127.0.0.1:1080"
    pub bind_addr: String,

    /// Deadline in seconds for every read and write on a connection
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl ServerConfig {
    /// Parse the bind address
    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        self.bind_addr
            .parse()
            .map_err(|e| format!("invalid bind_addr {:?}: {}", self.bind_addr, e))
    }

    /// Per-operation timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        self.socket_addr()?;
        if self.timeout == 0 {
            return Err("server.timeout must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Settings for the built-in direct handler
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct HandlerConfig {
    /// Deadline in seconds for resolving and connecting to a destination
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    /// Copy buffer size in bytes
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        HandlerConfig {
            connect_timeout: default_connect_timeout(),
            buffer_size: default_buffer_size(),
        }
    }
}

impl HandlerConfig {
    /// Dial timeout
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.connect_timeout == 0 {
            return Err("handler.connect_timeout must be greater than zero".to_string());
        }
        if self.buffer_size == 0 {
            return Err("handler.buffer_size must be greater than zero".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(bind_addr: &str, timeout: u64) -> ServerConfig {
        ServerConfig {
            bind_addr: bind_addr.to_string(),
            timeout,
        }
    }

    #[test]
    fn test_server_config_validate() {
        assert!(server("127.0.0.1:1080", 10).validate().is_ok());
        assert!(server("[::1]:1080", 1).validate().is_ok());

        let err = server("localhost", 10).validate().unwrap_err();
        assert!(err.contains("bind_addr"));

        let err = server("127.0.0.1:1080", 0).validate().unwrap_err();
        assert!(err.contains("timeout"));
    }

    #[test]
    fn test_server_config_timeout() {
        assert_eq!(
            server("127.0.0.1:1080", 7).timeout(),
            Duration::from_secs(7)
        );
    }

    #[test]
    fn test_handler_config_default() {
        let config = HandlerConfig::default();
        assert_eq!(config.connect_timeout, 10);
        assert_eq!(config.buffer_size, DEFAULT_BUFFER_SIZE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_handler_config_validate() {
        let config = HandlerConfig {
            connect_timeout: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = HandlerConfig {
            buffer_size: 0,
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().contains("buffer_size"));
    }
}
