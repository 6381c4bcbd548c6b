//! Configuration module for Socksrelay
//!
//! This module provides configuration types and TOML parsing for the proxy.

mod server;
mod tcp;

pub use server::{HandlerConfig, ServerConfig};
pub use tcp::TcpConfig;

use crate::error::SocksRelayError;
use crate::handler::DefaultHandler;
use crate::proxy::ProxyConfig;
use crate::transport::SocketOpts;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Top-level configuration file
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Config {
    /// Listener settings
    pub server: ServerConfig,

    /// Direct handler settings
    #[serde(default)]
    pub handler: HandlerConfig,

    /// Socket options
    #[serde(default)]
    pub tcp: TcpConfig,
}

impl Config {
    /// Configuration listening on `bind_addr` with every other value defaulted
    pub fn with_bind_addr(bind_addr: impl Into<String>) -> Self {
        Config {
            server: ServerConfig {
                bind_addr: bind_addr.into(),
                timeout: 10,
            },
            handler: HandlerConfig::default(),
            tcp: TcpConfig::default(),
        }
    }

    /// Validate every section
    pub fn validate(&self) -> Result<(), String> {
        self.server.validate()?;
        self.handler.validate()?;
        Ok(())
    }

    /// Build the direct handler described by this configuration
    pub fn build_handler(&self) -> DefaultHandler {
        DefaultHandler::new(self.server.timeout())
            .with_connect_timeout(self.handler.connect_timeout())
            .with_buffer_size(self.handler.buffer_size)
            .with_socket_opts(SocketOpts::from_tcp_config(&self.tcp))
    }

    /// Build the runtime listener configuration
    pub fn proxy_config(&self) -> Result<ProxyConfig, SocksRelayError> {
        self.validate().map_err(SocksRelayError::Config)?;
        let bind_addr = self
            .server
            .socket_addr()
            .map_err(SocksRelayError::Config)?;

        Ok(ProxyConfig {
            bind_addr,
            timeout: self.server.timeout(),
            handler: Arc::new(self.build_handler()),
        })
    }
}

/// Load and validate configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

    parse_config(&content)
}

/// Parse and validate configuration from a TOML string
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config =
        toml::from_str(content).with_context(|| "Failed to parse configuration")?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!(e))
        .with_context(|| "Invalid configuration")?;
    Ok(config)
}
