//! # Socksrelay - Embeddable SOCKS5 Proxy Engine
//!
//! Socksrelay accepts SOCKS5 clients on a TCP listener, negotiates the
//! RFC 1928 handshake, and hands the CONNECT request to a pluggable
//! [`ProxyHandler`] that dials the destination and moves the bytes.
//!
//! ## Features
//!
//! - **No-auth CONNECT**: method 0x00 and the CONNECT command over IPv4,
//!   IPv6 and domain-name addresses
//! - **Pluggable handlers**: dial, copy, keepalive and cleanup policy behind
//!   one trait; [`DefaultHandler`] dials directly over TCP
//! - **Bounded I/O**: every negotiation read and write carries a deadline
//! - **Graceful stop**: stopping the proxy interrupts negotiation without
//!   cutting established relays
//!
//! ## Usage
//!
//! ```rust,ignore
//! use socksrelay::{DefaultHandler, Proxy, ProxyConfig};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let handler = Arc::new(DefaultHandler::new(Duration::from_secs(10)));
//!     let config = ProxyConfig::new("127.0.0.1:1080".parse()?, handler);
//!
//!     let mut proxy = Proxy::new(config);
//!     proxy.start().await?;
//!     tokio::signal::ctrl_c().await?;
//!     proxy.stop();
//!     proxy.wait().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! SOCKS5 Client -> Proxy (accept) -> Connection (negotiate) -> Handler (dial) -> Target
//!                                                  \-> Relay (handler copies, both directions)
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod handler;
pub mod proxy;
pub mod relay;
pub mod socks;
pub mod transport;

// Re-export commonly used items
pub use config::{load_config, Config};
pub use error::{ProxyError, ReplyReason, SocksRelayError};
pub use handler::{Backend, DefaultHandler, ProxyHandler};
pub use proxy::{Proxy, ProxyConfig};

/// Version of the Socksrelay library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the application
pub const NAME: &str = env!("CARGO_PKG_NAME");
