//! Test utilities and mocks for Socksrelay
//!
//! This module provides common test utilities used across integration tests.

#![allow(dead_code)]

use socksrelay::handler::ProxyHandler;
use socksrelay::{Proxy, ProxyConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Create a test TCP listener on an available port
pub async fn create_test_listener() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// An address nothing is listening on
pub async fn closed_addr() -> SocketAddr {
    let (_listener, addr) = create_test_listener().await;
    addr
}

/// Spawn a TCP server that echoes every connection until EOF
pub async fn spawn_echo_server() -> SocketAddr {
    let (listener, addr) = create_test_listener().await;

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (mut reader, mut writer) = stream.split();
                let _ = tokio::io::copy(&mut reader, &mut writer).await;
                let _ = writer.shutdown().await;
            });
        }
    });

    addr
}

/// Start a proxy on an ephemeral port
pub async fn start_proxy(handler: Arc<dyn ProxyHandler>, timeout: Duration) -> (Proxy, SocketAddr) {
    let config = ProxyConfig::new("127.0.0.1:0".parse().unwrap(), handler).with_timeout(timeout);
    let mut proxy = Proxy::new(config);
    let addr = proxy.start().await.unwrap();
    (proxy, addr)
}

/// Send a no-auth greeting and check the selection
pub async fn negotiate_no_auth(stream: &mut TcpStream) {
    stream
        .write_all(&socks5_mock::create_auth_request_no_auth())
        .await
        .unwrap();
    let mut selection = [0u8; 2];
    stream.read_exact(&mut selection).await.unwrap();
    assert_eq!(selection, [0x05, 0x00]);
}

/// Read one complete reply message
pub async fn read_reply(stream: &mut TcpStream) -> Vec<u8> {
    let mut reply = vec![0u8; 4];
    stream.read_exact(&mut reply).await.unwrap();

    let rest = match reply[3] {
        0x01 => 4 + 2,
        0x04 => 16 + 2,
        0x03 => {
            let len = stream.read_u8().await.unwrap();
            reply.push(len);
            len as usize + 2
        }
        other => panic!("unexpected address type {:#04x}", other),
    };

    let mut tail = vec![0u8; rest];
    stream.read_exact(&mut tail).await.unwrap();
    reply.extend_from_slice(&tail);
    reply
}

/// Mock SOCKS5 handshake data
pub mod socks5_mock {
    use socksrelay::socks::*;
    use std::net::SocketAddr;

    /// Create a no-auth method selection request
    pub fn create_auth_request_no_auth() -> Vec<u8> {
        vec![SOCKS5_VERSION, 1, SOCKS5_AUTH_METHOD_NONE]
    }

    /// Create a greeting offering the given methods
    pub fn create_auth_request(methods: &[u8]) -> Vec<u8> {
        let mut request = vec![SOCKS5_VERSION, methods.len() as u8];
        request.extend_from_slice(methods);
        request
    }

    /// Create a connect command to IPv4 address
    pub fn create_connect_ipv4(ip: [u8; 4], port: u16) -> Vec<u8> {
        let mut cmd = vec![
            SOCKS5_VERSION,
            SOCKS5_CMD_TCP_CONNECT,
            SOCKS5_RESERVED,
            SOCKS5_ADDR_TYPE_IPV4,
        ];
        cmd.extend_from_slice(&ip);
        cmd.extend_from_slice(&port.to_be_bytes());
        cmd
    }

    /// Create a connect command to a local socket address
    pub fn create_connect_addr(addr: SocketAddr) -> Vec<u8> {
        let mut cmd = vec![SOCKS5_VERSION, SOCKS5_CMD_TCP_CONNECT, SOCKS5_RESERVED];
        cmd.extend_from_slice(&TargetAddr::from(addr).to_bytes());
        cmd
    }

    /// Create a connect command to domain
    pub fn create_connect_domain(domain: &str, port: u16) -> Vec<u8> {
        let mut cmd = vec![
            SOCKS5_VERSION,
            SOCKS5_CMD_TCP_CONNECT,
            SOCKS5_RESERVED,
            SOCKS5_ADDR_TYPE_DOMAIN,
            domain.len() as u8,
        ];
        cmd.extend_from_slice(domain.as_bytes());
        cmd.extend_from_slice(&port.to_be_bytes());
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_test_listener() {
        let (listener, addr) = create_test_listener().await;
        assert!(addr.port() > 0);
        drop(listener);
    }

    #[tokio::test]
    async fn test_echo_server() {
        let addr = spawn_echo_server().await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        stream.write_all(b"hello").await.unwrap();
        let mut buf = [0u8; 5];
        stream.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn test_socks5_mock_auth_request() {
        let request = socks5_mock::create_auth_request_no_auth();
        assert_eq!(request[0], 5); // SOCKS5 version
        assert_eq!(request[1], 1); // 1 method
        assert_eq!(request[2], 0); // NO AUTH

        assert_eq!(socks5_mock::create_auth_request(&[1, 2]), vec![5, 2, 1, 2]);
    }

    #[test]
    fn test_socks5_mock_connect_ipv4() {
        let cmd = socks5_mock::create_connect_ipv4([192, 168, 1, 1], 8080);
        assert_eq!(cmd[0], 5); // SOCKS5 version
        assert_eq!(cmd[1], 1); // CONNECT
        assert_eq!(cmd[3], 1); // IPv4
        assert_eq!(&cmd[4..8], &[192, 168, 1, 1]);
    }

    #[test]
    fn test_socks5_mock_connect_addr() {
        let cmd = socks5_mock::create_connect_addr("127.0.0.1:8080".parse().unwrap());
        assert_eq!(cmd, socks5_mock::create_connect_ipv4([127, 0, 0, 1], 8080));
    }
}
