//! SOCKS type definitions
//!
//! Defines the core types used in SOCKS5 protocol handling.

use super::consts::*;
use anyhow::{Context, Result};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

/// SOCKS protocol version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    /// SOCKS4 (recognized but not served)
    Socks4,
    /// SOCKS5
    Socks5,
}

impl Version {
    /// Parse a version byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            SOCKS4_VERSION => Some(Version::Socks4),
            SOCKS5_VERSION => Some(Version::Socks5),
            _ => None,
        }
    }

    /// Convert Version to byte
    pub fn to_byte(self) -> u8 {
        match self {
            Version::Socks4 => SOCKS4_VERSION,
            Version::Socks5 => SOCKS5_VERSION,
        }
    }
}

/// SOCKS5 command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocksCommand {
    /// TCP CONNECT - establish a TCP connection to target
    Connect,
    /// TCP BIND - wait for incoming connection (not implemented)
    Bind,
    /// UDP ASSOCIATE - establish UDP relay (not implemented)
    UdpAssociate,
}

impl SocksCommand {
    /// Parse a command byte into SocksCommand
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            SOCKS5_CMD_TCP_CONNECT => Some(SocksCommand::Connect),
            SOCKS5_CMD_TCP_BIND => Some(SocksCommand::Bind),
            SOCKS5_CMD_UDP_ASSOCIATE => Some(SocksCommand::UdpAssociate),
            _ => None,
        }
    }

    /// Convert SocksCommand to byte
    pub fn to_byte(self) -> u8 {
        match self {
            SocksCommand::Connect => SOCKS5_CMD_TCP_CONNECT,
            SocksCommand::Bind => SOCKS5_CMD_TCP_BIND,
            SocksCommand::UdpAssociate => SOCKS5_CMD_UDP_ASSOCIATE,
        }
    }
}

impl fmt::Display for SocksCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocksCommand::Connect => write!(f, "CONNECT"),
            SocksCommand::Bind => write!(f, "BIND"),
            SocksCommand::UdpAssociate => write!(f, "UDP ASSOCIATE"),
        }
    }
}

/// Address type field of requests and replies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressType {
    /// 4-byte IPv4 address
    Ipv4,
    /// Length-prefixed domain name
    DomainName,
    /// 16-byte IPv6 address
    Ipv6,
}

impl AddressType {
    /// Parse an ATYP byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            SOCKS5_ADDR_TYPE_IPV4 => Some(AddressType::Ipv4),
            SOCKS5_ADDR_TYPE_DOMAIN => Some(AddressType::DomainName),
            SOCKS5_ADDR_TYPE_IPV6 => Some(AddressType::Ipv6),
            _ => None,
        }
    }

    /// Convert AddressType to byte
    pub fn to_byte(self) -> u8 {
        match self {
            AddressType::Ipv4 => SOCKS5_ADDR_TYPE_IPV4,
            AddressType::DomainName => SOCKS5_ADDR_TYPE_DOMAIN,
            AddressType::Ipv6 => SOCKS5_ADDR_TYPE_IPV6,
        }
    }
}

/// Address carried in a SOCKS5 request or reply
///
/// Domain names are kept as the raw bytes the client sent; the protocol does
/// not require them to be UTF-8 and an empty name is representable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetAddr {
    /// IP address with port
    Ip(SocketAddr),
    /// Domain name with port
    Domain(Vec<u8>, u16),
}

impl TargetAddr {
    /// Create a new TargetAddr from an IPv4 address and port
    pub fn ipv4(ip: Ipv4Addr, port: u16) -> Self {
        TargetAddr::Ip(SocketAddr::new(IpAddr::V4(ip), port))
    }

    /// Create a new TargetAddr from an IPv6 address and port
    pub fn ipv6(ip: Ipv6Addr, port: u16) -> Self {
        TargetAddr::Ip(SocketAddr::new(IpAddr::V6(ip), port))
    }

    /// Create a new TargetAddr from a domain name and port
    pub fn domain(domain: impl Into<Vec<u8>>, port: u16) -> Self {
        TargetAddr::Domain(domain.into(), port)
    }

    /// Get the port number
    pub fn port(&self) -> u16 {
        match self {
            TargetAddr::Ip(addr) => addr.port(),
            TargetAddr::Domain(_, port) => *port,
        }
    }

    /// Get the address type
    pub fn addr_type(&self) -> AddressType {
        match self {
            TargetAddr::Ip(SocketAddr::V4(_)) => AddressType::Ipv4,
            TargetAddr::Ip(SocketAddr::V6(_)) => AddressType::Ipv6,
            TargetAddr::Domain(_, _) => AddressType::DomainName,
        }
    }

    /// Address bytes as they appear on the wire, without length prefix
    pub fn address_bytes(&self) -> Vec<u8> {
        match self {
            TargetAddr::Ip(SocketAddr::V4(addr)) => addr.ip().octets().to_vec(),
            TargetAddr::Ip(SocketAddr::V6(addr)) => addr.ip().octets().to_vec(),
            TargetAddr::Domain(domain, _) => domain.clone(),
        }
    }

    /// Host part rendered for dialing or logging
    pub fn host(&self) -> String {
        match self {
            TargetAddr::Ip(addr) => addr.ip().to_string(),
            TargetAddr::Domain(domain, _) => String::from_utf8_lossy(domain).into_owned(),
        }
    }

    /// Resolve the address to a SocketAddr
    ///
    /// For IP addresses, this returns immediately.
    /// For domain names, this performs DNS resolution.
    pub async fn resolve(&self) -> Result<SocketAddr> {
        match self {
            TargetAddr::Ip(addr) => Ok(*addr),
            TargetAddr::Domain(_, port) => {
                let host = self.host();
                let resolved = tokio::net::lookup_host((host.as_str(), *port))
                    .await
                    .with_context(|| format!("Failed to resolve domain: {}", host))?
                    .next()
                    .with_context(|| format!("No addresses found for domain: {}", host))?;
                Ok(resolved)
            }
        }
    }

    /// Serialize the address to bytes for SOCKS5 protocol
    ///
    /// Produces `ATYP | ADDR | PORT`. Domain names longer than 255 bytes
    /// cannot be represented and are truncated to 255.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();

        match self {
            TargetAddr::Ip(SocketAddr::V4(addr)) => {
                bytes.push(SOCKS5_ADDR_TYPE_IPV4);
                bytes.extend_from_slice(&addr.ip().octets());
                bytes.extend_from_slice(&addr.port().to_be_bytes());
            }
            TargetAddr::Ip(SocketAddr::V6(addr)) => {
                bytes.push(SOCKS5_ADDR_TYPE_IPV6);
                bytes.extend_from_slice(&addr.ip().octets());
                bytes.extend_from_slice(&addr.port().to_be_bytes());
            }
            TargetAddr::Domain(domain, port) => {
                let len = domain.len().min(u8::MAX as usize);
                bytes.push(SOCKS5_ADDR_TYPE_DOMAIN);
                bytes.push(len as u8);
                bytes.extend_from_slice(&domain[..len]);
                bytes.extend_from_slice(&port.to_be_bytes());
            }
        }

        bytes
    }

    /// Number of bytes `to_bytes` produces
    pub fn encoded_len(&self) -> usize {
        match self {
            TargetAddr::Ip(SocketAddr::V4(_)) => 1 + 4 + 2,
            TargetAddr::Ip(SocketAddr::V6(_)) => 1 + 16 + 2,
            TargetAddr::Domain(domain, _) => 1 + 1 + domain.len().min(u8::MAX as usize) + 2,
        }
    }
}

impl fmt::Display for TargetAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetAddr::Ip(addr) => write!(f, "{}", addr),
            TargetAddr::Domain(_, port) => write!(f, "{}:{}", self.host(), port),
        }
    }
}

impl From<SocketAddr> for TargetAddr {
    fn from(addr: SocketAddr) -> Self {
        TargetAddr::Ip(addr)
    }
}

impl Default for TargetAddr {
    fn default() -> Self {
        TargetAddr::Ip(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0))
    }
}

/// Parsed client greeting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Protocol version
    pub version: Version,
    /// Offered authentication methods, in the order the client sent them
    pub methods: Vec<u8>,
}

impl Header {
    /// Whether the client offered the given method
    pub fn offers(&self, method: u8) -> bool {
        self.methods.contains(&method)
    }

    /// Bytes the greeting occupied on the wire
    pub fn encoded_len(&self) -> usize {
        2 + self.methods.len()
    }
}

/// Parsed CONNECT request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Protocol version
    pub version: Version,
    /// Requested command
    pub command: SocksCommand,
    /// Destination address and port
    pub destination: TargetAddr,
}

impl Request {
    /// Address type of the destination
    pub fn address_type(&self) -> AddressType {
        self.destination.addr_type()
    }

    /// Destination port
    pub fn port(&self) -> u16 {
        self.destination.port()
    }

    /// Bytes the request occupied on the wire
    pub fn encoded_len(&self) -> usize {
        3 + self.destination.encoded_len()
    }
}
