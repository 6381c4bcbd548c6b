//! SOCKS protocol constants
//!
//! Defines all constants used in the SOCKS5 protocol implementation.

/// SOCKS4 protocol version (recognized, never served)
pub const SOCKS4_VERSION: u8 = 0x04;

/// SOCKS5 protocol version
pub const SOCKS5_VERSION: u8 = 0x05;

// Authentication methods
/// No authentication required
pub const SOCKS5_AUTH_METHOD_NONE: u8 = 0x00;
/// GSSAPI authentication (not implemented)
pub const SOCKS5_AUTH_METHOD_GSSAPI: u8 = 0x01;
/// Username/password authentication (not implemented)
pub const SOCKS5_AUTH_METHOD_PASSWORD: u8 = 0x02;
/// No acceptable methods
pub const SOCKS5_AUTH_METHOD_NOT_ACCEPTABLE: u8 = 0xFF;

// Commands
/// TCP CONNECT command
pub const SOCKS5_CMD_TCP_CONNECT: u8 = 0x01;
/// TCP BIND command (not implemented)
pub const SOCKS5_CMD_TCP_BIND: u8 = 0x02;
/// UDP ASSOCIATE command (not implemented)
pub const SOCKS5_CMD_UDP_ASSOCIATE: u8 = 0x03;

// Address types
/// IPv4 address
pub const SOCKS5_ADDR_TYPE_IPV4: u8 = 0x01;
/// Domain name
pub const SOCKS5_ADDR_TYPE_DOMAIN: u8 = 0x03;
/// IPv6 address
pub const SOCKS5_ADDR_TYPE_IPV6: u8 = 0x04;

// Reserved byte
/// Reserved byte value (always 0x00)
pub const SOCKS5_RESERVED: u8 = 0x00;

// Message sizes
/// Shortest valid greeting: VER, NMETHODS and one METHOD byte
pub const MIN_HEADER_LEN: usize = 3;
/// Shortest valid request: VER, CMD, RSV, ATYP, one address byte, PORT
pub const MIN_REQUEST_LEN: usize = 7;
/// Upper bound on a single negotiation message read from a client
pub const MAX_MESSAGE_SIZE: usize = 4096;
/// Chunk size for negotiation reads; a shorter read ends the message
pub const READ_CHUNK_SIZE: usize = 1024;
/// Default buffer size for data transfer
pub const DEFAULT_BUFFER_SIZE: usize = 10240;
