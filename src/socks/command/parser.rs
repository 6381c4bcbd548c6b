//! SOCKS5 request parser
//!
//! Parses SOCKS5 command requests from the client.

use crate::error::{DecodeError, ProxyError, ReplyReason};
use crate::socks::consts::*;
use crate::socks::types::{AddressType, Request, SocksCommand, TargetAddr, Version};
use std::net::{Ipv4Addr, Ipv6Addr};

/// Parse a SOCKS5 request
///
/// # SOCKS5 Request Format
///
/// ```text
/// +----+-----+-------+------+----------+----------+
/// |VER | CMD |  RSV  | ATYP | DST.ADDR | DST.PORT |
/// +----+-----+-------+------+----------+----------+
/// | 1  |  1  | X'00' |  1   | Variable |    2     |
/// +----+-----+-------+------+----------+----------+
/// ```
///
/// Only CONNECT is accepted. BIND and UDP ASSOCIATE are recognized and
/// rejected with `CommandNotSupported`. The reserved byte is not checked.
pub fn parse_request(buf: &[u8]) -> Result<Request, ProxyError> {
    if buf.len() < MIN_REQUEST_LEN {
        return Err(ProxyError::new(
            ReplyReason::ConnectionRefused,
            DecodeError::TooShort {
                expected: MIN_REQUEST_LEN,
                actual: buf.len(),
            },
        ));
    }

    let version = Version::from_byte(buf[0]).ok_or_else(|| {
        ProxyError::new(
            ReplyReason::ConnectionRefused,
            DecodeError::UnknownVersion(buf[0]),
        )
    })?;

    let command = match SocksCommand::from_byte(buf[1]) {
        Some(SocksCommand::Connect) => SocksCommand::Connect,
        Some(other) => {
            return Err(ProxyError::msg(
                ReplyReason::CommandNotSupported,
                format!("command {} not supported", other),
            ))
        }
        None => {
            return Err(ProxyError::msg(
                ReplyReason::CommandNotSupported,
                format!("command {:#04x} not supported", buf[1]),
            ))
        }
    };

    let addr_type = AddressType::from_byte(buf[3]).ok_or_else(|| {
        ProxyError::new(
            ReplyReason::AddressTypeNotSupported,
            DecodeError::UnknownAddressType(buf[3]),
        )
    })?;

    let (destination, _) = decode_address(addr_type, &buf[4..])
        .map_err(|e| ProxyError::new(ReplyReason::GeneralFailure, e))?;

    Ok(Request {
        version,
        command,
        destination,
    })
}

/// Decode `DST.ADDR | DST.PORT` for the given address type
///
/// Returns the address and the number of bytes consumed. Lengths that run
/// past the end of `buf` are reported as [`DecodeError::Truncated`].
pub fn decode_address(
    addr_type: AddressType,
    buf: &[u8],
) -> Result<(TargetAddr, usize), DecodeError> {
    match addr_type {
        AddressType::Ipv4 => {
            let addr: [u8; 4] = take(buf, 0, 4, "IPv4 address")?
                .try_into()
                .map_err(|_| truncated("IPv4 address", 4, buf.len()))?;
            let port = read_port(buf, 4)?;
            Ok((TargetAddr::ipv4(Ipv4Addr::from(addr), port), 4 + 2))
        }

        AddressType::DomainName => {
            let domain_len = take(buf, 0, 1, "domain length")?[0] as usize;
            let domain = take(buf, 1, domain_len, "domain name")?.to_vec();
            let port = read_port(buf, 1 + domain_len)?;
            Ok((TargetAddr::domain(domain, port), 1 + domain_len + 2))
        }

        AddressType::Ipv6 => {
            let addr: [u8; 16] = take(buf, 0, 16, "IPv6 address")?
                .try_into()
                .map_err(|_| truncated("IPv6 address", 16, buf.len()))?;
            let port = read_port(buf, 16)?;
            Ok((TargetAddr::ipv6(Ipv6Addr::from(addr), port), 16 + 2))
        }
    }
}

fn take<'a>(
    buf: &'a [u8],
    offset: usize,
    len: usize,
    field: &'static str,
) -> Result<&'a [u8], DecodeError> {
    buf.get(offset..offset + len)
        .ok_or_else(|| truncated(field, len, buf.len().saturating_sub(offset)))
}

fn read_port(buf: &[u8], offset: usize) -> Result<u16, DecodeError> {
    let bytes = take(buf, offset, 2, "port")?;
    Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
}

fn truncated(field: &'static str, needed: usize, available: usize) -> DecodeError {
    DecodeError::Truncated {
        field,
        needed,
        available,
    }
}
