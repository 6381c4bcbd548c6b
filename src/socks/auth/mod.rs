//! SOCKS5 method negotiation
//!
//! Parses the client greeting and selects an authentication method. Only
//! "no authentication" is served.

use super::consts::*;
use super::types::{Header, Version};
use crate::error::{DecodeError, ProxyError, ReplyReason};

/// Parse the client greeting
///
/// # SOCKS5 Greeting Format
///
/// ```text
/// +----+----------+----------+
/// |VER | NMETHODS | METHODS  |
/// +----+----------+----------+
/// | 1  |    1     | 1 to 255 |
/// +----+----------+----------+
/// ```
///
/// Bytes after the declared methods are not consumed; use
/// [`Header::encoded_len`] to find where the next message starts.
pub fn parse_header(buf: &[u8]) -> Result<Header, DecodeError> {
    if buf.len() < MIN_HEADER_LEN {
        return Err(DecodeError::TooShort {
            expected: MIN_HEADER_LEN,
            actual: buf.len(),
        });
    }

    let version = Version::from_byte(buf[0]).ok_or(DecodeError::UnknownVersion(buf[0]))?;

    let num_methods = buf[1] as usize;
    let methods = buf[2..]
        .get(..num_methods)
        .ok_or(DecodeError::Truncated {
            field: "methods",
            needed: num_methods,
            available: buf.len() - 2,
        })?
        .to_vec();

    Ok(Header { version, methods })
}

/// Select the method to use for this client
///
/// SOCKS4 greetings are rejected as not implemented. A SOCKS5 client must
/// offer "no authentication"; anything else yields `MethodNotSupported`.
pub fn select_method(header: &Header) -> Result<u8, ProxyError> {
    match header.version {
        Version::Socks4 => Err(ProxyError::msg(
            ReplyReason::CommandNotSupported,
            "socks4 not yet implemented",
        )),
        Version::Socks5 if header.offers(SOCKS5_AUTH_METHOD_NONE) => Ok(SOCKS5_AUTH_METHOD_NONE),
        Version::Socks5 => Err(ProxyError::msg(
            ReplyReason::MethodNotSupported,
            format!(
                "only no-authentication is supported, client offered {:02x?}",
                header.methods
            ),
        )),
    }
}

/// Encode the method-selection message
pub fn method_selection(method: u8) -> [u8; 2] {
    [SOCKS5_VERSION, method]
}
