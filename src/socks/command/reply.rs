//! SOCKS5 reply encoder
//!
//! Constructs SOCKS5 reply messages.

use crate::error::ReplyReason;
use crate::socks::consts::*;
use crate::socks::types::TargetAddr;

/// Encode a SOCKS5 reply
///
/// # SOCKS5 Reply Format
///
/// ```text
/// +----+-----+-------+------+----------+----------+
/// |VER | REP |  RSV  | ATYP | BND.ADDR | BND.PORT |
/// +----+-----+-------+------+----------+----------+
/// | 1  |  1  | X'00' |  1   | Variable |    2     |
/// +----+-----+-------+------+----------+----------+
/// ```
///
/// # Arguments
///
/// * `bound` - The bound address; `None` encodes `0.0.0.0:0`
/// * `reason` - The reply status code
pub fn encode_reply(bound: Option<&TargetAddr>, reason: ReplyReason) -> Vec<u8> {
    let unspecified = TargetAddr::default();
    let bound = bound.unwrap_or(&unspecified);

    let mut reply = Vec::with_capacity(3 + bound.encoded_len());
    reply.extend_from_slice(&[SOCKS5_VERSION, reason.into(), SOCKS5_RESERVED]);
    reply.extend_from_slice(&bound.to_bytes());
    reply
}

/// Encode an error reply, which never carries a bound address
pub fn encode_error_reply(reason: ReplyReason) -> Vec<u8> {
    encode_reply(None, reason)
}
