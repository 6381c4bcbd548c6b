//! SOCKS5 command parsing module
//!
//! Handles parsing SOCKS5 requests and encoding replies.

mod parser;
mod reply;

pub use parser::{decode_address, parse_request};
pub use reply::{encode_error_reply, encode_reply};
