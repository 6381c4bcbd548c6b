//! SOCKS5 wire codec for Socksrelay
//!
//! Pure encoders and decoders for the greeting, the request and the reply
//! messages of RFC 1928. Nothing in this module performs I/O.

mod auth;
mod command;
mod consts;
mod types;

pub use auth::{method_selection, parse_header, select_method};
pub use command::{decode_address, encode_error_reply, encode_reply, parse_request};
pub use consts::*;
pub use types::{AddressType, Header, Request, SocksCommand, TargetAddr, Version};
