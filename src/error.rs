//! Error types for Socksrelay
//!
//! This module defines the reply-code taxonomy shared by the wire codec and
//! the connection state machine, plus the error types raised by each layer.

use std::fmt;
use std::io;
use thiserror::Error;

/// Crate-level error type for listener and configuration operations
#[derive(Error, Debug)]
pub enum SocksRelayError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The listening socket could not be bound
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Address we tried to bind
        addr: String,
        /// Underlying socket error
        #[source]
        source: io::Error,
    },

    /// `start` was called on a proxy that is already running
    #[error("Proxy already started")]
    AlreadyStarted,

    /// SOCKS5 protocol error
    #[error("SOCKS5 error: {0}")]
    Proxy(#[from] ProxyError),
}

/// Reply codes for the SOCKS5 protocol
///
/// The nine RFC 1928 status codes plus `MethodNotSupported` (0xFF), which is
/// sent when method negotiation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ReplyReason {
    /// Command succeeded
    Succeeded = 0x00,
    /// General SOCKS server failure
    GeneralFailure = 0x01,
    /// Connection not allowed by ruleset
    ConnectionNotAllowed = 0x02,
    /// Network unreachable
    NetworkUnreachable = 0x03,
    /// Host unreachable
    HostUnreachable = 0x04,
    /// Connection refused
    ConnectionRefused = 0x05,
    /// TTL expired
    TtlExpired = 0x06,
    /// Command not supported
    CommandNotSupported = 0x07,
    /// Address type not supported
    AddressTypeNotSupported = 0x08,
    /// No acceptable authentication method
    MethodNotSupported = 0xFF,
}

impl ReplyReason {
    /// Classify a failed backend dial.
    ///
    /// Anything without a more specific mapping is reported as
    /// `HostUnreachable`.
    pub fn for_dial_error(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionRefused => ReplyReason::ConnectionRefused,
            io::ErrorKind::PermissionDenied => ReplyReason::ConnectionNotAllowed,
            io::ErrorKind::NetworkUnreachable => ReplyReason::NetworkUnreachable,
            io::ErrorKind::HostUnreachable => ReplyReason::HostUnreachable,
            _ => ReplyReason::HostUnreachable,
        }
    }
}

impl From<ReplyReason> for u8 {
    fn from(reason: ReplyReason) -> Self {
        reason as u8
    }
}

impl TryFrom<u8> for ReplyReason {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(ReplyReason::Succeeded),
            0x01 => Ok(ReplyReason::GeneralFailure),
            0x02 => Ok(ReplyReason::ConnectionNotAllowed),
            0x03 => Ok(ReplyReason::NetworkUnreachable),
            0x04 => Ok(ReplyReason::HostUnreachable),
            0x05 => Ok(ReplyReason::ConnectionRefused),
            0x06 => Ok(ReplyReason::TtlExpired),
            0x07 => Ok(ReplyReason::CommandNotSupported),
            0x08 => Ok(ReplyReason::AddressTypeNotSupported),
            0xFF => Ok(ReplyReason::MethodNotSupported),
            other => Err(other),
        }
    }
}

impl fmt::Display for ReplyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ReplyReason::Succeeded => "succeeded",
            ReplyReason::GeneralFailure => "general SOCKS server failure",
            ReplyReason::ConnectionNotAllowed => "connection not allowed by ruleset",
            ReplyReason::NetworkUnreachable => "network unreachable",
            ReplyReason::HostUnreachable => "host unreachable",
            ReplyReason::ConnectionRefused => "connection refused",
            ReplyReason::TtlExpired => "TTL expired",
            ReplyReason::CommandNotSupported => "command not supported",
            ReplyReason::AddressTypeNotSupported => "address type not supported",
            ReplyReason::MethodNotSupported => "method not supported",
        };
        f.write_str(text)
    }
}

/// Failure carrying the reply reason the client should see
///
/// Every failure in the connection state machine is turned into one of
/// these before an error reply is written.
#[derive(Error, Debug)]
#[error("{reason}: {source:#}")]
pub struct ProxyError {
    reason: ReplyReason,
    #[source]
    source: anyhow::Error,
}

impl ProxyError {
    /// Create a new error with the given reason and cause
    pub fn new<E>(reason: ReplyReason, source: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        ProxyError {
            reason,
            source: source.into(),
        }
    }

    /// Create a new error from a plain message
    pub fn msg<M>(reason: ReplyReason, message: M) -> Self
    where
        M: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        ProxyError {
            reason,
            source: anyhow::Error::msg(message),
        }
    }

    /// Reply reason sent to the client
    pub fn reason(&self) -> ReplyReason {
        self.reason
    }

    /// Underlying cause
    pub fn cause(&self) -> &anyhow::Error {
        &self.source
    }
}

/// Wire codec failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer bytes than the fixed part of the message
    #[error("message too short: expected at least {expected} bytes, got {actual}")]
    TooShort {
        /// Minimum length of the message
        expected: usize,
        /// Bytes available
        actual: usize,
    },

    /// A length field points past the end of the buffer
    #[error("truncated {field}: need {needed} bytes, {available} available")]
    Truncated {
        /// Field being decoded
        field: &'static str,
        /// Bytes the field requires
        needed: usize,
        /// Bytes left in the buffer
        available: usize,
    },

    /// Version byte is neither SOCKS4 nor SOCKS5
    #[error("unknown SOCKS version {0:#04x}")]
    UnknownVersion(u8),

    /// Address type byte outside {0x01, 0x03, 0x04}
    #[error("unknown address type {0:#04x}")]
    UnknownAddressType(u8),
}

/// Failures of deadline-bounded reads and writes
#[derive(Error, Debug)]
pub enum TransportError {
    /// The operation did not finish before its deadline
    #[error("deadline exceeded")]
    Timeout,

    /// The operation was interrupted by cancellation
    #[error("operation cancelled")]
    Cancelled,

    /// The peer closed the stream before sending anything
    #[error("connection closed by peer")]
    Closed,

    /// Other IO error
    #[error("IO error: {0}")]
    Io(io::Error),
}

impl TransportError {
    /// Whether this error is a deadline expiry
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout)
    }
}

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            // Raised by DeadlineStream when its deadline passes.
            io::ErrorKind::TimedOut => TransportError::Timeout,
            io::ErrorKind::UnexpectedEof => TransportError::Closed,
            _ => TransportError::Io(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_REASONS: [ReplyReason; 10] = [
        ReplyReason::Succeeded,
        ReplyReason::GeneralFailure,
        ReplyReason::ConnectionNotAllowed,
        ReplyReason::NetworkUnreachable,
        ReplyReason::HostUnreachable,
        ReplyReason::ConnectionRefused,
        ReplyReason::TtlExpired,
        ReplyReason::CommandNotSupported,
        ReplyReason::AddressTypeNotSupported,
        ReplyReason::MethodNotSupported,
    ];

    #[test]
    fn test_reply_reason_byte_values() {
        assert_eq!(u8::from(ReplyReason::Succeeded), 0x00);
        assert_eq!(u8::from(ReplyReason::HostUnreachable), 0x04);
        assert_eq!(u8::from(ReplyReason::AddressTypeNotSupported), 0x08);
        assert_eq!(u8::from(ReplyReason::MethodNotSupported), 0xFF);
    }

    #[test]
    fn test_reply_reason_from_u8() {
        for reason in ALL_REASONS {
            assert_eq!(ReplyReason::try_from(u8::from(reason)), Ok(reason));
        }
    }

    #[test]
    fn test_reply_reason_from_u8_unassigned() {
        assert_eq!(ReplyReason::try_from(0x09), Err(0x09));
        assert_eq!(ReplyReason::try_from(0xFE), Err(0xFE));
    }

    #[test]
    fn test_reply_reason_for_dial_error() {
        let err = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        assert_eq!(
            ReplyReason::for_dial_error(&err),
            ReplyReason::ConnectionRefused
        );

        let err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(
            ReplyReason::for_dial_error(&err),
            ReplyReason::ConnectionNotAllowed
        );

        let err = io::Error::new(io::ErrorKind::NetworkUnreachable, "no route to network");
        assert_eq!(
            ReplyReason::for_dial_error(&err),
            ReplyReason::NetworkUnreachable
        );

        let err = io::Error::new(io::ErrorKind::HostUnreachable, "no route to host");
        assert_eq!(
            ReplyReason::for_dial_error(&err),
            ReplyReason::HostUnreachable
        );

        let err = io::Error::new(io::ErrorKind::TimedOut, "timeout");
        assert_eq!(
            ReplyReason::for_dial_error(&err),
            ReplyReason::HostUnreachable
        );

        let err = io::Error::new(io::ErrorKind::Other, "other");
        assert_eq!(
            ReplyReason::for_dial_error(&err),
            ReplyReason::HostUnreachable
        );
    }

    #[test]
    fn test_reply_reason_display() {
        assert_eq!(ReplyReason::HostUnreachable.to_string(), "host unreachable");
        assert_eq!(
            ReplyReason::MethodNotSupported.to_string(),
            "method not supported"
        );
    }

    #[test]
    fn test_proxy_error_display_and_reason() {
        let err = ProxyError::msg(ReplyReason::CommandNotSupported, "command 0x02");
        assert_eq!(err.reason(), ReplyReason::CommandNotSupported);
        assert_eq!(err.to_string(), "command not supported: command 0x02");
    }

    #[test]
    fn test_proxy_error_keeps_cause() {
        let cause = DecodeError::UnknownVersion(0x06);
        let err = ProxyError::new(ReplyReason::ConnectionRefused, cause.clone());
        assert_eq!(err.cause().downcast_ref::<DecodeError>(), Some(&cause));
    }

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::TooShort {
            expected: 7,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "message too short: expected at least 7 bytes, got 3"
        );
        assert_eq!(
            DecodeError::UnknownVersion(0x06).to_string(),
            "unknown SOCKS version 0x06"
        );
    }

    #[test]
    fn test_transport_error_from_io() {
        let err: TransportError = io::Error::from(io::ErrorKind::TimedOut).into();
        assert!(err.is_timeout());

        let err: TransportError = io::Error::from(io::ErrorKind::UnexpectedEof).into();
        assert!(matches!(err, TransportError::Closed));

        let err: TransportError = io::Error::from(io::ErrorKind::BrokenPipe).into();
        assert!(matches!(err, TransportError::Io(_)));
    }

    #[test]
    fn test_socks_relay_error_from_proxy_error() {
        let err: SocksRelayError = ProxyError::msg(ReplyReason::GeneralFailure, "boom").into();
        assert!(matches!(err, SocksRelayError::Proxy(_)));
        assert_eq!(
            err.to_string(),
            "SOCKS5 error: general SOCKS server failure: boom"
        );
    }
}
