use std::{fmt, num::ParseIntError, str::Utf8Error};

use crate::RpcError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// Simple wrapper over all I/O related errors
    IoError(std::io::Error),
    /// Connection, handshake or authentication failure reported by the
    /// transport underneath the NETCONF session
    TransportError(String),
    /// The device sent something that violates NETCONF framing or the
    /// hello exchange
    InvalidToken(String),
    /// A caller supplied interface id or VLAN that cannot be carried in a
    /// request. Raised before any network I/O takes place.
    InvalidInput(String),
    /// The device explicitly refused an `edit-config`
    ProtocolError(RpcError),
    /// We were unable to decode the reply against the expected schema. The
    /// raw reply is kept so that callers can still go through it.
    ParseError { reason: String, reply: String },
    /// The device accepted an `edit-config`, but the read that was supposed
    /// to confirm it failed. The contained error is the one from that read.
    Unconfirmed(Box<Error>),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::IoError(_) => write!(f, "IO operation failed"),
            Error::TransportError(msg) => write!(f, "transport failure: {}", msg),
            Error::InvalidToken(msg) => write!(f, "received invalid token: {}", msg),
            Error::InvalidInput(msg) => write!(f, "invalid input: {}", msg),
            Error::ProtocolError(err) => {
                write!(f, "device rejected the request: {}", err.message())?;
                if !err.path().is_empty() {
                    write!(f, " (at {})", err.path())?;
                }
                Ok(())
            }
            Error::ParseError { reason, .. } => {
                write!(f, "failed to parse device reply: {}", reason)
            }
            Error::Unconfirmed(_) => {
                write!(f, "update was accepted but could not be confirmed")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::IoError(err) => Some(err),
            Self::Unconfirmed(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl Error {
    pub fn eof(err: &str) -> Self {
        Self::IoError(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, err))
    }

    /// Creates an [Error::ParseError] for `reply`
    pub(crate) fn parse(reason: impl Into<String>, reply: &str) -> Self {
        Self::ParseError {
            reason: reason.into(),
            reply: reply.to_owned(),
        }
    }

    /// Returns the device-side error if this is a rejection
    pub fn rpc_error(&self) -> Option<&RpcError> {
        match self {
            Self::ProtocolError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<RpcError> for Error {
    fn from(err: RpcError) -> Self {
        Error::ProtocolError(err)
    }
}

impl From<Utf8Error> for Error {
    fn from(_: Utf8Error) -> Self {
        Error::InvalidToken("failed to parse as utf8".into())
    }
}

impl From<ParseIntError> for Error {
    fn from(_: ParseIntError) -> Self {
        Error::InvalidToken("failed to parse as integer".into())
    }
}

#[cfg(feature = "ssh")]
impl From<ssh2::Error> for Error {
    fn from(err: ssh2::Error) -> Self {
        Error::TransportError(err.to_string())
    }
}
