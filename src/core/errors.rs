// src/core/errors.rs

//! Defines the primary error type for the crate.

use std::sync::Arc;
use thiserror::Error;

/// Every failure a connection, its codecs, or its callers can observe.
#[derive(Error, Debug)]
pub enum IrcLineError {
    #[error("IO Error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("Failed to connect: {0}")]
    ConnectFailed(String),

    #[error("TLS handshake failed: {0}")]
    TlsHandshake(String),

    #[error("Invalid TLS server name '{0}'")]
    InvalidServerName(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Invalid connection config: {0}")]
    InvalidConfig(String),

    #[error("Connection is already connected or connecting")]
    AlreadyConnected,

    #[error("not connected")]
    NotConnected,

    /// The peer sent a line longer than the configured limit.
    #[error("Line exceeds maximum length of {0} bytes")]
    LineTooLong(usize),

    /// A line could not be parsed into a message.
    #[error("Invalid line: {0}")]
    InvalidLine(String),

    /// A message could not be formatted into a line.
    #[error("Invalid message: {0}")]
    InvalidMessage(String),
}

// `std::io::Error` is not cloneable, hence the Arc.
impl Clone for IrcLineError {
    fn clone(&self) -> Self {
        match self {
            IrcLineError::Io(e) => IrcLineError::Io(Arc::clone(e)),
            IrcLineError::ConnectFailed(s) => IrcLineError::ConnectFailed(s.clone()),
            IrcLineError::TlsHandshake(s) => IrcLineError::TlsHandshake(s.clone()),
            IrcLineError::InvalidServerName(s) => IrcLineError::InvalidServerName(s.clone()),
            IrcLineError::Timeout(s) => IrcLineError::Timeout(s.clone()),
            IrcLineError::InvalidConfig(s) => IrcLineError::InvalidConfig(s.clone()),
            IrcLineError::AlreadyConnected => IrcLineError::AlreadyConnected,
            IrcLineError::NotConnected => IrcLineError::NotConnected,
            IrcLineError::LineTooLong(n) => IrcLineError::LineTooLong(*n),
            IrcLineError::InvalidLine(s) => IrcLineError::InvalidLine(s.clone()),
            IrcLineError::InvalidMessage(s) => IrcLineError::InvalidMessage(s.clone()),
        }
    }
}

impl PartialEq for IrcLineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (IrcLineError::Io(e1), IrcLineError::Io(e2)) => e1.kind() == e2.kind(),
            (IrcLineError::ConnectFailed(s1), IrcLineError::ConnectFailed(s2)) => s1 == s2,
            (IrcLineError::TlsHandshake(s1), IrcLineError::TlsHandshake(s2)) => s1 == s2,
            (IrcLineError::InvalidServerName(s1), IrcLineError::InvalidServerName(s2)) => {
                s1 == s2
            }
            (IrcLineError::Timeout(s1), IrcLineError::Timeout(s2)) => s1 == s2,
            (IrcLineError::InvalidConfig(s1), IrcLineError::InvalidConfig(s2)) => s1 == s2,
            (IrcLineError::LineTooLong(n1), IrcLineError::LineTooLong(n2)) => n1 == n2,
            (IrcLineError::InvalidLine(s1), IrcLineError::InvalidLine(s2)) => s1 == s2,
            (IrcLineError::InvalidMessage(s1), IrcLineError::InvalidMessage(s2)) => s1 == s2,
            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }
}

impl From<std::io::Error> for IrcLineError {
    fn from(e: std::io::Error) -> Self {
        IrcLineError::Io(Arc::new(e))
    }
}
