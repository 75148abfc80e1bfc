// src/lib.rs

pub mod config;
pub mod connection;
pub mod core;

// Re-export
pub use crate::config::{ConnectionConfig, TlsConfig};
pub use crate::connection::Connection;
pub use crate::connection::status::ConnectionStatus;
pub use crate::core::{IrcCodec, IrcLineError, IrcMessage, LineCodec};
