// src/core/mod.rs

//! Protocol types and the error type shared by every connection.

pub mod errors;
pub mod protocol;

pub use errors::IrcLineError;
pub use protocol::{IrcCodec, IrcMessage, LineCodec};
