// src/core/protocol/mod.rs

pub mod line_codec;
pub mod line_frame;
pub mod message;
pub use line_codec::{IrcCodec, LineCodec};
pub use line_frame::{LineFrame, LineFrameCodec};
pub use message::IrcMessage;
