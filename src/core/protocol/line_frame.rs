// src/core/protocol/line_frame.rs

//! Implements the transport framing for line protocols: a `Decoder` that splits
//! a byte stream on `\n` and yields each line with its terminator stripped.
//!
//! A line over the length limit does not fail the stream. The decoder reports
//! it once as `LineFrame::TooLong` and skips everything up to the next `\n`.

use crate::core::IrcLineError;
use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

/// The longest line IRCv3 permits: 8191 bytes of tags plus a 512 byte body.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 8191 + 512;

/// One unit produced by `LineFrameCodec`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineFrame {
    /// A complete line, terminator stripped.
    Line(String),
    /// A line longer than the limit was skipped. Holds its first
    /// `max_length` bytes.
    TooLong(String),
}

impl LineFrame {
    /// The line, if this frame is a deliverable one.
    pub fn into_line(self) -> Option<String> {
        match self {
            LineFrame::Line(line) => Some(line),
            LineFrame::TooLong(_) => None,
        }
    }
}

/// A `tokio_util::codec` decoder producing one `LineFrame` per `\n`-terminated line.
#[derive(Debug)]
pub struct LineFrameCodec {
    max_length: usize,
    /// Where to resume the search for `\n`, so a partial line is scanned once.
    next_index: usize,
    /// Set while skipping the remainder of an overlong line.
    discarding: bool,
}

impl LineFrameCodec {
    /// Creates a codec that skips lines longer than `max_length` bytes,
    /// not counting the terminator.
    pub fn new(max_length: usize) -> Self {
        Self {
            max_length,
            next_index: 0,
            discarding: false,
        }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    fn head(&self, bytes: &[u8]) -> String {
        let end = bytes.len().min(self.max_length);
        String::from_utf8_lossy(&bytes[..end]).into_owned()
    }
}

impl Default for LineFrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_LENGTH)
    }
}

impl Decoder for LineFrameCodec {
    type Item = LineFrame;
    type Error = IrcLineError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.discarding {
            match src.iter().position(|b| *b == b'\n') {
                Some(offset) => {
                    src.advance(offset + 1);
                    self.discarding = false;
                }
                None => {
                    src.clear();
                    return Ok(None);
                }
            }
        }

        let search_from = self.next_index.min(src.len());
        match src[search_from..].iter().position(|b| *b == b'\n') {
            Some(offset) => {
                self.next_index = 0;
                let frame = src.split_to(search_from + offset + 1);
                let line = trim_line_breaks(&frame);
                if line.len() > self.max_length {
                    trace!(bytes = line.len(), "Skipping overlong line");
                    return Ok(Some(LineFrame::TooLong(self.head(line))));
                }
                Ok(Some(LineFrame::Line(
                    String::from_utf8_lossy(line).into_owned(),
                )))
            }
            None => {
                // Leave room for a `\r` still waiting on its `\n`.
                if src.len() > self.max_length + 1 {
                    trace!(bytes = src.len(), "Skipping overlong line");
                    let head = self.head(&src[..]);
                    src.clear();
                    self.next_index = 0;
                    self.discarding = true;
                    return Ok(Some(LineFrame::TooLong(head)));
                }
                self.next_index = src.len();
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        // An unterminated final line is never delivered.
        if !src.is_empty() {
            trace!(bytes = src.len(), "Discarding partial line at end of stream");
            src.clear();
        }
        self.next_index = 0;
        self.discarding = false;
        Ok(None)
    }
}

/// Removes `\r` and `\n` bytes from both ends.
fn trim_line_breaks(frame: &[u8]) -> &[u8] {
    let is_break = |b: &u8| *b == b'\r' || *b == b'\n';
    let start = frame.iter().position(|b| !is_break(b)).unwrap_or(frame.len());
    let end = frame.iter().rposition(|b| !is_break(b)).map_or(start, |i| i + 1);
    &frame[start..end]
}
