// src/core/protocol/line_codec.rs

//! Line-level parsing and formatting.
//!
//! A `LineCodec` turns one terminator-free line into a structured message and
//! back. The connection layer is generic over it, so any line protocol can be
//! carried; `IrcCodec` is the implementation for IRC with IRCv3 message tags.

use super::message::IrcMessage;
use crate::core::IrcLineError;
use indexmap::IndexMap;

/// The maximum size of the `@tags` section, excluding the leading `@` and the
/// separating space.
pub const MAX_TAGS_LENGTH: usize = 8191;

/// Characters that may never appear inside a single line.
const FORBIDDEN: [char; 3] = ['\0', '\r', '\n'];

/// A stateless parser/formatter for a single protocol line.
pub trait LineCodec: Send + Sync + 'static {
    type Message: Send + 'static;

    /// Parses a line with its terminator already removed.
    fn parse_line(&self, line: &str) -> Result<Self::Message, IrcLineError>;

    /// Formats a message into a line without a terminator.
    fn format_message(&self, message: &Self::Message) -> Result<String, IrcLineError>;
}

/// The IRC codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct IrcCodec;

impl LineCodec for IrcCodec {
    type Message = IrcMessage;

    fn parse_line(&self, line: &str) -> Result<IrcMessage, IrcLineError> {
        if line.contains(FORBIDDEN) {
            return Err(invalid_line("line contains NUL, CR or LF"));
        }

        let mut rest = line.trim_start_matches(' ');
        if rest.is_empty() {
            return Err(invalid_line("empty line"));
        }

        let mut tags = IndexMap::new();
        if let Some(stripped) = rest.strip_prefix('@') {
            let (raw_tags, after) = stripped
                .split_once(' ')
                .ok_or_else(|| invalid_line("tags without a command"))?;
            if raw_tags.len() > MAX_TAGS_LENGTH {
                return Err(invalid_line("tags section too long"));
            }
            tags = parse_tags(raw_tags)?;
            rest = after.trim_start_matches(' ');
        }

        let mut source = None;
        if let Some(stripped) = rest.strip_prefix(':') {
            let (raw_source, after) = stripped
                .split_once(' ')
                .ok_or_else(|| invalid_line("source without a command"))?;
            if raw_source.is_empty() {
                return Err(invalid_line("empty source"));
            }
            source = Some(raw_source.to_string());
            rest = after.trim_start_matches(' ');
        }

        let (command, mut rest) = rest.split_once(' ').unwrap_or((rest, ""));
        if command.is_empty() {
            return Err(invalid_line("missing command"));
        }

        let mut params = Vec::new();
        loop {
            rest = rest.trim_start_matches(' ');
            if rest.is_empty() {
                break;
            }
            if let Some(trailing) = rest.strip_prefix(':') {
                params.push(trailing.to_string());
                break;
            }
            match rest.split_once(' ') {
                Some((param, after)) => {
                    params.push(param.to_string());
                    rest = after;
                }
                None => {
                    params.push(rest.to_string());
                    break;
                }
            }
        }

        Ok(IrcMessage {
            tags,
            source,
            command: command.to_ascii_uppercase(),
            params,
        })
    }

    fn format_message(&self, message: &IrcMessage) -> Result<String, IrcLineError> {
        let mut line = String::with_capacity(64);

        if !message.tags.is_empty() {
            let mut section = String::new();
            for (i, (key, value)) in message.tags.iter().enumerate() {
                if key.is_empty() || key.contains([' ', ';', '=']) || key.contains(FORBIDDEN) {
                    return Err(invalid_message(format!("invalid tag key '{key}'")));
                }
                if i > 0 {
                    section.push(';');
                }
                section.push_str(key);
                if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                    if value.contains('\0') {
                        return Err(invalid_message("tag value contains NUL"));
                    }
                    section.push('=');
                    escape_tag_value(value, &mut section);
                }
            }
            if section.len() > MAX_TAGS_LENGTH {
                return Err(invalid_message("tags section too long"));
            }
            line.push('@');
            line.push_str(&section);
            line.push(' ');
        }

        if let Some(source) = &message.source {
            if source.is_empty() || source.contains(' ') || source.contains(FORBIDDEN) {
                return Err(invalid_message(format!("invalid source '{source}'")));
            }
            line.push(':');
            line.push_str(source);
            line.push(' ');
        }

        let command = &message.command;
        if command.is_empty()
            || command.contains(' ')
            || command.contains(FORBIDDEN)
            || command.starts_with([':', '@'])
        {
            return Err(invalid_message(format!("invalid command '{command}'")));
        }
        line.push_str(command);

        let last = message.params.len().saturating_sub(1);
        for (i, param) in message.params.iter().enumerate() {
            if param.contains(FORBIDDEN) {
                return Err(invalid_message("param contains NUL, CR or LF"));
            }
            let needs_colon = param.is_empty() || param.contains(' ') || param.starts_with(':');
            line.push(' ');
            if needs_colon {
                if i != last {
                    return Err(invalid_message(format!(
                        "only the last param may be empty, contain spaces or start with ':' (param {i})"
                    )));
                }
                line.push(':');
            }
            line.push_str(param);
        }

        Ok(line)
    }
}

fn parse_tags(raw: &str) -> Result<IndexMap<String, Option<String>>, IrcLineError> {
    let mut tags = IndexMap::new();
    for tag in raw.split(';').filter(|t| !t.is_empty()) {
        let (key, value) = match tag.split_once('=') {
            Some((key, value)) => (key, Some(value)),
            None => (tag, None),
        };
        if key.is_empty() {
            return Err(invalid_line("empty tag key"));
        }
        let value = value
            .filter(|v| !v.is_empty())
            .map(unescape_tag_value)
            .filter(|v| !v.is_empty());
        tags.insert(key.to_string(), value);
    }
    Ok(tags)
}

fn unescape_tag_value(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(':') => out.push(';'),
            Some('s') => out.push(' '),
            Some('\\') => out.push('\\'),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some(other) => out.push(other),
            // A lone trailing backslash is dropped.
            None => {}
        }
    }
    out
}

fn escape_tag_value(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            ';' => out.push_str("\\:"),
            ' ' => out.push_str("\\s"),
            '\\' => out.push_str("\\\\"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            other => out.push(other),
        }
    }
}

fn invalid_line(reason: impl Into<String>) -> IrcLineError {
    IrcLineError::InvalidLine(reason.into())
}

fn invalid_message(reason: impl Into<String>) -> IrcLineError {
    IrcLineError::InvalidMessage(reason.into())
}
