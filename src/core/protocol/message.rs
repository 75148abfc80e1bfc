// src/core/protocol/message.rs

//! The structured form of a single IRC line.

use indexmap::IndexMap;

/// One decoded protocol line: `[@tags] [:source] COMMAND [params...]`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IrcMessage {
    /// IRCv3 message tags in wire order. A missing or empty value is `None`.
    pub tags: IndexMap<String, Option<String>>,
    /// The `:nick!user@host` or server-name prefix, without the leading colon.
    pub source: Option<String>,
    /// The command or three-digit numeric, upper-cased when parsed.
    pub command: String,
    pub params: Vec<String>,
}

impl IrcMessage {
    /// Creates a message with the given command and no tags, source or params.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.params.push(param.into());
        self
    }

    /// Adds a tag. An empty value is stored as `None`, matching how the
    /// wire form cannot distinguish `key` from `key=`.
    pub fn with_tag(mut self, key: impl Into<String>, value: Option<&str>) -> Self {
        let value = value.filter(|v| !v.is_empty()).map(str::to_string);
        self.tags.insert(key.into(), value);
        self
    }

    /// Returns the value of a tag, or `None` if it is absent or valueless.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).and_then(|v| v.as_deref())
    }

    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    /// The final parameter, which is where most commands carry free text.
    pub fn trailing(&self) -> Option<&str> {
        self.params.last().map(String::as_str)
    }

    /// The nickname portion of the source, if the source is a user mask.
    pub fn source_nick(&self) -> Option<&str> {
        let source = self.source.as_deref()?;
        Some(source.split(['!', '@']).next().unwrap_or(source))
    }
}
