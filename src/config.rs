// src/config.rs

//! Manages configuration: loading from TOML and validation.

use crate::core::IrcLineError;
use crate::core::protocol::line_frame::DEFAULT_MAX_LINE_LENGTH;
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

/// Configuration for TLS on the outbound link.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsConfig {
    #[serde(default)]
    pub enabled: bool,
    /// A PEM bundle of extra trust anchors, added on top of the webpki roots.
    #[serde(default)]
    pub ca_cert_path: Option<String>,
    /// Overrides the name used for SNI and certificate verification.
    /// Defaults to the connection host.
    #[serde(default)]
    pub server_name: Option<String>,
}

/// Everything a `Connection` needs to reach its peer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub tls: TlsConfig,
    /// How many parsed messages may wait for a consumer before the reader
    /// stops pulling from the socket.
    #[serde(default = "default_inbound_capacity")]
    pub inbound_capacity: usize,
    /// Inbound lines longer than this, excluding the terminator, end the connection.
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,
    /// Bounds the TCP dial plus TLS handshake. Unset means wait indefinitely.
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub connect_timeout: Option<Duration>,
    /// Bounds each individual write. Unset means wait indefinitely.
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub write_timeout: Option<Duration>,
}

fn default_inbound_capacity() -> usize {
    1
}
fn default_max_line_length() -> usize {
    DEFAULT_MAX_LINE_LENGTH
}
fn default_log_level() -> String {
    "info".to_string()
}

impl ConnectionConfig {
    /// Creates a plain-TCP configuration with default limits and no timeouts.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            tls: TlsConfig::default(),
            inbound_capacity: default_inbound_capacity(),
            max_line_length: default_max_line_length(),
            connect_timeout: None,
            write_timeout: None,
        }
    }

    /// Enables TLS with default trust settings.
    pub fn with_tls(mut self) -> Self {
        self.tls.enabled = true;
        self
    }

    /// The `host:port` string used for dialing and logging.
    pub fn addr(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            // Bare IPv6 literal.
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Checks the settings a connection attempt depends on.
    pub fn validate(&self) -> Result<(), IrcLineError> {
        if self.host.trim().is_empty() {
            return Err(IrcLineError::InvalidConfig("host cannot be empty".into()));
        }
        if self.port == 0 {
            return Err(IrcLineError::InvalidConfig("port cannot be 0".into()));
        }
        if self.inbound_capacity == 0 {
            return Err(IrcLineError::InvalidConfig(
                "inbound_capacity cannot be 0".into(),
            ));
        }
        if self.max_line_length == 0 {
            return Err(IrcLineError::InvalidConfig(
                "max_line_length cannot be 0".into(),
            ));
        }
        if self.tls.enabled
            && let Some(path) = &self.tls.ca_cert_path
            && path.trim().is_empty()
        {
            return Err(IrcLineError::InvalidConfig(
                "tls.ca_cert_path cannot be empty when set".into(),
            ));
        }
        Ok(())
    }
}

/// The top-level configuration file used by the `ircline` binary.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    pub connection: ConnectionConfig,
    /// Raw lines sent, in order, right after the link comes up.
    #[serde(default)]
    pub on_connect: Vec<String>,
}

impl Config {
    /// Creates a new `Config` instance by reading and parsing a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at '{path}'"))?;
        let config = Self::from_toml(&contents)
            .with_context(|| format!("Invalid configuration in '{path}'"))?;
        Ok(config)
    }

    /// Parses and validates configuration from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration to ensure logical consistency.
    fn validate(&self) -> Result<()> {
        self.connection
            .validate()
            .map_err(|e| anyhow!("connection: {e}"))?;

        for (i, line) in self.on_connect.iter().enumerate() {
            if line.trim().is_empty() {
                return Err(anyhow!("on_connect line #{} is empty", i + 1));
            }
            if line.trim_end_matches(['\r', '\n']).contains(['\r', '\n']) {
                return Err(anyhow!(
                    "on_connect line #{} contains an embedded line break",
                    i + 1
                ));
            }
        }
        Ok(())
    }
}
