// src/connection/observer.rs

//! Hooks for watching the raw traffic of a connection.

use crate::core::IrcLineError;
use tracing::debug;

/// Receives every line crossing a connection. Called inline from the reader
/// task and from writers, so implementations must not block.
pub trait TrafficObserver: Send + Sync {
    /// A line arrived from the peer, terminator stripped, before parsing.
    fn on_inbound(&self, _peer: &str, _line: &str) {}

    /// A line is about to be written, terminator stripped.
    fn on_outbound(&self, _peer: &str, _line: &str) {}

    /// An inbound line could not be parsed and was dropped.
    fn on_parse_error(&self, _peer: &str, _line: &str, _error: &IrcLineError) {}
}

/// Logs traffic at `debug` under the `ircline::traffic` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl TrafficObserver for TracingObserver {
    fn on_inbound(&self, peer: &str, line: &str) {
        debug!(target: "ircline::traffic", "[S {peer}] {line}");
    }

    fn on_outbound(&self, peer: &str, line: &str) {
        debug!(target: "ircline::traffic", "[C {peer}] {line}");
    }

    fn on_parse_error(&self, peer: &str, line: &str, error: &IrcLineError) {
        debug!(target: "ircline::traffic", "Dropping unparsable line from {peer}: {error} ({line:?})");
    }
}

/// Ignores all traffic.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl TrafficObserver for NoopObserver {}
