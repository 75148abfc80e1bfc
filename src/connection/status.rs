// src/connection/status.rs

//! The lifecycle state of a connection, readable from any task without locking.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Where a connection is in its lifecycle. Being connected and connecting at
/// the same time is unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionStatus {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
}

impl ConnectionStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ConnectionStatus::Connecting,
            2 => ConnectionStatus::Connected,
            _ => ConnectionStatus::Disconnected,
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
        };
        f.write_str(name)
    }
}

/// A `ConnectionStatus` shared between the caller and the reader task.
#[derive(Debug)]
pub struct AtomicStatus(AtomicU8);

impl AtomicStatus {
    pub fn new(status: ConnectionStatus) -> Self {
        Self(AtomicU8::new(status as u8))
    }

    pub fn load(&self) -> ConnectionStatus {
        ConnectionStatus::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn store(&self, status: ConnectionStatus) {
        self.0.store(status as u8, Ordering::Release);
    }

    /// Moves from `from` to `to` only if the current status is `from`.
    /// On failure returns the status that was observed instead.
    pub fn transition(
        &self,
        from: ConnectionStatus,
        to: ConnectionStatus,
    ) -> Result<(), ConnectionStatus> {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(ConnectionStatus::from_u8)
    }
}

impl Default for AtomicStatus {
    fn default() -> Self {
        Self::new(ConnectionStatus::Disconnected)
    }
}
