// src/connection/mod.rs

//! A single outbound link carrying a line protocol over TCP or TLS.
//!
//! `connect` dials the peer and starts a reader task that publishes parsed
//! messages on the returned channel. Writes from any number of tasks are
//! serialized through one lock so lines never interleave on the wire.
//!
//! Each link carries a cancellation token. `close` cancels it, which stops
//! the reader and aborts any write still pending, so closing never waits on
//! a peer that has stopped reading.

pub mod observer;
mod reader;
pub mod status;
pub mod stream;
pub mod tls;

use crate::config::ConnectionConfig;
use crate::core::IrcLineError;
use crate::core::protocol::{IrcCodec, LineCodec};
use observer::{TracingObserver, TrafficObserver};
use reader::ReaderLoop;
use status::{AtomicStatus, ConnectionStatus};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use stream::AnyStream;
use tokio::io::{AsyncWriteExt, WriteHalf, split};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc, watch};
use tokio_rustls::TlsConnector;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Formats a line and writes it on a `Connection`, appending the terminator
/// if needed. Evaluates to a future yielding the number of bytes written.
///
/// ```ignore
/// ircline::write_line!(conn, "PRIVMSG {} :{}", channel, text).await?;
/// ```
#[macro_export]
macro_rules! write_line {
    ($conn:expr, $($arg:tt)*) => {
        $conn.write_line(&::std::format!($($arg)*))
    };
}

/// How long `close` lets a graceful transport shutdown (TLS close_notify) run.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Handles to the reader task of the current link.
struct ReaderHandle {
    shutdown: CancellationToken,
    done_rx: watch::Receiver<bool>,
}

/// One logical link to a single remote endpoint.
pub struct Connection<C: LineCodec = IrcCodec> {
    config: ConnectionConfig,
    codec: Arc<C>,
    tls_config: Option<Arc<rustls::ClientConfig>>,
    observer: Arc<dyn TrafficObserver>,
    status: Arc<AtomicStatus>,
    /// The write half of the transport. Holding this lock is what serializes writers.
    writer: Mutex<Option<WriteHalf<AnyStream>>>,
    reader: parking_lot::Mutex<Option<ReaderHandle>>,
}

impl Connection<IrcCodec> {
    /// Creates a disconnected IRC connection for the given peer.
    pub fn new(config: ConnectionConfig) -> Self {
        Self::with_codec(config, IrcCodec)
    }
}

impl<C: LineCodec> Connection<C> {
    /// Creates a disconnected connection that parses lines with `codec`.
    pub fn with_codec(config: ConnectionConfig, codec: C) -> Self {
        Self {
            config,
            codec: Arc::new(codec),
            tls_config: None,
            observer: Arc::new(TracingObserver),
            status: Arc::new(AtomicStatus::default()),
            writer: Mutex::new(None),
            reader: parking_lot::Mutex::new(None),
        }
    }

    /// Replaces the default traffic observer.
    pub fn with_observer(mut self, observer: Arc<dyn TrafficObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Uses a caller-built TLS config instead of the one derived from `config.tls`.
    pub fn with_tls_config(mut self, tls_config: Arc<rustls::ClientConfig>) -> Self {
        self.tls_config = Some(tls_config);
        self
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status.load()
    }

    pub fn is_connected(&self) -> bool {
        self.status() == ConnectionStatus::Connected
    }

    pub fn is_connecting(&self) -> bool {
        self.status() == ConnectionStatus::Connecting
    }

    /// Dials the peer and starts the reader task.
    ///
    /// Returns the receiving end of the inbound channel. It yields parsed
    /// messages in wire order and ends once the link is gone. Fails with
    /// `AlreadyConnected` if a link is up or being established; on any dial or
    /// handshake failure no channel is created and no task is started.
    pub async fn connect(&self) -> Result<mpsc::Receiver<C::Message>, IrcLineError> {
        self.config.validate()?;
        self.status
            .transition(ConnectionStatus::Disconnected, ConnectionStatus::Connecting)
            .map_err(|_| IrcLineError::AlreadyConnected)?;

        let addr = self.config.addr();
        info!("Connecting to {addr} (tls: {})", self.config.tls.enabled);

        let dialed = match self.config.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, self.dial(&addr))
                .await
                .unwrap_or_else(|_| {
                    Err(IrcLineError::Timeout(format!(
                        "connecting to {addr} took longer than {limit:?}"
                    )))
                }),
            None => self.dial(&addr).await,
        };

        let stream = match dialed {
            Ok(stream) => stream,
            Err(e) => {
                self.status.store(ConnectionStatus::Disconnected);
                warn!("Connection to {addr} failed: {e}");
                return Err(e);
            }
        };

        let (read_half, write_half) = split(stream);
        let (inbound_tx, inbound_rx) = mpsc::channel(self.config.inbound_capacity);
        let shutdown = CancellationToken::new();
        let (done_tx, done_rx) = watch::channel(false);

        // Replacing a stale write half here releases the previous socket.
        *self.writer.lock().await = Some(write_half);
        *self.reader.lock() = Some(ReaderHandle {
            shutdown: shutdown.clone(),
            done_rx,
        });
        self.status.store(ConnectionStatus::Connected);

        let reader = ReaderLoop {
            peer: self.config.host.clone(),
            codec: Arc::clone(&self.codec),
            observer: Arc::clone(&self.observer),
            status: Arc::clone(&self.status),
            inbound_tx,
            max_line_length: self.config.max_line_length,
        };
        tokio::spawn(reader.run(read_half, shutdown, done_tx));

        info!("Connected to {addr}");
        Ok(inbound_rx)
    }

    async fn dial(&self, addr: &str) -> Result<AnyStream, IrcLineError> {
        let server_name = if self.config.tls.enabled {
            Some(tls::server_name(&self.config)?)
        } else {
            None
        };

        let tcp_stream = TcpStream::connect(addr)
            .await
            .map_err(|e| IrcLineError::ConnectFailed(format!("{addr}: {e}")))?;

        let Some(server_name) = server_name else {
            return Ok(AnyStream::Tcp(tcp_stream));
        };

        let tls_config = match &self.tls_config {
            Some(tls_config) => Arc::clone(tls_config),
            None => tls::default_client_config(&self.config.tls)?,
        };
        debug!("Starting TLS handshake with {addr}");
        let tls_stream = TlsConnector::from(tls_config)
            .connect(server_name, tcp_stream)
            .await
            .map_err(|e| IrcLineError::TlsHandshake(e.to_string()))?;

        Ok(AnyStream::Tls(Box::new(tls_stream)))
    }

    /// Shuts down the transport if connected; otherwise does nothing.
    ///
    /// Pending writes are aborted with `NotConnected` rather than waited for.
    /// The status flips to `Disconnected` when the reader task exits, not
    /// before this returns. Await [`Connection::closed`] or the end of the
    /// inbound channel for that guarantee.
    pub async fn close(&self) -> Result<(), IrcLineError> {
        if !self.is_connected() {
            // A peer-initiated disconnect leaves the write half behind.
            if let Ok(mut writer) = self.writer.try_lock() {
                writer.take();
            }
            return Ok(());
        }

        if let Some(shutdown) = self.link_shutdown() {
            shutdown.cancel();
        }

        // Cancelled writers release the lock promptly.
        let writer = self.writer.lock().await.take();
        let result = match writer {
            Some(mut writer) => tokio::time::timeout(SHUTDOWN_GRACE, writer.shutdown())
                .await
                .unwrap_or_else(|_| {
                    debug!("Transport shutdown stalled; dropping the socket");
                    Ok(())
                }),
            None => Ok(()),
        };
        info!("Closed connection to {}", self.config.addr());
        result.map_err(IrcLineError::from)
    }

    fn link_shutdown(&self) -> Option<CancellationToken> {
        self.reader.lock().as_ref().map(|h| h.shutdown.clone())
    }

    /// Resolves once the reader task of the current link has exited.
    /// Returns immediately if no link was ever established.
    pub async fn closed(&self) {
        let done_rx = self.reader.lock().as_ref().map(|h| h.done_rx.clone());
        if let Some(mut done_rx) = done_rx {
            // An error means the reader is gone, which is what we wait for.
            let _ = done_rx.wait_for(|done| *done).await;
        }
    }

    /// Writes raw bytes under the write lock and returns how many were written.
    ///
    /// A write that exceeds `write_timeout` may have left part of its bytes on
    /// the wire, so the link is torn down and later writes fail with
    /// `NotConnected`.
    pub async fn write_raw(&self, bytes: &[u8]) -> Result<usize, IrcLineError> {
        let shutdown = match self.link_shutdown() {
            Some(shutdown) if self.is_connected() => shutdown,
            _ => return Err(IrcLineError::NotConnected),
        };

        tokio::select! {
            written = self.write_locked(bytes, &shutdown) => written,
            _ = shutdown.cancelled() => Err(IrcLineError::NotConnected),
        }
    }

    async fn write_locked(
        &self,
        bytes: &[u8],
        shutdown: &CancellationToken,
    ) -> Result<usize, IrcLineError> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(IrcLineError::NotConnected)?;
        let write = async {
            writer.write_all(bytes).await?;
            writer.flush().await?;
            Ok::<_, std::io::Error>(bytes.len())
        };

        let Some(limit) = self.config.write_timeout else {
            return Ok(write.await?);
        };
        match tokio::time::timeout(limit, write).await {
            Ok(written) => Ok(written?),
            Err(_) => {
                guard.take();
                shutdown.cancel();
                warn!(
                    "Write to {} took longer than {limit:?}; closing the link",
                    self.config.host
                );
                Err(IrcLineError::Timeout(format!(
                    "write to {} took longer than {limit:?}",
                    self.config.host
                )))
            }
        }
    }

    /// Writes one line, appending `\n` unless it already ends with one.
    pub async fn write_line(&self, line: &str) -> Result<usize, IrcLineError> {
        if !self.is_connected() {
            return Err(IrcLineError::NotConnected);
        }

        let mut line = line.to_string();
        if !line.ends_with('\n') {
            line.push('\n');
        }
        self.observer
            .on_outbound(&self.config.host, line.trim_end_matches(['\r', '\n']));
        self.write_raw(line.as_bytes()).await
    }

    /// Formats then writes one line. [`write_line!`] is the usual way in.
    pub fn write_line_fmt(
        &self,
        args: fmt::Arguments<'_>,
    ) -> impl Future<Output = Result<usize, IrcLineError>> + Send + '_ {
        // Formatted eagerly: `fmt::Arguments` is not `Send`.
        let line = args.to_string();
        async move { self.write_line(&line).await }
    }

    /// Formats a message with the connection's codec and writes it as one line.
    pub async fn send(&self, message: &C::Message) -> Result<usize, IrcLineError> {
        let line = self.codec.format_message(message)?;
        self.write_line(&line).await
    }
}

impl<C: LineCodec> Drop for Connection<C> {
    fn drop(&mut self) {
        if let Some(handle) = self.reader.get_mut().take() {
            handle.shutdown.cancel();
        }
    }
}
