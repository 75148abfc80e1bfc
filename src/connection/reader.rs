// src/connection/reader.rs

//! The background task that turns the inbound byte stream into parsed messages.
//!
//! One reader runs per successful connect and owns the read half exclusively.
//! Each line is reported to the observer, parsed, and pushed onto the inbound
//! channel. Unparsable and overlong lines are dropped without ending the link. Pushing waits for channel capacity,
//! so a slow consumer pauses reading and the peer sees TCP back-pressure.
//! When the loop ends for any reason the status becomes `Disconnected` and the
//! inbound channel is closed, in that order.

use super::observer::TrafficObserver;
use super::status::{AtomicStatus, ConnectionStatus};
use super::stream::AnyStream;
use crate::core::IrcLineError;
use crate::core::protocol::{LineCodec, LineFrame, LineFrameCodec};
use futures::StreamExt;
use std::sync::Arc;
use tokio::io::ReadHalf;
use tokio::sync::{mpsc, watch};
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Why the reader stopped.
#[derive(Debug)]
enum ExitReason {
    /// The peer closed its end.
    Eof,
    /// A transport failure.
    ReadError(IrcLineError),
    /// `Connection::close`, a write timeout, or the connection being dropped.
    Shutdown,
    /// Nobody holds the inbound receiver any more.
    ConsumerGone,
}

pub(crate) struct ReaderLoop<C: LineCodec> {
    pub(crate) peer: String,
    pub(crate) codec: Arc<C>,
    pub(crate) observer: Arc<dyn TrafficObserver>,
    pub(crate) status: Arc<AtomicStatus>,
    pub(crate) inbound_tx: mpsc::Sender<C::Message>,
    pub(crate) max_line_length: usize,
}

impl<C: LineCodec> ReaderLoop<C> {
    pub(crate) async fn run(
        self,
        reader: ReadHalf<AnyStream>,
        shutdown: CancellationToken,
        done_tx: watch::Sender<bool>,
    ) {
        debug!("Reader started for {}", self.peer);
        let mut lines = FramedRead::new(reader, LineFrameCodec::new(self.max_line_length));

        let reason = loop {
            let line = tokio::select! {
                next = lines.next() => match next {
                    Some(Ok(LineFrame::Line(line))) => line,
                    Some(Ok(LineFrame::TooLong(head))) => {
                        let error = IrcLineError::LineTooLong(self.max_line_length);
                        self.observer.on_parse_error(&self.peer, &head, &error);
                        continue;
                    }
                    Some(Err(e)) => break ExitReason::ReadError(e),
                    None => break ExitReason::Eof,
                },
                _ = shutdown.cancelled() => break ExitReason::Shutdown,
            };

            self.observer.on_inbound(&self.peer, &line);

            let message = match self.codec.parse_line(&line) {
                Ok(message) => message,
                Err(e) => {
                    self.observer.on_parse_error(&self.peer, &line, &e);
                    continue;
                }
            };

            tokio::select! {
                sent = self.inbound_tx.send(message) => {
                    if sent.is_err() {
                        break ExitReason::ConsumerGone;
                    }
                }
                _ = shutdown.cancelled() => break ExitReason::Shutdown,
            }
        };

        match &reason {
            ExitReason::Eof => info!("Connection to {} closed by peer", self.peer),
            ExitReason::ReadError(e) => warn!("Read from {} failed: {e}", self.peer),
            ExitReason::Shutdown => debug!("Reader for {} shut down", self.peer),
            ExitReason::ConsumerGone => {
                debug!("Inbound receiver for {} dropped; stopping reader", self.peer)
            }
        }

        let _ = self
            .status
            .transition(ConnectionStatus::Connected, ConnectionStatus::Disconnected);
        // Dropping the sender closes the inbound channel.
        drop(self);
        done_tx.send_replace(true);
    }
}
