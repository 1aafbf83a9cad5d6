//! Websocket client for the live streaming endpoint.
//!
//! One client owns one connection for the lifetime of a session: connect,
//! select the configured channel source, then decode every inbound binary
//! frame into the shared queue until cancelled or the stream fails. The close
//! handshake runs exactly once, on every exit path.

use std::sync::Arc;

use futures_util::{SinkExt, Stream, StreamExt};
use parking_lot::Mutex;
use serde_json::json;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{CaptureConfig, SourceId};
use crate::error::{MeaError, MeaResult};
use crate::queue::SampleQueue;
use crate::sample::decode_frame;

/// Connection lifecycle of the streaming client.
///
/// Cancellation from any state jumps directly to `Disconnecting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// No connection attempt yet, or the close handshake has finished.
    Disconnected,
    /// Websocket handshake in progress.
    Connecting,
    /// Connected; the select-source message has been sent.
    Subscribed,
    /// Receiving live frames.
    Streaming,
    /// Close handshake in progress.
    Disconnecting,
}

/// Streaming client feeding the shared sample queue.
pub struct ServiceClient {
    ws_url: String,
    source_id: SourceId,
    queue: Arc<SampleQueue>,
    state: Mutex<ClientState>,
}

impl ServiceClient {
    /// Creates a client for the configured endpoint and source.
    pub fn new(config: &CaptureConfig, queue: Arc<SampleQueue>) -> Self {
        Self {
            ws_url: config.ws_url(),
            source_id: config.source_id(),
            queue,
            state: Mutex::new(ClientState::Disconnected),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ClientState {
        *self.state.lock()
    }

    fn set_state(&self, state: ClientState) {
        debug!(?state, "client state");
        *self.state.lock() = state;
    }

    /// Runs the streaming loop until cancelled or a fatal error.
    ///
    /// On connect, sends one JSON text frame selecting the configured source,
    /// then pushes every decoded frame into the queue (drop-oldest eviction
    /// absorbs overflow, so the producer never blocks). Returns `Ok(())` on
    /// cooperative cancellation; connection and decode failures are fatal and
    /// propagate after the close handshake has run. The caller owns the
    /// decision to surface cancellation as an error.
    pub async fn run(&self, cancel: CancellationToken) -> MeaResult<()> {
        self.set_state(ClientState::Connecting);
        let connected = tokio::select! {
            biased;

            () = cancel.cancelled() => {
                self.set_state(ClientState::Disconnected);
                return Ok(());
            }
            connected = connect_async(self.ws_url.as_str()) => connected,
        };
        let (mut ws, _) = match connected {
            Ok(pair) => pair,
            Err(err) => {
                self.set_state(ClientState::Disconnected);
                return Err(err.into());
            }
        };
        info!(url = %self.ws_url, "connected to streaming service");

        // Select the channel source before anything else arrives.
        let subscribe = json!({ "meaid": self.source_id.value() }).to_string();
        let result = match ws.send(Message::text(subscribe)).await {
            Ok(()) => {
                self.set_state(ClientState::Subscribed);
                self.set_state(ClientState::Streaming);
                self.pump(&mut ws, &cancel).await
            }
            Err(err) => Err(err.into()),
        };

        // Runs exactly once on every exit path, cancellation included.
        self.set_state(ClientState::Disconnecting);
        if let Err(err) = ws.close(None).await {
            debug!(%err, "close handshake failed");
        }
        self.set_state(ClientState::Disconnected);
        info!("disconnected from streaming service");

        result
    }

    async fn pump(
        &self,
        ws: &mut (impl Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin),
        cancel: &CancellationToken,
    ) -> MeaResult<()> {
        loop {
            let message = tokio::select! {
                biased;

                () = cancel.cancelled() => return Ok(()),
                message = ws.next() => message,
            };
            match message {
                Some(Ok(Message::Binary(payload))) => {
                    let sample = decode_frame(&payload)?;
                    if self.queue.push(sample).is_some() {
                        warn!(
                            capacity = self.queue.capacity(),
                            "queue full, dropped oldest snapshot"
                        );
                    }
                    debug!(buffered = self.queue.len(), "snapshot buffered");
                }
                // Control frames and text chatter carry no sample data.
                Some(Ok(_)) => {}
                Some(Err(err)) => return Err(err.into()),
                None => {
                    return Err(MeaError::ServiceUnavailable(
                        "stream closed by server before the frame target was reached".into(),
                    ))
                }
            }
        }
    }
}
