//! Debugger relay connection
//!
//! Keeps one WebSocket to the packager's debugger proxy open, reconnecting
//! after a fixed delay whenever it closes.

use std::sync::Arc;
use std::time::Duration;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::{AbortHandle, JoinHandle};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use rn_droid_core::{AppConfig, DebugError};

use crate::dispatch::{Dispatcher, Responder};
use crate::envelope::RelayEnvelope;

/// Delay between a close and the next connect attempt
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(1);

type RelaySocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Relay errors
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Gave up after {attempts} failed connects to {url}")]
    RetriesExhausted { url: String, attempts: u32 },
    #[error("Relay task failed: {0}")]
    Task(String),
}

impl From<RelayError> for DebugError {
    fn from(err: RelayError) -> Self {
        DebugError::RelayTransport(err.to_string())
    }
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Disconnected,
    Connecting,
    Connected,
}

/// Where and how to connect
#[derive(Debug, Clone)]
pub struct RelayOptions {
    pub url: String,
    pub reconnect_delay: Duration,
    /// Consecutive failed connects before giving up, the first attempt
    /// included; a successful open resets the count. `None` retries forever
    pub max_connect_failures: Option<u32>,
}

impl RelayOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            max_connect_failures: None,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            url: config.packager.relay_url(),
            reconnect_delay: config.relay.reconnect_delay(),
            max_connect_failures: config.relay.max_connect_failures,
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_max_connect_failures(mut self, attempts: u32) -> Self {
        self.max_connect_failures = Some(attempts);
        self
    }
}

/// Handle to a running relay
pub struct RelayHandle {
    state: watch::Receiver<RelayState>,
    task: JoinHandle<Result<(), RelayError>>,
}

impl RelayHandle {
    pub fn state(&self) -> RelayState {
        *self.state.borrow()
    }

    /// Receiver that observes every later state change
    pub fn state_changes(&self) -> watch::Receiver<RelayState> {
        self.state.clone()
    }

    /// Tear the relay down
    pub fn stop(&self) {
        self.task.abort();
    }

    /// Stops the relay from elsewhere while `join` is pending
    pub fn abort_handle(&self) -> AbortHandle {
        self.task.abort_handle()
    }

    /// Wait for the relay to end; only a retry cap or `stop` ends it
    pub async fn join(self) -> Result<(), RelayError> {
        match self.task.await {
            Ok(result) => result,
            Err(err) if err.is_cancelled() => Ok(()),
            Err(err) => Err(RelayError::Task(err.to_string())),
        }
    }
}

/// The relay between the debugger proxy and the script runtime
pub struct DebuggerRelay {
    options: RelayOptions,
    dispatcher: Arc<Dispatcher>,
    state: watch::Sender<RelayState>,
}

impl DebuggerRelay {
    pub fn new(options: RelayOptions, dispatcher: Dispatcher) -> Self {
        let (state, _) = watch::channel(RelayState::Disconnected);
        Self {
            options,
            dispatcher: Arc::new(dispatcher),
            state,
        }
    }

    /// Spawn the connect loop
    pub fn start(self) -> RelayHandle {
        let state = self.state.subscribe();
        let task = tokio::spawn(self.run());
        RelayHandle { state, task }
    }

    /// Connect, serve, and reconnect until the retry cap (if any) is hit
    pub async fn run(self) -> Result<(), RelayError> {
        let mut failures = 0u32;

        loop {
            self.set_state(RelayState::Connecting);

            match connect_async(self.options.url.as_str()).await {
                Ok((socket, _)) => {
                    failures = 0;
                    info!("WebSocket connection opened to {}", self.options.url);
                    self.set_state(RelayState::Connected);
                    self.serve(socket).await;
                    info!("WebSocket connection closed");
                }
                Err(err) => {
                    failures += 1;
                    warn!("Cannot connect to {}: {}", self.options.url, err);
                    if let Some(max) = self.options.max_connect_failures {
                        if failures >= max {
                            self.set_state(RelayState::Disconnected);
                            return Err(RelayError::RetriesExhausted {
                                url: self.options.url.clone(),
                                attempts: failures,
                            });
                        }
                    }
                }
            }

            self.set_state(RelayState::Disconnected);
            tokio::time::sleep(self.options.reconnect_delay).await;
        }
    }

    fn set_state(&self, next: RelayState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!("Relay state: {:?} -> {:?}", previous, next);
        }
    }

    /// Pump one connection until it closes
    async fn serve(&self, socket: RelaySocket) {
        let (mut sink, mut stream) = socket.split();
        let (outbound, mut queued) = mpsc::unbounded_channel::<String>();

        let writer = tokio::spawn(async move {
            while let Some(text) = queued.recv().await {
                if let Err(err) = sink.send(Message::Text(text)).await {
                    debug!("Reply not sent: {}", err);
                    break;
                }
            }
        });

        while let Some(frame) = stream.next().await {
            match frame {
                Ok(Message::Text(text)) => self.handle_text(&text, &outbound),
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(err) => {
                    warn!("Relay transport error: {}", err);
                    break;
                }
            }
        }

        // Replies still in flight belong to this socket and are dropped.
        writer.abort();
    }

    fn handle_text(&self, text: &str, outbound: &mpsc::UnboundedSender<String>) {
        match RelayEnvelope::parse(text) {
            Ok(Some(envelope)) => {
                let responder = Responder::new(outbound.clone(), envelope.id.clone());
                self.dispatcher.dispatch(envelope, responder);
            }
            Ok(None) => debug!("Ignoring message without method"),
            Err(err) => warn!("Malformed relay message: {}", err),
        }
    }
}
