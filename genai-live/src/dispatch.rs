//! Callback dispatch.
//!
//! The reader task pushes items into a channel of capacity one; a single
//! dispatcher task awaits each hook before taking the next item. Hooks are
//! therefore never invoked concurrently and see messages in wire order.

use crate::error::LiveError;
use crate::events::ServerMessage;
use crate::transport::CloseEvent;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;

/// Hooks invoked for session events.
///
/// Only [`on_message`](LiveCallbacks::on_message) is required. The other hooks
/// default to no-ops.
#[async_trait]
pub trait LiveCallbacks: Send + Sync {
    /// The transport is established. Always the first hook.
    async fn on_open(&self) {}

    /// A decoded server message.
    async fn on_message(&self, message: ServerMessage);

    /// A transport failure. Followed by [`on_close`](LiveCallbacks::on_close).
    async fn on_error(&self, _error: LiveError) {}

    /// The session closed. Invoked exactly once, always last.
    async fn on_close(&self, _event: CloseEvent) {}
}

/// Items sent from the background tasks to the dispatcher.
#[derive(Debug)]
pub(crate) enum Dispatch {
    Message(ServerMessage),
    Error(LiveError),
    Close(CloseEvent),
}

/// Capacity of the reader-to-dispatcher channel.
pub(crate) const DISPATCH_CAPACITY: usize = 1;

pub(crate) async fn run_dispatcher(
    session_id: String,
    callbacks: Arc<dyn LiveCallbacks>,
    mut rx: mpsc::Receiver<Dispatch>,
    close_requested: Arc<AtomicBool>,
) {
    callbacks.on_open().await;

    let mut closed = false;
    while let Some(item) = rx.recv().await {
        match item {
            Dispatch::Message(message) => {
                if close_requested.load(Ordering::SeqCst) {
                    tracing::debug!(session_id = %session_id, kind = message.event.kind(), "dropping message after close");
                    continue;
                }
                callbacks.on_message(message).await;
            }
            Dispatch::Error(error) => callbacks.on_error(error).await,
            Dispatch::Close(event) => {
                if !closed {
                    closed = true;
                    callbacks.on_close(event).await;
                }
            }
        }
    }

    if !closed {
        callbacks.on_close(CloseEvent::new(None, "session ended")).await;
    }
    tracing::debug!(session_id = %session_id, "dispatcher stopped");
}

/// Events produced by [`ChannelCallbacks`].
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
    /// Transport established.
    Open,
    /// A server message.
    Message(ServerMessage),
    /// A transport failure.
    Error(LiveError),
    /// The session closed.
    Close(CloseEvent),
}

/// Adapter that turns hook calls into a stream of [`LiveEvent`]s.
///
/// ```rust
/// use genai_live::ChannelCallbacks;
///
/// let (callbacks, mut events) = ChannelCallbacks::new();
/// # drop((callbacks, events.try_recv()));
/// ```
#[derive(Debug, Clone)]
pub struct ChannelCallbacks {
    tx: mpsc::UnboundedSender<LiveEvent>,
}

impl ChannelCallbacks {
    /// Create the adapter and the receiving end.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<LiveEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(&self, event: LiveEvent) {
        // The consumer may have stopped listening.
        let _ = self.tx.send(event);
    }
}

#[async_trait]
impl LiveCallbacks for ChannelCallbacks {
    async fn on_open(&self) {
        self.forward(LiveEvent::Open);
    }

    async fn on_message(&self, message: ServerMessage) {
        self.forward(LiveEvent::Message(message));
    }

    async fn on_error(&self, error: LiveError) {
        self.forward(LiveEvent::Error(error));
    }

    async fn on_close(&self, event: CloseEvent) {
        self.forward(LiveEvent::Close(event));
    }
}
