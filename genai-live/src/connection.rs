//! Connection state and the background writer/reader tasks.
//!
//! Outbound frames go through one unbounded queue drained by the writer task.
//! The queue's sender sits behind a mutex that `close()` shares, so a frame is
//! either enqueued before the close marker or rejected with
//! [`LiveError::SessionClosed`].

use crate::codec;
use crate::dispatch::Dispatch;
use crate::error::{LiveError, Result};
use crate::events::{ClientEvent, ServerEvent, ServerMessage, ToolResponse};
use crate::transport::{CloseEvent, Frame, FrameSink, FrameStream};
use genai_types::FunctionResponse;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};

/// How long the reader waits for queued frames to flush once the connection ends.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Lifecycle of a session. States only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SessionState {
    /// Transport open, setup not yet acknowledged.
    Connecting,
    /// Setup acknowledged.
    Open,
    /// `close()` was called; queued frames are being flushed.
    Closing,
    /// The connection is gone.
    Closed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connecting => f.write_str("connecting"),
            Self::Open => f.write_str("open"),
            Self::Closing => f.write_str("closing"),
            Self::Closed => f.write_str("closed"),
        }
    }
}

#[derive(Debug)]
pub(crate) enum Outbound {
    Frame(String),
    Close,
}

/// A tool call the model is waiting on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingToolCall {
    /// Call id, when the server assigned one.
    pub id: Option<String>,
    /// Function name.
    pub name: String,
}

/// State shared by the session handle and its background tasks.
pub(crate) struct Shared {
    pub session_id: String,
    state: watch::Sender<SessionState>,
    outbound: Mutex<Option<mpsc::UnboundedSender<Outbound>>>,
    pub close_requested: Arc<AtomicBool>,
    pending_calls: Mutex<Vec<PendingToolCall>>,
    resumption_handle: Mutex<Option<String>>,
}

impl Shared {
    pub fn new(session_id: String) -> (Arc<Self>, mpsc::UnboundedReceiver<Outbound>) {
        let (state, _) = watch::channel(SessionState::Connecting);
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Self {
            session_id,
            state,
            outbound: Mutex::new(Some(tx)),
            close_requested: Arc::new(AtomicBool::new(false)),
            pending_calls: Mutex::new(Vec::new()),
            resumption_handle: Mutex::new(None),
        });
        (shared, rx)
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Move to `to` if it is ahead of the current state.
    pub fn advance(&self, to: SessionState) -> bool {
        let mut from = None;
        let changed = self.state.send_if_modified(|state| {
            if to > *state {
                from = Some(*state);
                *state = to;
                true
            } else {
                false
            }
        });
        if let Some(from) = from {
            tracing::debug!(session_id = %self.session_id, %from, %to, "session state changed");
        }
        changed
    }

    /// Encode and queue one client event.
    pub fn enqueue(&self, event: &ClientEvent) -> Result<()> {
        let frame = codec::encode(event)?;
        let outbound = self.outbound.lock();
        if self.close_requested.load(Ordering::SeqCst) || self.state() >= SessionState::Closing {
            return Err(LiveError::SessionClosed);
        }
        let tx = outbound.as_ref().ok_or(LiveError::SessionClosed)?;
        tx.send(Outbound::Frame(frame)).map_err(|_| LiveError::SessionClosed)?;
        tracing::debug!(session_id = %self.session_id, kind = event.kind(), "frame queued");
        Ok(())
    }

    /// Client-initiated close. Returns false when already closing.
    pub fn request_close(&self) -> bool {
        let mut outbound = self.outbound.lock();
        if self.close_requested.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.advance(SessionState::Closing);
        if let Some(tx) = outbound.take() {
            let _ = tx.send(Outbound::Close);
        }
        true
    }

    /// Stop accepting frames and ask the writer to close the sink.
    fn shutdown_writer(&self) {
        if let Some(tx) = self.outbound.lock().take() {
            let _ = tx.send(Outbound::Close);
        }
    }

    pub fn pending_calls(&self) -> Vec<PendingToolCall> {
        self.pending_calls.lock().clone()
    }

    pub fn resumption_handle(&self) -> Option<String> {
        self.resumption_handle.lock().clone()
    }

    /// Validate tool responses against the outstanding calls, fill a missing id
    /// when the answer is unambiguous, queue the frame and retire the answered
    /// calls.
    ///
    /// A response without an id is rejected only while two or more calls are
    /// unanswered and at least one of them has an id the caller could supply.
    /// Each outstanding call is matched by at most one response of the batch.
    pub fn send_tool_response(&self, mut responses: Vec<FunctionResponse>) -> Result<()> {
        if responses.is_empty() {
            return Err(LiveError::validation("functionResponses is required"));
        }

        let mut pending = self.pending_calls.lock();
        let mut unanswered = pending.clone();
        for (index, response) in responses.iter_mut().enumerate() {
            if response.name.is_empty() {
                return Err(LiveError::validation(format!(
                    "FunctionResponse at index {} must have a name",
                    index
                )));
            }
            if let Some(id) = &response.id {
                unanswered.retain(|call| call.id.as_ref() != Some(id));
                continue;
            }
            if unanswered.len() > 1 && unanswered.iter().any(|call| call.id.is_some()) {
                return Err(LiveError::validation(
                    "FunctionResponse request must have an id when more than one tool call is outstanding",
                ));
            }
            let mut same_name =
                unanswered.iter().enumerate().filter(|(_, call)| call.name == response.name);
            let matched = match (same_name.next(), same_name.next()) {
                (Some((position, _)), None) => Some(position),
                // Several id-less calls share the name; any of them is the answer.
                (Some((position, call)), Some(_)) if call.id.is_none() => Some(position),
                _ => None,
            };
            if let Some(position) = matched {
                response.id = unanswered.remove(position).id;
            }
        }

        let answered: Vec<(Option<String>, String)> =
            responses.iter().map(|r| (r.id.clone(), r.name.clone())).collect();
        self.enqueue(&ClientEvent::ToolResponse(ToolResponse { function_responses: responses }))?;

        for (id, name) in answered {
            let position = pending.iter().position(|call| match &id {
                Some(id) => call.id.as_deref() == Some(id.as_str()),
                None => call.id.is_none() && call.name == name,
            });
            if let Some(position) = position {
                pending.remove(position);
            }
        }
        Ok(())
    }

    /// Bookkeeping for an inbound message before it is dispatched.
    fn observe(&self, message: &ServerMessage) {
        match &message.event {
            ServerEvent::SetupComplete => {
                if self.advance(SessionState::Open) {
                    tracing::info!(session_id = %self.session_id, "setup complete");
                }
            }
            ServerEvent::ToolCall(call) => {
                let mut pending = self.pending_calls.lock();
                for function_call in &call.function_calls {
                    pending.push(PendingToolCall {
                        id: function_call.id.clone(),
                        name: function_call.name.clone(),
                    });
                }
                tracing::debug!(
                    session_id = %self.session_id,
                    outstanding = pending.len(),
                    "tool call received"
                );
            }
            ServerEvent::ToolCallCancellation(cancellation) => {
                self.pending_calls.lock().retain(|call| {
                    !call.id.as_ref().is_some_and(|id| cancellation.ids.contains(id))
                });
            }
            ServerEvent::GoAway(go_away) => {
                tracing::info!(
                    session_id = %self.session_id,
                    time_left = ?go_away.time_left(),
                    "server will close the connection"
                );
            }
            ServerEvent::SessionResumptionUpdate(update) => {
                if update.resumable != Some(false) {
                    if let Some(handle) = &update.new_handle {
                        *self.resumption_handle.lock() = Some(handle.clone());
                    }
                }
            }
            ServerEvent::ServerContent(_) | ServerEvent::UsageMetadata(_) => {}
        }
    }
}

/// Drain the outbound queue into the sink until a close marker, a send
/// failure or the queue closing.
pub(crate) async fn run_writer(
    shared: Arc<Shared>,
    mut sink: Box<dyn FrameSink>,
    mut rx: mpsc::UnboundedReceiver<Outbound>,
    dispatch_tx: mpsc::Sender<Dispatch>,
    done: oneshot::Sender<()>,
) {
    while let Some(outbound) = rx.recv().await {
        match outbound {
            Outbound::Frame(text) => {
                if let Err(e) = sink.send(Frame::Text(text)).await {
                    tracing::error!(session_id = %shared.session_id, error = %e, "write failed");
                    let _ = dispatch_tx.send(Dispatch::Error(e)).await;
                    break;
                }
            }
            Outbound::Close => break,
        }
    }

    // Nothing may be enqueued past this point.
    shared.shutdown_writer();
    if let Err(e) = sink.close().await {
        tracing::debug!(session_id = %shared.session_id, error = %e, "close frame not delivered");
    }
    tracing::debug!(session_id = %shared.session_id, "writer stopped");
    let _ = done.send(());
}

enum ReadStep {
    WriterDone,
    Item(Option<Result<Frame>>),
}

/// Read frames until the connection ends, then report the close.
pub(crate) async fn run_reader(
    shared: Arc<Shared>,
    mut stream: Box<dyn FrameStream>,
    dispatch_tx: mpsc::Sender<Dispatch>,
    mut writer_done: oneshot::Receiver<()>,
) {
    let mut writer_finished = false;

    let close_event = loop {
        let step = tokio::select! {
            biased;
            _ = &mut writer_done => ReadStep::WriterDone,
            item = stream.recv() => ReadStep::Item(item),
        };

        let item = match step {
            ReadStep::Item(item) => item,
            ReadStep::WriterDone => {
                writer_finished = true;
                break if shared.close_requested.load(Ordering::SeqCst) {
                    CloseEvent::client()
                } else {
                    CloseEvent::new(Some(CloseEvent::ABNORMAL), "write failed")
                };
            }
        };

        match item {
            Some(Ok(Frame::Close(event))) => {
                tracing::info!(
                    session_id = %shared.session_id,
                    code = ?event.code,
                    reason = %event.reason,
                    "server closed the connection"
                );
                break event;
            }
            Some(Ok(frame)) => match codec::decode_frame(&frame) {
                Ok(message) => {
                    tracing::debug!(session_id = %shared.session_id, kind = message.event.kind(), "frame received");
                    shared.observe(&message);
                    if dispatch_tx.send(Dispatch::Message(message)).await.is_err() {
                        break CloseEvent::new(None, "dispatcher stopped");
                    }
                }
                Err(e) => {
                    tracing::warn!(session_id = %shared.session_id, error = %e, "dropping undecodable frame");
                }
            },
            Some(Err(e)) => {
                tracing::error!(session_id = %shared.session_id, error = %e, "transport failed");
                let _ = dispatch_tx.send(Dispatch::Error(e)).await;
                break CloseEvent::new(Some(CloseEvent::ABNORMAL), "transport error");
            }
            None => break CloseEvent::new(None, "connection ended"),
        }
    };

    if !writer_finished {
        shared.shutdown_writer();
        if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, writer_done).await.is_err() {
            tracing::warn!(session_id = %shared.session_id, "writer did not stop in time");
        }
    }

    shared.advance(SessionState::Closed);
    tracing::info!(session_id = %shared.session_id, code = ?close_event.code, "session closed");
    let _ = dispatch_tx.send(Dispatch::Close(close_event)).await;
}
