//! The live session handle.

use crate::activity::ActivityController;
use crate::client::LiveClient;
use crate::config::LiveConnectConfig;
use crate::connection::{self, PendingToolCall, SessionState, Shared};
use crate::dispatch::{self, DISPATCH_CAPACITY, LiveCallbacks};
use crate::error::{LiveError, Result};
use crate::events::{ClientEvent, RealtimeInput};
use genai_types::{ContentListUnion, ContentNormalizer, FunctionResponse};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};

impl LiveClient {
    /// Open a live session.
    ///
    /// Resolves the model, opens the transport and queues the `setup` frame
    /// before anything else. The returned session is `Connecting` until the
    /// server acknowledges setup; sends issued before then are queued in order.
    pub async fn connect(
        &self,
        model: &str,
        config: LiveConnectConfig,
        callbacks: Arc<dyn LiveCallbacks>,
    ) -> Result<LiveSession> {
        let model = self.options.resolve_model(model)?;
        let request = self.options.connect_request()?;
        let session_id = uuid::Uuid::new_v4().to_string();

        tracing::info!(
            session_id = %session_id,
            model_id = %model,
            url = %request.redacted_url(),
            "connecting live session"
        );
        let (sink, stream) = self.connector.connect(request).await.map_err(|e| match e {
            LiveError::ConnectionError(_) => e,
            other => LiveError::connection(other.to_string()),
        })?;

        let (shared, outbound_rx) = Shared::new(session_id.clone());
        let controller = ActivityController::from_config(&config);
        shared.enqueue(&ClientEvent::Setup(config.to_setup(model.clone())))?;

        let (dispatch_tx, dispatch_rx) = mpsc::channel(DISPATCH_CAPACITY);
        let (writer_done_tx, writer_done_rx) = oneshot::channel();

        tokio::spawn(dispatch::run_dispatcher(
            session_id.clone(),
            callbacks,
            dispatch_rx,
            shared.close_requested.clone(),
        ));
        tokio::spawn(connection::run_writer(
            shared.clone(),
            sink,
            outbound_rx,
            dispatch_tx.clone(),
            writer_done_tx,
        ));
        tokio::spawn(connection::run_reader(shared.clone(), stream, dispatch_tx, writer_done_rx));

        let state_rx = shared.subscribe();
        Ok(LiveSession { shared, state_rx, controller, normalizer: self.normalizer.clone(), model })
    }
}

/// A live session.
///
/// All `send_*` methods validate their input, queue exactly one frame and
/// return without waiting for the network. Frames leave in call order.
/// Dropping the session closes it.
pub struct LiveSession {
    shared: Arc<Shared>,
    state_rx: watch::Receiver<SessionState>,
    controller: ActivityController,
    normalizer: Arc<dyn ContentNormalizer>,
    model: String,
}

impl std::fmt::Debug for LiveSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveSession")
            .field("session_id", &self.shared.session_id)
            .field("model", &self.model)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl LiveSession {
    /// Unique id of this session, used in logs.
    pub fn session_id(&self) -> &str {
        &self.shared.session_id
    }

    /// Resolved model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    /// Whether setup was acknowledged and the session is not closing.
    pub fn is_open(&self) -> bool {
        self.state() == SessionState::Open
    }

    /// Newest resumption handle received from the server.
    pub fn resumption_handle(&self) -> Option<String> {
        self.shared.resumption_handle()
    }

    /// Tool calls the model is still waiting on.
    pub fn pending_tool_calls(&self) -> Vec<PendingToolCall> {
        self.shared.pending_calls()
    }

    /// Send conversation turns.
    ///
    /// Accepts text, parts or contents; they are normalized into turns before
    /// sending. With `turn_complete = false` the model waits for more input.
    pub fn send_client_content(
        &self,
        turns: impl Into<ContentListUnion>,
        turn_complete: bool,
    ) -> Result<()> {
        let turns = self.normalizer.normalize(turns.into())?;
        let event = self.controller.client_content(turns, turn_complete)?;
        self.shared.enqueue(&event)
    }

    /// Send one realtime input: a media chunk, text or an activity marker.
    pub fn send_realtime_input(&self, input: RealtimeInput) -> Result<()> {
        let event = self.controller.realtime_input(input)?;
        self.shared.enqueue(&event)
    }

    /// Answer tool calls.
    ///
    /// A response without an id is matched to the only outstanding call of the
    /// same name; with several calls outstanding every response needs an id.
    pub fn send_tool_response(&self, function_responses: Vec<FunctionResponse>) -> Result<()> {
        self.shared.send_tool_response(function_responses)
    }

    /// Close the session. Queued frames are flushed first. Idempotent.
    pub fn close(&self) {
        if self.shared.request_close() {
            tracing::info!(session_id = %self.shared.session_id, "closing live session");
        }
    }

    /// Wait until the server acknowledges setup.
    ///
    /// Fails with [`LiveError::SessionClosed`] if the session closes first.
    pub async fn wait_for_setup(&self) -> Result<()> {
        let mut rx = self.state_rx.clone();
        let state = rx
            .wait_for(|state| *state != SessionState::Connecting)
            .await
            .map_err(|_| LiveError::SessionClosed)?;
        match *state {
            SessionState::Open => Ok(()),
            _ => Err(LiveError::SessionClosed),
        }
    }

    /// Wait until the connection is gone.
    pub async fn closed(&self) {
        let mut rx = self.state_rx.clone();
        let _ = rx.wait_for(|state| *state == SessionState::Closed).await;
    }
}

impl Drop for LiveSession {
    fn drop(&mut self) {
        self.close();
    }
}
