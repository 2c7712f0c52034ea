//! # genai-live
//!
//! Live, bidirectional streaming sessions for generative-model services
//! (the `BidiGenerateContent` WebSocket API on Google AI Studio and Vertex AI).
//!
//! A session keeps one WebSocket open to a model. The caller streams turns,
//! realtime media, text and tool results; server events arrive through a
//! [`LiveCallbacks`] implementation.
//!
//! ```text
//!   send_* ──▶ validate ──▶ outbound queue ──▶ writer task ──▶ socket
//!                                                               │
//!   LiveCallbacks ◀── dispatcher task ◀── reader task ◀─────────┘
//! ```
//!
//! ## Features
//!
//! - **One frame per call**: every `send_*` queues exactly one JSON frame, in call order
//! - **Setup first**: the `setup` frame always leads; sends before the server's
//!   acknowledgement are queued
//! - **Serialized callbacks**: hooks run one at a time, in wire order; `on_close` runs once, last
//! - **Tool bookkeeping**: outstanding tool calls are tracked so responses can be validated
//! - **Pluggable transport**: [`WebSocketConnector`] by default, [`MemoryConnector`] for tests
//!
//! ## Example
//!
//! ```rust,no_run
//! use genai_live::{ChannelCallbacks, LiveClient, LiveConnectConfig, LiveEvent};
//! use std::sync::Arc;
//!
//! # async fn run() -> genai_live::Result<()> {
//! let client = LiveClient::builder().api_key("your-api-key").build()?;
//! let (callbacks, mut events) = ChannelCallbacks::new();
//!
//! let session = client
//!     .connect("gemini-live-2.5-flash-preview", LiveConnectConfig::new().with_text_output(), Arc::new(callbacks))
//!     .await?;
//! session.send_client_content("Hello there", true)?;
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         LiveEvent::Message(message) => {
//!             if let Some(text) = message.text() {
//!                 print!("{}", text);
//!             }
//!         }
//!         LiveEvent::Close(_) => break,
//!         _ => {}
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod activity;
pub mod client;
pub mod codec;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod session;
pub mod transport;

pub use activity::ActivityController;
pub use client::{ClientOptions, LiveBackend, LiveClient, LiveClientBuilder};
pub use config::{
    ActivityHandling, AutomaticActivityDetection, EndSensitivity, LiveConnectConfig,
    RealtimeInputConfig, SessionResumptionConfig, StartSensitivity, TurnCoverage,
};
pub use connection::{PendingToolCall, SessionState};
pub use dispatch::{ChannelCallbacks, LiveCallbacks, LiveEvent};
pub use error::{LiveError, Result};
pub use events::{
    ClientContent, ClientEvent, GoAway, LiveSetup, RealtimeInput, ServerContent, ServerEvent,
    ServerMessage, SessionResumptionUpdate, ToolCall, ToolCallCancellation, ToolResponse,
    Transcription, UsageMetadata,
};
pub use session::LiveSession;
pub use transport::{
    CloseEvent, ConnectRequest, Connector, Frame, FrameSink, FrameStream, MemoryConnector,
    MemoryListener, MemoryPeer, WebSocketConnector,
};

// Re-export the content model so callers need only this crate.
pub use genai_types::{
    Blob, Content, ContentListUnion, FunctionCall, FunctionDeclaration, FunctionResponse, Modality,
    Part, Role, Tool, ToolConfig,
};
