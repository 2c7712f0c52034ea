//! Transport seam between the session and the network.
//!
//! A [`Connector`] opens a connection and hands back a [`FrameSink`] and a
//! [`FrameStream`]. The session owns exactly one writer task on the sink and
//! one reader task on the stream.

pub mod memory;

pub use memory::{MemoryConnector, MemoryListener, MemoryPeer};

use crate::error::{LiveError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Once;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use url::Url;

/// A single transport frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 text frame.
    Text(String),
    /// Binary frame.
    Binary(Bytes),
    /// The peer closed the connection.
    Close(CloseEvent),
}

/// Why a connection closed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CloseEvent {
    /// WebSocket close code, when one was received or sent.
    pub code: Option<u16>,
    /// Close reason, possibly empty.
    pub reason: String,
}

impl CloseEvent {
    /// Normal closure.
    pub const NORMAL: u16 = 1000;
    /// Abnormal closure (no close frame).
    pub const ABNORMAL: u16 = 1006;

    /// Create a close event.
    pub fn new(code: Option<u16>, reason: impl Into<String>) -> Self {
        Self { code, reason: reason.into() }
    }

    /// Close initiated by this client.
    pub fn client() -> Self {
        Self::new(Some(Self::NORMAL), "client closed")
    }

    /// Whether the connection closed cleanly.
    pub fn is_normal(&self) -> bool {
        self.code == Some(Self::NORMAL)
    }
}

/// Everything needed to open the transport for one session.
#[derive(Clone)]
pub struct ConnectRequest {
    /// Endpoint URL, possibly carrying a key in its query.
    pub url: Url,
    /// Bearer token for the `Authorization` header.
    pub bearer_token: Option<SecretString>,
}

impl ConnectRequest {
    /// Create a request for a URL.
    pub fn new(url: Url) -> Self {
        Self { url, bearer_token: None }
    }

    /// Attach a bearer token.
    pub fn with_bearer_token(mut self, token: SecretString) -> Self {
        self.bearer_token = Some(token);
        self
    }

    /// The URL with credential query parameters masked, for logs.
    pub fn redacted_url(&self) -> String {
        let mut url = self.url.clone();
        let pairs: Vec<(String, String)> = self
            .url
            .query_pairs()
            .map(|(k, v)| {
                let masked = matches!(k.as_ref(), "key" | "access_token");
                (k.into_owned(), if masked { "***".to_string() } else { v.into_owned() })
            })
            .collect();
        if pairs.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(pairs);
        }
        url.to_string()
    }
}

impl std::fmt::Debug for ConnectRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectRequest")
            .field("url", &self.redacted_url())
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Outbound half of a transport.
#[async_trait]
pub trait FrameSink: Send {
    /// Write one frame.
    async fn send(&mut self, frame: Frame) -> Result<()>;

    /// Send a close frame and release the connection.
    async fn close(&mut self) -> Result<()>;
}

/// Inbound half of a transport.
#[async_trait]
pub trait FrameStream: Send {
    /// Next frame; `None` when the stream ended without a close frame.
    async fn recv(&mut self) -> Option<Result<Frame>>;
}

/// Opens transports.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a connection for a request.
    async fn connect(
        &self,
        request: ConnectRequest,
    ) -> Result<(Box<dyn FrameSink>, Box<dyn FrameStream>)>;
}

// ── WebSocket ───────────────────────────────────────────────────────────

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Default connector over TLS WebSockets.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    /// Create a new connector.
    pub fn new() -> Self {
        Self
    }
}

fn install_crypto_provider() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        // Fails only when the application already installed one.
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
    });
}

fn map_connect_error(err: tokio_tungstenite::tungstenite::Error) -> LiveError {
    use tokio_tungstenite::tungstenite::Error as WsError;
    match err {
        WsError::Http(response) => {
            let status = response.status().as_u16();
            match status {
                401 | 403 => LiveError::connection(format!(
                    "authentication rejected (HTTP {}): check the API key or access token",
                    status
                )),
                400 | 404 => LiveError::connection(format!(
                    "invalid model or endpoint (HTTP {})",
                    status
                )),
                _ => LiveError::connection(format!("WebSocket handshake failed (HTTP {})", status)),
            }
        }
        other => LiveError::connection(format!("WebSocket connect error: {}", other)),
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(
        &self,
        request: ConnectRequest,
    ) -> Result<(Box<dyn FrameSink>, Box<dyn FrameStream>)> {
        install_crypto_provider();

        let mut ws_request = request.url.as_str().into_client_request().map_err(|e| {
            LiveError::connection(format!("Failed to create client request: {}", e))
        })?;
        if let Some(token) = &request.bearer_token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                .map_err(|e| LiveError::config(format!("Invalid auth token header: {}", e)))?;
            ws_request.headers_mut().insert("Authorization", value);
        }

        tracing::debug!(url = %request.redacted_url(), "opening websocket");
        let (stream, response) =
            tokio_tungstenite::connect_async(ws_request).await.map_err(map_connect_error)?;
        tracing::debug!(status = %response.status(), "websocket handshake complete");

        let (sink, source) = stream.split();
        Ok((Box::new(WsFrameSink { sink }), Box::new(WsFrameStream { source })))
    }
}

struct WsFrameSink {
    sink: SplitSink<WsStream, Message>,
}

#[async_trait]
impl FrameSink for WsFrameSink {
    async fn send(&mut self, frame: Frame) -> Result<()> {
        let message = match frame {
            Frame::Text(text) => Message::Text(text.into()),
            Frame::Binary(bytes) => Message::Binary(bytes),
            Frame::Close(event) => Message::Close(Some(CloseFrame {
                code: CloseCode::from(event.code.unwrap_or(CloseEvent::NORMAL)),
                reason: event.reason.into(),
            })),
        };
        self.sink
            .send(message)
            .await
            .map_err(|e| LiveError::transport(format!("Send error: {}", e)))
    }

    async fn close(&mut self) -> Result<()> {
        self.sink.close().await.map_err(|e| LiveError::transport(format!("Close error: {}", e)))
    }
}

struct WsFrameStream {
    source: SplitStream<WsStream>,
}

#[async_trait]
impl FrameStream for WsFrameStream {
    async fn recv(&mut self) -> Option<Result<Frame>> {
        loop {
            return match self.source.next().await? {
                Ok(Message::Text(text)) => Some(Ok(Frame::Text(text.as_str().to_owned()))),
                Ok(Message::Binary(bytes)) => Some(Ok(Frame::Binary(bytes))),
                Ok(Message::Close(frame)) => {
                    let event = frame
                        .map(|f| CloseEvent::new(Some(u16::from(f.code)), f.reason.as_str()))
                        .unwrap_or_else(|| CloseEvent::new(None, ""));
                    Some(Ok(Frame::Close(event)))
                }
                // Pings are answered by tungstenite itself.
                Ok(_) => continue,
                Err(e) => Some(Err(LiveError::transport(format!("Receive error: {}", e)))),
            };
        }
    }
}
