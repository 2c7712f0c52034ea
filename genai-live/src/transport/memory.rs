//! In-process transport.
//!
//! [`MemoryConnector`] hands every accepted connection to a [`MemoryListener`]
//! as a [`MemoryPeer`], which plays the server side: it reads the client's
//! frames and pushes server frames back. Used by tests and offline demos.

use super::{CloseEvent, ConnectRequest, Connector, Frame, FrameSink, FrameStream};
use crate::codec;
use crate::error::{LiveError, Result};
use crate::events::ClientEvent;
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Connector whose connections terminate in this process.
#[derive(Clone)]
pub struct MemoryConnector {
    accept_tx: mpsc::UnboundedSender<MemoryPeer>,
    reject_with: Arc<Mutex<Option<LiveError>>>,
}

/// Receives the server side of each connection.
pub struct MemoryListener {
    accept_rx: mpsc::UnboundedReceiver<MemoryPeer>,
}

impl MemoryConnector {
    /// Create a connector and the listener that receives its connections.
    pub fn new() -> (Self, MemoryListener) {
        let (accept_tx, accept_rx) = mpsc::unbounded_channel();
        (
            Self { accept_tx, reject_with: Arc::new(Mutex::new(None)) },
            MemoryListener { accept_rx },
        )
    }

    /// Make every following connect attempt fail with `error`.
    pub fn reject_with(&self, error: LiveError) {
        *self.reject_with.lock() = Some(error);
    }
}

impl MemoryListener {
    /// Wait for the next connection.
    pub async fn accept(&mut self) -> Option<MemoryPeer> {
        self.accept_rx.recv().await
    }

    /// The next connection, if one is already waiting.
    pub fn try_accept(&mut self) -> Option<MemoryPeer> {
        self.accept_rx.try_recv().ok()
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(
        &self,
        request: ConnectRequest,
    ) -> Result<(Box<dyn FrameSink>, Box<dyn FrameStream>)> {
        if let Some(error) = self.reject_with.lock().clone() {
            return Err(error);
        }

        let (client_tx, client_rx) = mpsc::unbounded_channel();
        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let peer = MemoryPeer { request, from_client: client_rx, to_client: Some(server_tx) };
        self.accept_tx.send(peer).map_err(|_| LiveError::connection("memory listener dropped"))?;

        Ok((
            Box::new(MemorySink { tx: Some(client_tx) }),
            Box::new(MemoryStream { rx: server_rx }),
        ))
    }
}

struct MemorySink {
    tx: Option<mpsc::UnboundedSender<Frame>>,
}

#[async_trait]
impl FrameSink for MemorySink {
    async fn send(&mut self, frame: Frame) -> Result<()> {
        let tx = self.tx.as_ref().ok_or_else(|| LiveError::transport("sink closed"))?;
        tx.send(frame).map_err(|_| LiveError::transport("peer disconnected"))
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Frame::Close(CloseEvent::client()));
        }
        Ok(())
    }
}

struct MemoryStream {
    rx: mpsc::UnboundedReceiver<Result<Frame>>,
}

#[async_trait]
impl FrameStream for MemoryStream {
    async fn recv(&mut self) -> Option<Result<Frame>> {
        self.rx.recv().await
    }
}

/// Server side of an in-memory connection.
pub struct MemoryPeer {
    request: ConnectRequest,
    from_client: mpsc::UnboundedReceiver<Frame>,
    to_client: Option<mpsc::UnboundedSender<Result<Frame>>>,
}

impl MemoryPeer {
    /// The request the client connected with.
    pub fn request(&self) -> &ConnectRequest {
        &self.request
    }

    /// Next raw frame from the client; `None` once the client side is gone.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.from_client.recv().await
    }

    /// Next client event, decoded. Returns `None` on a close frame or when the
    /// client side is gone.
    pub async fn recv_event(&mut self) -> Option<ClientEvent> {
        match self.recv().await? {
            Frame::Text(text) => codec::decode_client(&text).ok(),
            Frame::Binary(bytes) => {
                std::str::from_utf8(&bytes).ok().and_then(|t| codec::decode_client(t).ok())
            }
            Frame::Close(_) => None,
        }
    }

    /// Push a text frame.
    pub fn send_text(&self, text: impl Into<String>) -> bool {
        self.push(Ok(Frame::Text(text.into())))
    }

    /// Push a JSON value as a text frame.
    pub fn send_json(&self, value: &Value) -> bool {
        self.send_text(value.to_string())
    }

    /// Push a binary frame.
    pub fn send_binary(&self, bytes: impl Into<Bytes>) -> bool {
        self.push(Ok(Frame::Binary(bytes.into())))
    }

    /// Acknowledge the setup frame.
    pub fn send_setup_complete(&self) -> bool {
        self.send_text(r#"{"setupComplete":{}}"#)
    }

    /// Inject a transport failure into the client's stream.
    pub fn fail(&self, message: impl Into<String>) -> bool {
        self.push(Err(LiveError::transport(message)))
    }

    /// Close the connection from the server side.
    pub fn close(&mut self, code: u16, reason: impl Into<String>) {
        if let Some(tx) = self.to_client.take() {
            let _ = tx.send(Ok(Frame::Close(CloseEvent::new(Some(code), reason))));
        }
    }

    /// Drop the connection without a close frame.
    pub fn disconnect(&mut self) {
        self.to_client = None;
    }

    fn push(&self, item: Result<Frame>) -> bool {
        self.to_client.as_ref().is_some_and(|tx| tx.send(item).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn request() -> ConnectRequest {
        ConnectRequest::new(Url::parse("wss://memory.test/live").unwrap())
    }

    #[tokio::test]
    async fn test_frames_flow_both_ways() {
        let (connector, mut listener) = MemoryConnector::new();
        let (mut sink, mut stream) = connector.connect(request()).await.unwrap();
        let mut peer = listener.accept().await.unwrap();

        sink.send(Frame::Text("ping".into())).await.unwrap();
        assert_eq!(peer.recv().await, Some(Frame::Text("ping".into())));

        assert!(peer.send_text("pong"));
        assert_eq!(stream.recv().await.unwrap().unwrap(), Frame::Text("pong".into()));

        sink.close().await.unwrap();
        assert_eq!(peer.recv().await, Some(Frame::Close(CloseEvent::client())));
        assert_eq!(peer.recv().await, None);
    }

    #[tokio::test]
    async fn test_reject_with() {
        let (connector, _listener) = MemoryConnector::new();
        connector.reject_with(LiveError::connection("authentication rejected (HTTP 401)"));
        let result = connector.connect(request()).await;
        assert!(matches!(result, Err(LiveError::ConnectionError(_))));
    }

    #[tokio::test]
    async fn test_disconnect_ends_stream() {
        let (connector, mut listener) = MemoryConnector::new();
        let (_sink, mut stream) = connector.connect(request()).await.unwrap();
        let mut peer = listener.accept().await.unwrap();
        peer.disconnect();
        assert!(stream.recv().await.is_none());
    }
}
