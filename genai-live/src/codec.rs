//! JSON frame codec.
//!
//! One client event becomes one text frame. Inbound frames are parsed as a
//! single JSON object whose top-level key selects the server event.

use crate::error::{LiveError, Result};
use crate::events::{
    ClientEvent, GoAway, ServerContent, ServerEvent, ServerMessage, SessionResumptionUpdate,
    ToolCall, ToolCallCancellation, UsageMetadata,
};
use crate::transport::Frame;
use serde::Deserialize;
use serde_json::Value;

/// Encode a client event as the text of a single frame.
pub fn encode(event: &ClientEvent) -> Result<String> {
    serde_json::to_string(event)
        .map_err(|e| LiveError::SerializationError(format!("{} frame: {}", event.kind(), e)))
}

/// Decode a client frame. This is the decoder a server would run and is used
/// by in-memory peers and round-trip checks.
pub fn decode_client(raw: &str) -> Result<ClientEvent> {
    serde_json::from_str(raw).map_err(|e| LiveError::protocol(format!("invalid client frame: {}", e)))
}

/// Decode an inbound transport frame. The service sends JSON in binary
/// frames as well as text frames.
pub fn decode_frame(frame: &Frame) -> Result<ServerMessage> {
    match frame {
        Frame::Text(text) => decode(text),
        Frame::Binary(bytes) => {
            let text = std::str::from_utf8(bytes).map_err(|e| {
                LiveError::protocol(format!("Invalid UTF-8 in binary message: {}", e))
            })?;
            decode(text)
        }
        Frame::Close(_) => Err(LiveError::protocol("close frame carries no server message")),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawServerMessage {
    #[serde(default)]
    setup_complete: Option<Value>,
    #[serde(default)]
    server_content: Option<ServerContent>,
    #[serde(default)]
    tool_call: Option<ToolCall>,
    #[serde(default)]
    tool_call_cancellation: Option<ToolCallCancellation>,
    #[serde(default)]
    go_away: Option<GoAway>,
    #[serde(default)]
    session_resumption_update: Option<SessionResumptionUpdate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

/// Decode the text of an inbound frame.
pub fn decode(raw: &str) -> Result<ServerMessage> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| LiveError::protocol(format!("Parse error: {}", e)))?;
    if !value.is_object() {
        return Err(LiveError::protocol("server frame is not a JSON object"));
    }

    let raw: RawServerMessage = serde_json::from_value(value)
        .map_err(|e| LiveError::protocol(format!("malformed server frame: {}", e)))?;

    let event = if raw.setup_complete.is_some() {
        ServerEvent::SetupComplete
    } else if let Some(content) = raw.server_content {
        ServerEvent::ServerContent(content)
    } else if let Some(call) = raw.tool_call {
        ServerEvent::ToolCall(call)
    } else if let Some(cancellation) = raw.tool_call_cancellation {
        ServerEvent::ToolCallCancellation(cancellation)
    } else if let Some(go_away) = raw.go_away {
        ServerEvent::GoAway(go_away)
    } else if let Some(update) = raw.session_resumption_update {
        ServerEvent::SessionResumptionUpdate(update)
    } else if let Some(usage) = raw.usage_metadata.clone() {
        ServerEvent::UsageMetadata(usage)
    } else {
        return Err(LiveError::protocol("unrecognized server message"));
    };

    Ok(ServerMessage { event, usage_metadata: raw.usage_metadata })
}
