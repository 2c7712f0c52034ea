//! Event types for live communication.
//!
//! Client events are what the session writes to the socket, one frame per
//! event. Server events are what the reader task decodes from the socket and
//! hands to the callback dispatcher. Both follow the camelCase JSON layout of
//! the `BidiGenerateContent` protocol.

use crate::config::{RealtimeInputConfig, SessionResumptionConfig};
use genai_types::{Blob, Content, FunctionCall, FunctionResponse, Modality, Tool, ToolConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ── Client Events ───────────────────────────────────────────────────────

/// Events sent from the client to the live server.
///
/// Serialized externally tagged, so each variant becomes a single-key object
/// such as `{"clientContent": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum ClientEvent {
    /// Initial handshake frame carrying model and configuration.
    Setup(LiveSetup),
    /// Incremental conversation turns.
    ClientContent(ClientContent),
    /// Realtime media, text or activity markers.
    RealtimeInput(RealtimeInput),
    /// Results for tool calls requested by the model.
    ToolResponse(ToolResponse),
}

impl ClientEvent {
    /// Wire discriminator of this event, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Setup(_) => "setup",
            Self::ClientContent(_) => "clientContent",
            Self::RealtimeInput(_) => "realtimeInput",
            Self::ToolResponse(_) => "toolResponse",
        }
    }
}

/// The `setup` frame.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LiveSetup {
    /// Fully qualified model resource name.
    pub model: String,
    /// Generation parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
    /// System instruction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    /// Tools available to the model.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
    /// Tool configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_config: Option<ToolConfig>,
    /// Realtime input handling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realtime_input_config: Option<RealtimeInputConfig>,
    /// Enables transcription of the user's audio.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_audio_transcription: Option<AudioTranscriptionConfig>,
    /// Enables transcription of the model's audio.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_audio_transcription: Option<AudioTranscriptionConfig>,
    /// Session resumption.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_resumption: Option<SessionResumptionConfig>,
}

/// Generation parameters sent in the setup frame.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Requested output modalities.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub response_modalities: Vec<Modality>,
    /// Sampling temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Nucleus sampling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    /// Top-k sampling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    /// Maximum output tokens per turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    /// Sampling seed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i32>,
    /// Voice selection for audio output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speech_config: Option<SpeechConfig>,
}

impl GenerationConfig {
    /// True when no field is set; such a config is left out of the setup frame.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Speech output configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    /// Voice selection.
    pub voice_config: VoiceConfig,
}

/// Voice selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    /// A prebuilt voice.
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

/// A prebuilt voice by name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    /// Voice name, e.g. `Puck`.
    pub voice_name: String,
}

impl SpeechConfig {
    /// Speech config selecting a prebuilt voice.
    pub fn voice(name: impl Into<String>) -> Self {
        Self {
            voice_config: VoiceConfig {
                prebuilt_voice_config: PrebuiltVoiceConfig { voice_name: name.into() },
            },
        }
    }
}

/// Presence enables transcription; the object itself is empty on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AudioTranscriptionConfig {}

/// The `clientContent` frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClientContent {
    /// Ordered turns appended to the conversation.
    pub turns: Vec<Content>,
    /// Whether the model should start generating after these turns.
    #[serde(default)]
    pub turn_complete: bool,
}

/// Marks the start of user activity when automatic activity detection is off.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivityStart {}

/// Marks the end of user activity when automatic activity detection is off.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivityEnd {}

/// The `realtimeInput` frame.
///
/// Exactly one field must be set per frame; the session rejects anything else
/// before touching the network. Long audio streams are sent as many frames,
/// one chunk each.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    /// Generic media chunk. Sent as the protocol's single-element `mediaChunks`.
    #[serde(
        rename = "mediaChunks",
        default,
        with = "media_chunks",
        skip_serializing_if = "Option::is_none"
    )]
    pub media: Option<Blob>,
    /// Audio chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<Blob>,
    /// Video frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<Blob>,
    /// Realtime text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Start of user activity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_start: Option<ActivityStart>,
    /// End of user activity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_end: Option<ActivityEnd>,
    /// The audio stream was paused; flushes cached audio on the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_stream_end: Option<bool>,
}

impl RealtimeInput {
    /// Realtime text input.
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()), ..Default::default() }
    }

    /// Audio chunk input.
    pub fn audio(blob: Blob) -> Self {
        Self { audio: Some(blob), ..Default::default() }
    }

    /// Audio chunk input from raw bytes, e.g. `audio/pcm;rate=16000`.
    pub fn audio_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self::audio(Blob::from_bytes(mime_type, bytes))
    }

    /// Video frame input.
    pub fn video(blob: Blob) -> Self {
        Self { video: Some(blob), ..Default::default() }
    }

    /// Generic media chunk input.
    pub fn media(blob: Blob) -> Self {
        Self { media: Some(blob), ..Default::default() }
    }

    /// Start-of-activity marker.
    pub fn activity_start() -> Self {
        Self { activity_start: Some(ActivityStart {}), ..Default::default() }
    }

    /// End-of-activity marker.
    pub fn activity_end() -> Self {
        Self { activity_end: Some(ActivityEnd {}), ..Default::default() }
    }

    /// Audio stream end marker.
    pub fn audio_stream_end() -> Self {
        Self { audio_stream_end: Some(true), ..Default::default() }
    }

    /// Names of the fields that are set, in wire spelling.
    pub fn set_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.media.is_some() {
            fields.push("media");
        }
        if self.audio.is_some() {
            fields.push("audio");
        }
        if self.video.is_some() {
            fields.push("video");
        }
        if self.text.is_some() {
            fields.push("text");
        }
        if self.activity_start.is_some() {
            fields.push("activityStart");
        }
        if self.activity_end.is_some() {
            fields.push("activityEnd");
        }
        if self.audio_stream_end == Some(true) {
            fields.push("audioStreamEnd");
        }
        fields
    }

    /// Whether this input is an activity marker.
    pub fn is_activity_marker(&self) -> bool {
        self.activity_start.is_some() || self.activity_end.is_some()
    }
}

mod media_chunks {
    use genai_types::Blob;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(media: &Option<Blob>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match media {
            Some(blob) => std::slice::from_ref(blob).serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Blob>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let chunks: Option<Vec<Blob>> = Option::deserialize(deserializer)?;
        Ok(chunks.and_then(|chunks| chunks.into_iter().next()))
    }
}

/// The `toolResponse` frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    /// Ordered function results.
    pub function_responses: Vec<FunctionResponse>,
}

// ── Server Events ───────────────────────────────────────────────────────

/// A decoded inbound frame.
///
/// `usage_metadata` rides along with whichever event the frame carried.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerMessage {
    /// The event selected by the frame's discriminator.
    pub event: ServerEvent,
    /// Token accounting, when the server attached it.
    pub usage_metadata: Option<UsageMetadata>,
}

impl ServerMessage {
    /// Wrap an event without usage metadata.
    pub fn new(event: ServerEvent) -> Self {
        Self { event, usage_metadata: None }
    }

    /// Whether this is the setup acknowledgement.
    pub fn is_setup_complete(&self) -> bool {
        matches!(self.event, ServerEvent::SetupComplete)
    }

    /// Server content, if this message carries any.
    pub fn server_content(&self) -> Option<&ServerContent> {
        match &self.event {
            ServerEvent::ServerContent(content) => Some(content),
            _ => None,
        }
    }

    /// Concatenated text of the model turn fragment, if any.
    pub fn text(&self) -> Option<String> {
        self.server_content()?.model_turn.as_ref()?.text_parts()
    }

    /// Concatenated decoded inline data (usually audio) of the model turn fragment.
    pub fn data(&self) -> Option<Vec<u8>> {
        let turn = self.server_content()?.model_turn.as_ref()?;
        let mut out: Option<Vec<u8>> = None;
        for part in &turn.parts {
            if let genai_types::Part::InlineData { inline_data } = part {
                match inline_data.decode() {
                    Ok(bytes) => out.get_or_insert_with(Vec::new).extend_from_slice(&bytes),
                    Err(e) => {
                        tracing::warn!(error = %e, "dropping undecodable inline data");
                    }
                }
            }
        }
        out
    }
}

/// Events received from the live server.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// The setup frame was accepted.
    SetupComplete,
    /// A fragment of model output.
    ServerContent(ServerContent),
    /// The model asks the client to run functions.
    ToolCall(ToolCall),
    /// Previously requested calls should not be run (or their results are no longer needed).
    ToolCallCancellation(ToolCallCancellation),
    /// The server will terminate the connection soon.
    GoAway(GoAway),
    /// A new resumption handle is available.
    SessionResumptionUpdate(SessionResumptionUpdate),
    /// A frame that carried only token accounting.
    UsageMetadata(UsageMetadata),
}

impl ServerEvent {
    /// Wire discriminator of this event, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SetupComplete => "setupComplete",
            Self::ServerContent(_) => "serverContent",
            Self::ToolCall(_) => "toolCall",
            Self::ToolCallCancellation(_) => "toolCallCancellation",
            Self::GoAway(_) => "goAway",
            Self::SessionResumptionUpdate(_) => "sessionResumptionUpdate",
            Self::UsageMetadata(_) => "usageMetadata",
        }
    }
}

/// Incremental model output.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    /// The model turn fragment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_turn: Option<Content>,
    /// The model finished its turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_complete: Option<bool>,
    /// The model was interrupted by user activity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interrupted: Option<bool>,
    /// The model finished generating (it may still be streaming audio).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_complete: Option<bool>,
    /// Transcription of the user's audio.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_transcription: Option<Transcription>,
    /// Transcription of the model's audio.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_transcription: Option<Transcription>,
}

impl ServerContent {
    /// Whether this fragment ends the model turn.
    pub fn is_turn_complete(&self) -> bool {
        self.turn_complete.unwrap_or(false)
    }

    /// Whether the model was interrupted.
    pub fn is_interrupted(&self) -> bool {
        self.interrupted.unwrap_or(false)
    }
}

/// Audio transcription fragment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Transcription {
    /// Transcribed text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// The transcription of this utterance is final.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished: Option<bool>,
}

/// Function calls requested by the model.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    /// Calls in request order.
    #[serde(default)]
    pub function_calls: Vec<FunctionCall>,
}

/// Cancellation of previously requested calls.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolCallCancellation {
    /// Ids of the cancelled calls.
    #[serde(default)]
    pub ids: Vec<String>,
}

/// Notice that the server will close the connection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GoAway {
    /// Remaining time as a protobuf duration string, e.g. `"10s"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_left: Option<String>,
}

impl GoAway {
    /// Remaining time before the server closes the connection.
    pub fn time_left(&self) -> Option<Duration> {
        parse_proto_duration(self.time_left.as_deref()?)
    }
}

/// A fresh handle for resuming this session on a new connection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionResumptionUpdate {
    /// The handle; absent when the session cannot be resumed right now.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_handle: Option<String>,
    /// Whether the session is resumable at this point.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resumable: Option<bool>,
    /// Index of the last client message covered by the handle (int64 as string).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_consumed_client_message_index: Option<String>,
}

/// Token accounting.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    /// Tokens in the prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_token_count: Option<u32>,
    /// Tokens served from cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_content_token_count: Option<u32>,
    /// Tokens in the response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_token_count: Option<u32>,
    /// Tokens in tool-use prompts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_use_prompt_token_count: Option<u32>,
    /// Tokens spent thinking.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thoughts_token_count: Option<u32>,
    /// Total tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_token_count: Option<u32>,
}

fn parse_proto_duration(raw: &str) -> Option<Duration> {
    let seconds: f64 = raw.trim().strip_suffix('s')?.parse().ok()?;
    if seconds.is_finite() && seconds >= 0.0 { Some(Duration::from_secs_f64(seconds)) } else { None }
}
