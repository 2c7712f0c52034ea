//! Configuration types for live sessions.
//!
//! [`LiveConnectConfig`] is what a caller hands to `LiveClient::connect`; it is
//! turned into the `setup` frame by [`LiveConnectConfig::to_setup`].

use crate::events::{AudioTranscriptionConfig, GenerationConfig, LiveSetup, SpeechConfig};
use genai_types::{Content, Modality, Tool, ToolConfig};
use serde::{Deserialize, Serialize};

/// How sensitive the server is to the start of speech.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StartSensitivity {
    /// Detect speech starts eagerly.
    #[serde(rename = "START_SENSITIVITY_HIGH")]
    High,
    /// Detect speech starts conservatively.
    #[serde(rename = "START_SENSITIVITY_LOW")]
    Low,
}

/// How sensitive the server is to the end of speech.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndSensitivity {
    /// End turns after short pauses.
    #[serde(rename = "END_SENSITIVITY_HIGH")]
    High,
    /// Allow longer pauses inside a turn.
    #[serde(rename = "END_SENSITIVITY_LOW")]
    Low,
}

/// What user activity does to an in-progress model response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityHandling {
    /// New activity interrupts the model (barge-in).
    StartOfActivityInterrupts,
    /// The model keeps talking.
    NoInterruption,
}

/// Which realtime input counts towards the user turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TurnCoverage {
    /// Only input during detected activity.
    TurnIncludesOnlyActivity,
    /// All input since the previous turn.
    TurnIncludesAllInput,
}

/// Server-side voice activity detection settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AutomaticActivityDetection {
    /// Turns detection off; the client then brackets turns with activity markers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    /// Start-of-speech sensitivity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_of_speech_sensitivity: Option<StartSensitivity>,
    /// End-of-speech sensitivity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_of_speech_sensitivity: Option<EndSensitivity>,
    /// Audio kept before a detected speech start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix_padding_ms: Option<u32>,
    /// Silence needed before speech is considered ended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub silence_duration_ms: Option<u32>,
}

impl AutomaticActivityDetection {
    /// Detection turned off.
    pub fn disabled() -> Self {
        Self { disabled: Some(true), ..Default::default() }
    }

    /// Set the silence duration.
    pub fn with_silence_duration(mut self, ms: u32) -> Self {
        self.silence_duration_ms = Some(ms);
        self
    }

    /// Set the prefix padding.
    pub fn with_prefix_padding(mut self, ms: u32) -> Self {
        self.prefix_padding_ms = Some(ms);
        self
    }
}

/// Realtime input handling.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInputConfig {
    /// Voice activity detection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automatic_activity_detection: Option<AutomaticActivityDetection>,
    /// Interruption behavior.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_handling: Option<ActivityHandling>,
    /// Turn coverage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_coverage: Option<TurnCoverage>,
}

impl RealtimeInputConfig {
    /// Whether the server detects activity on its own. Enabled unless explicitly disabled.
    pub fn automatic_activity_detection_enabled(&self) -> bool {
        !self.automatic_activity_detection.as_ref().and_then(|aad| aad.disabled).unwrap_or(false)
    }
}

/// Session resumption settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionResumptionConfig {
    /// Handle of the session to resume; absent to start a resumable session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
}

/// Configuration for a live session.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LiveConnectConfig {
    /// Output modalities. Left to the server default when empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub response_modalities: Vec<Modality>,

    /// System instruction for the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,

    /// Prebuilt voice for audio output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,

    /// Temperature for response generation.
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

    /// Tools available to the model.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,

    /// Tool configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_config: Option<ToolConfig>,

    /// Realtime input handling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realtime_input_config: Option<RealtimeInputConfig>,

    /// Transcribe the user's audio.
    #[serde(default)]
    pub input_audio_transcription: bool,

    /// Transcribe the model's audio.
    #[serde(default)]
    pub output_audio_transcription: bool,

    /// Session resumption.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_resumption: Option<SessionResumptionConfig>,
}

impl LiveConnectConfig {
    /// Create a new empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the output modalities.
    pub fn with_response_modalities(mut self, modalities: Vec<Modality>) -> Self {
        self.response_modalities = modalities;
        self
    }

    /// Text output only.
    pub fn with_text_output(self) -> Self {
        self.with_response_modalities(vec![Modality::Text])
    }

    /// Audio output only.
    pub fn with_audio_output(self) -> Self {
        self.with_response_modalities(vec![Modality::Audio])
    }

    /// Set the system instruction from text.
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(Content::user(instruction));
        self
    }

    /// Set the system instruction from prepared content.
    pub fn with_system_instruction_content(mut self, instruction: Content) -> Self {
        self.system_instruction = Some(instruction);
        self
    }

    /// Set the output voice.
    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    /// Set the temperature.
    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    /// Set the maximum output tokens.
    pub fn with_max_output_tokens(mut self, max: u32) -> Self {
        self.max_output_tokens = Some(max);
        self
    }

    /// Set the sampling seed.
    pub fn with_seed(mut self, seed: i32) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Add a tool.
    pub fn with_tool(mut self, tool: Tool) -> Self {
        self.tools.push(tool);
        self
    }

    /// Set all tools.
    pub fn with_tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = tools;
        self
    }

    /// Set the tool configuration.
    pub fn with_tool_config(mut self, tool_config: ToolConfig) -> Self {
        self.tool_config = Some(tool_config);
        self
    }

    /// Set realtime input handling.
    pub fn with_realtime_input_config(mut self, config: RealtimeInputConfig) -> Self {
        self.realtime_input_config = Some(config);
        self
    }

    /// Turn off server-side activity detection; turns are then bracketed by
    /// `activityStart` / `activityEnd` markers.
    pub fn without_automatic_activity_detection(mut self) -> Self {
        let config = self.realtime_input_config.get_or_insert_with(Default::default);
        config.automatic_activity_detection = Some(AutomaticActivityDetection::disabled());
        self
    }

    /// Enable transcription of the user's audio.
    pub fn with_input_audio_transcription(mut self) -> Self {
        self.input_audio_transcription = true;
        self
    }

    /// Enable transcription of the model's audio.
    pub fn with_output_audio_transcription(mut self) -> Self {
        self.output_audio_transcription = true;
        self
    }

    /// Enable session resumption, optionally resuming from a previous handle.
    pub fn with_session_resumption(mut self, handle: Option<String>) -> Self {
        self.session_resumption = Some(SessionResumptionConfig { handle });
        self
    }

    /// Whether server-side activity detection is on for this config.
    pub fn automatic_activity_detection_enabled(&self) -> bool {
        self.realtime_input_config
            .as_ref()
            .is_none_or(RealtimeInputConfig::automatic_activity_detection_enabled)
    }

    /// Build the `setup` frame for an already-resolved model name.
    pub fn to_setup(&self, model: impl Into<String>) -> LiveSetup {
        let generation_config = GenerationConfig {
            response_modalities: self.response_modalities.clone(),
            temperature: self.temperature,
            top_p: self.top_p,
            top_k: self.top_k,
            max_output_tokens: self.max_output_tokens,
            seed: self.seed,
            speech_config: self.voice.as_deref().map(SpeechConfig::voice),
        };

        LiveSetup {
            model: model.into(),
            generation_config: (!generation_config.is_empty()).then_some(generation_config),
            system_instruction: self.system_instruction.clone(),
            tools: self.tools.clone(),
            tool_config: self.tool_config.clone(),
            realtime_input_config: self.realtime_input_config.clone(),
            input_audio_transcription: self
                .input_audio_transcription
                .then(AudioTranscriptionConfig::default),
            output_audio_transcription: self
                .output_audio_transcription
                .then(AudioTranscriptionConfig::default),
            session_resumption: self.session_resumption.clone(),
        }
    }
}
