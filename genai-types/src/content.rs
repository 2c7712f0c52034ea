//! # Content primitives
//!
//! - [`Role`] - The speaker of a turn (user or model)
//! - [`Part`] - Content fragments that make up a turn (text, media, function calls, code execution)
//! - [`Blob`] - Binary data with MIME type, base64 encoded on the wire
//! - [`Content`] - A role plus its ordered parts; one `Content` is one turn
//! - [`Modality`] - Output format types (text, image, audio)

#![allow(clippy::enum_variant_names)]

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::tools::{FunctionCall, FunctionResponse};

/// Role of a turn in a conversation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Turn from the user
    User,
    /// Turn from the model
    Model,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => f.write_str("user"),
            Self::Model => f.write_str("model"),
        }
    }
}

/// Content part that can be included in a turn
///
/// Variants are tried in order. Parts this crate does not model land in
/// [`Part::Other`] so that one new part kind cannot fail a whole frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Part {
    /// Text content
    Text {
        /// The text content
        text: String,
        /// Whether this is a thought summary
        #[serde(skip_serializing_if = "Option::is_none")]
        thought: Option<bool>,
        /// Opaque signature to echo back with the part in later turns
        #[serde(rename = "thoughtSignature", skip_serializing_if = "Option::is_none")]
        thought_signature: Option<String>,
    },
    /// Inline media (audio, image, video)
    InlineData {
        /// The blob data
        #[serde(rename = "inlineData")]
        inline_data: Blob,
    },
    /// Media referenced by URI
    FileData {
        /// The file reference
        #[serde(rename = "fileData")]
        file_data: FileData,
    },
    /// Function call from the model
    FunctionCall {
        /// The function call details
        #[serde(rename = "functionCall")]
        function_call: FunctionCall,
        /// Opaque signature to echo back with the part in later turns
        #[serde(rename = "thoughtSignature", skip_serializing_if = "Option::is_none")]
        thought_signature: Option<String>,
    },
    /// Function response (results from executing a function call)
    FunctionResponse {
        /// The function response details
        #[serde(rename = "functionResponse")]
        function_response: FunctionResponse,
    },
    /// Code generated by the model for the code execution tool
    ExecutableCode {
        /// The code and its language
        #[serde(rename = "executableCode")]
        executable_code: ExecutableCode,
    },
    /// Result of running [`Part::ExecutableCode`]
    CodeExecutionResult {
        /// The code execution result details
        #[serde(rename = "codeExecutionResult")]
        code_execution_result: CodeExecutionResultData,
    },
    /// Any other part, kept verbatim
    Other(serde_json::Map<String, serde_json::Value>),
}

impl Part {
    /// Create a text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into(), thought: None, thought_signature: None }
    }

    /// Create a text part carrying a thought signature.
    pub fn text_with_thought_signature(
        text: impl Into<String>,
        thought_signature: impl Into<String>,
    ) -> Self {
        Self::Text {
            text: text.into(),
            thought: None,
            thought_signature: Some(thought_signature.into()),
        }
    }

    /// Create an inline media part from raw bytes.
    pub fn inline_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self::InlineData { inline_data: Blob::from_bytes(mime_type, bytes) }
    }

    /// Create a file reference part.
    pub fn file_data(mime_type: impl Into<String>, file_uri: impl Into<String>) -> Self {
        Self::FileData {
            file_data: FileData { mime_type: Some(mime_type.into()), file_uri: file_uri.into() },
        }
    }

    /// Create a function call part.
    pub fn function_call(function_call: FunctionCall) -> Self {
        Self::FunctionCall { function_call, thought_signature: None }
    }

    /// Create a function response part.
    pub fn function_response(function_response: FunctionResponse) -> Self {
        Self::FunctionResponse { function_response }
    }

    /// The text of this part, if it is a text part.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text, .. } => Some(text),
            _ => None,
        }
    }

    /// The thought signature attached to this part, if any.
    pub fn thought_signature(&self) -> Option<&str> {
        match self {
            Self::Text { thought_signature, .. } | Self::FunctionCall { thought_signature, .. } => {
                thought_signature.as_deref()
            }
            _ => None,
        }
    }

    /// Whether this part carries a function call or a function response.
    pub fn is_function_part(&self) -> bool {
        matches!(self, Self::FunctionCall { .. } | Self::FunctionResponse { .. })
    }

    /// A part is empty when it carries no payload: empty text or empty inline data.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text { text, .. } => text.is_empty(),
            Self::InlineData { inline_data } => inline_data.data.is_empty(),
            Self::FileData { file_data } => file_data.file_uri.is_empty(),
            Self::FunctionCall { function_call, .. } => function_call.name.is_empty(),
            Self::FunctionResponse { function_response } => function_response.name.is_empty(),
            Self::ExecutableCode { executable_code } => executable_code.code.is_empty(),
            Self::CodeExecutionResult { .. } => false,
            Self::Other(fields) => fields.is_empty(),
        }
    }
}

/// Reference to media stored outside the frame
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileData {
    /// The MIME type of the file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// URI of the file
    pub file_uri: String,
}

/// Code the model wrote for the code execution tool
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutableCode {
    /// Programming language, e.g. `PYTHON`
    pub language: String,
    /// Source code
    pub code: String,
}

/// Result from code execution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CodeExecutionResultData {
    /// Outcome of the execution (e.g. "OUTCOME_OK", "OUTCOME_DEADLINE_EXCEEDED")
    pub outcome: String,
    /// Output from the execution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

/// Blob for a media part
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    /// The MIME type of the data
    pub mime_type: String,
    /// Base64 encoded data
    pub data: String,
}

impl Blob {
    /// Create a new blob from a MIME type and already base64-encoded data
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self { mime_type: mime_type.into(), data: data.into() }
    }

    /// Create a new blob by base64-encoding raw bytes
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self::new(mime_type, base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    /// Decode the base64 payload back into raw bytes
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        base64::engine::general_purpose::STANDARD.decode(&self.data)
    }
}

/// Content of a turn
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    /// Role of the content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    /// Parts of the content
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    /// Create a content from a role and its parts
    pub fn new(role: Role, parts: Vec<Part>) -> Self {
        Self { role: Some(role), parts }
    }

    /// Create a user turn with a single text part
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![Part::text(text)])
    }

    /// Create a model turn with a single text part
    pub fn model(text: impl Into<String>) -> Self {
        Self::new(Role::Model, vec![Part::text(text)])
    }

    /// Create a role-less content with a single text part
    pub fn text(text: impl Into<String>) -> Self {
        Self { role: None, parts: vec![Part::text(text)] }
    }

    /// Add a role to this content
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    /// Append a part to this content
    pub fn with_part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    /// Number of parts that actually carry a payload
    pub fn non_empty_parts(&self) -> usize {
        self.parts.iter().filter(|part| !part.is_empty()).count()
    }

    /// Concatenated text of all non-thought text parts, `None` when there is no text
    pub fn text_parts(&self) -> Option<String> {
        let mut out: Option<String> = None;
        for part in &self.parts {
            if let Part::Text { text, thought, .. } = part {
                if thought.unwrap_or(false) {
                    continue;
                }
                out.get_or_insert_with(String::new).push_str(text);
            }
        }
        out
    }
}

/// Content modality type, the format of model output
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Modality {
    /// Default value.
    ModalityUnspecified,
    /// Indicates the model should return text.
    Text,
    /// Indicates the model should return images.
    Image,
    /// Indicates the model should return audio.
    Audio,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_part_wire_shapes() {
        assert_eq!(serde_json::to_value(Part::text("hi")).unwrap(), json!({"text": "hi"}));
        assert_eq!(
            serde_json::to_value(Part::inline_bytes("audio/pcm", b"hello")).unwrap(),
            json!({"inlineData": {"mimeType": "audio/pcm", "data": "aGVsbG8="}})
        );
    }

    #[test]
    fn test_part_deserialize_variants() {
        let part: Part = serde_json::from_value(json!({"inlineData": {"mimeType": "image/png", "data": "AAE="}})).unwrap();
        match part {
            Part::InlineData { inline_data } => {
                assert_eq!(inline_data.mime_type, "image/png");
                assert_eq!(inline_data.decode().unwrap(), vec![0x00, 0x01]);
            }
            other => panic!("expected inline data, got {other:?}"),
        }

        let part: Part =
            serde_json::from_value(json!({"functionCall": {"id": "c1", "name": "f", "args": {}}}))
                .unwrap();
        assert!(part.is_function_part());
    }

    #[test]
    fn test_code_execution_and_file_parts() {
        let part: Part = serde_json::from_value(
            json!({"executableCode": {"language": "PYTHON", "code": "print(1)"}}),
        )
        .unwrap();
        assert_eq!(
            part,
            Part::ExecutableCode {
                executable_code: ExecutableCode { language: "PYTHON".into(), code: "print(1)".into() }
            }
        );

        let part: Part = serde_json::from_value(
            json!({"codeExecutionResult": {"outcome": "OUTCOME_OK", "output": "1\n"}}),
        )
        .unwrap();
        match part {
            Part::CodeExecutionResult { code_execution_result } => {
                assert_eq!(code_execution_result.outcome, "OUTCOME_OK");
                assert_eq!(code_execution_result.output.as_deref(), Some("1\n"));
            }
            other => panic!("expected a code execution result, got {other:?}"),
        }

        let part: Part = serde_json::from_value(
            json!({"fileData": {"mimeType": "video/mp4", "fileUri": "gs://bucket/clip.mp4"}}),
        )
        .unwrap();
        assert_eq!(part, Part::file_data("video/mp4", "gs://bucket/clip.mp4"));
    }

    #[test]
    fn test_unknown_part_is_kept_verbatim() {
        let raw = json!({"videoMetadata": {"startOffset": "1s"}});
        let part: Part = serde_json::from_value(raw.clone()).unwrap();
        assert!(matches!(part, Part::Other(_)));
        assert!(!part.is_empty());
        assert_eq!(serde_json::to_value(&part).unwrap(), raw);
    }

    #[test]
    fn test_thought_signature_survives_round_trip() {
        let raw = json!({"functionCall": {"name": "f", "args": {}}, "thoughtSignature": "sig-1"});
        let part: Part = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(part.thought_signature(), Some("sig-1"));
        assert_eq!(serde_json::to_value(&part).unwrap(), raw);

        let part = Part::text_with_thought_signature("hi", "sig-2");
        assert_eq!(
            serde_json::to_value(&part).unwrap(),
            json!({"text": "hi", "thoughtSignature": "sig-2"})
        );
    }

    #[test]
    fn test_empty_parts() {
        assert!(Part::text("").is_empty());
        assert!(!Part::text(" ").is_empty());
        let content = Content::new(Role::User, vec![Part::text(""), Part::text("x")]);
        assert_eq!(content.non_empty_parts(), 1);
    }

    #[test]
    fn test_text_parts_skip_thoughts() {
        let content = Content::new(
            Role::Model,
            vec![
                Part::Text { text: "thinking".into(), thought: Some(true), thought_signature: None },
                Part::text("Hello, "),
                Part::text("world"),
            ],
        );
        assert_eq!(content.text_parts().as_deref(), Some("Hello, world"));
        assert_eq!(Content::default().text_parts(), None);
    }

    #[test]
    fn test_modality_serialization() {
        assert_eq!(serde_json::to_value(Modality::Audio).unwrap(), json!("AUDIO"));
        let m: Modality = serde_json::from_value(json!("TEXT")).unwrap();
        assert_eq!(m, Modality::Text);
    }
}
