//! Conversion of caller-supplied turn shapes into canonical [`Content`] lists.
//!
//! Callers hand the live session whatever is convenient: a string, a single
//! part, a list of parts or strings, one content or a list of contents. The
//! normalizer turns all of them into an ordered `Vec<Content>` where every
//! entry carries an explicit role.
//!
//! ```rust
//! use genai_types::{ContentListUnion, ContentNormalizer, DefaultNormalizer, Role};
//!
//! let turns = DefaultNormalizer.normalize(ContentListUnion::from("Hello")).unwrap();
//! assert_eq!(turns.len(), 1);
//! assert_eq!(turns[0].role, Some(Role::User));
//! ```

use crate::content::{Content, Part, Role};
use crate::error::ContentError;

/// A single part, or a bare string standing for a text part.
#[derive(Debug, Clone, PartialEq)]
pub enum PartUnion {
    /// Text shorthand
    Text(String),
    /// A fully formed part
    Part(Part),
}

impl PartUnion {
    fn into_part(self) -> Part {
        match self {
            Self::Text(text) => Part::text(text),
            Self::Part(part) => part,
        }
    }
}

impl From<&str> for PartUnion {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for PartUnion {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Part> for PartUnion {
    fn from(part: Part) -> Self {
        Self::Part(part)
    }
}

/// Every shape accepted where a list of turns is expected.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentListUnion {
    /// One user turn holding one text part
    Text(String),
    /// One user turn holding one part
    Part(Part),
    /// One user turn holding these parts
    Parts(Vec<PartUnion>),
    /// A single turn
    Content(Content),
    /// Several turns, in order
    Contents(Vec<Content>),
}

impl From<&str> for ContentListUnion {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for ContentListUnion {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Part> for ContentListUnion {
    fn from(part: Part) -> Self {
        Self::Part(part)
    }
}

impl From<Vec<Part>> for ContentListUnion {
    fn from(parts: Vec<Part>) -> Self {
        Self::Parts(parts.into_iter().map(PartUnion::Part).collect())
    }
}

impl From<Vec<PartUnion>> for ContentListUnion {
    fn from(parts: Vec<PartUnion>) -> Self {
        Self::Parts(parts)
    }
}

impl From<Content> for ContentListUnion {
    fn from(content: Content) -> Self {
        Self::Content(content)
    }
}

impl From<Vec<Content>> for ContentListUnion {
    fn from(contents: Vec<Content>) -> Self {
        Self::Contents(contents)
    }
}

/// Converts caller shapes into canonical turns.
///
/// Implementations must be pure: no I/O, no shared state. The live session
/// holds one behind an `Arc` and calls it on every `send_client_content`.
pub trait ContentNormalizer: Send + Sync {
    /// Normalize `input` into an ordered list of turns.
    fn normalize(&self, input: ContentListUnion) -> Result<Vec<Content>, ContentError>;
}

impl<F> ContentNormalizer for F
where
    F: Fn(ContentListUnion) -> Result<Vec<Content>, ContentError> + Send + Sync,
{
    fn normalize(&self, input: ContentListUnion) -> Result<Vec<Content>, ContentError> {
        self(input)
    }
}

/// The standard normalization rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultNormalizer;

impl ContentNormalizer for DefaultNormalizer {
    fn normalize(&self, input: ContentListUnion) -> Result<Vec<Content>, ContentError> {
        normalize_contents(input)
    }
}

/// Apply the standard normalization rules.
///
/// - text and single parts become one `user` turn
/// - a part list becomes one `user` turn; it may not contain function call or
///   function response parts, which must be wrapped in a content with an explicit role
/// - contents without a role default to `user`
pub fn normalize_contents(input: ContentListUnion) -> Result<Vec<Content>, ContentError> {
    match input {
        ContentListUnion::Text(text) => Ok(vec![Content::user(text)]),
        ContentListUnion::Part(part) => parts_to_user_turn(vec![part]),
        ContentListUnion::Parts(parts) => {
            parts_to_user_turn(parts.into_iter().map(PartUnion::into_part).collect())
        }
        ContentListUnion::Content(content) => Ok(vec![with_default_role(content)]),
        ContentListUnion::Contents(contents) => {
            Ok(contents.into_iter().map(with_default_role).collect())
        }
    }
}

fn parts_to_user_turn(parts: Vec<Part>) -> Result<Vec<Content>, ContentError> {
    if let Some(position) = parts.iter().position(Part::is_function_part) {
        return Err(ContentError::UnwrappedFunctionPart { index: position });
    }
    if parts.is_empty() {
        return Ok(Vec::new());
    }
    Ok(vec![Content::new(Role::User, parts)])
}

fn with_default_role(content: Content) -> Content {
    match content.role {
        Some(_) => content,
        None => content.with_role(Role::User),
    }
}
