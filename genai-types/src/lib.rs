//! # genai-types
//!
//! Core primitives shared by the generative-model clients:
//!
//! - **`content`** - [`Role`], [`Part`], [`Blob`], [`Content`] and [`Modality`]
//! - **`tools`** - function declarations, calls and responses
//! - **`normalize`** - turning strings, parts and contents into canonical turns
//!
//! ```rust
//! use genai_types::{Content, Part, Role};
//!
//! let turn = Content::new(Role::User, vec![Part::text("What is in this picture?")]);
//! assert_eq!(turn.non_empty_parts(), 1);
//! ```

pub mod content;
pub mod error;
pub mod normalize;
pub mod tools;

pub use content::{
    Blob, CodeExecutionResultData, Content, ExecutableCode, FileData, Modality, Part, Role,
};
pub use error::ContentError;
pub use normalize::{
    ContentListUnion, ContentNormalizer, DefaultNormalizer, PartUnion, normalize_contents,
};
pub use tools::{
    Behavior, FunctionCall, FunctionCallingConfig, FunctionCallingMode, FunctionDeclaration,
    FunctionResponse, Tool, ToolConfig,
};
