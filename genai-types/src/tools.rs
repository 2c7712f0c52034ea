//! Function calling types: declarations the model may call, the calls it makes
//! and the responses the client sends back.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tool that can be used by the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Tool {
    /// Function-based tool
    Function {
        /// The function declarations for the tool
        #[serde(rename = "functionDeclarations")]
        function_declarations: Vec<FunctionDeclaration>,
    },
    /// Google Search tool
    GoogleSearch {
        /// The Google Search configuration
        #[serde(rename = "googleSearch")]
        google_search: GoogleSearchConfig,
    },
    /// Code execution tool
    CodeExecution {
        /// The code execution configuration
        #[serde(rename = "codeExecution")]
        code_execution: CodeExecutionConfig,
    },
}

/// Empty configuration for the Google Search tool
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
pub struct GoogleSearchConfig {}

/// Empty configuration for the code execution tool
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodeExecutionConfig {}

impl Tool {
    /// Create a new tool with a single function declaration
    pub fn new(function_declaration: FunctionDeclaration) -> Self {
        Self::Function { function_declarations: vec![function_declaration] }
    }

    /// Create a new tool with multiple function declarations
    pub fn with_functions(function_declarations: Vec<FunctionDeclaration>) -> Self {
        Self::Function { function_declarations }
    }

    /// Create a new Google Search tool
    pub fn google_search() -> Self {
        Self::GoogleSearch { google_search: GoogleSearchConfig {} }
    }

    /// Create a new code execution tool
    pub fn code_execution() -> Self {
        Self::CodeExecution { code_execution: CodeExecutionConfig {} }
    }
}

/// Defines the function behavior. Only honoured by the live (bidirectional) API.
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Behavior {
    /// The model waits for the function response before continuing.
    #[default]
    Blocking,
    /// The model keeps talking and folds the response in once it arrives.
    NonBlocking,
}

/// Declaration of a function that can be called by the model
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionDeclaration {
    /// The name of the function
    pub name: String,
    /// The description of the function
    #[serde(default)]
    pub description: String,
    /// Function behavior
    #[serde(skip_serializing_if = "Option::is_none")]
    pub behavior: Option<Behavior>,
    /// JSON Schema for the parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

impl FunctionDeclaration {
    /// Create a new function declaration
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self { name: name.into(), description: description.into(), ..Default::default() }
    }

    /// Set the parameters schema
    pub fn with_parameters(mut self, schema: Value) -> Self {
        self.parameters = Some(schema);
        self
    }

    /// Set the function behavior
    pub fn with_behavior(mut self, behavior: Behavior) -> Self {
        self.behavior = Some(behavior);
        self
    }
}

/// A function call made by the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    /// Call identifier, echoed back in the matching [`FunctionResponse`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// The name of the function
    pub name: String,
    /// The arguments for the function
    #[serde(default)]
    pub args: Value,
}

impl FunctionCall {
    /// Create a new function call
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        Self { id: None, name: name.into(), args }
    }

    /// Set the call identifier
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// The result of a function call, sent back to the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionResponse {
    /// Identifier of the call this responds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// The name of the function
    pub name: String,
    /// The response payload, a JSON object
    #[serde(default)]
    pub response: Value,
}

impl FunctionResponse {
    /// Create a new function response with a JSON value
    pub fn new(name: impl Into<String>, response: Value) -> Self {
        Self { id: None, name: name.into(), response }
    }

    /// Create a response that answers a specific call
    pub fn for_call(call: &FunctionCall, response: Value) -> Self {
        Self { id: call.id.clone(), name: call.name.clone(), response }
    }

    /// Set the call identifier
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Function calling mode
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FunctionCallingMode {
    /// The model decides whether to call a function.
    #[default]
    Auto,
    /// The model always calls a function.
    Any,
    /// The model never calls a function.
    None,
}

/// Function calling configuration
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FunctionCallingConfig {
    /// Calling mode
    pub mode: FunctionCallingMode,
    /// Restrict calls to these function names (only with `Any`)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_function_names: Vec<String>,
}

/// Tool configuration shared by all tools of a request
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolConfig {
    /// Function calling configuration
    pub function_calling_config: FunctionCallingConfig,
}

impl ToolConfig {
    /// Tool configuration with the given calling mode
    pub fn with_mode(mode: FunctionCallingMode) -> Self {
        Self { function_calling_config: FunctionCallingConfig { mode, ..Default::default() } }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_wire_shape() {
        let tool = Tool::new(
            FunctionDeclaration::new("get_weather", "Get current weather")
                .with_parameters(json!({"type": "object", "properties": {"city": {"type": "string"}}}))
                .with_behavior(Behavior::NonBlocking),
        );
        let value = serde_json::to_value(&tool).unwrap();
        let decl = &value["functionDeclarations"][0];
        assert_eq!(decl["name"], "get_weather");
        assert_eq!(decl["behavior"], "NON_BLOCKING");
        assert_eq!(decl["parameters"]["properties"]["city"]["type"], "string");

        assert_eq!(serde_json::to_value(Tool::google_search()).unwrap(), json!({"googleSearch": {}}));
    }

    #[test]
    fn test_function_response_for_call() {
        let call = FunctionCall::new("lookup", json!({"q": "rust"})).with_id("call-1");
        let response = FunctionResponse::for_call(&call, json!({"result": 42}));
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"id": "call-1", "name": "lookup", "response": {"result": 42}})
        );
    }

    #[test]
    fn test_function_response_without_id_omits_field() {
        let response = FunctionResponse::new("f", json!({}));
        assert_eq!(serde_json::to_value(&response).unwrap(), json!({"name": "f", "response": {}}));
    }

    #[test]
    fn test_tool_config_mode() {
        let config = ToolConfig::with_mode(FunctionCallingMode::Any);
        assert_eq!(
            serde_json::to_value(&config).unwrap(),
            json!({"functionCallingConfig": {"mode": "ANY"}})
        );
    }
}
