//! The uniform tool call/result envelope.

use serde::{Deserialize, Serialize};

/// A request to invoke a named tool with JSON parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Registered tool name.
    pub name: String,
    /// Tool-specific parameters, as a JSON object.
    pub parameters: serde_json::Value,
}

impl ToolCall {
    /// Construct a tool call.
    pub fn new(name: impl Into<String>, parameters: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            parameters,
        }
    }
}

/// The outcome of dispatching a [`ToolCall`]. Exactly one of `result`/
/// `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Name of the tool that produced this result.
    pub name: String,
    /// Successful output, if the call succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Error message, if the call failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    /// Build a successful result.
    pub fn ok(name: impl Into<String>, result: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            result: Some(result),
            error: None,
        }
    }

    /// Build a failed result.
    pub fn err(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            result: None,
            error: Some(error.into()),
        }
    }

    /// Whether this result represents success.
    pub fn is_ok(&self) -> bool {
        self.result.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ok_and_err_are_mutually_exclusive() {
        let ok = ToolResult::ok("search_code", json!({"hits": []}));
        assert!(ok.is_ok());
        assert!(ok.error.is_none());

        let err = ToolResult::err("read_file", "not found");
        assert!(!err.is_ok());
        assert!(err.result.is_none());
    }
}
