//! # research-tools — the tool registry (C6)
//!
//! Defines [`ToolDyn`], the object-safe contract every tool implements
//! (name, description, JSON-schema parameters, and an async dispatch
//! function), and [`ToolRegistry`], which holds tools keyed by name and
//! exposes a stable, name-ordered listing plus a catch-all `execute` that
//! turns any thrown error into `ToolResult::error` rather than
//! propagating it.
//!
//! Path parameters passed to the file-serving tools are resolved relative
//! to the registry's configured root; any resolution that would escape
//! the root is rejected (see [`resolve_under_root`]).

pub mod builtin;

use async_trait::async_trait;
use research_types::{ToolCall, ToolResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A schema entry returned by [`ToolRegistry::list`].
#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolSchema {
    /// Tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema for the tool's parameters.
    pub parameters: serde_json::Value,
}

/// Object-safe contract every tool implements.
#[async_trait]
pub trait ToolDyn: Send + Sync {
    /// The tool's unique name.
    fn name(&self) -> &str;
    /// Human-readable description of what the tool does.
    fn description(&self) -> &str;
    /// JSON Schema describing the tool's input parameters.
    fn parameter_schema(&self) -> serde_json::Value;
    /// Execute the tool against `parameters`, returning a JSON result or
    /// an error message. Implementations should return `Err` rather than
    /// panic; the registry converts any panic-free error into
    /// `ToolResult::error`.
    async fn call(&self, parameters: serde_json::Value) -> Result<serde_json::Value, String>;
}

/// Resolve `path` (as given by a tool caller) relative to `root`,
/// rejecting any result that would escape `root` via `..` components or
/// an absolute path.
pub fn resolve_under_root(root: &Path, path: &str) -> Result<PathBuf, String> {
    let candidate = Path::new(path);
    if candidate.is_absolute() {
        return Err(format!("path must be relative to root: {path}"));
    }
    let mut resolved = root.to_path_buf();
    for component in candidate.components() {
        match component {
            std::path::Component::Normal(part) => resolved.push(part),
            std::path::Component::CurDir => {}
            std::path::Component::ParentDir => {
                return Err(format!("path escapes root: {path}"));
            }
            _ => return Err(format!("invalid path component in: {path}")),
        }
    }
    Ok(resolved)
}

/// Registry of tools available to the orchestrator. Tools are stored by
/// name in a `BTreeMap` so [`ToolRegistry::list`] is stably ordered.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn ToolDyn>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, overwriting any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn ToolDyn>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// List registered tool schemas, ordered by name.
    pub fn list(&self) -> Vec<ToolSchema> {
        self.tools
            .values()
            .map(|t| ToolSchema {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameter_schema(),
            })
            .collect()
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ToolDyn>> {
        self.tools.get(name)
    }

    /// Dispatch `call`, catching any error and returning it in
    /// `ToolResult::error` rather than propagating it. A call to an
    /// unregistered tool is itself reported as an error result.
    pub async fn execute(&self, call: ToolCall) -> ToolResult {
        match self.tools.get(&call.name) {
            Some(tool) => match tool.call(call.parameters).await {
                Ok(value) => ToolResult::ok(&call.name, value),
                Err(e) => ToolResult::err(&call.name, e),
            },
            None => ToolResult::err(&call.name, format!("tool not found: {}", call.name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_under_root_rejects_parent_escape() {
        let root = Path::new("/repo");
        assert!(resolve_under_root(root, "../etc/passwd").is_err());
    }

    #[test]
    fn resolve_under_root_rejects_absolute() {
        let root = Path::new("/repo");
        assert!(resolve_under_root(root, "/etc/passwd").is_err());
    }

    #[test]
    fn resolve_under_root_accepts_relative() {
        let root = Path::new("/repo");
        let resolved = resolve_under_root(root, "src/lib.rs").unwrap();
        assert_eq!(resolved, Path::new("/repo/src/lib.rs"));
    }

    struct EchoTool;

    #[async_trait]
    impl ToolDyn for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "echoes input"
        }
        fn parameter_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object"})
        }
        async fn call(&self, parameters: serde_json::Value) -> Result<serde_json::Value, String> {
            Ok(parameters)
        }
    }

    struct FailTool;

    #[async_trait]
    impl ToolDyn for FailTool {
        fn name(&self) -> &str {
            "fail"
        }
        fn description(&self) -> &str {
            "always fails"
        }
        fn parameter_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object"})
        }
        async fn call(&self, _parameters: serde_json::Value) -> Result<serde_json::Value, String> {
            Err("boom".to_string())
        }
    }

    #[tokio::test]
    async fn execute_unknown_tool_is_an_error_result_not_a_panic() {
        let registry = ToolRegistry::new();
        let result = registry
            .execute(ToolCall::new("missing", serde_json::json!({})))
            .await;
        assert!(!result.is_ok());
        assert!(result.error.unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn execute_failing_tool_reports_error_not_panic() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(FailTool));
        let result = registry
            .execute(ToolCall::new("fail", serde_json::json!({})))
            .await;
        assert!(!result.is_ok());
        assert_eq!(result.error.as_deref(), Some("boom"));
    }

    #[test]
    fn list_is_ordered_by_name() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(FailTool));
        registry.register(Arc::new(EchoTool));
        let names: Vec<String> = registry.list().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["echo".to_string(), "fail".to_string()]);
    }
}
