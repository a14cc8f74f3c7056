//! Concrete built-in tools: `search_code`, `read_file`, `run_sandbox`,
//! `search_papers`, `clean_csv`, `clean_markdown`, `summarize_results`.

use crate::{resolve_under_root, ToolDyn};
use async_trait::async_trait;
use regex::Regex;
use research_sandbox::{ContainerLauncher, Sandbox, SandboxRequest};
use research_scholar::ScholarPool;
use research_search::CodeSearch;
use research_symbols::SymbolIndex;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

/// `search_code`: keyword/symbol evidence retrieval.
pub struct SearchCodeTool {
    root: PathBuf,
    symbols: Option<Arc<RwLock<SymbolIndex>>>,
}

impl SearchCodeTool {
    /// Build the tool, rooted at `root`, optionally backed by a shared
    /// symbol index.
    pub fn new(root: impl Into<PathBuf>, symbols: Option<Arc<RwLock<SymbolIndex>>>) -> Self {
        Self {
            root: root.into(),
            symbols,
        }
    }
}

fn query_from_param(v: &Value) -> Result<String, String> {
    match v {
        Value::String(s) => Ok(s.clone()),
        Value::Array(items) => {
            let mut parts = Vec::new();
            for item in items {
                match item {
                    Value::String(s) => parts.push(s.clone()),
                    _ => return Err("query list elements must be strings".into()),
                }
            }
            Ok(parts.join(" "))
        }
        _ => Err("query must be a string or list of strings".into()),
    }
}

#[async_trait]
impl ToolDyn for SearchCodeTool {
    fn name(&self) -> &str {
        "search_code"
    }
    fn description(&self) -> &str {
        "Keyword and symbol-index evidence search over the project's files"
    }
    fn parameter_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {"oneOf": [{"type": "string"}, {"type": "array", "items": {"type": "string"}}]},
                "paths": {"type": "array", "items": {"type": "string"}},
                "max_results": {"type": "integer", "default": 20}
            },
            "required": ["query"]
        })
    }
    async fn call(&self, parameters: Value) -> Result<Value, String> {
        let query_val = parameters.get("query").ok_or("missing field: query")?;
        let query = query_from_param(query_val)?;
        let paths: Vec<String> = match parameters.get("paths") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| v.as_str().map(str::to_string).ok_or("paths must be strings".to_string()))
                .collect::<Result<_, _>>()?,
            Some(_) => return Err("paths must be a list of strings".into()),
            None => Vec::new(),
        };
        let max_results = parameters
            .get("max_results")
            .and_then(Value::as_u64)
            .unwrap_or(20) as usize;

        let guard = self.symbols.as_ref().map(|s| s.read().expect("symbol index lock poisoned"));
        let searcher = CodeSearch::new(&self.root, guard.as_deref());
        let hits = searcher.search(&query, &paths, max_results);
        Ok(serde_json::to_value(hits).expect("SearchHit is serializable"))
    }
}

/// `read_file`: read a line range from a repository-relative file.
pub struct ReadFileTool {
    root: PathBuf,
}

impl ReadFileTool {
    /// Build the tool, rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ToolDyn for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }
    fn description(&self) -> &str {
        "Read a line range from a file relative to the project root"
    }
    fn parameter_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {"type": "string"},
                "start_line": {"type": "integer"},
                "end_line": {"type": "integer"}
            },
            "required": ["path"]
        })
    }
    async fn call(&self, parameters: Value) -> Result<Value, String> {
        let path = parameters
            .get("path")
            .and_then(Value::as_str)
            .ok_or("missing field: path")?;
        let full = resolve_under_root(&self.root, path)?;
        let content = std::fs::read_to_string(&full).map_err(|e| format!("file not found: {path} ({e})"))?;
        let lines: Vec<&str> = content.lines().collect();
        let start = parameters
            .get("start_line")
            .and_then(Value::as_u64)
            .unwrap_or(1)
            .max(1) as usize;
        let end = parameters
            .get("end_line")
            .and_then(Value::as_u64)
            .unwrap_or(lines.len() as u64) as usize;
        let end = end.min(lines.len());
        let start_idx = (start - 1).min(lines.len());
        let slice = if start_idx < end {
            lines[start_idx..end].join("\n")
        } else {
            String::new()
        };
        Ok(json!({"path": path, "start": start, "end": end, "text": slice}))
    }
}

/// `run_sandbox`: isolated code execution.
pub struct RunSandboxTool<L: ContainerLauncher + 'static> {
    sandbox: Arc<Sandbox<L>>,
    base_dir: Option<PathBuf>,
}

impl<L: ContainerLauncher + 'static> RunSandboxTool<L> {
    /// Build the tool around a concrete sandbox runtime.
    pub fn new(sandbox: Arc<Sandbox<L>>, base_dir: Option<PathBuf>) -> Self {
        Self { sandbox, base_dir }
    }
}

#[async_trait]
impl<L: ContainerLauncher + 'static> ToolDyn for RunSandboxTool<L> {
    fn name(&self) -> &str {
        "run_sandbox"
    }
    fn description(&self) -> &str {
        "Execute a code snippet in an isolated sandbox with a timeout and deterministic seed"
    }
    fn parameter_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "code": {"type": "string"},
                "timeout_s": {"type": "integer", "default": 30},
                "seed": {"type": "integer", "default": 1337}
            },
            "required": ["code"]
        })
    }
    async fn call(&self, parameters: Value) -> Result<Value, String> {
        let code = parameters
            .get("code")
            .and_then(Value::as_str)
            .ok_or("missing field: code")?
            .to_string();
        let timeout_s = parameters.get("timeout_s").and_then(Value::as_u64).unwrap_or(30);
        let seed = parameters.get("seed").and_then(Value::as_u64).unwrap_or(1337);
        let mut req = SandboxRequest::new(code, timeout_s, seed);
        req.base_dir = self.base_dir.clone();
        let result = self.sandbox.run_snippet(req).await;
        Ok(serde_json::to_value(result).expect("ExecResult is serializable"))
    }
}

/// `search_papers`: scholarly literature lookup.
pub struct SearchPapersTool {
    pool: Arc<ScholarPool>,
}

impl SearchPapersTool {
    /// Build the tool around a configured provider pool.
    pub fn new(pool: Arc<ScholarPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ToolDyn for SearchPapersTool {
    fn name(&self) -> &str {
        "search_papers"
    }
    fn description(&self) -> &str {
        "Search configured scholarly literature providers"
    }
    fn parameter_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string"},
                "max_results": {"type": "integer", "default": 5},
                "year_min": {"type": "integer"}
            },
            "required": ["query"]
        })
    }
    async fn call(&self, parameters: Value) -> Result<Value, String> {
        let query = parameters
            .get("query")
            .and_then(Value::as_str)
            .ok_or("missing field: query")?;
        let max_results = parameters.get("max_results").and_then(Value::as_u64).unwrap_or(5) as usize;
        let year_min = parameters.get("year_min").and_then(Value::as_u64).map(|y| y as u32);

        let mut papers = self.pool.search(query, max_results).await;
        if let Some(year_min) = year_min {
            papers.retain(|p| p.year.map(|y| y >= year_min).unwrap_or(false));
        }
        Ok(serde_json::to_value(papers).expect("PaperMeta is serializable"))
    }
}

fn csv_rows(content: &str) -> Vec<Vec<String>> {
    content
        .lines()
        .map(|line| line.split(',').map(|cell| cell.to_string()).collect())
        .collect()
}

/// `clean_csv`: normalize a CSV file (trim whitespace, drop empty rows,
/// drop exact-duplicate rows).
pub struct CleanCsvTool {
    root: PathBuf,
}

impl CleanCsvTool {
    /// Build the tool, rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ToolDyn for CleanCsvTool {
    fn name(&self) -> &str {
        "clean_csv"
    }
    fn description(&self) -> &str {
        "Trim, dedupe, and drop empty rows from a CSV data file"
    }
    fn parameter_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {"type": "string"},
                "output": {"type": "string"},
                "operations": {"type": "array", "items": {"type": "string"}}
            },
            "required": ["path"]
        })
    }
    async fn call(&self, parameters: Value) -> Result<Value, String> {
        let path = parameters.get("path").and_then(Value::as_str).ok_or("missing field: path")?;
        let full = resolve_under_root(&self.root, path)?;
        let content = std::fs::read_to_string(&full).map_err(|e| format!("input file not found: {path} ({e})"))?;

        let operations: Vec<String> = match parameters.get("operations") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => vec!["trim_whitespace".into(), "drop_empty_rows".into(), "dedup_rows".into()],
        };

        let mut rows = csv_rows(&content);
        let original_rows = rows.len();
        let mut steps_applied = Vec::new();

        if operations.iter().any(|o| o == "trim_whitespace") {
            for row in rows.iter_mut() {
                for cell in row.iter_mut() {
                    *cell = cell.trim().to_string();
                }
            }
            steps_applied.push("trim_whitespace".to_string());
        }
        if operations.iter().any(|o| o == "drop_empty_rows") {
            rows.retain(|row| row.iter().any(|c| !c.is_empty()));
            steps_applied.push("drop_empty_rows".to_string());
        }
        if operations.iter().any(|o| o == "dedup_rows") {
            let mut seen = std::collections::HashSet::new();
            rows.retain(|row| seen.insert(row.clone()));
            steps_applied.push("dedup_rows".to_string());
        }

        let cleaned_rows = rows.len();
        let output_path = parameters
            .get("output")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("{path}.cleaned"));
        let output_full = resolve_under_root(&self.root, &output_path)?;
        let rendered = rows.iter().map(|r| r.join(",")).collect::<Vec<_>>().join("\n");
        std::fs::write(&output_full, rendered).map_err(|e| format!("failed to write output: {e}"))?;

        Ok(json!({
            "original_rows": original_rows,
            "cleaned_rows": cleaned_rows,
            "output_path": output_path,
            "steps_applied": steps_applied,
        }))
    }
}

fn timestamp_regex() -> Regex {
    Regex::new(r"\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(?:\.\d+)?(?:Z|[+-]\d{2}:?\d{2})?")
        .expect("static regex is valid")
}

/// `clean_markdown`: collapse blank-line runs and optionally normalize
/// timestamps to a canonical `YYYY-MM-DD HH:MM:SS` form.
pub struct CleanMarkdownTool {
    root: PathBuf,
}

impl CleanMarkdownTool {
    /// Build the tool, rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ToolDyn for CleanMarkdownTool {
    fn name(&self) -> &str {
        "clean_markdown"
    }
    fn description(&self) -> &str {
        "Collapse empty-line runs and normalize timestamps in a markdown file"
    }
    fn parameter_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {"type": "string"},
                "output": {"type": "string"},
                "collapse_empty": {"type": "boolean", "default": true},
                "normalize_timestamps": {"type": "boolean", "default": true}
            },
            "required": ["path"]
        })
    }
    async fn call(&self, parameters: Value) -> Result<Value, String> {
        let path = parameters.get("path").and_then(Value::as_str).ok_or("missing field: path")?;
        let full = resolve_under_root(&self.root, path)?;
        let content = std::fs::read_to_string(&full).map_err(|e| format!("input file not found: {path} ({e})"))?;

        let original_sections = content.matches("\n#").count() + if content.starts_with('#') { 1 } else { 0 };
        let collapse_empty = parameters.get("collapse_empty").and_then(Value::as_bool).unwrap_or(true);
        let normalize_timestamps = parameters
            .get("normalize_timestamps")
            .and_then(Value::as_bool)
            .unwrap_or(true);

        let mut text = content.clone();
        let mut steps_applied = Vec::new();

        if normalize_timestamps {
            let re = timestamp_regex();
            text = re
                .replace_all(&text, |caps: &regex::Captures| {
                    normalize_one_timestamp(&caps[0])
                })
                .into_owned();
            steps_applied.push("normalize_timestamps".to_string());
        }
        if collapse_empty {
            let mut out_lines = Vec::new();
            let mut prev_blank = false;
            for line in text.lines() {
                let blank = line.trim().is_empty();
                if blank && prev_blank {
                    continue;
                }
                out_lines.push(line);
                prev_blank = blank;
            }
            text = out_lines.join("\n");
            steps_applied.push("collapse_empty".to_string());
        }

        let cleaned_sections = text.matches("\n#").count() + if text.starts_with('#') { 1 } else { 0 };
        let output_path = parameters
            .get("output")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("{path}.cleaned"));
        let output_full = resolve_under_root(&self.root, &output_path)?;
        std::fs::write(&output_full, &text).map_err(|e| format!("failed to write output: {e}"))?;

        Ok(json!({
            "original_sections": original_sections,
            "cleaned_sections": cleaned_sections,
            "output_path": output_path,
            "steps_applied": steps_applied,
        }))
    }
}

fn normalize_one_timestamp(raw: &str) -> String {
    let digits_only: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits_only.len() < 14 {
        return raw.to_string();
    }
    format!(
        "{}-{}-{} {}:{}:{}",
        &digits_only[0..4],
        &digits_only[4..6],
        &digits_only[6..8],
        &digits_only[8..10],
        &digits_only[10..12],
        &digits_only[12..14],
    )
}

/// `summarize_results`: produce a summary/markdown/json rendering of
/// arbitrary context text. Has no failure mode of its own.
pub struct SummarizeResultsTool;

#[async_trait]
impl ToolDyn for SummarizeResultsTool {
    fn name(&self) -> &str {
        "summarize_results"
    }
    fn description(&self) -> &str {
        "Render accumulated context as a summary, markdown, or JSON payload"
    }
    fn parameter_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "context": {"type": "string"},
                "style": {"type": "string", "enum": ["summary", "markdown", "json"], "default": "summary"}
            },
            "required": ["context"]
        })
    }
    async fn call(&self, parameters: Value) -> Result<Value, String> {
        let context = parameters
            .get("context")
            .and_then(Value::as_str)
            .ok_or("missing field: context")?;
        let style = parameters.get("style").and_then(Value::as_str).unwrap_or("summary");

        match style {
            "markdown" => Ok(Value::String(format!("## Summary\n\n{context}\n"))),
            "json" => Ok(json!({"summary": context})),
            _ => {
                let first_sentence = context.split(['.', '\n']).next().unwrap_or(context).trim();
                Ok(Value::String(first_sentence.to_string()))
            }
        }
    }
}
