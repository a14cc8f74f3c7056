//! # research-react — the ReAct parser (C11)
//!
//! Extracts tool-call requests from a free-form reasoner message. Three
//! forms are recognized, tried in priority order by the orchestrator:
//!
//! 1. structured function-call records attached to the message (handled
//!    upstream by the reasoner adapter, not this crate);
//! 2. a top-level JSON object `{"tool", "parameters"}` ([`parse_json_tool_call`]);
//! 3. natural `Thought:` / `Action:` / `Action Input:` / `Observation:`
//!    blocks ([`parse_blocks`]).
//!
//! A message with no recognizable action is a final answer if it has more
//! than 20 non-whitespace characters after trimming ([`extract_final_answer`]).

use serde_json::Value;

/// Minimum trimmed length for a message with no action to count as a
/// final answer rather than noise.
pub const FINAL_ANSWER_MIN_LEN: usize = 20;

/// One `Thought / Action / Action Input / Observation` quadruple. Any
/// field may be absent — a message might only contain a thought, or only
/// an action.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReactBlock {
    /// The reasoning text preceding the action, if present.
    pub thought: Option<String>,
    /// The requested tool name, if present.
    pub action: Option<String>,
    /// The parsed action input, if present.
    pub action_input: Option<Value>,
    /// An observation the reasoner echoed back, if present.
    pub observation: Option<String>,
}

/// Try to parse `message` as a single top-level JSON object with `tool`
/// and `parameters` fields. Returns `None` if `message` is not valid JSON
/// or lacks the expected shape (malformed JSON is skipped silently, per
/// spec.md §4.11).
pub fn parse_json_tool_call(message: &str) -> Option<ReactBlock> {
    let trimmed = message.trim();
    let value: Value = serde_json::from_str(trimmed).ok()?;
    let obj = value.as_object()?;
    let tool = obj.get("tool")?.as_str()?.to_string();
    let parameters = obj.get("parameters").cloned().unwrap_or(Value::Object(Default::default()));
    Some(ReactBlock {
        thought: None,
        action: Some(tool),
        action_input: Some(parameters),
        observation: None,
    })
}

fn line_prefix<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let trimmed = line.trim_start();
    trimmed.strip_prefix(prefix).map(str::trim)
}

/// Parse an action-input payload: try JSON first, then `key=value` lines,
/// then fall back to `{"input": <raw>}`.
fn parse_action_input(raw: &str) -> Value {
    let trimmed = raw.trim();
    if let Ok(v) = serde_json::from_str::<Value>(trimmed) {
        return v;
    }
    let mut obj = serde_json::Map::new();
    let mut any_kv = false;
    for line in trimmed.lines() {
        if let Some((k, v)) = line.split_once('=') {
            obj.insert(k.trim().to_string(), Value::String(v.trim().to_string()));
            any_kv = true;
        }
    }
    if any_kv {
        return Value::Object(obj);
    }
    let mut fallback = serde_json::Map::new();
    fallback.insert("input".to_string(), Value::String(trimmed.to_string()));
    Value::Object(fallback)
}

/// Parse every `Thought:` / `Action:` / `Action Input:` / `Observation:`
/// block found in `message`, in order of appearance. A new `Thought:` or
/// `Action:` line starts a new block.
pub fn parse_blocks(message: &str) -> Vec<ReactBlock> {
    let mut blocks = Vec::new();
    let mut current = ReactBlock::default();
    let mut pending_action_input_lines: Vec<String> = Vec::new();
    let mut in_action_input = false;
    let mut has_content = false;

    let flush_action_input = |current: &mut ReactBlock, lines: &mut Vec<String>| {
        if !lines.is_empty() {
            current.action_input = Some(parse_action_input(&lines.join("\n")));
            lines.clear();
        }
    };

    for line in message.lines() {
        if let Some(rest) = line_prefix(line, "Thought:") {
            flush_action_input(&mut current, &mut pending_action_input_lines);
            in_action_input = false;
            if has_content {
                blocks.push(std::mem::take(&mut current));
            }
            current.thought = Some(rest.to_string());
            has_content = true;
        } else if let Some(rest) = line_prefix(line, "Action:") {
            flush_action_input(&mut current, &mut pending_action_input_lines);
            in_action_input = false;
            current.action = Some(rest.to_string());
            has_content = true;
        } else if let Some(rest) = line_prefix(line, "Action Input:") {
            in_action_input = true;
            pending_action_input_lines.push(rest.to_string());
            has_content = true;
        } else if let Some(rest) = line_prefix(line, "Observation:") {
            flush_action_input(&mut current, &mut pending_action_input_lines);
            in_action_input = false;
            current.observation = Some(rest.to_string());
            has_content = true;
        } else if in_action_input {
            pending_action_input_lines.push(line.to_string());
        }
    }
    flush_action_input(&mut current, &mut pending_action_input_lines);
    if has_content {
        blocks.push(current);
    }
    blocks
}

/// If `message` contains no recognizable action (structured JSON tool
/// call or a ReAct `Action:` line) and has more than
/// [`FINAL_ANSWER_MIN_LEN`] non-whitespace characters after trimming,
/// treat it as the final answer.
pub fn extract_final_answer(message: &str) -> Option<String> {
    if parse_json_tool_call(message).is_some() {
        return None;
    }
    let blocks = parse_blocks(message);
    if blocks.iter().any(|b| b.action.is_some()) {
        return None;
    }
    let trimmed = message.trim();
    if trimmed.chars().filter(|c| !c.is_whitespace()).count() > FINAL_ANSWER_MIN_LEN {
        Some(message.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn parses_json_tool_call() {
        let msg = r#"{"tool": "search_code", "parameters": {"query": "policy"}}"#;
        let block = parse_json_tool_call(msg).unwrap();
        assert_eq!(block.action.as_deref(), Some("search_code"));
        assert_eq!(block.action_input, Some(json!({"query": "policy"})));
    }

    #[test]
    fn malformed_json_is_skipped_silently() {
        let msg = "{not json at all";
        assert!(parse_json_tool_call(msg).is_none());
    }

    #[test]
    fn parses_react_quadruple() {
        let msg = "Thought: I should search\nAction: search_code\nAction Input: {\"query\": \"policy\"}\nObservation: found it";
        let blocks = parse_blocks(msg);
        assert_eq!(blocks.len(), 1);
        let b = &blocks[0];
        assert_eq!(b.thought.as_deref(), Some("I should search"));
        assert_eq!(b.action.as_deref(), Some("search_code"));
        assert_eq!(b.action_input, Some(json!({"query": "policy"})));
        assert_eq!(b.observation.as_deref(), Some("found it"));
    }

    #[test]
    fn action_input_falls_back_to_key_value() {
        let msg = "Action: read_file\nAction Input: path=src/lib.rs\nstart_line=1";
        let blocks = parse_blocks(msg);
        assert_eq!(
            blocks[0].action_input,
            Some(json!({"path": "src/lib.rs", "start_line": "1"}))
        );
    }

    #[test]
    fn action_input_falls_back_to_raw_input_wrapper() {
        let msg = "Action: run_sandbox\nAction Input: just some raw text";
        let blocks = parse_blocks(msg);
        assert_eq!(blocks[0].action_input, Some(json!({"input": "just some raw text"})));
    }

    #[test]
    fn message_with_no_action_and_long_text_is_final_answer() {
        let msg = "Based on all the evidence gathered, the delegation policy enforces budgets.";
        assert_eq!(extract_final_answer(msg), Some(msg.to_string()));
    }

    #[test]
    fn short_message_with_no_action_is_not_final_answer() {
        assert_eq!(extract_final_answer("ok"), None);
    }

    #[test]
    fn message_with_action_is_not_a_final_answer() {
        let msg = "Thought: hm\nAction: search_code\nAction Input: {}";
        assert_eq!(extract_final_answer(msg), None);
    }

    proptest::proptest! {
        #[test]
        fn structured_json_roundtrip(tool in "[a-z_]{1,20}", query in "[a-zA-Z0-9 ]{0,40}") {
            let msg = serde_json::json!({"tool": tool, "parameters": {"query": query}}).to_string();
            let blocks = parse_blocks(&msg);
            // A bare JSON object has no ReAct-prefixed lines.
            prop_assert!(blocks.is_empty());
            let parsed = parse_json_tool_call(&msg).unwrap();
            prop_assert_eq!(parsed.action.unwrap(), tool);
        }
    }
}
