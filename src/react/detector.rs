//! Tool Call 检测：Structured Action Protocol
//!
//! 模型在自由文本中用一行 `Action: <tool> = { <json> }` 请求工具，前面可以有 `Thought: ...`。
//! 检测失败不是错误：没有 Action 行时不带提示（循环把原文当作最终回复）；
//! 有 Action 行但格式不对时带纠正提示（循环把提示写入记忆并进入下一轮）。

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::tools::{AskUserArgs, FinalAnswerArgs, ASK_USER_TOOL, FINAL_ANSWER_TOOL};

/// 解析出的工具调用
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub tool_name: String,
    pub params: Value,
}

/// 检测失败：message 说明原因，llm_hint 为 Some 时应作为纠正提示发回模型
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionFailure {
    pub message: String,
    pub llm_hint: Option<String>,
}

impl DetectionFailure {
    fn no_action() -> Self {
        Self {
            message: "no Action line found".to_string(),
            llm_hint: None,
        }
    }

    fn malformed(message: impl Into<String>) -> Self {
        let message = message.into();
        let hint = format!(
            "Your last Action could not be parsed ({message}). \
             Reply with exactly one line of the form `Action: <tool_name> = {{<json object>}}`, \
             for example `Action: final_answer = {{\"answer\": \"...\"}}`. \
             Optionally put `Thought: <reasoning>` on the line before it."
        );
        Self {
            message,
            llm_hint: Some(hint),
        }
    }
}

/// Tool Call 检测器接缝
pub trait ToolCallDetector: Send + Sync {
    fn detect(&self, text: &str) -> Result<ToolCall, DetectionFailure>;
}

fn action_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^[ \t>*`]*Action\s*:").expect("valid regex"))
}

fn action_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[ \t>*`]*Action\s*:\s*([A-Za-z_][\w.\-]*)\s*=\s*").expect("valid regex")
    })
}

fn thought_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)Thought[ \t]*:[ \t]*(.*?)(?:\n[ \t>*`]*Action\s*:|\z)").expect("valid regex")
    })
}

/// 提取 `Thought:` 之后、下一个 Action 行之前的文本；没有或为空时返回 None
pub fn extract_thought(text: &str) -> Option<String> {
    let caps = thought_re().captures(text)?;
    let thought = caps.get(1)?.as_str().trim();
    if thought.is_empty() {
        None
    } else {
        Some(thought.to_string())
    }
}

/// 从 text 开头的 `{` 起找到与之配对的 `}`，忽略字符串内的括号；返回包含两端的切片
fn balanced_object(text: &str) -> Option<&str> {
    if !text.starts_with('{') {
        return None;
    }
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// 默认检测器：取第一个 Action 行，参数允许跨行
#[derive(Debug, Default, Clone)]
pub struct SapDetector;

impl SapDetector {
    pub fn new() -> Self {
        Self
    }

    fn validate_builtin(call: &ToolCall) -> Result<(), DetectionFailure> {
        match call.tool_name.as_str() {
            FINAL_ANSWER_TOOL => serde_json::from_value::<FinalAnswerArgs>(call.params.clone())
                .map(|_| ())
                .map_err(|e| {
                    DetectionFailure::malformed(format!(
                        "final_answer needs a string \"answer\": {e}"
                    ))
                }),
            ASK_USER_TOOL => serde_json::from_value::<AskUserArgs>(call.params.clone())
                .map(|_| ())
                .map_err(|e| {
                    DetectionFailure::malformed(format!(
                        "ask_user needs a string \"question\": {e}"
                    ))
                }),
            _ => Ok(()),
        }
    }
}

impl ToolCallDetector for SapDetector {
    fn detect(&self, text: &str) -> Result<ToolCall, DetectionFailure> {
        let marker = action_marker()
            .find(text)
            .ok_or_else(DetectionFailure::no_action)?;
        let rest = &text[marker.start()..];

        let header = action_header().captures(rest).ok_or_else(|| {
            DetectionFailure::malformed("Action line is not `Action: <tool_name> = {...}`")
        })?;
        let tool_name = header[1].to_string();
        let after = &rest[header.get(0).map(|m| m.end()).unwrap_or(0)..];

        let json = balanced_object(after.trim_start()).ok_or_else(|| {
            DetectionFailure::malformed(format!(
                "parameters of `{tool_name}` must be a single JSON object"
            ))
        })?;
        let params: Value = serde_json::from_str(json).map_err(|e| {
            DetectionFailure::malformed(format!("invalid JSON for `{tool_name}`: {e}"))
        })?;

        let call = ToolCall { tool_name, params };
        Self::validate_builtin(&call)?;
        Ok(call)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn detect(text: &str) -> Result<ToolCall, DetectionFailure> {
        SapDetector::new().detect(text)
    }

    #[test]
    fn test_plain_text_has_no_hint() {
        let err = detect("I think the answer is 42").unwrap_err();
        assert!(err.llm_hint.is_none());
    }

    #[test]
    fn test_final_answer_with_trailing_noise() {
        let call = detect(r#"Action: final_answer = {"answer":"OK"}""#).unwrap();
        assert_eq!(call.tool_name, "final_answer");
        assert_eq!(call.params, json!({"answer": "OK"}));
    }

    #[test]
    fn test_multiline_params_with_braces_in_strings() {
        let text = "Thought: look it up\nAction: search = {\n  \"q\": \"rust {async}\",\n  \"n\": 3\n}\nmore text";
        let call = detect(text).unwrap();
        assert_eq!(call.tool_name, "search");
        assert_eq!(call.params["q"], "rust {async}");
        assert_eq!(call.params["n"], 3);
    }

    #[test]
    fn test_invalid_json_gives_hint() {
        let err = detect("Action: search = {q: nope}").unwrap_err();
        let hint = err.llm_hint.expect("hint");
        assert!(hint.contains("Action: <tool_name>"));
    }

    #[test]
    fn test_missing_equals_gives_hint() {
        let err = detect("Action: search").unwrap_err();
        assert!(err.llm_hint.is_some());
    }

    #[test]
    fn test_non_object_params_gives_hint() {
        let err = detect("Action: search = [1, 2]").unwrap_err();
        assert!(err.llm_hint.is_some());
    }

    #[test]
    fn test_final_answer_without_answer_gives_hint() {
        let err = detect(r#"Action: final_answer = {"text": "x"}"#).unwrap_err();
        assert!(err.message.contains("answer"));
        assert!(err.llm_hint.is_some());
    }

    #[test]
    fn test_ask_user_with_details() {
        let call = detect(r#"Action: ask_user = {"question":"Name?","details":"for the form"}"#)
            .unwrap();
        assert_eq!(call.params["details"], "for the form");
    }

    #[test]
    fn test_first_action_wins() {
        let call = detect("Action: a = {}\nAction: b = {}").unwrap();
        assert_eq!(call.tool_name, "a");
    }

    #[test]
    fn test_extract_thought() {
        let text = "Thought: I should search\nfor it\nAction: search = {}";
        assert_eq!(
            extract_thought(text).as_deref(),
            Some("I should search\nfor it")
        );
        assert_eq!(extract_thought("Thought: only this").as_deref(), Some("only this"));
        assert!(extract_thought("no reasoning here").is_none());
        assert!(extract_thought("Thought:   \nAction: x = {}").is_none());
    }
}
