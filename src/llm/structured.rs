//! 结构化输出：schemars 生成 JSON Schema 注入 system prompt，serde 在边界处校验 LLM 输出
//!
//! 兼容三种常见回复形态：纯 JSON、```json 代码块、夹杂说明文字的 JSON；
//! 推理模型输出的 `<think>...</think>` 段会先被剥离。

use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;

use crate::core::AgentError;
use crate::llm::{LlmClient, Message, Role};

/// 返回类型 T 的 JSON Schema 说明，可拼入 system prompt
pub fn schema_instruction<T: JsonSchema>() -> String {
    let schema = schema_for!(T);
    let schema = serde_json::to_string_pretty(&schema).unwrap_or_default();
    format!(
        "Respond with a single JSON object that conforms to this JSON Schema. \
        Do not add any text outside the JSON object.\n{schema}"
    )
}

/// 去除推理模型的思考段
fn strip_reasoning(output: &str) -> &str {
    match output.rfind("</think>") {
        Some(end) => &output[end + "</think>".len()..],
        None => output,
    }
}

/// 从 LLM 文本中提取 JSON 片段（```json 块优先，其次首个 `{` 到最后一个 `}`）
pub fn extract_json(output: &str) -> Option<&str> {
    let trimmed = strip_reasoning(output).trim();

    if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        return Some(rest.find("```").map(|end| rest[..end].trim()).unwrap_or(rest.trim()));
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&trimmed[start..=end])
}

/// 解析 LLM 输出为 T；找不到 JSON 或字段不符都返回 JsonParseError
pub fn parse_structured<T: DeserializeOwned>(output: &str) -> Result<T, AgentError> {
    let json_str = extract_json(output).ok_or_else(|| {
        AgentError::JsonParseError(format!("no JSON object in output: {}", preview(output)))
    })?;
    serde_json::from_str(json_str)
        .map_err(|e| AgentError::JsonParseError(format!("{}: {}", e, preview(json_str))))
}

/// 调用 LLM 并要求结构化输出；hint 为上一轮失败后的纠正提示（RetryWithPrompt）
pub async fn complete_structured<T>(
    llm: &dyn LlmClient,
    messages: &[Message],
    hint: Option<&str>,
) -> Result<T, AgentError>
where
    T: JsonSchema + DeserializeOwned,
{
    let mut full = Vec::with_capacity(messages.len() + 2);
    let instruction = schema_instruction::<T>();
    match messages.first() {
        Some(first) if first.role == Role::System => {
            full.push(Message::system(format!("{}\n\n{}", first.content, instruction)));
            full.extend_from_slice(&messages[1..]);
        }
        _ => {
            full.push(Message::system(instruction));
            full.extend_from_slice(messages);
        }
    }
    if let Some(hint) = hint {
        full.push(Message::user(hint.to_string()));
    }

    let output = llm.complete(&full).await?;
    parse_structured(&output)
}

fn preview(s: &str) -> String {
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, JsonSchema)]
    struct Probe {
        answer: String,
        #[serde(default)]
        score: f64,
    }

    #[test]
    fn test_extract_plain_json() {
        assert_eq!(extract_json(r#"{"a":1}"#), Some(r#"{"a":1}"#));
    }

    #[test]
    fn test_extract_fenced_json() {
        let out = "Sure!\n```json\n{\"a\": 1}\n```\nDone.";
        assert_eq!(extract_json(out), Some("{\"a\": 1}"));
    }

    #[test]
    fn test_extract_skips_think_block() {
        let out = "<think>maybe {not this}</think>\n{\"answer\": \"yes\"}";
        let probe: Probe = parse_structured(out).unwrap();
        assert_eq!(probe.answer, "yes");
        assert_eq!(probe.score, 0.0);
    }

    #[test]
    fn test_parse_without_json_fails() {
        let err = parse_structured::<Probe>("I cannot answer that").unwrap_err();
        assert!(matches!(err, AgentError::JsonParseError(_)));
    }

    #[test]
    fn test_parse_wrong_shape_fails() {
        let err = parse_structured::<Probe>(r#"{"score": 0.4}"#).unwrap_err();
        assert!(matches!(err, AgentError::JsonParseError(msg) if msg.contains("answer")));
    }

    #[test]
    fn test_schema_instruction_mentions_fields() {
        let s = schema_instruction::<Probe>();
        assert!(s.contains("answer"));
        assert!(s.contains("JSON Schema"));
    }
}
