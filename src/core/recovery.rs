//! 错误恢复引擎
//!
//! 根据 AgentError 类型返回 RecoveryAction，供图中的错误处理节点决定是重试还是终止。

use crate::core::{AgentError, RecoveryAction};
use crate::llm::LlmError;

/// 语义化错误恢复：将错误映射为可执行动作（重试 / 带提示重试 / 终止）
#[derive(Debug, Default)]
pub struct RecoveryEngine;

impl RecoveryEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, err: &AgentError) -> RecoveryAction {
        match err {
            AgentError::JsonParseError(raw) => RecoveryAction::RetryWithPrompt(format!(
                "Your previous answer was not valid JSON ({raw}). \
                Respond with exactly one JSON object that matches the schema, \
                without Markdown fences or any other text."
            )),
            AgentError::LlmError(LlmError::Timeout(_)) => RecoveryAction::Retry,
            AgentError::LlmError(LlmError::Request(_)) => RecoveryAction::Retry,
            AgentError::LlmError(LlmError::EmptyResponse) => RecoveryAction::Retry,
            AgentError::ToolTimeout(_) | AgentError::ToolExecutionFailed(_) => {
                RecoveryAction::Retry
            }
            AgentError::LlmError(LlmError::InvalidRequest(_)) => RecoveryAction::Abort,
            AgentError::ConfigError(_)
            | AgentError::InvalidInput(_)
            | AgentError::Graph(_)
            | AgentError::Cancelled => RecoveryAction::Abort,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recovery_json_parse_error() {
        let engine = RecoveryEngine::new();
        let err = AgentError::JsonParseError("invalid json".to_string());
        match engine.handle(&err) {
            RecoveryAction::RetryWithPrompt(msg) => {
                assert!(msg.contains("JSON"));
                assert!(msg.contains("invalid json"));
            }
            other => panic!("Expected RetryWithPrompt, got {:?}", other),
        }
    }

    #[test]
    fn test_recovery_llm_timeout() {
        let engine = RecoveryEngine::new();
        let err = AgentError::LlmError(LlmError::Timeout(30));
        assert_eq!(engine.handle(&err), RecoveryAction::Retry);
    }

    #[test]
    fn test_recovery_invalid_request_aborts() {
        let engine = RecoveryEngine::new();
        let err = AgentError::LlmError(LlmError::InvalidRequest("bad model".into()));
        assert_eq!(engine.handle(&err), RecoveryAction::Abort);
    }

    #[test]
    fn test_recovery_cancelled() {
        let engine = RecoveryEngine::new();
        assert_eq!(engine.handle(&AgentError::Cancelled), RecoveryAction::Abort);
    }

    #[test]
    fn test_recovery_tool_timeout() {
        let engine = RecoveryEngine::new();
        let err = AgentError::ToolTimeout("web_search".to_string());
        assert_eq!(engine.handle(&err), RecoveryAction::Retry);
    }
}
