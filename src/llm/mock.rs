//! Mock LLM 客户端（用于测试与无 API Key 的本地运行）
//!
//! - MockLlmClient：取最后一条 User 消息回显
//! - ScriptedLlmClient：按 system prompt 中的关键字匹配规则，依次返回预置回复（最后一条重复使用）

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError, Message, Role};

/// Mock 客户端：回显用户最后一条消息
#[derive(Debug, Default)]
pub struct MockLlmClient;

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, Role::User))
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");

        Ok(format!("Echo from Mock: {}", last_user))
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

struct Rule {
    pattern: String,
    replies: VecDeque<Result<String, LlmError>>,
}

/// 脚本化 Mock：规则按注册顺序匹配（system 或 user 消息包含 pattern 即命中）
#[derive(Default)]
pub struct ScriptedLlmClient {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 命中 pattern 时依次返回 replies；队列只剩一条时重复返回
    pub fn on(self, pattern: impl Into<String>, replies: Vec<&str>) -> Self {
        let replies = replies.into_iter().map(|r| Ok(r.to_string())).collect();
        self.push_rule(pattern.into(), replies)
    }

    /// 命中 pattern 时返回错误（可与 on 组合成「先失败后成功」）
    pub fn on_results(
        self,
        pattern: impl Into<String>,
        replies: Vec<Result<String, LlmError>>,
    ) -> Self {
        self.push_rule(pattern.into(), replies.into_iter().collect())
    }

    fn push_rule(self, pattern: String, replies: VecDeque<Result<String, LlmError>>) -> Self {
        if let Ok(mut rules) = self.rules.lock() {
            rules.push(Rule { pattern, replies });
        }
        self
    }

    /// 已收到的调用次数
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// 所有调用中包含 pattern 的次数
    pub fn calls_matching(&self, pattern: &str) -> usize {
        self.calls
            .lock()
            .map(|calls| {
                calls
                    .iter()
                    .filter(|msgs| msgs.iter().any(|m| m.content.contains(pattern)))
                    .count()
            })
            .unwrap_or(0)
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(messages.to_vec());
        }

        let mut rules = self
            .rules
            .lock()
            .map_err(|_| LlmError::Request("mock rules poisoned".to_string()))?;
        let rule = rules
            .iter_mut()
            .find(|r| messages.iter().any(|m| m.content.contains(&r.pattern)));

        match rule {
            Some(rule) if rule.replies.len() > 1 => {
                rule.replies.pop_front().unwrap_or(Err(LlmError::EmptyResponse))
            }
            Some(rule) => rule
                .replies
                .front()
                .cloned()
                .unwrap_or(Err(LlmError::EmptyResponse)),
            None => Err(LlmError::EmptyResponse),
        }
    }

    fn model_name(&self) -> &str {
        "scripted-mock"
    }
}
