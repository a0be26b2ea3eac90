//! 用户故事评分：给敏捷 User Story 打 0（WEAK）~ 5（GOOD）分
//!
//! 单轮 LLM 调用，整体受超时约束；分数从模型回复中解析，解析不到时为 None。

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::AgentError;
use crate::llm::{system_and_user, LlmClient, LlmError};

pub const AGENT_INSTRUCTIONS: &str =
    "You are a helpful assistant that will vote on a agile user story.";

/// 未指定论据时附带的默认论据
pub const DEFAULT_ARGUMENT: &str = "However, the tradeoff between UX and security is a concern.";

/// 评分状态
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteStoriesState {
    pub story: String,
    pub arguments: Vec<String>,
    pub score: Option<u8>,
}

impl VoteStoriesState {
    pub fn new(story: impl Into<String>, arguments: Vec<String>) -> Self {
        Self {
            story: story.into(),
            arguments,
            score: None,
        }
    }
}

/// 评分结果：模型原始回复与解析出的分数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryVote {
    pub story: String,
    pub output: String,
    pub score: Option<u8>,
}

pub fn format_vote_stories_prompt(state: &VoteStoriesState) -> String {
    let arguments = serde_json::to_string(&state.arguments).unwrap_or_else(|_| "[]".to_string());
    format!(
        "You are a helpful assistant that will vote on a story.\n\
        You will be given a story and a set of arguments.\n\
        You will need to vote on the story based on the arguments.\n\n\
        The story is: {story}\n\
        The arguments are: {arguments}\n\n\
        Provide your vote in the following format. Vote is between 0 (WEAK) to 5 (GOOD).\n\
        Vote: <0-5>\n\
        Reason: <one paragraph>",
        story = state.story,
    )
}

fn score_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:vote|score)\b\D{0,20}?\b([0-5])\b").expect("valid vote regex")
    })
}

/// 从回复中解析分数：取 "vote"/"score" 之后最近的 0-5 数字
pub fn parse_vote(output: &str) -> Option<u8> {
    score_regex()
        .captures(output)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// 用户故事评分 Agent
pub struct VoteStoriesAgent {
    llm: Arc<dyn LlmClient>,
    timeout: Duration,
}

impl VoteStoriesAgent {
    pub fn new(llm: Arc<dyn LlmClient>, timeout: Duration) -> Self {
        Self { llm, timeout }
    }

    /// 使用默认论据评分
    pub async fn vote(&self, story: &str) -> Result<StoryVote, AgentError> {
        self.vote_with_arguments(story, vec![DEFAULT_ARGUMENT.to_string()])
            .await
    }

    pub async fn vote_with_arguments(
        &self,
        story: &str,
        arguments: Vec<String>,
    ) -> Result<StoryVote, AgentError> {
        if story.trim().is_empty() {
            return Err(AgentError::InvalidInput("story is empty".into()));
        }
        let mut state = VoteStoriesState::new(story, arguments);
        let messages = system_and_user(AGENT_INSTRUCTIONS, format_vote_stories_prompt(&state));

        let output = tokio::time::timeout(self.timeout, self.llm.complete(&messages))
            .await
            .map_err(|_| {
                tracing::error!(timeout_secs = self.timeout.as_secs(), "vote request timed out");
                AgentError::LlmError(LlmError::Timeout(self.timeout.as_secs()))
            })??;

        state.score = parse_vote(&output);
        tracing::info!(score = ?state.score, model = %self.llm.model_name(), "story voted");
        Ok(StoryVote {
            story: state.story,
            output,
            score: state.score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedLlmClient;

    #[test]
    fn test_parse_vote_variants() {
        assert_eq!(parse_vote("Vote: 4\nReason: clear value"), Some(4));
        assert_eq!(parse_vote("**Score** - 2 out of 5"), Some(2));
        assert_eq!(parse_vote("My vote is 0 (WEAK)"), Some(0));
        assert_eq!(parse_vote("Vote: 9"), None);
        assert_eq!(parse_vote("no number here"), None);
    }

    #[test]
    fn test_prompt_lists_arguments() {
        let state = VoteStoriesState::new("As a user, I want X", vec![DEFAULT_ARGUMENT.into()]);
        let prompt = format_vote_stories_prompt(&state);
        assert!(prompt.contains("As a user, I want X"));
        assert!(prompt.contains("UX and security"));
    }

    #[tokio::test]
    async fn test_vote_parses_score() {
        let llm = ScriptedLlmClient::new().on("vote on a story", vec!["Vote: 3\nReason: ok"]);
        let agent = VoteStoriesAgent::new(Arc::new(llm), Duration::from_secs(5));
        let vote = agent
            .vote("As a user, I want to be able to create a report in a click.")
            .await
            .unwrap();
        assert_eq!(vote.score, Some(3));
        assert!(vote.output.contains("Reason"));
    }

    #[tokio::test]
    async fn test_empty_story_rejected() {
        let agent = VoteStoriesAgent::new(Arc::new(ScriptedLlmClient::new()), Duration::from_secs(5));
        assert!(matches!(agent.vote("  ").await, Err(AgentError::InvalidInput(_))));
    }

    struct SlowLlm;

    #[async_trait::async_trait]
    impl LlmClient for SlowLlm {
        async fn complete(&self, _messages: &[crate::llm::Message]) -> Result<String, LlmError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("Vote: 5".to_string())
        }
    }

    #[tokio::test]
    async fn test_vote_times_out() {
        let agent = VoteStoriesAgent::new(Arc::new(SlowLlm), Duration::from_millis(50));
        let err = agent.vote("As a user, I want dark mode.").await.unwrap_err();
        assert!(matches!(err, AgentError::LlmError(LlmError::Timeout(_))));
    }
}
