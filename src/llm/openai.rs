//! OpenAI 兼容 API 客户端
//!
//! 通过 async_openai 调用任意 OpenAI 兼容端点（可配置 base_url）；支持 OpenAI、NVIDIA Build、LM Studio 等。

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError, Message, Role};

/// 累计 token 用量，按 [prompt, completion] 计数
#[derive(Debug, Default)]
pub struct TokenUsage {
    counts: [AtomicU64; 2],
}

impl TokenUsage {
    pub fn record(&self, prompt: u64, completion: u64) {
        self.counts[0].fetch_add(prompt, Ordering::Relaxed);
        self.counts[1].fetch_add(completion, Ordering::Relaxed);
    }

    /// (prompt, completion, total)
    pub fn snapshot(&self) -> (u64, u64, u64) {
        let prompt = self.counts[0].load(Ordering::Relaxed);
        let completion = self.counts[1].load(Ordering::Relaxed);
        (prompt, completion, prompt + completion)
    }
}

/// 采样参数：温度与最大输出 token，未设置时使用服务端默认
#[derive(Debug, Clone, Copy, Default)]
pub struct SamplingParams {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// 单个 OpenAI 兼容端点上的一个模型；每次 complete 只取首个 choice
pub struct OpenAiClient {
    inner: Client<OpenAIConfig>,
    model: String,
    sampling: SamplingParams,
    timeout: Duration,
    usage: TokenUsage,
}

impl OpenAiClient {
    /// `base_url` 为空时使用 api.openai.com；本地端点（LM Studio）不校验 key
    pub fn new(base_url: Option<&str>, model: &str, api_key: &str) -> Self {
        let mut endpoint = OpenAIConfig::new().with_api_key(api_key);
        if let Some(url) = base_url {
            endpoint = endpoint.with_api_base(url);
        }

        Self {
            inner: Client::with_config(endpoint),
            model: model.to_string(),
            sampling: SamplingParams::default(),
            timeout: Duration::from_secs(60),
            usage: TokenUsage::default(),
        }
    }

    pub fn with_sampling(mut self, sampling: SamplingParams) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn to_openai_messages(
        &self,
        messages: &[Message],
    ) -> Result<Vec<ChatCompletionRequestMessage>, LlmError> {
        messages
            .iter()
            .map(|m| {
                let msg = match m.role {
                    Role::System => ChatCompletionRequestMessage::System(
                        ChatCompletionRequestSystemMessageArgs::default()
                            .content(m.content.clone())
                            .build()
                            .map_err(map_openai_error)?,
                    ),
                    Role::User => ChatCompletionRequestMessage::User(
                        ChatCompletionRequestUserMessageArgs::default()
                            .content(m.content.clone())
                            .build()
                            .map_err(map_openai_error)?,
                    ),
                    Role::Assistant => ChatCompletionRequestMessage::Assistant(
                        ChatCompletionRequestAssistantMessageArgs::default()
                            .content(m.content.clone())
                            .build()
                            .map_err(map_openai_error)?,
                    ),
                };
                Ok(msg)
            })
            .collect()
    }
}

fn map_openai_error(e: OpenAIError) -> LlmError {
    match e {
        OpenAIError::InvalidArgument(msg) => LlmError::InvalidRequest(msg),
        other => LlmError::Request(other.to_string()),
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn token_usage(&self) -> (u64, u64, u64) {
        self.usage.snapshot()
    }

    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model)
            .messages(self.to_openai_messages(messages)?);
        if let Some(t) = self.sampling.temperature {
            args.temperature(t);
        }
        if let Some(n) = self.sampling.max_tokens {
            args.max_completion_tokens(n);
        }
        let request = args.build().map_err(map_openai_error)?;

        let response = tokio::time::timeout(self.timeout, self.inner.chat().create(request))
            .await
            .map_err(|_| LlmError::Timeout(self.timeout.as_secs()))?
            .map_err(map_openai_error)?;

        if let Some(u) = &response.usage {
            self.usage.record(u64::from(u.prompt_tokens), u64::from(u.completion_tokens));
        }

        match response.choices.into_iter().next().and_then(|c| c.message.content) {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(LlmError::EmptyResponse),
        }
    }
}
