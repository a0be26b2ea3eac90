//! 模型提供方预设（均为 OpenAI 兼容格式）
//!
//! - lmstudio: 本地 LM Studio，Base URL http://127.0.0.1:1234/v1，无需真实 Key
//! - openai:   api.openai.com，Key 取自 `OPENAI_API_KEY`
//! - nvidia:   NVIDIA Build，Key 取自 `BUILD_NVIDIA_API_KEY`
//! - mock:     本地 Mock，无网络

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::core::AgentError;
use crate::llm::{LlmClient, MockLlmClient, OpenAiClient, SamplingParams};

pub const LMSTUDIO_BASE_URL: &str = "http://127.0.0.1:1234/v1";
pub const LMSTUDIO_PHI4: &str = "microsoft/phi-4-reasoning-plus";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const OPENAI_GPT4O: &str = "gpt-4o";
pub const NVIDIA_BASE_URL: &str = "https://integrate.api.nvidia.com/v1";
pub const NVIDIA_GPT_OSS_20B: &str = "openai/gpt-oss-20b";

/// 已知的模型提供方
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    LmStudio,
    OpenAi,
    Nvidia,
    Mock,
}

impl FromStr for Provider {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lmstudio" | "lm_studio" | "local" => Ok(Self::LmStudio),
            "openai" => Ok(Self::OpenAi),
            "nvidia" => Ok(Self::Nvidia),
            "mock" => Ok(Self::Mock),
            other => Err(AgentError::ConfigError(format!(
                "unknown llm provider '{other}' (expected lmstudio, openai, nvidia or mock)"
            ))),
        }
    }
}

impl Provider {
    pub fn default_base_url(self) -> Option<&'static str> {
        match self {
            Self::LmStudio => Some(LMSTUDIO_BASE_URL),
            Self::OpenAi => Some(OPENAI_BASE_URL),
            Self::Nvidia => Some(NVIDIA_BASE_URL),
            Self::Mock => None,
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Self::LmStudio => LMSTUDIO_PHI4,
            Self::OpenAi => OPENAI_GPT4O,
            Self::Nvidia => NVIDIA_GPT_OSS_20B,
            Self::Mock => "mock",
        }
    }

    /// 需要的 API Key 环境变量；本地 LM Studio 与 Mock 不需要
    pub fn api_key_env(self) -> Option<&'static str> {
        match self {
            Self::OpenAi => Some("OPENAI_API_KEY"),
            Self::Nvidia => Some("BUILD_NVIDIA_API_KEY"),
            Self::LmStudio | Self::Mock => None,
        }
    }
}

/// 按配置创建 LLM；缺少 API Key 或 provider 非法时返回 ConfigError
pub fn try_create_llm(cfg: &AppConfig) -> Result<Arc<dyn LlmClient>, AgentError> {
    let provider: Provider = cfg.llm.provider.parse()?;
    if provider == Provider::Mock {
        tracing::info!("Using Mock LLM");
        return Ok(Arc::new(MockLlmClient));
    }

    let api_key = match provider.api_key_env() {
        Some(var) => std::env::var(var).map_err(|_| {
            AgentError::ConfigError(format!("{var} not found in environment variables"))
        })?,
        None => "lm-studio".to_string(),
    };

    let model = cfg
        .llm
        .model
        .clone()
        .unwrap_or_else(|| provider.default_model().to_string());
    let base_url = cfg
        .llm
        .base_url
        .clone()
        .or_else(|| provider.default_base_url().map(String::from));

    tracing::info!(provider = ?provider, model = %model, "Using OpenAI-compatible LLM");
    let client = OpenAiClient::new(base_url.as_deref(), &model, &api_key)
        .with_sampling(SamplingParams {
            temperature: cfg.llm.temperature,
            max_tokens: cfg.llm.max_tokens,
        })
        .with_timeout(Duration::from_secs(cfg.llm.timeouts.request));
    Ok(Arc::new(client))
}

/// 按配置创建 LLM；失败时告警并回退到 Mock，保证流程可本地跑通
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    match try_create_llm(cfg) {
        Ok(llm) => llm,
        Err(e) => {
            tracing::warn!(error = %e, "LLM unavailable, using Mock LLM");
            Arc::new(MockLlmClient)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_provider() {
        assert_eq!("LMStudio".parse::<Provider>().unwrap(), Provider::LmStudio);
        assert_eq!("nvidia".parse::<Provider>().unwrap(), Provider::Nvidia);
        assert!("deepthought".parse::<Provider>().is_err());
    }

    #[test]
    fn test_provider_defaults() {
        assert_eq!(Provider::Nvidia.default_model(), NVIDIA_GPT_OSS_20B);
        assert_eq!(Provider::Nvidia.api_key_env(), Some("BUILD_NVIDIA_API_KEY"));
        assert_eq!(Provider::LmStudio.api_key_env(), None);
        assert_eq!(Provider::Mock.default_base_url(), None);
    }

    #[test]
    fn test_mock_provider_never_fails() {
        let mut cfg = AppConfig::default();
        cfg.llm.provider = "mock".to_string();
        let llm = try_create_llm(&cfg).unwrap();
        assert_eq!(llm.model_name(), "mock");
    }

    #[test]
    fn test_unknown_provider_falls_back_to_mock() {
        let mut cfg = AppConfig::default();
        cfg.llm.provider = "nope".to_string();
        let llm = create_llm_from_config(&cfg);
        assert_eq!(llm.model_name(), "mock");
    }
}
