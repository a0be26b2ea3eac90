//! Web 搜索工具：Tavily Search API、相关度过滤、查询长度限制
//!
//! 查询超过 max_query_length 个字符时截断；仅保留 score >= score_threshold 的结果，
//! 且最多 max_results 条；每次调用输出结构化审计日志（JSON）。

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::config::WebSearchSection;
use crate::core::AgentError;

/// 搜索结果（写入 Agent 状态，供原因分析 prompt 使用）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WebSearchOutput {
    /// 过滤后的结果正文
    pub search_results: Vec<String>,
    pub search_query: String,
    pub search_time: String,
    pub search_engine: String,
    pub search_url: String,
}

impl WebSearchOutput {
    pub fn is_empty(&self) -> bool {
        self.search_results.is_empty()
    }
}

/// 搜索后端 trait
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<WebSearchOutput, AgentError>;
}

/// Tavily 原始返回中的单条结果
#[derive(Debug, Clone, Deserialize)]
pub struct TavilyResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub score: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
    #[serde(default)]
    response_time: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'a str,
    max_results: usize,
}

/// 按相关度阈值过滤，保持原顺序，最多 max_results 条，返回正文
pub fn extract_content(results: &[TavilyResult], score_threshold: f64, max_results: usize) -> Vec<String> {
    results
        .iter()
        .filter(|r| r.score >= score_threshold)
        .take(max_results)
        .map(|r| r.content.clone())
        .collect()
}

/// 按字符（非字节）截断查询
pub fn truncate_query(query: &str, max_chars: usize) -> String {
    query.chars().take(max_chars).collect()
}

/// Tavily 搜索客户端
pub struct TavilySearch {
    client: Client,
    api_key: String,
    settings: WebSearchSection,
    debug: bool,
}

impl TavilySearch {
    /// 创建带超时的 HTTP 客户端；客户端构建失败时返回 ConfigError
    pub fn new(api_key: impl Into<String>, settings: WebSearchSection) -> Result<Self, AgentError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| AgentError::ConfigError(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            settings,
            debug: false,
        })
    }

    /// 从环境变量 `TAVILY_API_KEY` 创建；缺少 Key 时返回 None（调用方跳过搜索）
    pub fn from_env(settings: &WebSearchSection) -> Option<Self> {
        match std::env::var("TAVILY_API_KEY") {
            Ok(key) if !key.trim().is_empty() => match Self::new(key, settings.clone()) {
                Ok(search) => Some(search),
                Err(e) => {
                    tracing::warn!(error = %e, "web search disabled");
                    None
                }
            },
            _ => {
                tracing::warn!("TAVILY_API_KEY not set, web search disabled");
                None
            }
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/search", self.settings.base_url.trim_end_matches('/'))
    }

    async fn request(&self, query: &str) -> Result<TavilyResponse, AgentError> {
        let body = TavilyRequest {
            api_key: &self.api_key,
            query,
            search_depth: &self.settings.search_depth,
            max_results: self.settings.max_results,
        };
        let resp = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AgentError::ToolTimeout("web_search".to_string())
                } else {
                    AgentError::ToolExecutionFailed(format!("Request failed: {}", e))
                }
            })?;
        if !resp.status().is_success() {
            return Err(AgentError::ToolExecutionFailed(format!(
                "HTTP {}",
                resp.status()
            )));
        }
        resp.json::<TavilyResponse>()
            .await
            .map_err(|e| AgentError::ToolExecutionFailed(format!("Read body: {}", e)))
    }
}

#[async_trait]
impl WebSearch for TavilySearch {
    async fn search(&self, query: &str) -> Result<WebSearchOutput, AgentError> {
        let start = Instant::now();
        let truncated = truncate_query(query, self.settings.max_query_length);
        let result = self.request(&truncated).await;

        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": "web_search",
            "ok": result.is_ok(),
            "duration_ms": start.elapsed().as_millis() as u64,
            "query_preview": truncate_query(&truncated, 80),
        });
        tracing::info!(audit = %audit.to_string(), "tool");

        let response = result?;
        let search_results = extract_content(
            &response.results,
            self.settings.score_threshold,
            self.settings.max_results,
        );
        if self.debug {
            tracing::debug!(
                kept = search_results.len(),
                total = response.results.len(),
                results = ?search_results,
                "web search after filtering"
            );
        }

        Ok(WebSearchOutput {
            search_results,
            search_query: query.to_string(),
            search_time: response
                .response_time
                .map(|v| v.to_string())
                .unwrap_or_default(),
            search_engine: "tavily".to_string(),
            search_url: self.endpoint(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_keeps_configured_endpoint() {
        let settings = WebSearchSection {
            base_url: "https://search.internal/".into(),
            timeout_secs: 3,
            ..WebSearchSection::default()
        };
        let search = TavilySearch::new("key", settings).unwrap();
        assert_eq!(search.endpoint(), "https://search.internal/search");
        assert_eq!(search.settings.timeout_secs, 3);
    }

    fn result(content: &str, score: f64) -> TavilyResult {
        TavilyResult {
            title: String::new(),
            url: String::new(),
            content: content.to_string(),
            score,
        }
    }

    #[test]
    fn test_extract_filters_by_score_and_limit() {
        let results = vec![
            result("a", 0.9),
            result("low", 0.1),
            result("b", 0.2),
            result("c", 0.5),
            result("d", 0.8),
        ];
        assert_eq!(extract_content(&results, 0.2, 3), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_extract_empty() {
        assert!(extract_content(&[], 0.2, 3).is_empty());
    }

    #[test]
    fn test_truncate_query_by_chars() {
        assert_eq!(truncate_query("为什么会发生", 3), "为什么");
        assert_eq!(truncate_query("short", 400), "short");
    }

    #[test]
    fn test_parse_tavily_response() {
        let raw = r#"{"query":"q","response_time":1.25,"results":[{"title":"t","url":"u","content":"c","score":0.7}]}"#;
        let parsed: TavilyResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.results.len(), 1);
        assert_eq!(parsed.response_time.unwrap().to_string(), "1.25");
    }
}
