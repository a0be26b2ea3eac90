//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `WHYS__*` 覆盖（双下划线表示嵌套，如 `WHYS__LLM__PROVIDER=openai`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub agent: AgentSection,
    pub tools: ToolsSection,
}

/// [app] 段：应用名与调试输出
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppSection {
    pub name: Option<String>,
    /// 打开后在日志中输出搜索过滤结果等调试信息
    pub debug: bool,
}

/// [llm] 段：后端选择、采样参数与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 后端：lmstudio / openai / nvidia / mock
    pub provider: String,
    /// 未设置时使用 provider 的默认模型
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "lmstudio".to_string(),
            model: None,
            base_url: None,
            temperature: Some(0.8),
            max_tokens: Some(2000),
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmTimeoutsSection {
    /// 单次请求超时（秒）
    pub request: u64,
    /// 用户故事评分的整体超时（秒）
    pub vote: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self {
            request: 60,
            vote: 30,
        }
    }
}

/// [agent] 段：Five Whys 流程控制
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    /// 默认追问层数
    pub max_whys: usize,
    /// 图执行的最大步数（每执行一个节点计一步）
    pub recursion_limit: usize,
    /// 累计错误超过该值时终止
    pub max_errors: usize,
    /// 连续两层置信度都低于该值视为没有深入
    pub low_confidence_threshold: f64,
    /// 原因分析前是否先做网页搜索
    pub use_web_search: bool,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            max_whys: 5,
            recursion_limit: 30,
            max_errors: 3,
            low_confidence_threshold: 0.3,
            use_web_search: true,
        }
    }
}

/// [tools] 段
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ToolsSection {
    pub web_search: WebSearchSection,
}

/// [tools.web_search] 段：Tavily 搜索参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebSearchSection {
    pub base_url: String,
    /// 低于该相关度分数的结果被丢弃
    pub score_threshold: f64,
    /// basic 或 advanced
    pub search_depth: String,
    pub max_results: usize,
    /// 查询最大字符数，超出截断
    pub max_query_length: usize,
    pub timeout_secs: u64,
}

impl Default for WebSearchSection {
    fn default() -> Self {
        Self {
            base_url: "https://api.tavily.com".to_string(),
            score_threshold: 0.20,
            search_depth: "advanced".to_string(),
            max_results: 3,
            max_query_length: 400,
            timeout_secs: 15,
        }
    }
}

/// 从 config 目录加载配置，环境变量 WHYS__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 WHYS__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    const DEFAULT_LOCATIONS: [&str; 3] = ["config/default.toml", "../config/default.toml", "default.toml"];

    let mut builder = config::Config::builder();
    if let Some(found) = DEFAULT_LOCATIONS
        .iter()
        .map(std::path::Path::new)
        .find(|p| p.is_file())
    {
        tracing::debug!(path = %found.display(), "loading default config");
        builder = builder.add_source(config::File::from(found));
    }

    match config_path {
        Some(path) if path.is_file() => {
            builder = builder.add_source(config::File::from(path));
        }
        Some(path) => tracing::warn!(path = %path.display(), "config file not found, ignored"),
        None => {}
    }

    builder = builder.add_source(
        config::Environment::with_prefix("WHYS")
            .separator("__")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}
