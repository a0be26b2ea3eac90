//! Whys - Rust 根因分析与用户研究智能体
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型与恢复策略
//! - **empathy**: 支持工单共情地图（同意校验、PII 脱敏、分析与合成）
//! - **five_whys**: Five Whys 根因分析 Agent
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）、结构化输出
//! - **observability**: 日志初始化
//! - **tools**: 网页搜索（Tavily）
//! - **vote_stories**: 用户故事评分 Agent
//! - **workflow**: 带条件边的状态图引擎

pub mod config;
pub mod core;
pub mod empathy;
pub mod five_whys;
pub mod llm;
pub mod observability;
pub mod tools;
pub mod vote_stories;
pub mod workflow;

pub use empathy::EmpathyMappingAgent;
pub use five_whys::FiveWhysAgent;
pub use vote_stories::VoteStoriesAgent;
