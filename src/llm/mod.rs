//! LLM 层：消息、客户端抽象与实现（OpenAI 兼容 / Mock）、提供方预设、结构化输出

pub mod message;
pub mod mock;
pub mod openai;
pub mod providers;
pub mod structured;
pub mod traits;

pub use message::{system_and_user, Message, Role};
pub use mock::{MockLlmClient, ScriptedLlmClient};
pub use openai::{OpenAiClient, SamplingParams, TokenUsage};
pub use providers::{create_llm_from_config, try_create_llm, Provider};
pub use structured::{complete_structured, extract_json, parse_structured, schema_instruction};
pub use traits::{LlmClient, LlmError};
