//! 共情地图：从支持工单中提炼用户的 Say / Think / Do / Feel
//!
//! 流程依次做问题澄清、工单接入、同意校验、PII 脱敏、本地分析与 LLM 合成。

pub mod agent;
pub mod consent;
pub mod entities;
pub mod nodes;
pub mod outputs;
pub mod pii;
pub mod prompts;
pub mod state;
pub mod tools;

pub use agent::EmpathyMappingAgent;
pub use entities::*;
pub use outputs::EmpathyMapOutput;
pub use state::EmpathyMappingState;
pub use tools::{InMemoryTicketSource, TicketSource};
