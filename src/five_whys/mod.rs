//! Five Whys 根因分析：状态、prompt、结构化输出、图节点与 Agent

pub mod agent;
pub mod nodes;
pub mod outputs;
pub mod prompts;
pub mod state;

pub use agent::FiveWhysAgent;
pub use outputs::{CauseAnalysisOutput, ClarificationOutput, SolutionOutput, ValidationOutput};
pub use state::{FiveWhysResult, FiveWhysState, StopReason, WhyStep};
