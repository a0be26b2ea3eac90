//! 工作流：带条件边的状态图（节点读写共享状态，引擎按边逐步推进）

pub mod builder;
pub mod engine;
pub mod graph;
pub mod types;

pub use builder::GraphBuilder;
pub use engine::CompiledGraph;
pub use graph::WorkflowGraph;
pub use types::*;
