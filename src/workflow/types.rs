//! 工作流类型定义
//!
//! 定义节点、边、运行配置与错误等核心数据类型

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::core::AgentError;

pub type NodeId = String;

/// 终止节点名
pub const END: &str = "__end__";

/// 边的目标：下一个节点或终止
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Node(NodeId),
    End,
}

impl From<&str> for Target {
    fn from(name: &str) -> Self {
        if name == END {
            Target::End
        } else {
            Target::Node(name.to_string())
        }
    }
}

/// 条件路由：读取状态，返回分支标签
pub type Router<S> = Arc<dyn Fn(&S) -> &'static str + Send + Sync>;

/// 节点出边
pub enum Edge<S> {
    /// 固定跳转
    Direct(Target),
    /// 条件跳转：router 返回的标签在 branches 中查找目标
    Conditional {
        router: Router<S>,
        branches: Vec<(&'static str, Target)>,
    },
}

impl<S> Edge<S> {
    /// 所有可能的目标（用于校验与可达性分析）
    pub fn targets(&self) -> Vec<&Target> {
        match self {
            Edge::Direct(t) => vec![t],
            Edge::Conditional { branches, .. } => branches.iter().map(|(_, t)| t).collect(),
        }
    }
}

/// 图节点：读写共享状态；可恢复的错误应写入状态，返回 Err 会终止整次运行
#[async_trait]
pub trait Node<S>: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, state: &mut S) -> Result<(), AgentError>;
}

/// 状态钩子：引擎在每个节点执行后回调，用于记录执行轨迹与耗时
pub trait GraphState: Send {
    fn record_node(&mut self, name: &str, elapsed: Duration);
}

/// 单次运行配置
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// 最大执行步数（每执行一个节点计一步）
    pub recursion_limit: usize,
    pub cancel: CancellationToken,
}

impl RunConfig {
    pub fn new(recursion_limit: usize) -> Self {
        Self {
            recursion_limit,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::new(25)
    }
}

/// 工作流错误类型
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("entry point not set")]
    MissingEntry,
    #[error("unknown node: {0}")]
    UnknownNode(NodeId),
    #[error("duplicate node: {0}")]
    DuplicateNode(NodeId),
    #[error("node '{0}' already has an outgoing edge")]
    DuplicateEdge(NodeId),
    #[error("node '{0}' has no outgoing edge")]
    NoOutgoingEdge(NodeId),
    #[error("conditional edge of '{0}' has no branches")]
    EmptyBranches(NodeId),
    #[error("router of '{node}' returned unknown branch '{label}'")]
    UnknownBranch { node: NodeId, label: String },
    #[error("recursion limit of {0} steps reached without hitting END")]
    RecursionLimit(usize),
    #[error("node '{node}' failed: {source}")]
    NodeFailed {
        node: NodeId,
        #[source]
        source: Box<AgentError>,
    },
    #[error("run cancelled")]
    Cancelled,
}
