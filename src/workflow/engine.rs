//! 工作流引擎
//!
//! 从入口节点开始逐步执行：运行节点 -> 记录轨迹 -> 按出边选择下一个节点，直到 END。
//! 每步检查取消令牌与最大步数。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::Instrument;

use crate::workflow::graph::WorkflowGraph;
use crate::workflow::types::*;

/// 已校验、可执行的工作流
pub struct CompiledGraph<S> {
    name: String,
    entry: NodeId,
    nodes: HashMap<NodeId, Arc<dyn Node<S>>>,
    edges: HashMap<NodeId, Edge<S>>,
    topology: WorkflowGraph,
}

impl<S: GraphState> CompiledGraph<S> {
    pub(crate) fn new(
        name: String,
        entry: NodeId,
        nodes: HashMap<NodeId, Arc<dyn Node<S>>>,
        edges: HashMap<NodeId, Edge<S>>,
        topology: WorkflowGraph,
    ) -> Self {
        Self {
            name,
            entry,
            nodes,
            edges,
            topology,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Mermaid 流程图
    pub fn to_mermaid(&self) -> String {
        self.topology.to_mermaid(&self.entry)
    }

    /// 执行工作流直到 END，返回最终状态
    pub async fn invoke(&self, mut state: S, run: &RunConfig) -> Result<S, GraphError> {
        let mut current = Target::Node(self.entry.clone());
        let mut steps = 0usize;

        while let Target::Node(name) = current {
            if run.cancel.is_cancelled() {
                return Err(GraphError::Cancelled);
            }
            if steps >= run.recursion_limit {
                tracing::error!(graph = %self.name, node = %name, steps, "recursion limit reached");
                return Err(GraphError::RecursionLimit(run.recursion_limit));
            }
            steps += 1;

            let node = self
                .nodes
                .get(&name)
                .ok_or_else(|| GraphError::UnknownNode(name.clone()))?;

            let span = tracing::info_span!("node", graph = %self.name, node = %name, step = steps);
            let start = Instant::now();
            let result = tokio::select! {
                r = node.run(&mut state).instrument(span) => r,
                _ = run.cancel.cancelled() => return Err(GraphError::Cancelled),
            };
            let elapsed = start.elapsed();
            state.record_node(&name, elapsed);
            tracing::debug!(graph = %self.name, node = %name, elapsed_ms = elapsed.as_millis() as u64, "node finished");

            if let Err(e) = result {
                return Err(GraphError::NodeFailed {
                    node: name,
                    source: Box::new(e),
                });
            }

            current = self.next(&name, &state)?;
        }

        tracing::info!(graph = %self.name, steps, "graph reached END");
        Ok(state)
    }

    fn next(&self, from: &str, state: &S) -> Result<Target, GraphError> {
        let edge = self
            .edges
            .get(from)
            .ok_or_else(|| GraphError::NoOutgoingEdge(from.to_string()))?;
        match edge {
            Edge::Direct(target) => Ok(target.clone()),
            Edge::Conditional { router, branches } => {
                let label = router(state);
                branches
                    .iter()
                    .find(|(l, _)| *l == label)
                    .map(|(_, t)| t.clone())
                    .ok_or_else(|| GraphError::UnknownBranch {
                        node: from.to_string(),
                        label: label.to_string(),
                    })
            }
        }
    }
}
