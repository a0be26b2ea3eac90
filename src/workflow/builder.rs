//! 工作流构建器
//!
//! 提供流畅的API来声明节点与边，build 时统一校验

use std::collections::HashMap;
use std::sync::Arc;

use crate::workflow::engine::CompiledGraph;
use crate::workflow::graph::WorkflowGraph;
use crate::workflow::types::*;

/// 工作流构建器
pub struct GraphBuilder<S> {
    name: String,
    entry: Option<NodeId>,
    order: Vec<NodeId>,
    nodes: HashMap<NodeId, Arc<dyn Node<S>>>,
    edges: HashMap<NodeId, Edge<S>>,
    /// 声明阶段发现的错误，延迟到 build 时返回
    errors: Vec<GraphError>,
}

impl<S: GraphState + 'static> GraphBuilder<S> {
    /// 创建新的工作流构建器
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entry: None,
            order: Vec::new(),
            nodes: HashMap::new(),
            edges: HashMap::new(),
            errors: Vec::new(),
        }
    }

    /// 添加节点（以 Node::name 为 ID）
    pub fn node(mut self, node: impl Node<S> + 'static) -> Self {
        let id = node.name().to_string();
        if self.nodes.contains_key(&id) {
            self.errors.push(GraphError::DuplicateNode(id));
            return self;
        }
        self.order.push(id.clone());
        self.nodes.insert(id, Arc::new(node));
        self
    }

    /// 设置入口节点
    pub fn entry(mut self, name: &str) -> Self {
        self.entry = Some(name.to_string());
        self
    }

    /// 固定边；to 为 END 时表示终止
    pub fn edge(self, from: &str, to: &str) -> Self {
        self.add_edge(from, Edge::Direct(Target::from(to)))
    }

    /// 条件边：router 返回的标签映射到 branches 中的目标
    pub fn conditional<F>(self, from: &str, router: F, branches: &[(&'static str, &str)]) -> Self
    where
        F: Fn(&S) -> &'static str + Send + Sync + 'static,
    {
        let branches = branches
            .iter()
            .map(|(label, to)| (*label, Target::from(*to)))
            .collect();
        self.add_edge(
            from,
            Edge::Conditional {
                router: Arc::new(router),
                branches,
            },
        )
    }

    fn add_edge(mut self, from: &str, edge: Edge<S>) -> Self {
        if self.edges.contains_key(from) {
            self.errors.push(GraphError::DuplicateEdge(from.to_string()));
        } else {
            self.edges.insert(from.to_string(), edge);
        }
        self
    }

    /// 构建工作流：校验入口、边的两端、每个节点都有出边
    pub fn build(mut self) -> Result<CompiledGraph<S>, GraphError> {
        if let Some(err) = self.errors.drain(..).next() {
            return Err(err);
        }

        let entry = self.entry.clone().ok_or(GraphError::MissingEntry)?;
        if !self.nodes.contains_key(&entry) {
            return Err(GraphError::UnknownNode(entry));
        }

        for (from, edge) in &self.edges {
            if !self.nodes.contains_key(from) {
                return Err(GraphError::UnknownNode(from.clone()));
            }
            if let Edge::Conditional { branches, .. } = edge {
                if branches.is_empty() {
                    return Err(GraphError::EmptyBranches(from.clone()));
                }
            }
            for target in edge.targets() {
                if let Target::Node(to) = target {
                    if !self.nodes.contains_key(to) {
                        return Err(GraphError::UnknownNode(to.clone()));
                    }
                }
            }
        }

        for id in &self.order {
            if !self.edges.contains_key(id) {
                return Err(GraphError::NoOutgoingEdge(id.clone()));
            }
        }

        let topology = WorkflowGraph::from_edges(&self.edges);
        let reachable = topology.reachable_from(&entry);
        for id in &self.order {
            if !reachable.contains(id) {
                tracing::warn!(graph = %self.name, node = %id, "node is unreachable from entry");
            }
        }

        Ok(CompiledGraph::new(
            self.name,
            entry,
            self.nodes,
            self.edges,
            topology,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::AgentError;
    use async_trait::async_trait;
    use std::time::Duration;

    #[derive(Default)]
    struct Trace(Vec<String>);

    impl GraphState for Trace {
        fn record_node(&mut self, name: &str, _elapsed: Duration) {
            self.0.push(name.to_string());
        }
    }

    struct Noop(&'static str);

    #[async_trait]
    impl Node<Trace> for Noop {
        fn name(&self) -> &str {
            self.0
        }

        async fn run(&self, _state: &mut Trace) -> Result<(), AgentError> {
            Ok(())
        }
    }

    #[test]
    fn test_build_without_entry_fails() {
        let result = GraphBuilder::<Trace>::new("t")
            .node(Noop("a"))
            .edge("a", END)
            .build();
        assert!(matches!(result, Err(GraphError::MissingEntry)));
    }

    #[test]
    fn test_build_with_unknown_target_fails() {
        let result = GraphBuilder::<Trace>::new("t")
            .node(Noop("a"))
            .entry("a")
            .edge("a", "b")
            .build();
        assert!(matches!(result, Err(GraphError::UnknownNode(n)) if n == "b"));
    }

    #[test]
    fn test_build_without_outgoing_edge_fails() {
        let result = GraphBuilder::<Trace>::new("t")
            .node(Noop("a"))
            .node(Noop("b"))
            .entry("a")
            .edge("a", "b")
            .build();
        assert!(matches!(result, Err(GraphError::NoOutgoingEdge(n)) if n == "b"));
    }

    #[test]
    fn test_duplicate_edge_fails() {
        let result = GraphBuilder::<Trace>::new("t")
            .node(Noop("a"))
            .entry("a")
            .edge("a", END)
            .edge("a", END)
            .build();
        assert!(matches!(result, Err(GraphError::DuplicateEdge(_))));
    }

    #[test]
    fn test_duplicate_node_fails() {
        let result = GraphBuilder::<Trace>::new("t")
            .node(Noop("a"))
            .node(Noop("a"))
            .entry("a")
            .edge("a", END)
            .build();
        assert!(matches!(result, Err(GraphError::DuplicateNode(_))));
    }

    #[test]
    fn test_empty_branches_fail() {
        let result = GraphBuilder::<Trace>::new("t")
            .node(Noop("a"))
            .entry("a")
            .conditional("a", |_| "x", &[])
            .build();
        assert!(matches!(result, Err(GraphError::EmptyBranches(_))));
    }
}
