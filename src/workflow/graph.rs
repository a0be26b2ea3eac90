//! 工作流拓扑
//!
//! 使用邻接表描述节点之间的跳转，支持可达性分析与 Mermaid 导出

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use crate::workflow::types::*;

/// 工作流拓扑图（只含结构，不含节点实现）
#[derive(Debug, Clone, Default)]
pub struct WorkflowGraph {
    /// 邻接表：节点 -> (分支标签, 目标)；固定边的标签为空
    pub adjacency: BTreeMap<NodeId, Vec<(String, Target)>>,
}

impl WorkflowGraph {
    pub fn from_edges<S>(edges: &HashMap<NodeId, Edge<S>>) -> Self {
        let mut adjacency: BTreeMap<NodeId, Vec<(String, Target)>> = BTreeMap::new();
        for (from, edge) in edges {
            let out = match edge {
                Edge::Direct(t) => vec![(String::new(), t.clone())],
                Edge::Conditional { branches, .. } => branches
                    .iter()
                    .map(|(label, t)| (label.to_string(), t.clone()))
                    .collect(),
            };
            adjacency.insert(from.clone(), out);
        }
        Self { adjacency }
    }

    /// 从入口出发 BFS 可达的节点集合
    pub fn reachable_from(&self, entry: &str) -> HashSet<NodeId> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([entry.to_string()]);
        while let Some(node) = queue.pop_front() {
            if !seen.insert(node.clone()) {
                continue;
            }
            if let Some(out) = self.adjacency.get(&node) {
                for (_, target) in out {
                    if let Target::Node(next) = target {
                        queue.push_back(next.clone());
                    }
                }
            }
        }
        seen
    }

    /// 导出 Mermaid flowchart，便于在文档或终端中查看流程
    pub fn to_mermaid(&self, entry: &str) -> String {
        let mut out = String::from("flowchart TD\n");
        out.push_str(&format!("    __start__ --> {entry}\n"));
        for (from, targets) in &self.adjacency {
            for (label, target) in targets {
                let to = match target {
                    Target::Node(n) => n.as_str(),
                    Target::End => END,
                };
                if label.is_empty() {
                    out.push_str(&format!("    {from} --> {to}\n"));
                } else {
                    out.push_str(&format!("    {from} -->|{label}| {to}\n"));
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn edges() -> HashMap<NodeId, Edge<()>> {
        let mut edges = HashMap::new();
        edges.insert("a".to_string(), Edge::Direct(Target::Node("b".into())));
        edges.insert(
            "b".to_string(),
            Edge::Conditional {
                router: Arc::new(|_: &()| "done"),
                branches: vec![("again", Target::Node("a".into())), ("done", Target::End)],
            },
        );
        edges.insert("orphan".to_string(), Edge::Direct(Target::End));
        edges
    }

    #[test]
    fn test_reachable_skips_orphans() {
        let graph = WorkflowGraph::from_edges(&edges());
        let reachable = graph.reachable_from("a");
        assert!(reachable.contains("a"));
        assert!(reachable.contains("b"));
        assert!(!reachable.contains("orphan"));
    }

    #[test]
    fn test_mermaid_has_labels() {
        let graph = WorkflowGraph::from_edges(&edges());
        let mermaid = graph.to_mermaid("a");
        assert!(mermaid.contains("__start__ --> a"));
        assert!(mermaid.contains("b -->|again| a"));
        assert!(mermaid.contains("b -->|done| __end__"));
    }
}
