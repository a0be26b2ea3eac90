//! 共情地图 Agent
//!
//! ```text
//! clarify -> ingest -> consent -+-> redact -> analyze -> synthesize -> summarize -> END
//!                               |                                        ^
//!                               +---------- (no eligible tickets) -------+
//! ```

use std::sync::Arc;
use std::time::Instant;

use crate::core::AgentError;
use crate::empathy::consent::EMPATHY_MAPPING_PURPOSE;
use crate::empathy::entities::{EmpathyMapResponse, SupportTicket};
use crate::empathy::nodes::*;
use crate::empathy::state::EmpathyMappingState;
use crate::empathy::tools::TicketSource;
use crate::llm::LlmClient;
use crate::workflow::{CompiledGraph, GraphBuilder, GraphError, RunConfig, END};

const RECURSION_LIMIT: usize = 16;

pub struct EmpathyMappingAgent {
    graph: CompiledGraph<EmpathyMappingState>,
}

impl EmpathyMappingAgent {
    pub fn new(llm: Arc<dyn LlmClient>) -> Result<Self, AgentError> {
        Self::with_purpose(llm, EMPATHY_MAPPING_PURPOSE)
    }

    /// 指定工单授权必须包含的用途
    pub fn with_purpose(llm: Arc<dyn LlmClient>, purpose: &str) -> Result<Self, AgentError> {
        let ctx = Arc::new(EmpathyContext {
            llm,
            purpose: purpose.to_string(),
        });
        Ok(Self {
            graph: build_graph(ctx)?,
        })
    }

    pub fn graph_mermaid(&self) -> String {
        self.graph.to_mermaid()
    }

    /// 从工单生成共情地图
    ///
    /// 单张工单的问题（无授权、重复、空内容）记为 warning；只有流程本身失败才返回 Err。
    pub async fn run(
        &self,
        problem: &str,
        tickets: Vec<SupportTicket>,
    ) -> Result<EmpathyMapResponse, AgentError> {
        let start = Instant::now();
        tracing::info!(tickets = tickets.len(), "starting empathy mapping");

        let state = self
            .graph
            .invoke(
                EmpathyMappingState::new(problem, tickets),
                &RunConfig::new(RECURSION_LIMIT),
            )
            .await
            .map_err(|e| match e {
                GraphError::Cancelled => AgentError::Cancelled,
                GraphError::NodeFailed { source, .. } => *source,
                other => AgentError::Graph(other),
            })?;

        let processing_time = start.elapsed().as_secs_f64();
        tracing::info!(
            maps = state.empathy_maps.len(),
            warnings = state.warnings.len(),
            elapsed_ms = (processing_time * 1000.0) as u64,
            "empathy mapping finished"
        );

        let empathy_map = state.empathy_map().cloned();
        Ok(EmpathyMapResponse {
            success: empathy_map.is_some() && state.errors.is_empty(),
            empathy_map,
            errors: state.errors,
            warnings: state.warnings,
            processing_time,
            summary: state.summary,
            document: state.document,
        })
    }

    /// 先从工单来源拉取，再运行
    pub async fn run_from_source(
        &self,
        problem: &str,
        source: &dyn TicketSource,
        ticket_ids: &[String],
    ) -> Result<EmpathyMapResponse, AgentError> {
        let tickets = source.fetch(ticket_ids).await?;
        self.run(problem, tickets).await
    }
}

fn build_graph(
    ctx: Arc<EmpathyContext>,
) -> Result<CompiledGraph<EmpathyMappingState>, GraphError> {
    GraphBuilder::new("empathy_mapping")
        .node(ClarifyNode::new(ctx.clone()))
        .node(IngestNode)
        .node(ConsentNode::new(ctx.clone()))
        .node(RedactNode)
        .node(AnalyzeNode)
        .node(SynthesizeNode::new(ctx))
        .node(SummarizeNode)
        .entry(names::CLARIFY)
        .edge(names::CLARIFY, names::INGEST)
        .edge(names::INGEST, names::CONSENT)
        .conditional(
            names::CONSENT,
            route_after_consent,
            &[("redact", names::REDACT), ("summarize", names::SUMMARIZE)],
        )
        .edge(names::REDACT, names::ANALYZE)
        .edge(names::ANALYZE, names::SYNTHESIZE)
        .edge(names::SYNTHESIZE, names::SUMMARIZE)
        .edge(names::SUMMARIZE, END)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;

    #[test]
    fn test_graph_shape() {
        let agent = EmpathyMappingAgent::new(Arc::new(MockLlmClient)).unwrap();
        let mermaid = agent.graph_mermaid();
        assert!(mermaid.contains("__start__ --> clarify"));
        assert!(mermaid.contains("consent -->|summarize| summarize"));
        assert!(mermaid.contains("summarize --> __end__"));
    }

    #[tokio::test]
    async fn test_empty_problem_rejected() {
        let agent = EmpathyMappingAgent::new(Arc::new(MockLlmClient)).unwrap();
        let err = agent.run("   ", Vec::new()).await.unwrap_err();
        assert!(matches!(err, AgentError::InvalidInput(_)));
    }
}
