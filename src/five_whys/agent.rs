//! Five Whys Agent
//!
//! 组装状态图并对外提供 analyze：
//!
//! ```text
//! entry -> why_question -> web_search -> cause_analysis -+-> validation -> decision -+-> why_question
//!                                            ^           |                          |
//!                                            | retry     v                          v
//!                                            +---- error_handling -> END    solution_generation
//!                                                                                   |
//!                                                                           synthesis -> END
//! ```

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::config::AgentSection;
use crate::core::{AgentError, RecoveryEngine};
use crate::five_whys::nodes::*;
use crate::five_whys::state::{FiveWhysResult, FiveWhysState};
use crate::llm::LlmClient;
use crate::tools::WebSearch;
use crate::workflow::{CompiledGraph, GraphBuilder, GraphError, RunConfig, END};

/// Five Whys 根因分析 Agent
pub struct FiveWhysAgent {
    graph: CompiledGraph<FiveWhysState>,
    settings: AgentSection,
}

impl FiveWhysAgent {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        search: Option<Arc<dyn WebSearch>>,
        settings: AgentSection,
    ) -> Result<Self, AgentError> {
        let ctx = Arc::new(NodeContext {
            llm,
            search,
            recovery: RecoveryEngine::new(),
            settings: settings.clone(),
        });
        let graph = build_graph(ctx)?;
        Ok(Self { graph, settings })
    }

    /// Mermaid 流程图
    pub fn graph_mermaid(&self) -> String {
        self.graph.to_mermaid()
    }

    /// 运行 Five Whys 分析
    pub async fn analyze(&self, problem: &str, max_whys: usize) -> Result<FiveWhysResult, AgentError> {
        self.analyze_with_cancel(problem, max_whys, CancellationToken::new())
            .await
    }

    /// 运行 Five Whys 分析，可通过 cancel 中途终止
    pub async fn analyze_with_cancel(
        &self,
        problem: &str,
        max_whys: usize,
        cancel: CancellationToken,
    ) -> Result<FiveWhysResult, AgentError> {
        if problem.trim().is_empty() {
            return Err(AgentError::InvalidInput("problem statement is empty".into()));
        }
        if max_whys == 0 {
            return Err(AgentError::InvalidInput("max_whys must be at least 1".into()));
        }

        let budget = step_budget(max_whys, self.settings.max_errors);
        let run = RunConfig::new(self.settings.recursion_limit.max(budget)).with_cancel(cancel);
        let start = Instant::now();
        tracing::info!(max_whys, recursion_limit = run.recursion_limit, "starting 5 Whys analysis");

        let mut state = self
            .graph
            .invoke(FiveWhysState::new(problem, max_whys), &run)
            .await
            .map_err(|e| match e {
                GraphError::Cancelled => AgentError::Cancelled,
                GraphError::NodeFailed { source, .. } => *source,
                other => AgentError::Graph(other),
            })?;
        state.processing_time = start.elapsed();

        tracing::info!(
            levels = state.why_chain.len(),
            stop_reason = ?state.stop_reason,
            errors = state.errors.len(),
            elapsed_ms = state.processing_time.as_millis() as u64,
            "5 Whys analysis finished"
        );
        Ok(state.into_result())
    }
}

/// 一次完整运行最多需要的节点步数：
/// entry + 每层 5 步（why_question..decision）+ solution/synthesis，
/// 每次错误多走 error_handling 与重试的 cause_analysis
pub(crate) fn step_budget(max_whys: usize, max_errors: usize) -> usize {
    3 + 5 * max_whys + 2 * (max_errors + 1)
}

fn build_graph(ctx: Arc<NodeContext>) -> Result<CompiledGraph<FiveWhysState>, GraphError> {
    GraphBuilder::new("five_whys")
        .node(EntryNode::new(ctx.clone()))
        .node(WhyQuestionNode)
        .node(WebSearchNode::new(ctx.clone()))
        .node(CauseAnalysisNode::new(ctx.clone()))
        .node(ValidationNode::new(ctx.clone()))
        .node(DecisionNode::new(ctx.clone()))
        .node(SolutionGenerationNode::new(ctx.clone()))
        .node(SynthesisNode::new(ctx.clone()))
        .node(ErrorHandlingNode::new(ctx))
        .entry(names::ENTRY)
        .edge(names::ENTRY, names::WHY_QUESTION)
        .edge(names::WHY_QUESTION, names::WEB_SEARCH)
        .edge(names::WEB_SEARCH, names::CAUSE_ANALYSIS)
        .conditional(
            names::CAUSE_ANALYSIS,
            route_after_cause_analysis,
            &[
                ("validation", names::VALIDATION),
                ("error_handling", names::ERROR_HANDLING),
            ],
        )
        .edge(names::VALIDATION, names::DECISION)
        .conditional(
            names::DECISION,
            route_after_decision,
            &[
                ("continue", names::WHY_QUESTION),
                ("solution_generation", names::SOLUTION_GENERATION),
            ],
        )
        .edge(names::SOLUTION_GENERATION, names::SYNTHESIS)
        .conditional(
            names::ERROR_HANDLING,
            route_after_error,
            &[("retry", names::CAUSE_ANALYSIS), ("end", END)],
        )
        .edge(names::SYNTHESIS, END)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;

    #[test]
    fn test_graph_builds_and_exports() {
        let agent = FiveWhysAgent::new(Arc::new(MockLlmClient), None, AgentSection::default()).unwrap();
        let mermaid = agent.graph_mermaid();
        assert!(mermaid.contains("__start__ --> entry"));
        assert!(mermaid.contains("decision -->|continue| why_question"));
        assert!(mermaid.contains("error_handling -->|end| __end__"));
    }

    #[test]
    fn test_step_budget_covers_full_run_with_retries() {
        // 5 层各 5 步 + entry/solution/synthesis + 4 次失败各 2 步
        assert_eq!(step_budget(5, 3), 36);
        assert!(step_budget(6, 3) > AgentSection::default().recursion_limit);
    }

    #[tokio::test]
    async fn test_empty_problem_rejected_before_graph() {
        let llm = Arc::new(crate::llm::ScriptedLlmClient::new());
        let agent = FiveWhysAgent::new(llm.clone(), None, AgentSection::default()).unwrap();
        let err = agent.analyze("   ", 3).await.unwrap_err();
        assert!(matches!(err, AgentError::InvalidInput(_)));
        assert_eq!(llm.calls_matching(""), 0);
    }

    #[tokio::test]
    async fn test_zero_whys_rejected() {
        let agent = FiveWhysAgent::new(Arc::new(MockLlmClient), None, AgentSection::default()).unwrap();
        let err = agent.analyze("anything", 0).await.unwrap_err();
        assert!(matches!(err, AgentError::InvalidInput(_)));
    }
}
