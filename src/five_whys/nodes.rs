//! Five Whys 图节点
//!
//! 每个节点持有共享的 NodeContext（LLM、搜索后端、恢复引擎、流程参数）。
//! LLM 失败属于可恢复错误：写入 state.errors，由路由决定重试或收尾；节点本身只在不变量被破坏时返回 Err。

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::AgentSection;
use crate::core::{AgentError, RecoveryAction, RecoveryEngine};
use crate::five_whys::outputs::{
    CauseAnalysisOutput, ClarificationOutput, SolutionOutput, ValidationOutput,
};
use crate::five_whys::prompts::*;
use crate::five_whys::state::{FiveWhysState, StopReason, WhyStep};
use crate::llm::{complete_structured, system_and_user, LlmClient};
use crate::tools::{WebSearch, WebSearchOutput};
use crate::workflow::Node;

/// 节点名
pub mod names {
    pub const ENTRY: &str = "entry";
    pub const WHY_QUESTION: &str = "why_question";
    pub const WEB_SEARCH: &str = "web_search_cause_analysis";
    pub const CAUSE_ANALYSIS: &str = "cause_analysis";
    pub const VALIDATION: &str = "validation";
    pub const DECISION: &str = "decision";
    pub const SOLUTION_GENERATION: &str = "solution_generation";
    pub const SYNTHESIS: &str = "synthesis";
    pub const ERROR_HANDLING: &str = "error_handling";
}

/// 节点共享依赖
pub struct NodeContext {
    pub llm: Arc<dyn LlmClient>,
    pub search: Option<Arc<dyn WebSearch>>,
    pub recovery: RecoveryEngine,
    pub settings: AgentSection,
}

macro_rules! context_node {
    ($ty:ident) => {
        pub struct $ty {
            ctx: Arc<NodeContext>,
        }

        impl $ty {
            pub fn new(ctx: Arc<NodeContext>) -> Self {
                Self { ctx }
            }
        }
    };
}

context_node!(EntryNode);
context_node!(WebSearchNode);
context_node!(CauseAnalysisNode);
context_node!(ValidationNode);
context_node!(DecisionNode);
context_node!(SolutionGenerationNode);
context_node!(SynthesisNode);
context_node!(ErrorHandlingNode);

/// 追问生成不依赖外部资源
pub struct WhyQuestionNode;

#[async_trait]
impl Node<FiveWhysState> for EntryNode {
    fn name(&self) -> &str {
        names::ENTRY
    }

    /// 澄清问题陈述；失败时保留原始问题继续
    async fn run(&self, state: &mut FiveWhysState) -> Result<(), AgentError> {
        if state.problem_statement.trim().is_empty() {
            return Err(AgentError::InvalidInput("problem statement is empty".into()));
        }

        let messages = system_and_user(
            CLARIFICATION_PROMPT,
            format!("Problem: {}", state.problem_statement),
        );
        match complete_structured::<ClarificationOutput>(self.ctx.llm.as_ref(), &messages, None)
            .await
        {
            Ok(clarification) => {
                if !clarification.clarified_problem.trim().is_empty() {
                    state.problem_statement = clarification.clarified_problem;
                }
                state.assumptions_made = clarification.assumptions;
                state.evidence_needed = clarification.evidence_needed;
            }
            Err(e) => {
                tracing::warn!(error = %e, "clarification failed, keeping original problem statement");
            }
        }

        state.current_focus = state.problem_statement.clone();
        Ok(())
    }
}

#[async_trait]
impl Node<FiveWhysState> for WhyQuestionNode {
    fn name(&self) -> &str {
        names::WHY_QUESTION
    }

    async fn run(&self, state: &mut FiveWhysState) -> Result<(), AgentError> {
        let question = if state.current_why_level == 0 || state.why_answers.is_empty() {
            format_why_question_prompt(state)
        } else {
            format_why_question_chain_prompt(state)
        };
        state.why_questions.push(question);
        state.current_why_level += 1;
        tracing::info!(level = state.current_why_level, "why question generated");
        Ok(())
    }
}

#[async_trait]
impl Node<FiveWhysState> for WebSearchNode {
    fn name(&self) -> &str {
        names::WEB_SEARCH
    }

    /// 以最新追问为查询词；未启用或失败时结果为空，不影响后续分析
    async fn run(&self, state: &mut FiveWhysState) -> Result<(), AgentError> {
        let query = state.current_question().unwrap_or_default().to_string();
        state.web_search_results = WebSearchOutput::default();

        let search = match (&self.ctx.search, self.ctx.settings.use_web_search) {
            (Some(search), true) => search,
            _ => {
                tracing::debug!("web search disabled, skipping");
                return Ok(());
            }
        };

        match search.search(&query).await {
            Ok(results) => {
                tracing::info!(results = results.search_results.len(), "web search done");
                state.web_search_results = results;
            }
            Err(e) => {
                tracing::warn!(error = %e, "web search failed, continuing without results");
                state.web_search_results.search_query = query;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Node<FiveWhysState> for CauseAnalysisNode {
    fn name(&self) -> &str {
        names::CAUSE_ANALYSIS
    }

    async fn run(&self, state: &mut FiveWhysState) -> Result<(), AgentError> {
        let hint = match state.pending_error.take() {
            Some(RecoveryAction::RetryWithPrompt(hint)) => Some(hint),
            _ => None,
        };
        let question = state
            .current_question()
            .ok_or_else(|| AgentError::InvalidInput("cause analysis without a why question".into()))?
            .to_string();

        let messages = system_and_user(format_cause_analysis_prompt(state, &question), question.clone());
        let result = complete_structured::<CauseAnalysisOutput>(
            self.ctx.llm.as_ref(),
            &messages,
            hint.as_deref(),
        )
        .await;

        match result {
            Ok(analysis) => {
                let primary_cause = if analysis.primary_cause.trim().is_empty() {
                    "Unknown cause".to_string()
                } else {
                    analysis.primary_cause
                };
                state.why_answers.push(primary_cause.clone());
                state.why_chain.push(WhyStep {
                    question,
                    answer: primary_cause.clone(),
                    evidence: analysis.evidence.clone(),
                    alternatives: analysis.alternative_causes,
                    level: state.current_why_level,
                });
                state.depth_scores.push(analysis.confidence_level.clamp(0.0, 1.0));
                if !analysis.evidence.trim().is_empty() {
                    state.evidence_gathered.push(analysis.evidence);
                }
                state.current_focus = primary_cause;
            }
            Err(e) => {
                let action = self.ctx.recovery.handle(&e);
                tracing::warn!(error = %e, action = ?action, "cause analysis failed");
                state.errors.push(format!("Failed to parse cause analysis response: {e}"));
                state.pending_error = Some(action);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Node<FiveWhysState> for ValidationNode {
    fn name(&self) -> &str {
        names::VALIDATION
    }

    async fn run(&self, state: &mut FiveWhysState) -> Result<(), AgentError> {
        let messages = system_and_user(
            format_validation_prompt(state),
            "Please validate the current 5 Whys chain.",
        );
        match complete_structured::<ValidationOutput>(self.ctx.llm.as_ref(), &messages, None).await {
            Ok(validation) => {
                state
                    .refinement_suggestions
                    .extend(validation.improvement_suggestions.iter().cloned());
                if validation.chain_validity > 0.0 {
                    state.relevance_scores.push(validation.chain_validity);
                }
                if validation.actionability > 0.0 {
                    state.actionability_scores.push(validation.actionability);
                }
                state.validation_results.push(validation);
            }
            Err(e) => {
                tracing::warn!(error = %e, "validation failed");
                state.errors.push(format!("Failed to parse validation response: {e}"));
            }
        }
        Ok(())
    }
}

/// 判断是否继续追问；返回 None 表示继续
pub fn decide_stop(state: &FiveWhysState, low_confidence_threshold: f64) -> Option<StopReason> {
    if state.current_why_level >= state.max_why_levels {
        return Some(StopReason::MaxWhysReached);
    }
    if state
        .validation_results
        .last()
        .map(|v| v.is_root_cause_likely)
        .unwrap_or(false)
    {
        return Some(StopReason::RootCauseIdentified);
    }
    if state.depth_scores.len() >= 2 {
        let recent = &state.depth_scores[state.depth_scores.len() - 2..];
        if recent.iter().all(|s| *s < low_confidence_threshold) {
            return Some(StopReason::InsufficientDepth);
        }
    }
    None
}

#[async_trait]
impl Node<FiveWhysState> for DecisionNode {
    fn name(&self) -> &str {
        names::DECISION
    }

    async fn run(&self, state: &mut FiveWhysState) -> Result<(), AgentError> {
        let stop = decide_stop(state, self.ctx.settings.low_confidence_threshold);
        state.should_continue = stop.is_none();
        state.stop_reason = stop;
        if let Some(reason) = stop {
            tracing::info!(level = state.current_why_level, reason = %reason, "stop asking why");
        }
        Ok(())
    }
}

#[async_trait]
impl Node<FiveWhysState> for SolutionGenerationNode {
    fn name(&self) -> &str {
        names::SOLUTION_GENERATION
    }

    async fn run(&self, state: &mut FiveWhysState) -> Result<(), AgentError> {
        let messages = system_and_user(
            format_solution_prompt(state),
            "Generate solutions based on the 5 Whys analysis.",
        );
        match complete_structured::<SolutionOutput>(self.ctx.llm.as_ref(), &messages, None).await {
            Ok(solutions) => {
                state.potential_solutions = solutions.immediate_actions.clone();
                state.recommended_actions = solutions.preventive_measures.clone();
                state.solution_details = Some(solutions);
            }
            Err(e) => {
                tracing::warn!(error = %e, "solution generation failed");
                state.errors.push(format!("Failed to parse solution response: {e}"));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Node<FiveWhysState> for SynthesisNode {
    fn name(&self) -> &str {
        names::SYNTHESIS
    }

    /// 最后一层答案即根因；报告由 LLM 生成，失败时用本地模板
    async fn run(&self, state: &mut FiveWhysState) -> Result<(), AgentError> {
        if let Some(last) = state.why_chain.last() {
            state.final_root_cause = last.answer.clone();
        }

        let messages = system_and_user(
            format_report_prompt(state),
            "Generate the final 5 Whys analysis report.",
        );
        match self.ctx.llm.complete(&messages).await {
            Ok(report) if !report.trim().is_empty() => state.final_report = report,
            Ok(_) => state.final_report = render_fallback_report(state),
            Err(e) => {
                tracing::warn!(error = %e, "report generation failed, rendering locally");
                state.errors.push(format!("Report generation failed: {e}"));
                state.final_report = render_fallback_report(state);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Node<FiveWhysState> for ErrorHandlingNode {
    fn name(&self) -> &str {
        names::ERROR_HANDLING
    }

    async fn run(&self, state: &mut FiveWhysState) -> Result<(), AgentError> {
        let abort = matches!(state.pending_error, Some(RecoveryAction::Abort));
        if abort || state.errors.len() > self.ctx.settings.max_errors {
            state.should_continue = false;
            state.stop_reason = Some(StopReason::TooManyErrors);
            tracing::error!(errors = state.errors.len(), abort, "giving up on analysis");
        } else {
            tracing::info!(errors = state.errors.len(), "retrying cause analysis");
        }
        Ok(())
    }
}

/// cause_analysis 之后：有待处理错误走 error_handling
pub fn route_after_cause_analysis(state: &FiveWhysState) -> &'static str {
    if state.pending_error.is_some() {
        "error_handling"
    } else {
        "validation"
    }
}

pub fn route_after_decision(state: &FiveWhysState) -> &'static str {
    if state.should_continue {
        "continue"
    } else {
        "solution_generation"
    }
}

pub fn route_after_error(state: &FiveWhysState) -> &'static str {
    if state.should_continue {
        "retry"
    } else {
        "end"
    }
}
