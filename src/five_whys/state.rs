//! Five Whys 分析状态
//!
//! 图中所有节点共享同一份 FiveWhysState；字段按用途分组：问题、追问链、搜索、质量分、校验、方案、控制、调试。

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::RecoveryAction;
use crate::five_whys::outputs::{SolutionOutput, ValidationOutput};
use crate::tools::WebSearchOutput;
use crate::workflow::GraphState;

/// 追问链中的一环
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhyStep {
    pub question: String,
    pub answer: String,
    pub evidence: String,
    pub alternatives: Vec<String>,
    pub level: usize,
}

/// 停止追问的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    MaxWhysReached,
    RootCauseIdentified,
    InsufficientDepth,
    TooManyErrors,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopReason::MaxWhysReached => "max_whys_reached",
            StopReason::RootCauseIdentified => "root_cause_identified",
            StopReason::InsufficientDepth => "insufficient_depth",
            StopReason::TooManyErrors => "too_many_errors",
        };
        f.write_str(s)
    }
}

/// Five Whys 分析的完整状态
#[derive(Debug, Clone)]
pub struct FiveWhysState {
    // 问题
    pub problem_statement: String,
    pub current_focus: String,

    // 追问链
    pub current_why_level: usize,
    pub max_why_levels: usize,
    pub why_questions: Vec<String>,
    pub why_answers: Vec<String>,
    pub why_chain: Vec<WhyStep>,

    // 网页搜索
    pub web_search_results: WebSearchOutput,

    // 分析要素
    pub assumptions_made: Vec<String>,
    pub evidence_needed: Vec<String>,
    pub evidence_gathered: Vec<String>,

    // 质量分
    pub depth_scores: Vec<f64>,
    pub relevance_scores: Vec<f64>,
    pub actionability_scores: Vec<f64>,

    // 校验与改进
    pub validation_results: Vec<ValidationOutput>,
    pub refinement_suggestions: Vec<String>,

    // 方案
    pub potential_solutions: Vec<String>,
    pub recommended_actions: Vec<String>,
    pub solution_details: Option<SolutionOutput>,

    // 结果
    pub final_root_cause: String,
    pub final_report: String,

    // 控制
    pub should_continue: bool,
    pub stop_reason: Option<StopReason>,
    /// 最近一次原因分析失败后的恢复动作；None 表示无待处理错误
    pub pending_error: Option<RecoveryAction>,

    // 调试与监控
    pub processing_time: Duration,
    pub node_history: Vec<String>,

    pub errors: Vec<String>,
}

impl FiveWhysState {
    pub fn new(problem: impl Into<String>, max_why_levels: usize) -> Self {
        Self {
            problem_statement: problem.into(),
            current_focus: String::new(),
            current_why_level: 0,
            max_why_levels,
            why_questions: Vec::new(),
            why_answers: Vec::new(),
            why_chain: Vec::new(),
            web_search_results: WebSearchOutput::default(),
            assumptions_made: Vec::new(),
            evidence_needed: Vec::new(),
            evidence_gathered: Vec::new(),
            depth_scores: Vec::new(),
            relevance_scores: Vec::new(),
            actionability_scores: Vec::new(),
            validation_results: Vec::new(),
            refinement_suggestions: Vec::new(),
            potential_solutions: Vec::new(),
            recommended_actions: Vec::new(),
            solution_details: None,
            final_root_cause: String::new(),
            final_report: String::new(),
            should_continue: true,
            stop_reason: None,
            pending_error: None,
            processing_time: Duration::ZERO,
            node_history: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// 当前（最新）的追问
    pub fn current_question(&self) -> Option<&str> {
        self.why_questions.last().map(String::as_str)
    }

    /// 追问链的 JSON 表示（拼入 prompt）
    pub fn why_chain_json(&self) -> String {
        serde_json::to_string_pretty(&self.why_chain).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn into_result(self) -> FiveWhysResult {
        FiveWhysResult {
            problem: self.problem_statement,
            root_cause: self.final_root_cause,
            why_chain: self.why_chain,
            solutions: self.potential_solutions,
            recommended_actions: self.recommended_actions,
            report: self.final_report,
            processing_time_secs: self.processing_time.as_secs_f64(),
            stop_reason: self.stop_reason,
            errors: self.errors,
            node_history: self.node_history,
        }
    }
}

impl GraphState for FiveWhysState {
    fn record_node(&mut self, name: &str, _elapsed: Duration) {
        self.node_history.push(name.to_string());
    }
}

/// 对外返回的分析结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiveWhysResult {
    pub problem: String,
    pub root_cause: String,
    pub why_chain: Vec<WhyStep>,
    pub solutions: Vec<String>,
    pub recommended_actions: Vec<String>,
    pub report: String,
    pub processing_time_secs: f64,
    pub stop_reason: Option<StopReason>,
    pub errors: Vec<String>,
    pub node_history: Vec<String>,
}
