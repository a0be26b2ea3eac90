//! 各节点要求 LLM 返回的结构化输出
//!
//! 字段上的文档注释会进入 JSON Schema 的 description，直接影响模型理解。

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The clarified problem statement.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ClarificationOutput {
    /// The problem statement rephrased to be specific and actionable
    pub clarified_problem: String,
    /// Assumptions that need to be validated
    #[serde(default)]
    pub assumptions: Vec<String>,
    /// Evidence or data that would help the analysis
    #[serde(default)]
    pub evidence_needed: Vec<String>,
}

/// Output of the cause analysis step.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CauseAnalysisOutput {
    /// The main cause that answers the why question
    pub primary_cause: String,
    /// Evidence or reasoning supporting this cause
    #[serde(default)]
    pub evidence: String,
    /// Alternative causes
    #[serde(default)]
    pub alternative_causes: Vec<String>,
    /// How deep this cause is (surface/intermediate/deep)
    #[serde(default)]
    pub depth_assessment: String,
    /// 0.0 to 1.0
    #[serde(default = "default_confidence")]
    pub confidence_level: f64,
    /// How actionable this cause is (low/medium/high)
    #[serde(default)]
    pub actionability: String,
}

fn default_confidence() -> f64 {
    0.5
}

/// Output of the chain validation step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationOutput {
    /// 0.0 to 1.0
    #[serde(default)]
    pub chain_validity: f64,
    /// 0.0 to 1.0
    #[serde(default)]
    pub depth_adequacy: f64,
    /// 0.0 to 1.0
    #[serde(default)]
    pub evidence_strength: f64,
    /// 0.0 to 1.0
    #[serde(default)]
    pub actionability: f64,
    /// Issues found in the chain
    #[serde(default)]
    pub issues_found: Vec<String>,
    /// Improvement suggestions
    #[serde(default)]
    pub improvement_suggestions: Vec<String>,
    /// Is the root cause likely?
    pub is_root_cause_likely: bool,
    /// Recommended action (continue, dig_deeper, explore_alternatives)
    #[serde(default)]
    pub recommended_action: String,
}

/// Output of the solution generation step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SolutionOutput {
    /// Immediate actions to address the root cause
    pub immediate_actions: Vec<String>,
    /// Preventive measures to avoid recurrence
    #[serde(default)]
    pub preventive_measures: Vec<String>,
    /// Monitoring strategies to track effectiveness
    #[serde(default)]
    pub monitoring_strategies: Vec<String>,
    /// Alternative approaches if the primary solution fails
    #[serde(default)]
    pub alternative_approaches: Vec<String>,
    /// Success metrics
    #[serde(default)]
    pub success_metrics: Vec<String>,
    /// Suggested implementation timeline
    #[serde(default)]
    pub timeline: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::parse_structured;

    #[test]
    fn test_cause_analysis_defaults_confidence() {
        let out: CauseAnalysisOutput =
            parse_structured(r#"{"primary_cause": "no monitoring"}"#).unwrap();
        assert_eq!(out.primary_cause, "no monitoring");
        assert!((out.confidence_level - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_validation_requires_root_cause_flag() {
        assert!(parse_structured::<ValidationOutput>(r#"{"chain_validity": 0.9}"#).is_err());
    }
}
