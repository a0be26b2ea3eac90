//! 共情地图流程中要求 LLM 返回的结构化输出

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The clarified problem statement for support ticket analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ClarificationOutput {
    pub clarified_problem: String,
}

/// An empathy map synthesized from support tickets.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct EmpathyMapOutput {
    /// What users are saying
    #[serde(default)]
    pub say: Vec<String>,
    /// What users are thinking
    #[serde(default)]
    pub think: Vec<String>,
    /// What users are doing
    #[serde(default, rename = "do")]
    pub do_: Vec<String>,
    /// How users are feeling
    #[serde(default)]
    pub feel: Vec<String>,
    #[serde(default)]
    pub goals: Vec<String>,
    #[serde(default)]
    pub pains: Vec<String>,
    #[serde(default)]
    pub gains: Vec<String>,
    /// Needs users do not state explicitly
    #[serde(default)]
    pub latent_needs: Vec<String>,
    /// Verbatim quotes taken from the tickets
    #[serde(default)]
    pub key_quotes: Vec<String>,
    /// 0.0 to 1.0
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

fn default_confidence() -> f64 {
    0.5
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::parse_structured;

    #[test]
    fn test_empathy_map_output_accepts_do_keyword() {
        let json = r#"{"say": ["I can't log in"], "do": ["Retries password reset"], "pains": ["locked out"]}"#;
        let out: EmpathyMapOutput = parse_structured(json).unwrap();
        assert_eq!(out.do_, vec!["Retries password reset".to_string()]);
        assert!(out.think.is_empty());
        assert_eq!(out.confidence, 0.5);
    }
}
