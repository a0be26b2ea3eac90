//! Five Whys 各节点的 prompt 模板

use crate::five_whys::state::FiveWhysState;

pub const CLARIFICATION_PROMPT: &str = "\
You are starting a 5 Whys root cause analysis. The user has provided a problem statement.
Your task is to:
1. Clarify and rephrase the problem statement to be specific and actionable
2. Identify any assumptions that need to be validated
3. Suggest what evidence or data might be helpful";

/// 第一层追问：直接问问题为什么发生
pub fn format_why_question_prompt(state: &FiveWhysState) -> String {
    format!("Why does this problem occur: {}?", state.problem_statement)
}

/// 后续追问：针对上一层的原因继续问为什么
pub fn format_why_question_chain_prompt(state: &FiveWhysState) -> String {
    let current_cause = state
        .why_answers
        .last()
        .map(String::as_str)
        .unwrap_or(state.current_focus.as_str());
    format!(
        "The original problem is {problem}.\n\
        The last potential cause is identified as: {current_cause}.\n\n\
        Respond with a single question on why the last potential cause occurs.",
        problem = state.problem_statement,
    )
}

pub fn format_cause_analysis_prompt(state: &FiveWhysState, current_question: &str) -> String {
    let mut prompt = format!(
        "You are conducting a 5 Whys root cause analysis.\n\n\
        Problem Context: {problem}\n\
        Previous Why Chain: {chain}\n\
        Current Question: {current_question}\n",
        problem = state.problem_statement,
        chain = state.why_chain_json(),
    );

    if !state.web_search_results.is_empty() {
        prompt.push_str("\nWeb Research (may be incomplete, cite it when relevant):\n");
        for (i, result) in state.web_search_results.search_results.iter().enumerate() {
            prompt.push_str(&format!("[{}] {}\n", i + 1, result));
        }
    }

    prompt.push_str(
        "\nYour task is to:\n\
        1. Identify the most likely cause that answers the current question\n\
        2. Provide evidence or reasoning for this cause\n\
        3. Consider if there are alternative causes\n\
        4. Assess how deep this cause goes (is it a symptom or root cause?)",
    );
    prompt
}

pub fn format_validation_prompt(state: &FiveWhysState) -> String {
    format!(
        "You are validating a 5 Whys analysis chain. Review the current chain and assess:\n\n\
        Problem: {problem}\n\
        Current Why Chain: {chain}\n\n\
        Validate:\n\
        1. Logical consistency - does each why logically follow from the previous?\n\
        2. Depth adequacy - are we getting to root causes or stuck on symptoms?\n\
        3. Evidence strength - is there sufficient evidence for each cause?\n\
        4. Actionability - can we act on the identified causes?",
        problem = state.problem_statement,
        chain = state.why_chain_json(),
    )
}

pub fn format_solution_prompt(state: &FiveWhysState) -> String {
    format!(
        "Based on the 5 Whys analysis, generate actionable solutions.\n\n\
        Problem: {problem}\n\
        Root Cause Chain: {chain}\n\n\
        Generate:\n\
        1. Immediate actions to address the root cause\n\
        2. Preventive measures to avoid recurrence\n\
        3. Monitoring strategies to track effectiveness\n\
        4. Alternative approaches if the primary solution fails",
        problem = state.problem_statement,
        chain = state.why_chain_json(),
    )
}

pub fn format_report_prompt(state: &FiveWhysState) -> String {
    let solutions = state
        .solution_details
        .as_ref()
        .and_then(|s| serde_json::to_string_pretty(s).ok())
        .unwrap_or_else(|| "{}".to_string());
    format!(
        "Create a comprehensive 5 Whys analysis report.\n\n\
        Problem: {problem}\n\
        Analysis Chain: {chain}\n\
        Solutions: {solutions}\n\n\
        Create a structured report with:\n\
        1. Executive summary\n\
        2. Problem analysis\n\
        3. Root cause identification\n\
        4. Recommended actions\n\
        5. Implementation plan",
        problem = state.problem_statement,
        chain = state.why_chain_json(),
    )
}

/// LLM 报告失败时的本地 Markdown 报告
pub fn render_fallback_report(state: &FiveWhysState) -> String {
    let mut out = format!("# 5 Whys Analysis\n\n## Problem\n\n{}\n\n## Why Chain\n\n", state.problem_statement);
    if state.why_chain.is_empty() {
        out.push_str("_No causes were identified._\n");
    }
    for step in &state.why_chain {
        out.push_str(&format!("{}. **{}**\n   - {}\n", step.level, step.question, step.answer));
        if !step.evidence.is_empty() {
            out.push_str(&format!("   - Evidence: {}\n", step.evidence));
        }
    }
    if !state.final_root_cause.is_empty() {
        out.push_str(&format!("\n## Root Cause\n\n{}\n", state.final_root_cause));
    }
    if !state.potential_solutions.is_empty() {
        out.push_str("\n## Immediate Actions\n\n");
        for s in &state.potential_solutions {
            out.push_str(&format!("- {}\n", s));
        }
    }
    if !state.recommended_actions.is_empty() {
        out.push_str("\n## Preventive Measures\n\n");
        for s in &state.recommended_actions {
            out.push_str(&format!("- {}\n", s));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::five_whys::state::WhyStep;

    fn state_with_chain() -> FiveWhysState {
        let mut state = FiveWhysState::new("Deploys fail on Fridays", 5);
        state.why_answers.push("The CI cache expires".to_string());
        state.why_chain.push(WhyStep {
            question: "Why do deploys fail?".into(),
            answer: "The CI cache expires".into(),
            evidence: "build logs".into(),
            alternatives: vec![],
            level: 1,
        });
        state
    }

    #[test]
    fn test_chain_prompt_uses_last_answer() {
        let prompt = format_why_question_chain_prompt(&state_with_chain());
        assert!(prompt.contains("Deploys fail on Fridays"));
        assert!(prompt.contains("The CI cache expires"));
    }

    #[test]
    fn test_cause_prompt_includes_web_research_only_when_present() {
        let mut state = state_with_chain();
        let prompt = format_cause_analysis_prompt(&state, "Why does the cache expire?");
        assert!(!prompt.contains("Web Research"));

        state.web_search_results.search_results = vec!["Cache TTL defaults to 7 days".into()];
        let prompt = format_cause_analysis_prompt(&state, "Why does the cache expire?");
        assert!(prompt.contains("[1] Cache TTL defaults to 7 days"));
    }

    #[test]
    fn test_fallback_report_lists_chain() {
        let mut state = state_with_chain();
        state.final_root_cause = "The CI cache expires".into();
        let report = render_fallback_report(&state);
        assert!(report.contains("## Root Cause"));
        assert!(report.contains("Evidence: build logs"));
    }
}
