//! 共情地图 prompt

use crate::empathy::state::EmpathyMappingState;

pub const CLARIFICATION_PROMPT: &str = "You are a helpful assistant that will clarify the problem statement for support ticket analysis.\n\
You will be given a problem statement and you will need to clarify it.";

pub const SUPPORT_TICKET_ANALYSIS_PROMPT: &str = "You are an empathy mapping specialist analyzing support tickets to understand user needs, pains, and goals.\n\
Directly analyze the provided support ticket content to extract user goals, pains, and key quotes.\n\n\
Focus on:\n\
- What users are saying (Say quadrant)\n\
- What users are thinking (Think quadrant)\n\
- What users are doing (Do quadrant)\n\
- How users are feeling (Feel quadrant)\n\n\
Process each ticket directly without needing to search for similar content.\n\
Extract key insights and identify latent needs from the support ticket data.";

pub fn format_clarification_prompt(problem: &str) -> String {
    format!("The problem statement is: {}", problem)
}

/// 合成阶段的用户消息：问题、本地分析摘要与脱敏后的工单正文
///
/// 只使用 redacted_version，未脱敏的工单不会出现在这里。
pub fn format_ticket_analysis_prompt(state: &EmpathyMappingState) -> String {
    let mut out = format!("Problem: {}\n\n", state.focus());

    if !state.topic_analyses.is_empty() {
        out.push_str("Topics detected:\n");
        for topic in &state.topic_analyses {
            out.push_str(&format!(
                "- {} ({} tickets, {:?})\n",
                topic.topic_name, topic.frequency, topic.sentiment.sentiment_type
            ));
        }
        out.push('\n');
    }

    out.push_str("Support tickets:\n");
    for ticket in state.eligible_tickets() {
        let Some(doc) = &ticket.redacted_version else {
            continue;
        };
        out.push_str(&format!(
            "\n[{}] category={} priority={}\n{}\n",
            ticket.ticket_id, ticket.category, ticket.priority, doc.redacted_content
        ));
    }
    out
}
