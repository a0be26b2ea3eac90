//! 共情地图图节点
//!
//! 工单在进入 LLM 之前必须依次通过同意校验与 PII 脱敏；合成失败时退回本地分析结果。

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::core::AgentError;
use crate::empathy::consent::validate_ticket;
use crate::empathy::entities::{
    AnalysisSummaryResponse, DataSource, EmpathyMap, EmpathyMapQuadrant, Quote,
    SentimentAnalysis, SentimentType, TopicAnalysis, UserSegment,
};
use crate::empathy::outputs::{ClarificationOutput, EmpathyMapOutput};
use crate::empathy::pii;
use crate::empathy::prompts::*;
use crate::empathy::state::{phases, EmpathyMappingState};
use crate::empathy::tools::{
    create_empathy_map_document, process_ticket_content, send_consent_form, topic_keywords,
};
use crate::llm::{complete_structured, system_and_user, LlmClient};
use crate::workflow::Node;

pub mod names {
    pub const CLARIFY: &str = "clarify";
    pub const INGEST: &str = "ingest";
    pub const CONSENT: &str = "consent";
    pub const REDACT: &str = "redact";
    pub const ANALYZE: &str = "analyze";
    pub const SYNTHESIZE: &str = "synthesize";
    pub const SUMMARIZE: &str = "summarize";
}

/// 节点共享依赖
pub struct EmpathyContext {
    pub llm: Arc<dyn LlmClient>,
    /// 工单授权必须包含的用途
    pub purpose: String,
}

pub struct ClarifyNode {
    ctx: Arc<EmpathyContext>,
}

impl ClarifyNode {
    pub fn new(ctx: Arc<EmpathyContext>) -> Self {
        Self { ctx }
    }
}

pub struct ConsentNode {
    ctx: Arc<EmpathyContext>,
}

impl ConsentNode {
    pub fn new(ctx: Arc<EmpathyContext>) -> Self {
        Self { ctx }
    }
}

pub struct SynthesizeNode {
    ctx: Arc<EmpathyContext>,
}

impl SynthesizeNode {
    pub fn new(ctx: Arc<EmpathyContext>) -> Self {
        Self { ctx }
    }
}

pub struct IngestNode;
pub struct RedactNode;
pub struct AnalyzeNode;
pub struct SummarizeNode;

#[async_trait]
impl Node<EmpathyMappingState> for ClarifyNode {
    fn name(&self) -> &str {
        names::CLARIFY
    }

    async fn run(&self, state: &mut EmpathyMappingState) -> Result<(), AgentError> {
        state.current_phase = phases::CLARIFY.to_string();
        if state.problem_statement.trim().is_empty() {
            return Err(AgentError::InvalidInput("problem statement is empty".into()));
        }

        let messages = system_and_user(
            CLARIFICATION_PROMPT,
            format_clarification_prompt(&state.problem_statement),
        );
        match complete_structured::<ClarificationOutput>(self.ctx.llm.as_ref(), &messages, None)
            .await
        {
            Ok(out) if !out.clarified_problem.trim().is_empty() => {
                state.clarified_problem = Some(out.clarified_problem);
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "clarification failed, keeping original problem statement");
                state
                    .warnings
                    .push(format!("clarification failed: {}", e));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Node<EmpathyMappingState> for IngestNode {
    fn name(&self) -> &str {
        names::INGEST
    }

    /// 按 ticket_id 去重，丢弃正文为空的工单
    async fn run(&self, state: &mut EmpathyMappingState) -> Result<(), AgentError> {
        state.current_phase = phases::INGEST.to_string();
        let received = state.support_tickets.len();
        let mut seen = HashSet::new();
        let mut warnings = Vec::new();
        state.support_tickets.retain(|t| {
            if !seen.insert(t.ticket_id.clone()) {
                warnings.push(format!("duplicate ticket {} ignored", t.ticket_id));
                return false;
            }
            if t.title.trim().is_empty() && t.description.trim().is_empty() {
                warnings.push(format!("ticket {} has no content", t.ticket_id));
                return false;
            }
            true
        });
        state.warnings.extend(warnings);

        let customers: HashSet<_> = state.support_tickets.iter().map(|t| &t.customer_id).collect();
        state.metrics.total_tickets_processed = state.support_tickets.len();
        state.metrics.total_customers = customers.len();
        tracing::info!(
            received,
            kept = state.support_tickets.len(),
            customers = customers.len(),
            "support tickets ingested"
        );
        Ok(())
    }
}

#[async_trait]
impl Node<EmpathyMappingState> for ConsentNode {
    fn name(&self) -> &str {
        names::CONSENT
    }

    /// 未授权的工单不进入后续处理，并向客户补发同意书
    async fn run(&self, state: &mut EmpathyMappingState) -> Result<(), AgentError> {
        state.current_phase = phases::CONSENT.to_string();
        let now = Utc::now();
        let scope = vec![self.ctx.purpose.clone()];

        for ticket in &state.support_tickets {
            let result = validate_ticket(ticket, &self.ctx.purpose, now);
            state.metrics.consent_validation_count += 1;
            if result.valid {
                state.processing_queue.push(ticket.ticket_id.clone());
                if let Some(record) = result.consent_record {
                    state.consent_records.push(record);
                }
                continue;
            }

            for violation in &result.violations {
                state
                    .consent_violations
                    .push(format!("ticket {}: {}", ticket.ticket_id, violation));
            }
            let receipt = send_consent_form(&ticket.customer_id, &scope);
            state.warnings.push(format!(
                "ticket {} skipped, consent form {} sent to {}",
                ticket.ticket_id, receipt.consent_id, ticket.customer_id
            ));
        }

        tracing::info!(
            eligible = state.processing_queue.len(),
            violations = state.consent_violations.len(),
            "consent validated"
        );
        Ok(())
    }
}

/// 没有可处理的工单时直接汇总
pub fn route_after_consent(state: &EmpathyMappingState) -> &'static str {
    if state.processing_queue.is_empty() {
        "summarize"
    } else {
        "redact"
    }
}

#[async_trait]
impl Node<EmpathyMappingState> for RedactNode {
    fn name(&self) -> &str {
        names::REDACT
    }

    async fn run(&self, state: &mut EmpathyMappingState) -> Result<(), AgentError> {
        state.current_phase = phases::REDACT.to_string();
        let now = Utc::now();
        let queue = state.processing_queue.clone();

        for ticket in state
            .support_tickets
            .iter_mut()
            .filter(|t| queue.contains(&t.ticket_id))
        {
            let doc = pii::redact(&ticket.content(), now);
            if !doc.pii_entities.is_empty() {
                tracing::debug!(
                    ticket_id = %ticket.ticket_id,
                    entities = doc.pii_entities.len(),
                    level = ?doc.max_level(),
                    "PII redacted"
                );
            }
            state.metrics.pii_redaction_count += doc.pii_entities.len();
            state.pii_entities.extend(doc.pii_entities.iter().cloned());
            state.redacted_documents.push(doc.clone());
            ticket.redacted_version = Some(doc);
        }
        Ok(())
    }
}

/// 按主题汇总：出现次数与主题下工单的平均情感
fn aggregate_sentiment(items: &[&SentimentAnalysis]) -> SentimentAnalysis {
    let n = items.len().max(1) as f64;
    let positive = items.iter().map(|s| s.positive_score).sum::<f64>() / n;
    let negative = items.iter().map(|s| s.negative_score).sum::<f64>() / n;
    let neutral = items.iter().map(|s| s.neutral_score).sum::<f64>() / n;

    let first = items.first().map(|s| s.sentiment_type);
    let sentiment_type = match first {
        Some(t) if items.iter().all(|s| s.sentiment_type == t) => t,
        Some(_) => SentimentType::Mixed,
        None => SentimentType::Neutral,
    };

    let mut emotions = HashMap::new();
    for s in items {
        for (emotion, intensity) in &s.emotions {
            *emotions.entry(emotion.clone()).or_insert(0.0) += intensity / n;
        }
    }

    SentimentAnalysis {
        sentiment_type,
        confidence: positive.max(negative).max(neutral),
        positive_score: positive,
        negative_score: negative,
        neutral_score: neutral,
        emotions,
    }
}

#[async_trait]
impl Node<EmpathyMappingState> for AnalyzeNode {
    fn name(&self) -> &str {
        names::ANALYZE
    }

    async fn run(&self, state: &mut EmpathyMappingState) -> Result<(), AgentError> {
        state.current_phase = phases::ANALYZE.to_string();

        let mut per_topic: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        let mut sentiments = Vec::new();
        let mut quotes = Vec::new();
        let mut insights: Vec<String> = Vec::new();

        for ticket in state.eligible_tickets() {
            let analysis = process_ticket_content(&ticket.analyzable_content());
            let idx = sentiments.len();
            for topic in &analysis.topics {
                per_topic.entry(topic.clone()).or_default().push(idx);
            }
            for text in &analysis.quotes {
                quotes.push(Quote {
                    quote_id: uuid::Uuid::new_v4().to_string(),
                    original_text: text.clone(),
                    speaker: Some(ticket.customer_id.clone()),
                    timestamp: Some(ticket.created_at),
                    sentiment: analysis.sentiment.clone(),
                    topics: analysis.topics.clone(),
                    relevance_score: analysis.sentiment.negative_score.max(0.5),
                    source_document: ticket.ticket_id.clone(),
                });
            }
            for insight in analysis.key_insights {
                if !insights.contains(&insight) {
                    insights.push(insight);
                }
            }
            sentiments.push(analysis.sentiment);
        }

        let ticket_count = sentiments.len().max(1) as f64;
        let mut topics: Vec<TopicAnalysis> = per_topic
            .into_iter()
            .map(|(name, idxs)| {
                let members: Vec<&SentimentAnalysis> = idxs.iter().map(|i| &sentiments[*i]).collect();
                TopicAnalysis {
                    topic_id: format!("topic_{}", name),
                    keywords: topic_keywords(&name),
                    frequency: idxs.len(),
                    relevance_score: idxs.len() as f64 / ticket_count,
                    sentiment: aggregate_sentiment(&members),
                    topic_name: name,
                }
            })
            .collect();
        topics.sort_by(|a, b| b.frequency.cmp(&a.frequency));

        let segment = UserSegment {
            segment_id: format!("segment_{}", uuid::Uuid::new_v4().simple()),
            segment_name: "support ticket customers".to_string(),
            description: format!("Customers who filed support tickets about: {}", state.focus()),
            criteria: topics.iter().map(|t| t.topic_name.clone()).collect(),
            ticket_count: sentiments.len(),
            created_at: Utc::now(),
        };
        state.current_segment_id = Some(segment.segment_id.clone());
        state.user_segments.push(segment);

        tracing::info!(
            tickets = sentiments.len(),
            topics = topics.len(),
            quotes = quotes.len(),
            "support tickets analyzed"
        );
        state.sentiment_analyses = sentiments;
        state.topic_analyses = topics;
        state.extracted_quotes = quotes;
        state.key_insights = insights;
        Ok(())
    }
}

fn quadrant(kind: &str, insights: Vec<String>, quotes: Vec<String>, confidence: f64) -> EmpathyMapQuadrant {
    EmpathyMapQuadrant {
        quadrant_type: kind.to_string(),
        insights,
        quotes,
        confidence_score: confidence,
    }
}

/// 仅由本地分析结果构造共情地图内容
pub fn local_empathy_map(state: &EmpathyMappingState) -> EmpathyMapOutput {
    let quotes: Vec<String> = state
        .extracted_quotes
        .iter()
        .map(|q| q.original_text.clone())
        .collect();

    let mut feel = Vec::new();
    let mut feelings: BTreeMap<&str, f64> = BTreeMap::new();
    for s in &state.sentiment_analyses {
        for (emotion, intensity) in &s.emotions {
            *feelings.entry(emotion.as_str()).or_insert(0.0) += intensity;
        }
    }
    for (emotion, _) in feelings {
        feel.push(format!("Users express {}", emotion));
    }

    let negative_topics: Vec<&TopicAnalysis> = state
        .topic_analyses
        .iter()
        .filter(|t| matches!(t.sentiment.sentiment_type, SentimentType::Negative | SentimentType::Mixed))
        .collect();

    EmpathyMapOutput {
        say: quotes.clone(),
        think: state.key_insights.clone(),
        do_: state
            .topic_analyses
            .iter()
            .map(|t| format!("Contacts support about {} ({} tickets)", t.topic_name, t.frequency))
            .collect(),
        feel,
        goals: state
            .topic_analyses
            .iter()
            .map(|t| format!("Get {} working without contacting support", t.topic_name))
            .collect(),
        pains: negative_topics
            .iter()
            .map(|t| format!("Problems with {}", t.topic_name))
            .collect(),
        gains: Vec::new(),
        latent_needs: negative_topics
            .iter()
            .map(|t| format!("Self-service path for {} issues", t.topic_name))
            .collect(),
        key_quotes: quotes,
        confidence: 0.3,
    }
}

#[async_trait]
impl Node<EmpathyMappingState> for SynthesizeNode {
    fn name(&self) -> &str {
        names::SYNTHESIZE
    }

    async fn run(&self, state: &mut EmpathyMappingState) -> Result<(), AgentError> {
        state.current_phase = phases::SYNTHESIZE.to_string();
        let messages = system_and_user(
            SUPPORT_TICKET_ANALYSIS_PROMPT,
            format_ticket_analysis_prompt(state),
        );

        let output = match complete_structured::<EmpathyMapOutput>(
            self.ctx.llm.as_ref(),
            &messages,
            None,
        )
        .await
        {
            Ok(out) => out,
            Err(e) => {
                tracing::warn!(error = %e, "empathy map synthesis failed, using local analysis");
                state
                    .warnings
                    .push(format!("empathy map built from local analysis: {}", e));
                local_empathy_map(state)
            }
        };

        let confidence = output.confidence.clamp(0.0, 1.0);
        let now = Utc::now();
        let map = EmpathyMap {
            map_id: uuid::Uuid::new_v4().to_string(),
            segment_id: state.current_segment_id.clone().unwrap_or_default(),
            created_at: now,
            updated_at: now,
            say_quadrant: quadrant("say", output.say, output.key_quotes.clone(), confidence),
            think_quadrant: quadrant("think", output.think, Vec::new(), confidence),
            do_quadrant: quadrant("do", output.do_, Vec::new(), confidence),
            feel_quadrant: quadrant("feel", output.feel, Vec::new(), confidence),
            goals: output.goals,
            pains: output.pains,
            gains: output.gains,
            latent_needs: output.latent_needs,
            data_sources_used: vec![DataSource::SupportTicket],
            ticket_count: state.processing_queue.len(),
            total_analysis_time: state.node_execution_times.values().sum(),
            confidence_score: confidence,
        };

        state.document = Some(create_empathy_map_document(&map));
        state.empathy_maps.push(map);
        state.metrics.empathy_maps_generated = state.empathy_maps.len();
        state.metrics.average_confidence_score = state
            .empathy_maps
            .iter()
            .map(|m| m.confidence_score)
            .sum::<f64>()
            / state.empathy_maps.len() as f64;
        Ok(())
    }
}

#[async_trait]
impl Node<EmpathyMappingState> for SummarizeNode {
    fn name(&self) -> &str {
        names::SUMMARIZE
    }

    async fn run(&self, state: &mut EmpathyMappingState) -> Result<(), AgentError> {
        if state.empathy_maps.is_empty() {
            state
                .warnings
                .push("no tickets with valid consent, no empathy map generated".to_string());
        }

        state.metrics.processing_time_seconds = state.node_execution_times.values().sum();
        let mut top_insights = state.key_insights.clone();
        top_insights.truncate(5);

        state.summary = Some(AnalysisSummaryResponse {
            total_segments: state.user_segments.len(),
            total_customers: state.metrics.total_customers,
            empathy_maps_generated: state.empathy_maps.len(),
            average_confidence: state.metrics.average_confidence_score,
            top_insights,
            key_metrics: state.metrics.clone(),
        });
        state.current_phase = phases::COMPLETE.to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::empathy::tools::process_ticket_content;

    #[test]
    fn test_route_after_consent() {
        let mut state = EmpathyMappingState::new("p", Vec::new());
        assert_eq!(route_after_consent(&state), "summarize");
        state.processing_queue.push("T-1".into());
        assert_eq!(route_after_consent(&state), "redact");
    }

    #[test]
    fn test_aggregate_sentiment_mixed_when_types_differ() {
        let a = process_ticket_content("I love it, thanks").sentiment;
        let b = process_ticket_content("It is broken and I can't log in").sentiment;
        let agg = aggregate_sentiment(&[&a, &b]);
        assert_eq!(agg.sentiment_type, SentimentType::Mixed);
        assert!(agg.confidence > 0.0);
    }

    #[test]
    fn test_local_map_lists_pains_for_negative_topics() {
        let mut state = EmpathyMappingState::new("p", Vec::new());
        let s = process_ticket_content("The export is broken").sentiment;
        state.topic_analyses.push(TopicAnalysis {
            topic_id: "topic_export".into(),
            topic_name: "export".into(),
            keywords: topic_keywords("export"),
            frequency: 2,
            relevance_score: 1.0,
            sentiment: s,
        });
        let map = local_empathy_map(&state);
        assert_eq!(map.pains, vec!["Problems with export".to_string()]);
        assert_eq!(map.do_.len(), 1);
        assert_eq!(map.confidence, 0.3);
    }
}
