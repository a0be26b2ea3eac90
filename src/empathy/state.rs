//! 共情地图流程状态

use std::collections::HashMap;
use std::time::Duration;

use crate::empathy::entities::{
    AnalysisSummaryResponse, ConsentRecord, DocumentReceipt, EmpathyMap, PiiEntity,
    ProcessingMetrics, Quote, RedactedDocument, SentimentAnalysis, SupportTicket, TopicAnalysis,
    UserSegment,
};
use crate::workflow::GraphState;

/// 当前所处阶段
pub mod phases {
    pub const CLARIFY: &str = "clarify";
    pub const INGEST: &str = "ingest";
    pub const CONSENT: &str = "consent";
    pub const REDACT: &str = "redact";
    pub const ANALYZE: &str = "analyze";
    pub const SYNTHESIZE: &str = "synthesize";
    pub const COMPLETE: &str = "complete";
}

#[derive(Debug, Clone, Default)]
pub struct EmpathyMappingState {
    pub problem_statement: String,
    pub clarified_problem: Option<String>,

    // 核心数据
    pub support_tickets: Vec<SupportTicket>,
    pub user_segments: Vec<UserSegment>,
    pub empathy_maps: Vec<EmpathyMap>,
    pub consent_records: Vec<ConsentRecord>,

    // 处理进度
    pub current_segment_id: Option<String>,
    /// 通过同意校验、等待脱敏与分析的工单 ID
    pub processing_queue: Vec<String>,

    // 分析结果
    pub sentiment_analyses: Vec<SentimentAnalysis>,
    pub topic_analyses: Vec<TopicAnalysis>,
    pub extracted_quotes: Vec<Quote>,
    pub key_insights: Vec<String>,

    // PII 与同意
    pub pii_entities: Vec<PiiEntity>,
    pub redacted_documents: Vec<RedactedDocument>,
    pub consent_violations: Vec<String>,

    pub metrics: ProcessingMetrics,
    pub summary: Option<AnalysisSummaryResponse>,
    pub document: Option<DocumentReceipt>,

    // 控制
    pub current_phase: String,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,

    // 调试与监控
    pub processing_history: Vec<String>,
    /// 节点名 -> 累计耗时（秒）
    pub node_execution_times: HashMap<String, f64>,
}

impl EmpathyMappingState {
    pub fn new(problem: impl Into<String>, tickets: Vec<SupportTicket>) -> Self {
        Self {
            problem_statement: problem.into(),
            support_tickets: tickets,
            ..Default::default()
        }
    }

    /// 澄清后的问题；澄清失败时为原始问题
    pub fn focus(&self) -> &str {
        self.clarified_problem
            .as_deref()
            .unwrap_or(&self.problem_statement)
    }

    /// processing_queue 中的工单（按原顺序）
    pub fn eligible_tickets(&self) -> impl Iterator<Item = &SupportTicket> {
        self.support_tickets
            .iter()
            .filter(|t| self.processing_queue.contains(&t.ticket_id))
    }

    pub fn empathy_map(&self) -> Option<&EmpathyMap> {
        self.empathy_maps.last()
    }
}

impl GraphState for EmpathyMappingState {
    fn record_node(&mut self, name: &str, elapsed: Duration) {
        self.processing_history.push(name.to_string());
        *self
            .node_execution_times
            .entry(name.to_string())
            .or_insert(0.0) += elapsed.as_secs_f64();
    }
}
