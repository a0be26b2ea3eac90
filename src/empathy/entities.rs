//! 共情地图领域实体：同意记录、PII、工单、情感/主题分析、共情地图与对外响应

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 用户对数据处理的同意状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentStatus {
    Pending,
    Granted,
    Denied,
    Expired,
    Revoked,
}

impl fmt::Display for ConsentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConsentStatus::Pending => "pending",
            ConsentStatus::Granted => "granted",
            ConsentStatus::Denied => "denied",
            ConsentStatus::Expired => "expired",
            ConsentStatus::Revoked => "revoked",
        };
        f.write_str(s)
    }
}

/// 用户研究数据来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    SupportTicket,
}

/// PII 敏感级别（可比较，Critical 最高）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PiiLevel {
    None,
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentType {
    Positive,
    Negative,
    Neutral,
    Mixed,
}

/// 同意记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsentRecord {
    pub consent_id: String,
    pub user_id: String,
    pub data_source: DataSource,
    pub consent_scope: Vec<String>,
    pub consent_status: ConsentStatus,
    pub granted_at: DateTime<Utc>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub revoked_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub consent_artifact_id: Option<String>,
}

/// 识别出的一处 PII；位置为原文中的字节偏移
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiiEntity {
    /// email / phone / credit_card
    pub entity_type: String,
    pub original_text: String,
    pub redacted_text: String,
    pub confidence: f64,
    pub pii_level: PiiLevel,
    pub start_position: usize,
    pub end_position: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedactedDocument {
    pub original_content: String,
    pub redacted_content: String,
    pub pii_entities: Vec<PiiEntity>,
    pub redaction_timestamp: DateTime<Utc>,
    pub redaction_confidence: f64,
}

impl RedactedDocument {
    /// 文档中最高的 PII 级别；无 PII 时为 None
    pub fn max_level(&self) -> PiiLevel {
        self.pii_entities
            .iter()
            .map(|e| e.pii_level)
            .max()
            .unwrap_or(PiiLevel::None)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSegment {
    pub segment_id: String,
    pub segment_name: String,
    pub description: String,
    pub criteria: Vec<String>,
    pub ticket_count: usize,
    pub created_at: DateTime<Utc>,
}

/// 共情地图的一个象限（say / think / do / feel）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmpathyMapQuadrant {
    pub quadrant_type: String,
    pub insights: Vec<String>,
    pub quotes: Vec<String>,
    pub confidence_score: f64,
}

impl EmpathyMapQuadrant {
    pub fn new(quadrant_type: &str) -> Self {
        Self {
            quadrant_type: quadrant_type.to_string(),
            ..Default::default()
        }
    }
}

/// 一个用户分群的完整共情地图
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmpathyMap {
    pub map_id: String,
    pub segment_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    pub say_quadrant: EmpathyMapQuadrant,
    pub think_quadrant: EmpathyMapQuadrant,
    pub do_quadrant: EmpathyMapQuadrant,
    pub feel_quadrant: EmpathyMapQuadrant,

    pub goals: Vec<String>,
    pub pains: Vec<String>,
    pub gains: Vec<String>,
    pub latent_needs: Vec<String>,

    pub data_sources_used: Vec<DataSource>,
    pub ticket_count: usize,
    pub total_analysis_time: f64,
    pub confidence_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentAnalysis {
    pub sentiment_type: SentimentType,
    pub confidence: f64,
    pub positive_score: f64,
    pub negative_score: f64,
    pub neutral_score: f64,
    /// 情绪 -> 强度
    #[serde(default)]
    pub emotions: HashMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicAnalysis {
    pub topic_id: String,
    pub topic_name: String,
    pub keywords: Vec<String>,
    pub frequency: usize,
    pub relevance_score: f64,
    pub sentiment: SentimentAnalysis,
}

/// 从工单中摘出的原话
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub quote_id: String,
    pub original_text: String,
    pub speaker: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub sentiment: SentimentAnalysis,
    pub topics: Vec<String>,
    pub relevance_score: f64,
    pub source_document: String,
}

/// 支持工单
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportTicket {
    pub ticket_id: String,
    #[serde(default = "default_source")]
    pub source_type: DataSource,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub status: String,
    pub customer_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub consent_record: Option<ConsentRecord>,
    #[serde(default)]
    pub redacted_version: Option<RedactedDocument>,
}

fn default_source() -> DataSource {
    DataSource::SupportTicket
}

impl SupportTicket {
    /// 标题与正文拼接后的待分析文本
    pub fn content(&self) -> String {
        format!("{}\n{}", self.title, self.description)
    }

    /// 已脱敏时返回脱敏文本，否则返回原文
    pub fn analyzable_content(&self) -> String {
        match &self.redacted_version {
            Some(doc) => doc.redacted_content.clone(),
            None => self.content(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessingMetrics {
    pub total_tickets_processed: usize,
    pub total_customers: usize,
    pub processing_time_seconds: f64,
    pub pii_redaction_count: usize,
    pub consent_validation_count: usize,
    pub empathy_maps_generated: usize,
    pub average_confidence_score: f64,
}

/// 外部文档系统返回的共情地图文档
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentReceipt {
    pub document_id: String,
    pub url: String,
}

/// 同意书发送回执
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsentFormReceipt {
    pub consent_id: String,
    pub user_id: String,
    pub status: String,
}

/// 共情地图生成结果
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmpathyMapResponse {
    pub success: bool,
    pub empathy_map: Option<EmpathyMap>,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub processing_time: f64,
    /// 运行末尾生成的汇总
    #[serde(default)]
    pub summary: Option<AnalysisSummaryResponse>,
    #[serde(default)]
    pub document: Option<DocumentReceipt>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsentValidationResponse {
    pub valid: bool,
    pub consent_record: Option<ConsentRecord>,
    #[serde(default)]
    pub violations: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiiRedactionResponse {
    pub redacted_content: String,
    #[serde(default)]
    pub pii_entities_found: Vec<PiiEntity>,
    pub redaction_confidence: f64,
    pub processing_time: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummaryResponse {
    pub total_segments: usize,
    pub total_customers: usize,
    pub empathy_maps_generated: usize,
    pub average_confidence: f64,
    pub top_insights: Vec<String>,
    pub key_metrics: ProcessingMetrics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticket_deserializes_with_defaults() {
        let json = r#"{
            "ticket_id": "T-1",
            "title": "Login broken",
            "description": "I can't log in",
            "customer_id": "C-1",
            "created_at": "2024-05-01T10:00:00Z"
        }"#;
        let ticket: SupportTicket = serde_json::from_str(json).unwrap();
        assert_eq!(ticket.source_type, DataSource::SupportTicket);
        assert!(ticket.consent_record.is_none());
        assert_eq!(ticket.analyzable_content(), "Login broken\nI can't log in");
    }

    #[test]
    fn test_pii_level_ordering() {
        assert!(PiiLevel::Critical > PiiLevel::High);
        assert!(PiiLevel::Low > PiiLevel::None);
        assert_eq!(
            serde_json::to_string(&ConsentStatus::Granted).unwrap(),
            "\"granted\""
        );
    }
}
