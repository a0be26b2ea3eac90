//! 工单处理相关的外部工具
//!
//! 工单系统、文档系统与电子签名服务在此只有本地实现：
//! `InMemoryTicketSource` 提供工单，`create_empathy_map_document` / `send_consent_form` 返回模拟回执。

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::AgentError;
use crate::empathy::entities::{
    ConsentFormReceipt, DocumentReceipt, EmpathyMap, SentimentAnalysis, SentimentType,
    SupportTicket,
};

/// 工单来源
#[async_trait]
pub trait TicketSource: Send + Sync {
    /// 按 ID 拉取工单；ticket_ids 为空时返回全部
    async fn fetch(&self, ticket_ids: &[String]) -> Result<Vec<SupportTicket>, AgentError>;
}

/// 内存中的工单集合（测试与 JSON 文件输入）
#[derive(Debug, Clone, Default)]
pub struct InMemoryTicketSource {
    tickets: Vec<SupportTicket>,
}

impl InMemoryTicketSource {
    pub fn new(tickets: Vec<SupportTicket>) -> Self {
        Self { tickets }
    }

    /// 从 JSON 数组解析工单
    pub fn from_json(json: &str) -> Result<Self, AgentError> {
        let tickets: Vec<SupportTicket> = serde_json::from_str(json)
            .map_err(|e| AgentError::InvalidInput(format!("invalid ticket JSON: {}", e)))?;
        Ok(Self::new(tickets))
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }
}

#[async_trait]
impl TicketSource for InMemoryTicketSource {
    async fn fetch(&self, ticket_ids: &[String]) -> Result<Vec<SupportTicket>, AgentError> {
        if ticket_ids.is_empty() {
            return Ok(self.tickets.clone());
        }
        let found: Vec<_> = self
            .tickets
            .iter()
            .filter(|t| ticket_ids.contains(&t.ticket_id))
            .cloned()
            .collect();
        if found.len() < ticket_ids.len() {
            tracing::warn!(
                requested = ticket_ids.len(),
                found = found.len(),
                "some requested tickets were not found"
            );
        }
        Ok(found)
    }
}

/// 单张工单的本地分析结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketInsights {
    pub sentiment: SentimentAnalysis,
    pub topics: Vec<String>,
    pub key_insights: Vec<String>,
    pub quotes: Vec<String>,
}

const NEGATIVE_CUES: &[&str] = &[
    "can't", "cannot", "unable", "error", "broken", "fail", "crash", "slow", "frustrat",
    "annoy", "angry", "confus", "doesn't work", "not working", "lost", "charged twice",
    "refund", "terrible",
];

const POSITIVE_CUES: &[&str] = &[
    "thank", "great", "love", "helpful", "easy", "appreciate", "fast", "works well",
    "resolved",
];

const TOPICS: &[(&str, &[&str])] = &[
    ("login", &["login", "log in", "sign in", "password", "2fa"]),
    ("billing", &["charge", "invoice", "refund", "payment", "billing", "subscription"]),
    ("performance", &["slow", "timeout", "lag", "loading", "hangs"]),
    ("error", &["error", "crash", "bug", "broken", "fail"]),
    ("export", &["export", "download", "report", "csv"]),
    ("account", &["account", "profile", "settings", "email address"]),
];

const EMOTIONS: &[(&str, &[&str])] = &[
    ("frustration", &["frustrat", "annoy", "again", "still", "angry"]),
    ("confusion", &["confus", "don't understand", "unclear", "how do i"]),
    ("anxiety", &["worried", "urgent", "asap", "deadline", "lost"]),
    ("satisfaction", &["thank", "great", "love", "appreciate"]),
];

const MAX_QUOTES_PER_TICKET: usize = 3;

fn count_cues(text: &str, cues: &[&str]) -> usize {
    cues.iter().filter(|c| text.contains(*c)).count()
}

/// 关键词计数得到的情感分析
pub fn analyze_sentiment(content: &str) -> SentimentAnalysis {
    let text = content.to_lowercase();
    let negative = count_cues(&text, NEGATIVE_CUES) as f64;
    let positive = count_cues(&text, POSITIVE_CUES) as f64;
    let total = positive + negative + 1.0;

    let sentiment_type = if positive == 0.0 && negative == 0.0 {
        SentimentType::Neutral
    } else if positive > 0.0 && negative > 0.0 && positive.max(negative) < 2.0 * positive.min(negative) {
        SentimentType::Mixed
    } else if negative > positive {
        SentimentType::Negative
    } else {
        SentimentType::Positive
    };

    let emotions: HashMap<String, f64> = EMOTIONS
        .iter()
        .filter_map(|(emotion, cues)| {
            let hits = count_cues(&text, cues);
            (hits > 0).then(|| (emotion.to_string(), (hits as f64 / 3.0).min(1.0)))
        })
        .collect();

    let (positive_score, negative_score, neutral_score) =
        (positive / total, negative / total, 1.0 / total);
    SentimentAnalysis {
        sentiment_type,
        confidence: positive_score.max(negative_score).max(neutral_score),
        positive_score,
        negative_score,
        neutral_score,
        emotions,
    }
}

/// 命中关键词的主题名
pub fn detect_topics(content: &str) -> Vec<String> {
    let text = content.to_lowercase();
    TOPICS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
        .map(|(name, _)| name.to_string())
        .collect()
}

/// 主题的关键词表
pub fn topic_keywords(topic: &str) -> Vec<String> {
    TOPICS
        .iter()
        .find(|(name, _)| *name == topic)
        .map(|(_, keywords)| keywords.iter().map(|k| k.to_string()).collect())
        .unwrap_or_default()
}

/// 第一人称的句子视为用户原话
pub fn extract_quotes(content: &str) -> Vec<String> {
    content
        .split(['.', '!', '?', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter(|s| {
            let lower = format!(" {} ", s.to_lowercase());
            [" i ", " i'", " my ", " we ", " our "]
                .iter()
                .any(|p| lower.contains(p))
        })
        .take(MAX_QUOTES_PER_TICKET)
        .map(str::to_string)
        .collect()
}

/// 直接处理工单正文：情感、主题、要点与原话
pub fn process_ticket_content(content: &str) -> TicketInsights {
    let sentiment = analyze_sentiment(content);
    let topics = detect_topics(content);
    let key_insights = topics
        .iter()
        .map(|topic| match sentiment.sentiment_type {
            SentimentType::Negative | SentimentType::Mixed => {
                format!("User frustrated with {}", topic)
            }
            _ => format!("User mentions {}", topic),
        })
        .collect();

    TicketInsights {
        sentiment,
        topics,
        key_insights,
        quotes: extract_quotes(content),
    }
}

/// 在外部文档系统中创建共情地图文档（模拟）
pub fn create_empathy_map_document(map: &EmpathyMap) -> DocumentReceipt {
    let document_id = format!("doc_{}", map.map_id);
    tracing::info!(document_id = %document_id, "empathy map document created");
    DocumentReceipt {
        url: format!("mock://empathy-maps/{}", document_id),
        document_id,
    }
}

/// 向用户发送同意书（模拟）
pub fn send_consent_form(user_id: &str, consent_scope: &[String]) -> ConsentFormReceipt {
    let receipt = ConsentFormReceipt {
        consent_id: format!("consent_{}", uuid::Uuid::new_v4().simple()),
        user_id: user_id.to_string(),
        status: "sent".to_string(),
    };
    tracing::info!(
        user_id,
        consent_id = %receipt.consent_id,
        scope = ?consent_scope,
        "consent form sent"
    );
    receipt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_complaint() {
        let insights = process_ticket_content(
            "Login broken\nI can't log in to my account. This is so frustrating!",
        );
        assert_eq!(insights.sentiment.sentiment_type, SentimentType::Negative);
        assert!(insights.topics.contains(&"login".to_string()));
        assert!(insights.topics.contains(&"account".to_string()));
        assert!(insights
            .key_insights
            .contains(&"User frustrated with login".to_string()));
        assert_eq!(insights.quotes, vec!["I can't log in to my account".to_string()]);
        assert!(insights.sentiment.emotions.contains_key("frustration"));
    }

    #[test]
    fn test_neutral_question() {
        let sentiment = analyze_sentiment("Where is the invoice for March");
        assert_eq!(sentiment.sentiment_type, SentimentType::Neutral);
        assert_eq!(sentiment.confidence, 1.0);
        assert_eq!(detect_topics("Where is the invoice for March"), vec!["billing"]);
    }

    #[test]
    fn test_mixed_sentiment() {
        let sentiment = analyze_sentiment("Thanks for the help, but export still fails");
        assert_eq!(sentiment.sentiment_type, SentimentType::Mixed);
    }

    #[tokio::test]
    async fn test_in_memory_source_filters_by_id() {
        let json = r#"[
            {"ticket_id": "T-1", "title": "a", "description": "b", "customer_id": "C-1", "created_at": "2024-05-01T10:00:00Z"},
            {"ticket_id": "T-2", "title": "c", "description": "d", "customer_id": "C-2", "created_at": "2024-05-02T10:00:00Z"}
        ]"#;
        let source = InMemoryTicketSource::from_json(json).unwrap();
        assert_eq!(source.len(), 2);
        assert_eq!(source.fetch(&[]).await.unwrap().len(), 2);
        let one = source.fetch(&["T-2".to_string()]).await.unwrap();
        assert_eq!(one[0].customer_id, "C-2");
        assert!(InMemoryTicketSource::from_json("{").is_err());
    }

    #[test]
    fn test_consent_form_receipt() {
        let receipt = send_consent_form("C-9", &["empathy_mapping".to_string()]);
        assert_eq!(receipt.status, "sent");
        assert!(receipt.consent_id.starts_with("consent_"));
    }
}
