//! PII 脱敏：邮箱、电话、卡号
//!
//! 多个模式的匹配按起始位置合并，重叠时保留优先级更高者（邮箱 > 卡号 > 电话）。

use std::sync::OnceLock;
use std::time::Instant;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::empathy::entities::{PiiEntity, PiiLevel, PiiRedactionResponse, RedactedDocument};

struct PiiPattern {
    entity_type: &'static str,
    level: PiiLevel,
    confidence: f64,
    regex: Regex,
}

fn patterns() -> &'static [PiiPattern] {
    static PATTERNS: OnceLock<Vec<PiiPattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let specs: [(&'static str, PiiLevel, f64, &str); 3] = [
            (
                "email",
                PiiLevel::High,
                0.95,
                r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}",
            ),
            (
                "credit_card",
                PiiLevel::Critical,
                0.9,
                r"\b\d{4}[ -]?\d{4}[ -]?\d{4}[ -]?\d{1,4}\b",
            ),
            (
                "phone",
                PiiLevel::Medium,
                0.85,
                r"(?:\+\d{1,3}[ .-]?)?(?:\(\d{3}\)\s?|\b\d{3}[ .-]?)\d{3}[ .-]?\d{4}\b",
            ),
        ];
        specs
            .into_iter()
            .map(|(entity_type, level, confidence, pattern)| PiiPattern {
                entity_type,
                level,
                confidence,
                regex: Regex::new(pattern).expect("valid PII pattern"),
            })
            .collect()
    })
}

/// 替换占位符，如 `[REDACTED_EMAIL]`
pub fn placeholder(entity_type: &str) -> String {
    format!("[REDACTED_{}]", entity_type.to_uppercase())
}

/// 识别文本中的 PII（不重叠，按位置排序）
pub fn detect(text: &str) -> Vec<PiiEntity> {
    let mut candidates: Vec<(usize, usize, usize, &PiiPattern)> = Vec::new();
    for (priority, pattern) in patterns().iter().enumerate() {
        for m in pattern.regex.find_iter(text) {
            candidates.push((m.start(), priority, m.end(), pattern));
        }
    }
    candidates.sort_by_key(|(start, priority, _, _)| (*start, *priority));

    let mut entities: Vec<PiiEntity> = Vec::new();
    let mut last_end = 0;
    for (start, _, end, pattern) in candidates {
        if start < last_end {
            continue;
        }
        last_end = end;
        entities.push(PiiEntity {
            entity_type: pattern.entity_type.to_string(),
            original_text: text[start..end].to_string(),
            redacted_text: placeholder(pattern.entity_type),
            confidence: pattern.confidence,
            pii_level: pattern.level,
            start_position: start,
            end_position: end,
        });
    }
    entities
}

/// 脱敏：识别 PII 并以占位符替换；redaction_confidence 取各实体置信度的最小值，无 PII 时为 1.0
pub fn redact(text: &str, now: DateTime<Utc>) -> RedactedDocument {
    let entities = detect(text);

    let mut redacted = String::with_capacity(text.len());
    let mut cursor = 0;
    for entity in &entities {
        redacted.push_str(&text[cursor..entity.start_position]);
        redacted.push_str(&entity.redacted_text);
        cursor = entity.end_position;
    }
    redacted.push_str(&text[cursor..]);

    let confidence = entities
        .iter()
        .map(|e| e.confidence)
        .fold(1.0_f64, f64::min);

    RedactedDocument {
        original_content: text.to_string(),
        redacted_content: redacted,
        pii_entities: entities,
        redaction_timestamp: now,
        redaction_confidence: confidence,
    }
}

/// 脱敏并附带耗时，供对外接口使用
pub fn redact_with_timing(text: &str) -> PiiRedactionResponse {
    let start = Instant::now();
    let doc = redact(text, Utc::now());
    PiiRedactionResponse {
        redacted_content: doc.redacted_content,
        pii_entities_found: doc.pii_entities,
        redaction_confidence: doc.redaction_confidence,
        processing_time: start.elapsed().as_secs_f64(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacts_email_phone_and_card() {
        let text = "Reach me at jane.doe@example.com or +1 555-123-4567. Card 4111 1111 1111 1111 was charged twice.";
        let doc = redact(text, Utc::now());

        assert_eq!(
            doc.redacted_content,
            "Reach me at [REDACTED_EMAIL] or [REDACTED_PHONE]. Card [REDACTED_CREDIT_CARD] was charged twice."
        );
        let types: Vec<_> = doc.pii_entities.iter().map(|e| e.entity_type.as_str()).collect();
        assert_eq!(types, vec!["email", "phone", "credit_card"]);
        assert_eq!(doc.max_level(), PiiLevel::Critical);
        assert!((doc.redaction_confidence - 0.85).abs() < 1e-9);

        let email = &doc.pii_entities[0];
        assert_eq!(&text[email.start_position..email.end_position], "jane.doe@example.com");
    }

    #[test]
    fn test_text_without_pii_is_unchanged() {
        let text = "The export button does nothing since the 2024 update.";
        let doc = redact(text, Utc::now());
        assert_eq!(doc.redacted_content, text);
        assert!(doc.pii_entities.is_empty());
        assert_eq!(doc.max_level(), PiiLevel::None);
        assert_eq!(doc.redaction_confidence, 1.0);
    }

    #[test]
    fn test_parenthesized_phone() {
        let response = redact_with_timing("call (555) 123-4567 please");
        assert_eq!(response.redacted_content, "call [REDACTED_PHONE] please");
        assert_eq!(response.pii_entities_found.len(), 1);
    }
}
