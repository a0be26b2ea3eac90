//! 同意校验：工单只有在用户授权了对应用途时才能进入分析

use chrono::{DateTime, Utc};

use crate::empathy::entities::{
    ConsentRecord, ConsentStatus, ConsentValidationResponse, SupportTicket,
};

/// 共情地图分析所需的授权用途
pub const EMPATHY_MAPPING_PURPOSE: &str = "empathy_mapping";

/// 校验同意记录：状态为 granted、未过期、未撤销且授权范围包含 purpose 时有效
pub fn validate(record: &ConsentRecord, purpose: &str, now: DateTime<Utc>) -> ConsentValidationResponse {
    let mut violations = Vec::new();
    let mut recommendations = Vec::new();

    if record.consent_status != ConsentStatus::Granted {
        violations.push(format!("consent status is {}", record.consent_status));
    }
    if let Some(expires_at) = record.expires_at {
        if expires_at <= now {
            violations.push(format!("consent expired at {}", expires_at.to_rfc3339()));
        }
    }
    if let Some(revoked_at) = record.revoked_at {
        violations.push(format!("consent revoked at {}", revoked_at.to_rfc3339()));
    }
    if !record.consent_scope.iter().any(|s| s == purpose) {
        violations.push(format!("purpose '{}' is not in consent scope", purpose));
        recommendations.push(format!("request consent that includes '{}'", purpose));
    }

    if !violations.is_empty() && record.revoked_at.is_none() {
        recommendations.push(format!("send a new consent form to user {}", record.user_id));
    }

    ConsentValidationResponse {
        valid: violations.is_empty(),
        consent_record: Some(record.clone()),
        violations,
        recommendations,
    }
}

/// 校验工单附带的同意记录；没有记录视为无效
pub fn validate_ticket(
    ticket: &SupportTicket,
    purpose: &str,
    now: DateTime<Utc>,
) -> ConsentValidationResponse {
    match &ticket.consent_record {
        Some(record) => validate(record, purpose, now),
        None => ConsentValidationResponse {
            valid: false,
            consent_record: None,
            violations: vec![format!("ticket {} has no consent record", ticket.ticket_id)],
            recommendations: vec![format!(
                "send a consent form to customer {}",
                ticket.customer_id
            )],
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::empathy::entities::DataSource;
    use chrono::Duration;

    fn record(status: ConsentStatus) -> ConsentRecord {
        ConsentRecord {
            consent_id: "c-1".into(),
            user_id: "u-1".into(),
            data_source: DataSource::SupportTicket,
            consent_scope: vec![EMPATHY_MAPPING_PURPOSE.into()],
            consent_status: status,
            granted_at: Utc::now() - Duration::days(10),
            expires_at: None,
            revoked_at: None,
            consent_artifact_id: None,
        }
    }

    #[test]
    fn test_granted_consent_is_valid() {
        let result = validate(&record(ConsentStatus::Granted), EMPATHY_MAPPING_PURPOSE, Utc::now());
        assert!(result.valid);
        assert!(result.violations.is_empty());
    }

    #[test]
    fn test_expired_and_out_of_scope() {
        let now = Utc::now();
        let mut rec = record(ConsentStatus::Granted);
        rec.expires_at = Some(now - Duration::days(1));
        let result = validate(&rec, "marketing", now);
        assert!(!result.valid);
        assert_eq!(result.violations.len(), 2);
        assert!(result.violations[0].starts_with("consent expired"));
        assert!(result.violations[1].contains("marketing"));
    }

    #[test]
    fn test_revoked_and_pending() {
        let mut rec = record(ConsentStatus::Revoked);
        rec.revoked_at = Some(Utc::now());
        let result = validate(&rec, EMPATHY_MAPPING_PURPOSE, Utc::now());
        assert!(!result.valid);
        assert!(result.violations.iter().any(|v| v.contains("revoked at")));

        let pending = validate(&record(ConsentStatus::Pending), EMPATHY_MAPPING_PURPOSE, Utc::now());
        assert_eq!(pending.violations, vec!["consent status is pending".to_string()]);
    }
}
