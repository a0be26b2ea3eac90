//! 共情地图端到端测试：同意校验 -> 脱敏 -> 分析 -> 合成

use std::sync::Arc;

use serde_json::json;

use whys::empathy::{EmpathyMappingAgent, InMemoryTicketSource, SupportTicket};
use whys::llm::ScriptedLlmClient;

const CLARIFY: &str = "clarify the problem statement for support ticket analysis";
const SYNTHESIZE: &str = "empathy mapping specialist";

fn consent(user: &str, scope: &[&str], expires_at: Option<&str>) -> serde_json::Value {
    json!({
        "consent_id": format!("consent-{user}"),
        "user_id": user,
        "data_source": "support_ticket",
        "consent_scope": scope,
        "consent_status": "granted",
        "granted_at": "2024-01-01T00:00:00Z",
        "expires_at": expires_at,
    })
}

fn ticket(id: &str, customer: &str, title: &str, description: &str, consent: Option<serde_json::Value>) -> SupportTicket {
    serde_json::from_value(json!({
        "ticket_id": id,
        "title": title,
        "description": description,
        "category": "product",
        "priority": "high",
        "status": "open",
        "customer_id": customer,
        "created_at": "2024-05-01T10:00:00Z",
        "consent_record": consent,
    }))
    .unwrap()
}

fn tickets() -> Vec<SupportTicket> {
    vec![
        ticket(
            "T-1",
            "C-1",
            "Login trouble",
            "I can't log in to my account. Reach me at jane.doe@example.com or +1 555-123-4567.",
            Some(consent("C-1", &["empathy_mapping"], None)),
        ),
        ticket(
            "T-2",
            "C-2",
            "Export failing",
            "The CSV export is broken again and I am frustrated. My card 4111 1111 1111 1111 was charged twice.",
            Some(consent("C-2", &["empathy_mapping", "support"], Some("2999-01-01T00:00:00Z"))),
        ),
        ticket("T-3", "C-3", "Slow dashboard", "Dashboard loading takes forever", None),
        ticket(
            "T-4",
            "C-4",
            "Refund",
            "I want a refund",
            Some(consent("C-4", &["empathy_mapping"], Some("2020-01-01T00:00:00Z"))),
        ),
        ticket("T-1", "C-1", "Login trouble", "duplicate submission", None),
    ]
}

const MAP: &str = r#"{
    "say": ["I can't log in to my account"],
    "think": ["Support should not be needed for basic tasks"],
    "do": ["Retries login and export several times"],
    "feel": ["Frustrated"],
    "goals": ["Finish reports on time"],
    "pains": ["Locked out", "Broken export", "Double charge"],
    "gains": ["Quick resolution"],
    "latent_needs": ["Trust that billing is correct"],
    "key_quotes": ["I am frustrated"],
    "confidence": 0.8
}"#;

#[tokio::test]
async fn test_builds_map_from_consented_redacted_tickets() {
    let llm = Arc::new(
        ScriptedLlmClient::new()
            .on(CLARIFY, vec![r#"{"clarified_problem": "Why do customers struggle with login and export?"}"#])
            .on(SYNTHESIZE, vec![MAP]),
    );
    let agent = EmpathyMappingAgent::new(llm.clone()).unwrap();
    let response = agent.run("Why are customers unhappy?", tickets()).await.unwrap();

    assert!(response.success, "errors: {:?}", response.errors);
    let map = response.empathy_map.as_ref().unwrap();
    assert_eq!(map.ticket_count, 2);
    assert_eq!(map.say_quadrant.insights, vec!["I can't log in to my account"]);
    assert_eq!(map.do_quadrant.insights, vec!["Retries login and export several times"]);
    assert_eq!(map.say_quadrant.quotes, vec!["I am frustrated"]);
    assert_eq!(map.pains.len(), 3);
    assert!((map.confidence_score - 0.8).abs() < 1e-9);

    // 未脱敏的 PII 不会发给 LLM
    assert_eq!(llm.calls_matching("jane.doe@example.com"), 0);
    assert_eq!(llm.calls_matching("555-123-4567"), 0);
    assert_eq!(llm.calls_matching("4111 1111"), 0);
    assert_eq!(llm.calls_matching("[REDACTED_EMAIL]"), 1);
    // 未授权的工单不会进入合成
    assert_eq!(llm.calls_matching("Dashboard loading"), 0);
    assert_eq!(llm.calls_matching("Why do customers struggle with login and export?"), 1);

    assert!(response.warnings.iter().any(|w| w == "duplicate ticket T-1 ignored"));
    assert!(response.warnings.iter().any(|w| w.starts_with("ticket T-3 skipped")));
    assert!(response.warnings.iter().any(|w| w.starts_with("ticket T-4 skipped")));

    let summary = response.summary.as_ref().unwrap();
    assert_eq!(summary.empathy_maps_generated, 1);
    assert_eq!(summary.total_segments, 1);
    assert_eq!(summary.key_metrics.total_tickets_processed, 4);
    assert_eq!(summary.key_metrics.total_customers, 4);
    assert_eq!(summary.key_metrics.consent_validation_count, 4);
    assert_eq!(summary.key_metrics.pii_redaction_count, 3);

    let document = response.document.as_ref().unwrap();
    assert!(document.url.starts_with("mock://empathy-maps/"));
}

#[tokio::test]
async fn test_falls_back_to_local_analysis() {
    let agent = EmpathyMappingAgent::new(Arc::new(ScriptedLlmClient::new())).unwrap();
    let response = agent.run("Why are customers unhappy?", tickets()).await.unwrap();

    assert!(response.success);
    assert!(response
        .warnings
        .iter()
        .any(|w| w.starts_with("empathy map built from local analysis")));
    assert!(response.warnings.iter().any(|w| w.starts_with("clarification failed")));

    let map = response.empathy_map.unwrap();
    assert!(map.say_quadrant.insights.contains(&"I can't log in to my account".to_string()));
    assert!(map.pains.contains(&"Problems with login".to_string()));
    assert!(map.pains.contains(&"Problems with export".to_string()));
    assert!(map.feel_quadrant.insights.contains(&"Users express frustration".to_string()));
    assert!((map.confidence_score - 0.3).abs() < 1e-9);
}

#[tokio::test]
async fn test_no_consent_means_no_map() {
    let llm = Arc::new(ScriptedLlmClient::new().on(SYNTHESIZE, vec![MAP]));
    let agent = EmpathyMappingAgent::new(llm.clone()).unwrap();
    let unconsented = vec![ticket("T-9", "C-9", "Crash", "The app crashes on start", None)];
    let response = agent.run("Why does the app crash?", unconsented).await.unwrap();

    assert!(!response.success);
    assert!(response.empathy_map.is_none());
    assert!(response.document.is_none());
    assert_eq!(llm.calls_matching(SYNTHESIZE), 0);
    assert!(response
        .warnings
        .iter()
        .any(|w| w == "no tickets with valid consent, no empathy map generated"));
    assert_eq!(response.summary.unwrap().empathy_maps_generated, 0);
}

#[tokio::test]
async fn test_custom_purpose_and_source() {
    let source = InMemoryTicketSource::new(tickets());
    let agent = EmpathyMappingAgent::with_purpose(Arc::new(ScriptedLlmClient::new()), "support").unwrap();
    let response = agent
        .run_from_source("Why are customers unhappy?", &source, &["T-2".to_string()])
        .await
        .unwrap();

    // 只有 T-2 授权了 support 用途
    assert_eq!(response.empathy_map.unwrap().ticket_count, 1);
}
