//! 工作流集成测试：通过公开 API 构建并运行状态图

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use whys::core::AgentError;
use whys::workflow::*;

#[derive(Debug, Default)]
struct Ticket {
    attempts: u32,
    approved: bool,
    trail: Vec<String>,
}

impl GraphState for Ticket {
    fn record_node(&mut self, name: &str, _elapsed: Duration) {
        self.trail.push(name.to_string());
    }
}

struct Attempt;

#[async_trait]
impl Node<Ticket> for Attempt {
    fn name(&self) -> &str {
        "attempt"
    }

    async fn run(&self, state: &mut Ticket) -> Result<(), AgentError> {
        state.attempts += 1;
        Ok(())
    }
}

struct Review {
    approve_after: u32,
}

#[async_trait]
impl Node<Ticket> for Review {
    fn name(&self) -> &str {
        "review"
    }

    async fn run(&self, state: &mut Ticket) -> Result<(), AgentError> {
        state.approved = state.attempts >= self.approve_after;
        Ok(())
    }
}

struct Slow;

#[async_trait]
impl Node<Ticket> for Slow {
    fn name(&self) -> &str {
        "slow"
    }

    async fn run(&self, _state: &mut Ticket) -> Result<(), AgentError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(())
    }
}

fn route(state: &Ticket) -> &'static str {
    if state.approved {
        "done"
    } else {
        "again"
    }
}

fn review_loop(approve_after: u32) -> CompiledGraph<Ticket> {
    GraphBuilder::new("review_loop")
        .node(Attempt)
        .node(Review { approve_after })
        .entry("attempt")
        .edge("attempt", "review")
        .conditional("review", route, &[("again", "attempt"), ("done", END)])
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_loop_until_approved() {
    let graph = review_loop(3);
    let state = graph
        .invoke(Ticket::default(), &RunConfig::default())
        .await
        .unwrap();

    assert_eq!(state.attempts, 3);
    assert!(state.approved);
    assert_eq!(
        state.trail,
        vec!["attempt", "review", "attempt", "review", "attempt", "review"]
    );
}

#[tokio::test]
async fn test_recursion_limit_stops_endless_loop() {
    let graph = review_loop(u32::MAX);
    let err = graph
        .invoke(Ticket::default(), &RunConfig::new(7))
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::RecursionLimit(7)));
}

#[tokio::test]
async fn test_cancel_interrupts_running_node() {
    let graph = GraphBuilder::new("slow")
        .node(Slow)
        .entry("slow")
        .edge("slow", END)
        .build()
        .unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let err = graph
        .invoke(Ticket::default(), &RunConfig::default().with_cancel(cancel))
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::Cancelled));
}

#[test]
fn test_invalid_graphs_are_rejected() {
    let missing_entry = GraphBuilder::<Ticket>::new("g")
        .node(Attempt)
        .edge("attempt", END)
        .build();
    assert!(matches!(missing_entry, Err(GraphError::MissingEntry)));

    let dangling = GraphBuilder::new("g")
        .node(Attempt)
        .entry("attempt")
        .edge("attempt", "nowhere")
        .build();
    assert!(matches!(dangling, Err(GraphError::UnknownNode(n)) if n == "nowhere"));
}

#[test]
fn test_mermaid_export() {
    let mermaid = review_loop(1).to_mermaid();
    assert!(mermaid.starts_with("flowchart TD\n"));
    assert!(mermaid.contains("__start__ --> attempt"));
    assert!(mermaid.contains("attempt --> review"));
    assert!(mermaid.contains("review -->|again| attempt"));
    assert!(mermaid.contains("review -->|done| __end__"));
}
