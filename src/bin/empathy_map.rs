//! 共情地图命令行：读取支持工单 JSON 文件，生成共情地图

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use whys::config::load_config;
use whys::empathy::{EmpathyMapQuadrant, EmpathyMapResponse, EmpathyMappingAgent, InMemoryTicketSource};
use whys::llm::create_llm_from_config;
use whys::observability;

/// Build an empathy map from a JSON file of support tickets
#[derive(Parser, Debug)]
#[command(name = "empathy-map", author, version, about, long_about = None)]
struct Cli {
    /// JSON file containing an array of support tickets
    tickets: PathBuf,

    /// The problem being researched
    #[arg(short = 'q', long, default_value = "Why do users contact support?")]
    problem: String,

    /// Only process these ticket ids (repeatable)
    #[arg(short, long = "ticket")]
    ticket_ids: Vec<String>,

    /// Consent purpose the tickets must be granted for
    #[arg(long)]
    purpose: Option<String>,

    /// Extra config file layered over config/default.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the response as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = load_config(cli.config.clone()).context("Failed to load config")?;
    observability::init(cfg.app.debug);

    let raw = std::fs::read_to_string(&cli.tickets)
        .with_context(|| format!("Failed to read {}", cli.tickets.display()))?;
    let source = InMemoryTicketSource::from_json(&raw).context("Failed to parse tickets")?;

    let llm = create_llm_from_config(&cfg);
    let agent = match &cli.purpose {
        Some(purpose) => EmpathyMappingAgent::with_purpose(llm, purpose),
        None => EmpathyMappingAgent::new(llm),
    }
    .context("Failed to build agent")?;

    let response = agent
        .run_from_source(&cli.problem, &source, &cli.ticket_ids)
        .await
        .context("Empathy mapping failed")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_response(&response);
    }
    Ok(())
}

fn print_quadrant(title: &str, quadrant: &EmpathyMapQuadrant) {
    println!("\n{} ({:.0}%)", title, quadrant.confidence_score * 100.0);
    for insight in &quadrant.insights {
        println!("  - {}", insight);
    }
    for quote in &quadrant.quotes {
        println!("  \"{}\"", quote);
    }
}

fn print_list(title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!("\n{}", title);
    for item in items {
        println!("  - {}", item);
    }
}

fn print_response(response: &EmpathyMapResponse) {
    match &response.empathy_map {
        Some(map) => {
            println!("🗺️  Empathy Map {} ({} tickets)", map.map_id, map.ticket_count);
            println!("{}", "=".repeat(50));
            print_quadrant("💬 Say", &map.say_quadrant);
            print_quadrant("💭 Think", &map.think_quadrant);
            print_quadrant("🏃 Do", &map.do_quadrant);
            print_quadrant("❤️  Feel", &map.feel_quadrant);
            print_list("🎯 Goals", &map.goals);
            print_list("😣 Pains", &map.pains);
            print_list("🌱 Gains", &map.gains);
            print_list("🔍 Latent Needs", &map.latent_needs);
        }
        None => println!("No empathy map generated."),
    }

    if let Some(doc) = &response.document {
        println!("\n📄 Document: {}", doc.url);
    }
    if let Some(summary) = &response.summary {
        let m = &summary.key_metrics;
        println!(
            "\n📊 {} tickets, {} customers, {} consent checks, {} PII entities redacted",
            m.total_tickets_processed, m.total_customers, m.consent_validation_count, m.pii_redaction_count
        );
    }
    print_list("⚠️  Warnings", &response.warnings);
    print_list("❌ Errors", &response.errors);
    println!("\n⏱️  Processing Time: {:.2} seconds", response.processing_time);
}
