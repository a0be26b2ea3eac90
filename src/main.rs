//! Whys - Five Whys 根因分析命令行
//!
//! 入口：加载配置、初始化日志、创建 LLM 与搜索后端，对给定问题运行分析并打印报告。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use whys::config::load_config;
use whys::five_whys::{FiveWhysAgent, FiveWhysResult};
use whys::llm::create_llm_from_config;
use whys::observability;
use whys::tools::{TavilySearch, WebSearch};

const DEFAULT_PROBLEM: &str = "Cancer is a disease that affects the body. Why is it so common?";

/// Run a 5 Whys root cause analysis on a problem statement
#[derive(Parser, Debug)]
#[command(name = "whys", author, version, about, long_about = None)]
struct Cli {
    /// The problem to analyze
    #[arg(num_args = 0..)]
    problem: Vec<String>,

    /// Maximum number of why levels (defaults to agent.max_whys)
    #[arg(short, long)]
    max_whys: Option<usize>,

    /// Extra config file layered over config/default.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Skip web search
    #[arg(long)]
    no_search: bool,

    /// Print the workflow graph as Mermaid and exit
    #[arg(long)]
    print_graph: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut cfg = load_config(cli.config.clone()).context("Failed to load config")?;
    observability::init(cfg.app.debug);

    if cli.no_search {
        cfg.agent.use_web_search = false;
    }

    let llm = create_llm_from_config(&cfg);
    let search = if cfg.agent.use_web_search {
        TavilySearch::from_env(&cfg.tools.web_search)
            .map(|s| Arc::new(s.with_debug(cfg.app.debug)) as Arc<dyn WebSearch>)
    } else {
        None
    };

    let agent = FiveWhysAgent::new(llm.clone(), search, cfg.agent.clone()).context("Failed to build agent")?;
    if cli.print_graph {
        println!("{}", agent.graph_mermaid());
        return Ok(());
    }

    let problem = if cli.problem.is_empty() {
        DEFAULT_PROBLEM.to_string()
    } else {
        cli.problem.join(" ")
    };
    let max_whys = cli.max_whys.unwrap_or(cfg.agent.max_whys);

    // Ctrl-C 取消正在进行的分析
    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    if !cli.json {
        println!("🔍 Starting 5 Whys Analysis...");
        println!("Problem: {}", problem);
        println!("{}", "=".repeat(50));
    }

    let result = agent
        .analyze_with_cancel(&problem, max_whys, cancel)
        .await
        .context("Analysis failed")?;

    let (prompt_tokens, completion_tokens, total_tokens) = llm.token_usage();
    tracing::info!(
        model = llm.model_name(),
        prompt_tokens,
        completion_tokens,
        total_tokens,
        "Token usage"
    );

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }
    Ok(())
}

fn print_result(result: &FiveWhysResult) {
    println!("\n📊 ANALYSIS RESULTS");
    println!("{}", "=".repeat(50));

    println!("\n🎯 Root Cause: {}", result.root_cause);

    println!("\n🔗 Why Chain:");
    for (i, step) in result.why_chain.iter().enumerate() {
        println!("  {}. {}", i + 1, step.question);
        println!("     → {}", step.answer);
        if !step.evidence.is_empty() {
            println!("     Evidence: {}", step.evidence);
        }
        println!();
    }

    println!("\n💡 Recommended Solutions:");
    for (i, solution) in result.solutions.iter().enumerate() {
        println!("  {}. {}", i + 1, solution);
    }

    println!("\n📋 Full Report:");
    println!("{}", result.report);

    println!("\n⏱️  Processing Time: {:.2} seconds", result.processing_time_secs);
    match result.stop_reason {
        Some(reason) => println!("🏁 Stop Reason: {}", reason),
        None => println!("🏁 Stop Reason: none"),
    }

    if !result.errors.is_empty() {
        println!("\n⚠️  Errors: {:?}", result.errors);
    }
}
