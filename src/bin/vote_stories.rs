//! 用户故事评分命令行
//!
//! 默认使用 NVIDIA 托管模型；缺少 BUILD_NVIDIA_API_KEY 时打印配置指引。

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use whys::config::load_config;
use whys::core::AgentError;
use whys::llm::try_create_llm;
use whys::observability;
use whys::vote_stories::VoteStoriesAgent;

const DEFAULT_STORY: &str = "As a user, I want to be able to create a report in a click.";

/// Vote on an agile user story from 0 (WEAK) to 5 (GOOD)
#[derive(Parser, Debug)]
#[command(name = "vote-stories", author, version, about, long_about = None)]
struct Cli {
    /// The user story to vote on
    #[arg(num_args = 0..)]
    story: Vec<String>,

    /// Argument given to the voter (repeatable)
    #[arg(short, long = "argument")]
    arguments: Vec<String>,

    /// LLM provider (lmstudio / openai / nvidia / mock)
    #[arg(short, long, default_value = "nvidia")]
    provider: String,

    /// Extra config file layered over config/default.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut cfg = load_config(cli.config.clone()).context("Failed to load config")?;
    observability::init(cfg.app.debug);
    cfg.llm.provider = cli.provider.clone();

    let llm = match try_create_llm(&cfg) {
        Ok(llm) => llm,
        Err(AgentError::ConfigError(msg)) => {
            println!("Configuration error: {}", msg);
            println!("\nTo fix this:");
            println!("1. Export your NVIDIA API key: BUILD_NVIDIA_API_KEY=your_api_key_here");
            println!("2. Get your API key from: https://build.nvidia.com/");
            println!("3. Or pick another backend with --provider (lmstudio / openai / mock)");
            std::process::exit(2);
        }
        Err(e) => return Err(e).context("Failed to create LLM"),
    };

    let story = if cli.story.is_empty() {
        DEFAULT_STORY.to_string()
    } else {
        cli.story.join(" ")
    };

    let agent = VoteStoriesAgent::new(llm, Duration::from_secs(cfg.llm.timeouts.vote));
    let vote = if cli.arguments.is_empty() {
        agent.vote(&story).await
    } else {
        agent.vote_with_arguments(&story, cli.arguments.clone()).await
    }
    .context("Vote failed")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&vote)?);
    } else {
        println!("{}", vote.output);
        match vote.score {
            Some(score) => println!("\nScore: {}/5", score),
            None => println!("\nScore: could not be parsed"),
        }
    }
    Ok(())
}
