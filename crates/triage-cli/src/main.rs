//! Triage CLI
//!
//! The `triage` command turns bug reports into debugging signals and ranked
//! knowledge.
//!
//! ## Commands
//!
//! - `preprocess`: Extract the signal (stack, entities, keywords, logs) from a bug report
//! - `retrieve`: Preprocess, then search code, cases and log patterns and fuse the results
//! - `stats`: Show per-channel item counts of a knowledge file

mod knowledge;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};

use triage_core::{
    BugInput, BugSignal, Channel, ChannelToggles, HybridRetriever, LogFormat, Preprocessor,
    RequestSpan, RetrievalResult, SearchRequest, TriageConfig, METRICS,
};

use knowledge::KnowledgeBase;

#[derive(Parser)]
#[command(name = "triage")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Bug triage: signal extraction and knowledge retrieval", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// TOML configuration file
    #[arg(long, global = true, env = "TRIAGE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the debugging signal from a bug report
    Preprocess {
        /// Bug report (JSON)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Retrieve ranked knowledge for a bug report
    Retrieve {
        /// Bug report (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Knowledge base (JSON with code, cases, log_patterns)
        #[arg(short, long)]
        knowledge: PathBuf,

        /// Results per channel and after fusion (overrides config)
        #[arg(long, env = "TRIAGE_TOP_K")]
        top_k: Option<usize>,

        /// Skip the code channel
        #[arg(long)]
        no_code: bool,

        /// Skip the historical-case channel
        #[arg(long)]
        no_case: bool,

        /// Skip the log-pattern channel
        #[arg(long)]
        no_log_pattern: bool,
    },

    /// Show per-channel item counts of a knowledge base
    Stats {
        /// Knowledge base (JSON with code, cases, log_patterns)
        #[arg(short, long)]
        knowledge: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    triage_core::init_tracing(LogFormat::from_json_flag(cli.json), level);

    let config = load_config(cli.config.as_deref())?;

    let result = match cli.command {
        Commands::Preprocess { input } => cmd_preprocess(&config, &input),
        Commands::Retrieve {
            input,
            knowledge,
            top_k,
            no_code,
            no_case,
            no_log_pattern,
        } => {
            let channels = config
                .retrieval
                .channels
                .with(Channel::Code, config.retrieval.channels.code && !no_code)
                .with(Channel::Case, config.retrieval.channels.case && !no_case)
                .with(
                    Channel::LogPattern,
                    config.retrieval.channels.log_pattern && !no_log_pattern,
                );
            cmd_retrieve(&config, &input, &knowledge, top_k, channels).await
        }
        Commands::Stats { knowledge } => cmd_stats(&config, &knowledge).await,
    };

    METRICS.flush();
    result
}

fn load_config(path: Option<&Path>) -> Result<TriageConfig> {
    match path {
        Some(path) => TriageConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(TriageConfig::default()),
    }
}

fn read_bug(path: &Path) -> Result<BugInput> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read bug report {}", path.display()))?;
    let mut bug: BugInput = serde_json::from_str(&text)
        .with_context(|| format!("Invalid bug report {}", path.display()))?;
    bug.ensure_bug_id();
    Ok(bug)
}

/// Output of `triage retrieve`.
#[derive(Debug, Serialize)]
struct RetrieveReport {
    bug_id: String,
    query: String,
    signal: BugSignal,
    results: Vec<RetrievalResult>,
}

fn build_signal(config: &TriageConfig, bug: &BugInput) -> BugSignal {
    let _span = RequestSpan::enter(bug.bug_id.as_deref().unwrap_or("-"));
    Preprocessor::with_config(&config.preprocess).process(bug)
}

async fn build_retrieve_report(
    config: &TriageConfig,
    input: &Path,
    knowledge: &Path,
    top_k: Option<usize>,
    channels: ChannelToggles,
) -> Result<RetrieveReport> {
    if top_k == Some(0) {
        anyhow::bail!("--top-k must be > 0");
    }

    let bug = read_bug(input)?;
    let index = KnowledgeBase::load(knowledge)?.into_index();
    let signal = build_signal(config, &bug);

    let mut request = SearchRequest::for_bug(&bug, &signal).with_channels(channels);
    if let Some(top_k) = top_k {
        request = request.with_top_k(top_k);
    }

    let retriever = HybridRetriever::with_config(Arc::new(index), &config.retrieval);
    let results = retriever.retrieve(&request).await;
    info!(results = results.len(), "retrieval complete");

    Ok(RetrieveReport {
        bug_id: bug.bug_id.clone().unwrap_or_default(),
        query: request.query,
        signal,
        results,
    })
}

async fn build_stats(config: &TriageConfig, knowledge: &Path) -> Result<BTreeMap<Channel, usize>> {
    let index = KnowledgeBase::load(knowledge)?.into_index();
    let retriever = HybridRetriever::with_config(Arc::new(index), &config.retrieval);
    retriever
        .stats()
        .await
        .context("Failed to count knowledge items")
}

/// Print the extracted signal as JSON
fn cmd_preprocess(config: &TriageConfig, input: &Path) -> Result<()> {
    let bug = read_bug(input)?;
    let signal = build_signal(config, &bug);
    println!("{}", serde_json::to_string_pretty(&signal)?);
    Ok(())
}

/// Print the fused retrieval report as JSON
async fn cmd_retrieve(
    config: &TriageConfig,
    input: &Path,
    knowledge: &Path,
    top_k: Option<usize>,
    channels: ChannelToggles,
) -> Result<()> {
    let report = build_retrieve_report(config, input, knowledge, top_k, channels).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Print per-channel counts
async fn cmd_stats(config: &TriageConfig, knowledge: &Path) -> Result<()> {
    let stats = build_stats(config, knowledge).await?;
    for (channel, count) in &stats {
        println!("{:<12} {}", channel.as_str(), count);
    }
    Ok(())
}
