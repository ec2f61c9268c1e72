//! optiloop CLI - RL-guided code refinement.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use optiloop_agents::{ChatClient, ChatConfig, ChatModel, LlmCritic, LlmGenerator};
use optiloop_core::{Observation, ObjectiveWeights, OptimizationReport, OptimizationRequest};
use optiloop_encoder::{encode_report, scan};
use optiloop_engine::{EngineConfig, Orchestrator};
use optiloop_policy::load_adapter;
use optiloop_sandbox::{ProcessSandbox, SandboxConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "optiloop")]
#[command(about = "RL-guided iterative code optimization", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Optimize a Python file
    Optimize {
        /// Source file
        file: PathBuf,
        /// Refinement rounds (1-5)
        #[arg(long, default_value = "3")]
        rounds: usize,
        /// Runtime preference
        #[arg(long, default_value = "0.6")]
        runtime_pref: f64,
        /// Memory preference
        #[arg(long, default_value = "0.25")]
        memory_pref: f64,
        /// Quality preference
        #[arg(long, default_value = "0.15")]
        quality_pref: f64,
        /// Policy weights (JSON); the fallback policy is used without one
        #[arg(long, env = "OPTILOOP_POLICY")]
        policy: Option<PathBuf>,
        /// Sample the action instead of taking the most likely one
        #[arg(long)]
        stochastic: bool,
        /// Executions per benchmark
        #[arg(long, default_value = "1")]
        runs: usize,
        /// Interpreter
        #[arg(long, default_value = "python3")]
        python: String,
        /// Measure peak memory with tracemalloc
        #[arg(long, default_value = "true", action = clap::ArgAction::Set)]
        measure_memory: bool,
        /// Chat model
        #[arg(long, default_value = "gpt-4o-mini")]
        model: String,
        /// API base URL
        #[arg(long, env = "OPTILOOP_API_BASE", default_value = "https://api.openai.com/v1")]
        api_base: String,
        /// API key
        #[arg(long, env = "OPTILOOP_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
        /// Per-agent timeout in seconds
        #[arg(long, default_value = "60")]
        agent_timeout: u64,
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the observation vector and scan report for a file
    Encode {
        /// Source file
        file: PathBuf,
        /// Baseline runtime in seconds
        #[arg(long, default_value = "0")]
        runtime: f64,
        /// Baseline memory in MB
        #[arg(long, default_value = "0")]
        memory: f64,
    },
    /// Load a policy and print its meta-action
    Policy {
        /// Policy weights (JSON)
        path: PathBuf,
        /// Source file to encode; a zero observation is used without one
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

fn init_logging() {
    // Reports go to stdout, logs to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn api_key(flag: Option<String>) -> Result<String> {
    flag.or_else(|| std::env::var("OPENAI_API_KEY").ok())
        .filter(|key| !key.trim().is_empty())
        .context("No API key: set OPTILOOP_API_KEY or OPENAI_API_KEY, or pass --api-key")
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Optimize {
            file,
            rounds,
            runtime_pref,
            memory_pref,
            quality_pref,
            policy,
            stochastic,
            runs,
            python,
            measure_memory,
            model,
            api_base,
            api_key: key,
            agent_timeout,
            json,
        } => {
            let code = read_source(&file)?;
            let request = OptimizationRequest::new(code)
                .with_max_refinements(rounds)
                .with_preferences(runtime_pref, memory_pref, quality_pref);

            let chat: Arc<dyn ChatModel> = Arc::new(ChatClient::new(
                ChatConfig::default()
                    .with_api_key(api_key(key)?)
                    .with_base_url(api_base)
                    .with_model(model)
                    .with_timeout(Duration::from_secs(agent_timeout)),
            )?);
            let sandbox = ProcessSandbox::new(
                SandboxConfig::default()
                    .with_interpreter(python)
                    .with_runs(runs)
                    .with_memory_measurement(measure_memory),
            );

            let orchestrator = Orchestrator::new(
                load_adapter(policy.as_deref()),
                Arc::new(sandbox),
                Arc::new(LlmCritic::new(chat.clone())),
            )
            .with_generators(LlmGenerator::family(chat))
            .with_config(
                EngineConfig::default()
                    .with_deterministic(!stochastic)
                    .with_agent_timeout(Duration::from_secs(agent_timeout)),
            );

            info!("Optimizing {}", file.display());
            let report = orchestrator.optimize(&request).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_summary(&report);
            }
        }
        Commands::Encode {
            file,
            runtime,
            memory,
        } => {
            let code = read_source(&file)?;
            let (observation, report) = match scan(&code) {
                Ok(report) => (encode_report(&report, runtime, memory), Some(report)),
                Err(e) => {
                    info!("Scan failed, observation is all zeros: {}", e);
                    (Observation::zeros(), None)
                }
            };
            let output = serde_json::json!({
                "observation": observation,
                "scan": report,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Policy { path, file } => {
            let adapter = load_adapter(Some(&path));
            if !adapter.has_model() {
                anyhow::bail!("Failed to load policy from {}", path.display());
            }
            let observation = match file {
                Some(file) => optiloop_encoder::encode(&read_source(&file)?, 0.0, 0.0),
                None => Observation::zeros(),
            };
            let meta = adapter.act(&observation, ObjectiveWeights::default(), true);
            println!("{}", serde_json::to_string_pretty(&meta)?);
        }
    }

    Ok(())
}

fn print_summary(report: &OptimizationReport) {
    let m = &report.metrics;
    println!("Run {}", report.run_id);
    println!("  Strategy: {}", report.strategy_label);
    println!("  Reward: {:.4}", report.reward);
    println!(
        "  Runtime: {:.4}s -> {:.4}s ({:+.1}%)",
        m.baseline_runtime, m.optimized_runtime, m.runtime_improvement_pct
    );
    println!(
        "  Memory: {:.2} MB -> {:.2} MB ({:+.1}%)",
        m.baseline_memory, m.optimized_memory, m.memory_improvement_pct
    );
    println!("  Test pass rate: {:.2}", m.test_pass_rate);
    println!(
        "  Policy: {} (confidence {:.2}{})",
        report.meta_action.selected_action,
        report.meta_action.confidence,
        if report.meta_action.fallback { ", fallback" } else { "" }
    );
    for rule in &report.applied_overrides {
        println!("  Override: {:?}", rule);
    }

    println!();
    println!("  {:<6} {:<18} {:>8} {:>9} {:>9}", "Round", "Agent", "Reward", "Runtime%", "Memory%");
    for entry in &report.trace {
        println!(
            "  {:<6} {:<18} {:>8} {:>9.1} {:>9.1}{}",
            entry.round,
            entry.agent.map(|a| a.label()).unwrap_or("none"),
            entry
                .reward
                .map(|r| format!("{:.4}", r))
                .unwrap_or_else(|| "-".to_string()),
            entry.runtime_improvement_pct,
            entry.memory_improvement_pct,
            if entry.promoted { " *" } else { "" }
        );
    }
    for warning in &report.warnings {
        println!("  Warning: {}", warning);
    }

    println!();
    println!("{}", report.optimized_code);
}
