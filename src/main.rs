// SPDX-License-Identifier: MIT
mod cli;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use cli::{Cli, Commands};
use whisper_batch::{detect_format, parse_json, parse_text, parse_yaml, ExecutionModes, Executor, ScriptFormat};
use whisper_config::Config;
use whisper_tools::{ToolPolicy, ToolRegistry};
use whisper_workspace::validate_workspace;

fn build_registry(config: &Config) -> ToolRegistry {
    let policy = ToolPolicy::from_config(&config.tools);
    let mut registry = ToolRegistry::new(policy);

    let root = config.workspace.root.clone();
    registry.register(whisper_tools::ListFilesTool { root: root.clone() });
    registry.register(whisper_tools::ReadFileTool { root: root.clone() });
    registry.register(whisper_tools::WriteFileTool { root: root.clone() });
    registry.register(whisper_tools::CreateFileTool { root: root.clone() });

    let rfc_store = Arc::new(whisper_docs::RfcStore::new(config.workspace.rfc_dir()));
    let plan_store = Arc::new(whisper_docs::PlanStore::new(config.workspace.plans_dir(), config.workspace.rfc_dir()));
    registry.register(whisper_docs::CreateRfcTool { store: rfc_store.clone() });
    registry.register(whisper_docs::ReadRfcTool { store: rfc_store.clone() });
    registry.register(whisper_docs::UpdateRfcTool { store: rfc_store.clone() });
    registry.register(whisper_docs::MoveRfcTool { store: rfc_store.clone() });
    registry.register(whisper_docs::DeleteRfcTool { store: rfc_store.clone() });
    registry.register(whisper_docs::ListRfcsTool { store: rfc_store });
    registry.register(whisper_docs::PreparePlanFromRfcTool { store: plan_store.clone() });
    registry.register(whisper_docs::SaveGeneratedPlanTool { store: plan_store.clone() });
    registry.register(whisper_docs::UpdatePlanFromRfcTool { store: plan_store.clone() });
    registry.register(whisper_docs::MovePlanTool { store: plan_store.clone() });
    registry.register(whisper_docs::DeletePlanTool { store: plan_store.clone() });
    registry.register(whisper_docs::ListPlansTool { store: plan_store });

    registry.register(whisper_workspace::ValidateWorkspaceTool { config: config.clone() });

    registry
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry().with(filter).with(fmt::layer().with_writer(std::io::stderr)).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = whisper_config::load(cli.config.as_deref())?;

    match &cli.command {
        Commands::RunBatch { script, dry_run, stop_on_error } => run_batch(&config, script, *dry_run, *stop_on_error).await,
        Commands::HealthCheck { scripts_dir } => run_health_check(&config, scripts_dir.clone()).await,
        Commands::ValidateWorkspace => run_validate_workspace(&config),
    }
}

async fn run_batch(config: &Config, script_path: &PathBuf, dry_run: bool, stop_on_error: bool) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(script_path)
        .with_context(|| format!("reading {}", script_path.display()))?;
    let format = detect_format(script_path, &content);
    let script = match format {
        ScriptFormat::Json => parse_json(&content)?,
        ScriptFormat::Yaml => parse_yaml(&content)?,
        ScriptFormat::Text => parse_text(&content)?,
    };

    let registry = Arc::new(build_registry(config));
    let executor = Executor::new(registry, config.tools.allow_list.clone(), config.tools.deny_list.clone());
    let modes = ExecutionModes { dry_run, stop_on_error, ..Default::default() };
    let report = executor.run(&script, &modes).await?;

    println!(
        "batch '{}': {}/{} steps succeeded ({} failed)",
        script.name, report.completed, report.total, report.failed
    );
    for step in &report.per_step {
        println!("  [{}] {} -> {}", step.index, step.action.as_deref().unwrap_or("<raw>"), step.output);
    }
    if let Some(cascade) = &report.cascading_failure {
        println!("  cascading failure detected: root cause {}", cascade.root_cause);
        for step in &cascade.mitigation_steps {
            println!("    mitigation: {step}");
        }
    }

    if !report.success {
        anyhow::bail!("batch script reported failures");
    }
    Ok(())
}

async fn run_health_check(config: &Config, scripts_dir: Option<PathBuf>) -> anyhow::Result<()> {
    let dir = scripts_dir.unwrap_or_else(|| config.workspace.whisper_dir().join("health_scripts"));
    let registry = Arc::new(build_registry(config));
    let report = whisper_workspace::run_health_check(
        &dir,
        registry,
        config.tools.allow_list.clone(),
        config.tools.deny_list.clone(),
        config.tools.deadline_secs,
    )
    .await;

    println!("{}", report.summary());
    for result in &report.results {
        println!("  {:?} {} — {}", result.outcome, result.script.display(), result.detail);
    }
    if let Some(cascade) = &report.cascading_failure {
        println!("cascading failure detected: root cause {}", cascade.root_cause);
        for step in &cascade.mitigation_steps {
            println!("  mitigation: {step}");
        }
    }
    Ok(())
}

fn run_validate_workspace(config: &Config) -> anyhow::Result<()> {
    let health = validate_workspace(config);
    println!("overall status: {:?}", health.overall_status);
    for check in &health.checks {
        println!("  [{:?}] {} ({:?}): {}", check.status, check.name, check.category, check.message);
        if let Some(rec) = &check.recommendation {
            println!("    recommendation: {rec}");
        }
    }
    Ok(())
}
