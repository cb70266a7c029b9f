//! taskengine - CLI entry point
//!
//! Runs JSON-lines request files against an in-process task manager.

use std::path::Path;
use std::sync::Arc;

use chrono::{Duration, Utc};
use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tokio::io::{AsyncBufRead, BufReader};
use tracing::{debug, info};

use taskengine::api;
use taskengine::cli::{Cli, Command};
use taskengine::clock::SystemClock;
use taskengine::config::Config;
use taskengine::domain::{NewTask, Priority, Task, TaskId, TaskPatch, TaskStatus};
use taskengine::engine::{PageRequest, SortField, SortOrder, SortSpec, TaskEngine, TaskFilter, TaskQuery};
use taskengine::error::TaskResult;
use taskengine::state::TaskManager;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    // stdout carries responses, so logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    debug!("Logging initialized (level: {:?})", level);
    Ok(())
}

fn spawn_manager(config: &Config) -> TaskManager {
    let engine = TaskEngine::with_clock(Arc::new(SystemClock)).with_settings(config.engine_settings());
    TaskManager::spawn_with_capacity(engine, config.manager.channel_capacity, config.manager.event_capacity)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    setup_logging(cli.log_level.as_deref(), config.log_level.as_deref()).context("Failed to setup logging")?;
    config.validate().context("Invalid configuration")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Run { file } => cmd_run(&config, file.as_deref()).await,
        Command::Demo => cmd_demo(&config).await,
        Command::Config => cmd_config(&config),
    }
}

async fn cmd_run(config: &Config, file: Option<&Path>) -> Result<()> {
    let reader: Box<dyn AsyncBufRead + Unpin> = match file {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .context(format!("Failed to open {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    let manager = spawn_manager(config);
    let handled = api::run_lines(&manager, reader, tokio::io::stdout())
        .await
        .context("Failed to process requests")?;
    manager.shutdown().await?;

    info!(handled, "run complete");
    Ok(())
}

fn cmd_config(config: &Config) -> Result<()> {
    let yaml = serde_yaml::to_string(config).context("Failed to serialize configuration")?;
    print!("{yaml}");
    Ok(())
}

fn print_task(task: &Task) {
    let status = match task.status {
        TaskStatus::Pending => task.status.to_string().yellow(),
        TaskStatus::InProgress => task.status.to_string().cyan(),
        TaskStatus::Completed => task.status.to_string().green(),
        TaskStatus::Archived => task.status.to_string().dimmed(),
    };
    let deps = if task.dependencies.is_empty() {
        String::new()
    } else {
        let ids: Vec<String> = task.dependencies.iter().map(TaskId::to_string).collect();
        format!(" after {}", ids.join(", "))
    };
    println!(
        "  {} {:<18} {:<12} {:<7} [{}]{}",
        format!("#{}", task.id).bold(),
        task.title,
        status,
        task.priority,
        task.tags.join(", "),
        deps.dimmed()
    );
}

fn print_outcome(action: &str, result: &TaskResult<Task>) {
    match result {
        Ok(task) => println!("{} {} -> {}", "✓".green(), action, task.status),
        Err(err) => println!("{} {} rejected: {}", "✗".red(), action, err.to_string().red()),
    }
}

async fn cmd_demo(config: &Config) -> Result<()> {
    let manager = spawn_manager(config);
    let due = |days| Utc::now() + Duration::days(days);

    println!("{}", "Seeding tasks".bright_cyan().bold());
    let schema = manager
        .create_task(NewTask::new("Design schema", due(3), ["backend", "db"]).with_priority(Priority::High))
        .await?;
    let api_task = manager
        .create_task(NewTask::new("Implement API", due(7), ["backend"]).with_dependencies([schema.id]))
        .await?;
    let docs = manager
        .create_task(NewTask::new("Write docs", due(10), ["docs"]).with_priority(Priority::Low))
        .await?;
    let release = manager
        .create_task(
            NewTask::new("Release", due(14), ["release", "backend"])
                .with_priority(Priority::High)
                .with_dependencies([api_task.id, docs.id]),
        )
        .await?;

    println!("\n{}", "Lifecycle".bright_cyan().bold());
    let step = |id, status| manager.update_task(id, TaskPatch::status(status));
    print_outcome("schema: start", &step(schema.id, TaskStatus::InProgress).await);
    print_outcome("schema: archive", &step(schema.id, TaskStatus::Archived).await);
    print_outcome("schema: complete", &step(schema.id, TaskStatus::Completed).await);
    print_outcome("release: start", &step(release.id, TaskStatus::InProgress).await);
    print_outcome("release: complete", &step(release.id, TaskStatus::Completed).await);
    print_outcome(
        "api: depend on release",
        &manager
            .update_task(api_task.id, TaskPatch::dependencies([schema.id, release.id]))
            .await,
    );
    match manager.delete_task(schema.id).await {
        Ok(_) => println!("{} schema deleted", "✓".green()),
        Err(err) => println!("{} schema: delete rejected: {}", "✗".red(), err.to_string().red()),
    }

    println!("\n{}", "Tasks by priority".bright_cyan().bold());
    let query = TaskQuery::new(
        TaskFilter::default(),
        SortSpec::new(SortField::Priority, SortOrder::Desc),
        PageRequest::new(1, 10),
    );
    let page = manager.list_tasks(query).await?;
    for task in &page.tasks {
        print_task(task);
    }
    println!(
        "  {}",
        format!(
            "page {}/{} ({} total)",
            page.pagination.page, page.pagination.pages, page.pagination.total
        )
        .dimmed()
    );

    println!("\n{}", "Analytics".bright_cyan().bold());
    println!("  completion rate:  {}", manager.completion_rate().await?.to_string().green());
    println!("  average time:     {}", manager.average_completion_time().await?.to_string().green());
    let tags: Vec<String> = manager
        .popular_tags()
        .await?
        .into_iter()
        .map(|t| format!("{} ({})", t.tag, t.count))
        .collect();
    println!("  popular tags:     {}", tags.join(", "));
    let breakdown: Vec<String> = manager
        .status_breakdown()
        .await?
        .into_iter()
        .map(|s| format!("{}={}", s.status, s.count))
        .collect();
    println!("  status:           {}", breakdown.join(" "));
    let order: Vec<String> = manager
        .topological_order()
        .await?
        .iter()
        .map(|id| format!("#{id}"))
        .collect();
    println!("  execution order:  {}", order.join(" -> "));

    manager.shutdown().await?;
    Ok(())
}
