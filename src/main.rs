use clap::Parser;
use colored::*;
use eyre::{Context, Result, bail};
use log::info;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use cadence::cli::{Cli, Commands};
use cadence::config::Config;
use cadence::daemon::{Daemon, Engine};
use cadence::domain::PostStatus;
use cadence::id::now_ms;
use cadence::pipeline::schedule_today;
use cadence::scheduler::{JobKind, TickOutcome};

fn setup_logging() -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cadence")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("cadence.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    let engine = Arc::new(Engine::from_config(config).context("Failed to wire engine")?);

    match &cli.command {
        Commands::Run => run_daemon(config, engine).await,
        Commands::Generate { topic } => handle_generate(&engine, topic).await,
        Commands::Engine => run_job(config, engine, JobKind::DailyContent).await,
        Commands::Products => run_job(config, engine, JobKind::ProductCycle).await,
        Commands::Comments => run_job(config, engine, JobKind::CommentTick).await,
        Commands::Approve { id, at } => handle_approve(&engine, id, at.as_deref()),
        Commands::Reject { id } => handle_reject(&engine, id),
        Commands::Posts { status } => handle_posts(&engine, status.as_deref()),
        Commands::Activity { limit } => handle_activity(&engine, *limit),
        Commands::TokenStatus => handle_token_status(&engine).await,
    }
}

async fn run_daemon(config: &Config, engine: Arc<Engine>) -> Result<()> {
    println!("{}", "Starting cadence daemon...".cyan());
    let daemon = Daemon::new(config, engine)?;
    daemon.run().await?;
    println!("{}", "Daemon stopped".yellow());
    Ok(())
}

async fn run_job(config: &Config, engine: Arc<Engine>, kind: JobKind) -> Result<()> {
    info!("Manual run of job: {}", kind.name());
    println!("{} {}", "Running:".cyan(), kind.name());

    let daemon = Daemon::new(config, engine)?;
    match daemon.run_now(kind).await? {
        TickOutcome::Completed => {
            println!("{} {}", "Done:".green(), kind.name());
            Ok(())
        }
        TickOutcome::Skipped => {
            println!("{} {} is already running", "Skipped:".yellow(), kind.name());
            Ok(())
        }
        TickOutcome::Failed(message) => bail!("{} failed: {}", kind.name(), message),
    }
}

async fn handle_generate(engine: &Engine, topic: &str) -> Result<()> {
    println!("{} '{}'", "Generating post about".cyan(), topic);
    let item = engine.daily.generate_now(topic).await?;
    println!(
        "{} '{}' ({}), scheduled for the next publishing window",
        "Created:".green(),
        item.topic,
        item.id
    );
    Ok(())
}

fn handle_approve(engine: &Engine, id: &str, at: Option<&str>) -> Result<()> {
    let scheduled_for = match at {
        Some(time) => schedule_today(time),
        None => now_ms(),
    };

    let item = engine.lifecycle.approve(id, scheduled_for)?;
    println!("{} '{}' ({})", "Approved:".green(), item.topic, item.id);
    Ok(())
}

fn handle_reject(engine: &Engine, id: &str) -> Result<()> {
    let item = engine.lifecycle.reject(id)?;
    println!("{} '{}' ({})", "Rejected:".red(), item.topic, item.id);
    Ok(())
}

fn handle_posts(engine: &Engine, status: Option<&str>) -> Result<()> {
    let statuses: Vec<PostStatus> = match status {
        Some(s) => match PostStatus::parse(s) {
            Some(status) => vec![status],
            None => bail!("unknown status: {}", s),
        },
        None => vec![
            PostStatus::Draft,
            PostStatus::Approved,
            PostStatus::Published,
            PostStatus::Failed,
            PostStatus::Rejected,
        ],
    };

    let store = engine.store.lock().expect("store lock poisoned");
    for status in statuses {
        let posts = store.list_posts_by_status(status)?;
        if posts.is_empty() {
            continue;
        }
        println!("{}", status.as_str().to_uppercase().bold());
        for post in posts {
            println!("  {} {}", post.id.cyan(), post.topic);
        }
    }
    Ok(())
}

fn handle_activity(engine: &Engine, limit: usize) -> Result<()> {
    let entries = engine.activity.recent(limit)?;
    for entry in entries {
        let target = entry.to.as_deref().map(|t| format!(" -> {}", t)).unwrap_or_default();
        println!(
            "{} [{}{}] {}",
            entry.kind.as_str().yellow(),
            entry.from,
            target,
            entry.message
        );
    }
    Ok(())
}

async fn handle_token_status(engine: &Engine) -> Result<()> {
    let status = engine.token_monitor.check().await?;
    if status.is_valid {
        println!("{}", "Token is valid".green());
    } else {
        println!("{}", "Token is INVALID".red());
    }
    if let Some(days) = status.days_until_expiry {
        println!("  Expires in {} day(s)", days);
    }
    if !status.scopes.is_empty() {
        println!("  Scopes: {}", status.scopes.join(", "));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup logging first
    setup_logging().context("Failed to setup logging")?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}
