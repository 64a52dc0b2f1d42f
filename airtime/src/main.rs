use std::sync::Arc;

use airtime::config::AppConfig;
use airtime::logging;
use airtime::media::{FfprobeProber, MediaProber, MetadataCache};
use airtime::schedule::{ScheduleStore, resolve};
use airtime::scheduler::Scheduler;
use airtime::status::read_status;
use airtime::utils::fs;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Parser)]
#[command(name = "airtime", version, about = "24-hour broadcast schedule runner")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Publish now/next status every tick until interrupted (default).
    Run,
    /// Rescan the media library once and persist the metadata catalog.
    Rescan,
    /// Print the last published status.
    Status,
    /// Print what the schedule resolves to right now, without publishing.
    Resolve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load environment variables
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env_or_default();

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(config).await,
        Command::Rescan => rescan(config).await,
        Command::Status => status(&config).await,
        Command::Resolve => resolve_now(&config).await,
    }
}

fn prober(config: &AppConfig) -> Arc<dyn MediaProber> {
    Arc::new(FfprobeProber::new(
        config.ffprobe_path.clone(),
        config.probe_timeout,
    ))
}

async fn run(config: AppConfig) -> anyhow::Result<()> {
    let (logging, _guard) = logging::init_logging(&config.log_dir)?;
    if let Some(directive) = &config.log_filter
        && let Err(e) = logging.set_filter(directive)
    {
        warn!(error = %e, "Ignoring AIRTIME_LOG_FILTER");
    }
    info!("Starting broadcast scheduler");

    let mut scheduler = match Scheduler::bootstrap(&config, prober(&config)).await {
        Ok(scheduler) => scheduler,
        Err(e) => {
            error!(error = %e, "Scheduler failed to start");
            return Err(e.into());
        }
    };

    let cancel = CancellationToken::new();
    logging.start_retention_cleanup(cancel.clone());

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, stopping scheduler");
        }
        shutdown.cancel();
    });

    scheduler.run(cancel).await;
    info!("Broadcast scheduler stopped");
    Ok(())
}

async fn rescan(config: AppConfig) -> anyhow::Result<()> {
    let (_logging, _guard) = logging::init_logging(&config.log_dir)?;
    config.validate()?;

    fs::ensure_dir_all_with_op("creating media directory", &config.media_dir).await?;
    fs::ensure_parent_dir(&config.metadata_path).await?;

    let mut cache = MetadataCache::new(
        &config.metadata_path,
        &config.media_dir,
        prober(&config),
        config.probe_concurrency,
    );
    let count = cache.refresh(Utc::now()).await?;
    println!(
        "Metadata rescan complete: {count} items written to {}",
        cache.path().display()
    );
    Ok(())
}

async fn status(config: &AppConfig) -> anyhow::Result<()> {
    let Some(status) = read_status(&config.status_path).await? else {
        println!("No status file found.");
        return Ok(());
    };

    println!("UTC now: {}", status.current_utc);
    if let Some(current) = status.current_item {
        println!("Now: {} -> {}", current.time, current.media);
    }
    if let Some(next) = status.next_item {
        println!("Next: {} -> {}", next.time, next.media);
    }
    if let Some(metadata) = status.metadata {
        println!("Title: {}", metadata.title);
    }
    Ok(())
}

async fn resolve_now(config: &AppConfig) -> anyhow::Result<()> {
    let mut store = ScheduleStore::new(&config.schedule_path, config.default_display_secs);
    let now = Utc::now();
    let schedule = store.load().await;
    let resolution = resolve(schedule, now);

    println!("UTC now: {}", now.format("%H:%M:%S"));
    match (resolution.current, resolution.next) {
        (Some(current), Some(next)) => {
            println!("Now: {} -> {}", current.time_of_day, current.media_id);
            println!("Next: {} -> {}", next.time_of_day, next.media_id);
        }
        _ => println!("Schedule is empty."),
    }

    let mut cache = MetadataCache::new(
        &config.metadata_path,
        &config.media_dir,
        prober(config),
        config.probe_concurrency,
    );
    cache.load_persisted().await;
    if let Some(current) = resolution.current
        && cache.catalog().get(&current.media_id).is_none()
    {
        println!("Warning: {} is not in the metadata catalog.", current.media_id);
    }
    Ok(())
}
