use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use release_tracker::config::{TrackerConfig, log_dir};
use release_tracker::release::fetcher::{Fetcher, GitHubFetcher};
use release_tracker::release::types::RepositoryId;
use release_tracker::tracker::error::TrackerError;
use release_tracker::tracker::registry::TrackerRegistry;
use release_tracker::tracker::sensor::{ReleaseSensor, SensorView};
use release_tracker::tracker::state::CoordinatorState;

#[derive(Parser)]
#[command(name = "release-tracker")]
#[command(version, about = "Tracks the latest GitHub release of repositories")]
struct Cli {
    /// Write log lines as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Track repositories and print a JSON line whenever a sensor changes
    Run {
        /// Repositories as `owner/name` or GitHub URLs
        repositories: Vec<String>,

        /// JSON config file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Poll interval in seconds
        #[arg(long)]
        poll_interval: Option<u64>,

        /// GitHub API base URL
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Fetch the latest release of one repository and print it
    Check {
        repository: String,

        /// GitHub API base URL
        #[arg(long)]
        base_url: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_logging(cli.log_json)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    match cli.command {
        Command::Run {
            repositories,
            config,
            poll_interval,
            base_url,
        } => {
            let mut tracker_config = match config {
                Some(path) => TrackerConfig::load(&path)?,
                None => TrackerConfig::default(),
            };
            tracker_config.repositories.extend(repositories);
            if let Some(secs) = poll_interval {
                tracker_config.poll_interval = secs.saturating_mul(1000);
            }
            if let Some(base_url) = base_url {
                tracker_config.base_url = base_url;
            }
            runtime.block_on(run(tracker_config))
        }
        Command::Check {
            repository,
            base_url,
        } => {
            let mut tracker_config = TrackerConfig::default();
            if let Some(base_url) = base_url {
                tracker_config.base_url = base_url;
            }
            runtime.block_on(check(&repository, &tracker_config))
        }
    }
}

/// Logs go to a daily file in the data directory; stdout carries sensor output
fn init_logging(json: bool) -> anyhow::Result<WorkerGuard> {
    let dir = log_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory {:?}", dir))?;

    let appender = tracing_appender::rolling::daily(&dir, "release-tracker.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }

    Ok(guard)
}

async fn run(config: TrackerConfig) -> anyhow::Result<()> {
    let repositories = config.repository_ids()?;
    if repositories.is_empty() {
        anyhow::bail!("No repositories configured");
    }

    let fetcher: Arc<dyn Fetcher> =
        Arc::new(GitHubFetcher::new(&config.base_url, config.fetch_timeout())?);
    let mut registry = TrackerRegistry::new(fetcher, config.poll_interval());
    let mut printers = Vec::new();
    let mut pending = Vec::new();

    for repository in repositories {
        setup(&mut registry, repository, &mut printers, &mut pending).await;
    }

    let retry_interval = config.setup_retry_interval().max(Duration::from_secs(1));
    let mut retry = interval_at(Instant::now() + retry_interval, retry_interval);
    retry.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                if let Err(e) = result {
                    error!("Failed to listen for shutdown signal: {}", e);
                }
                info!("Shutting down");
                break;
            }
            _ = retry.tick(), if !pending.is_empty() => {
                for repository in std::mem::take(&mut pending) {
                    setup(&mut registry, repository, &mut printers, &mut pending).await;
                }
            }
        }
    }

    for printer in printers {
        printer.abort();
    }
    registry.shutdown();

    Ok(())
}

async fn setup(
    registry: &mut TrackerRegistry,
    repository: RepositoryId,
    printers: &mut Vec<JoinHandle<()>>,
    pending: &mut Vec<RepositoryId>,
) {
    match registry.add(repository.clone()).await {
        Ok(coordinator) => {
            let updates = coordinator.subscribe();
            printers.push(spawn_printer(ReleaseSensor::new(coordinator), updates));
        }
        Err(TrackerError::AlreadyTracked(repository)) => {
            warn!("{} is configured more than once", repository);
        }
        Err(e) => {
            warn!("Setup of {} failed, retrying later: {}", repository, e);
            pending.push(repository);
        }
    }
}

/// Prints the sensor whenever its rendered view changes
fn spawn_printer(
    sensor: ReleaseSensor,
    mut updates: watch::Receiver<CoordinatorState>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last_printed: Option<SensorView> = None;

        loop {
            let view = sensor.view_of(&updates.borrow_and_update());
            if last_printed.as_ref() != Some(&view) {
                match serde_json::to_string(&view) {
                    Ok(line) => println!("{line}"),
                    Err(e) => error!("Failed to render {}: {}", sensor.unique_id(), e),
                }
                last_printed = Some(view);
            }

            if updates.changed().await.is_err() {
                break;
            }
        }
    })
}

async fn check(repository: &str, config: &TrackerConfig) -> anyhow::Result<()> {
    let repository: RepositoryId = repository
        .parse()
        .with_context(|| format!("Invalid repository {:?}", repository))?;

    let fetcher = GitHubFetcher::new(&config.base_url, config.fetch_timeout())?;
    let record = fetcher
        .fetch(&repository)
        .await
        .with_context(|| format!("Failed to fetch latest release for {}", repository))?;

    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
