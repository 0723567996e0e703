use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use onair_agenda::{
    AgendaResolver, LocalReadCache, ReadCache, RecurrenceResult, Resolution, Schedulable,
    SystemClock,
};
use onair_core::config::OnairConfig;
use onair_core::{ItemId, ItemKind};
use onair_scheduler::AgendaRunner;
use onair_store::{
    AgendaService, Collaborator, MemoryCollaborator, RestCollaborator, SqliteReadCache,
    UserDirectory,
};
use tracing::{info, warn};

mod render;

/// Tells the announcer on duty what to read, and when.
#[derive(Parser, Debug)]
#[command(name = "onair", version)]
struct Cli {
    /// Config file (TOML).
    #[arg(short, long, env = "ONAIR_CONFIG", global = true)]
    config: Option<String>,

    /// Serve tables from a JSON fixture instead of the hosted backend.
    #[arg(long, global = true)]
    fixture: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve and print the agenda once.
    Agenda {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// List programs (only those on air unless --all).
    Programs {
        #[arg(long)]
        all: bool,
    },
    /// Mark an item read by the signed-in announcer.
    MarkRead {
        /// `testimonial` or `content`.
        kind: ItemKind,
        id: String,
    },
    /// Keep the agenda refreshed and ring on exact-time items until Ctrl-C.
    Watch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "onair=info,onair_store=info,onair_scheduler=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let config = OnairConfig::load(cli.config.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        OnairConfig::default()
    });

    let backend = build_backend(&config, cli.fixture.as_deref())?;
    let cache = build_cache(&config);
    let service = Arc::new(AgendaService::new(
        backend.clone(),
        cache,
        Arc::new(SystemClock),
        AgendaResolver::new(&config.agenda),
    ));

    match cli.command {
        Command::Agenda { json } => {
            let resolution = service.resolve_now().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&resolution)?);
            } else {
                let directory = UserDirectory::new(backend);
                print!("{}", render_agenda(&resolution, &directory).await);
            }
        }
        Command::Programs { all } => {
            let programs = if all {
                service.fetch_programs().await?
            } else {
                service.programs_on_air().await?
            };
            print!("{}", render::programs(&programs));
        }
        Command::MarkRead { kind, id } => {
            let result = service
                .mark_as_read(kind, &ItemId::from(id.as_str()))
                .await
                .with_context(|| format!("marking {kind} {id} as read"))?;
            match result {
                RecurrenceResult::Recurring => println!("{kind} {id}: read, back tomorrow"),
                RecurrenceResult::Done => println!("{kind} {id}: read, done"),
            }
        }
        Command::Watch => watch(service, &config, backend).await?,
    }
    Ok(())
}

fn build_backend(
    config: &OnairConfig,
    fixture: Option<&Path>,
) -> anyhow::Result<Arc<dyn Collaborator>> {
    if let Some(path) = fixture {
        let backend = MemoryCollaborator::from_fixture(path)
            .with_context(|| format!("loading fixture {}", path.display()))?;
        return Ok(Arc::new(backend));
    }
    info!(url = %config.backend.url, "using hosted backend");
    Ok(Arc::new(RestCollaborator::new(&config.backend)?))
}

/// Persistent read cache, or a process-local one if the database can't be opened.
fn build_cache(config: &OnairConfig) -> Arc<dyn ReadCache> {
    let path = Path::new(&config.cache.path);
    match SqliteReadCache::open(path) {
        Ok(cache) => {
            let today = chrono::Local::now().date_naive();
            if let Err(e) = cache.prune_before(today) {
                warn!(error = %e, "could not prune read cache");
            }
            Arc::new(cache)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "read cache unavailable; using memory");
            Arc::new(LocalReadCache::new())
        }
    }
}

async fn render_agenda(resolution: &Resolution, directory: &UserDirectory) -> String {
    let readers: BTreeSet<_> = resolution
        .entries
        .iter()
        .flat_map(|e| e.item.read_state().read_by.iter().cloned())
        .collect();
    let ids: Vec<_> = readers.into_iter().collect();
    let emails = directory.emails_for(&ids).await.unwrap_or_else(|e| {
        warn!(error = %e, "could not resolve reader e-mails");
        Default::default()
    });
    render::agenda(resolution, &emails)
}

async fn watch(
    service: Arc<AgendaService>,
    config: &OnairConfig,
    backend: Arc<dyn Collaborator>,
) -> anyhow::Result<()> {
    let runner = Arc::new(AgendaRunner::new(service, config.scheduler.clone()));
    let directory = UserDirectory::new(backend);
    let (alert_tx, mut alert_rx) = tokio::sync::mpsc::channel(64);
    let scheduler = runner.start(alert_tx)?;
    let mut online = runner.monitor().subscribe();

    let mut shown = 0;
    let mut redraw = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = redraw.tick() => {
                let generation = runner.board().generation();
                if generation != shown {
                    shown = generation;
                    if let Some(resolution) = runner.board().current() {
                        print!("{}", render_agenda(&resolution, &directory).await);
                    }
                }
            }
            Some(alert) = alert_rx.recv() => {
                // Terminal bell.
                println!("\x07>>> {} is due now ({})", alert.headline, alert.key);
            }
            Ok(()) = online.changed() => {
                if *online.borrow_and_update() {
                    println!("--- back online");
                } else {
                    println!("--- offline; showing last agenda");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }

    runner.stop(scheduler).await;
    Ok(())
}
