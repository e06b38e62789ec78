//! Command-line interface for boardwatch.
//!
//! Lists attached boards, streams connect/disconnect events, or looks up a
//! single VID/PID. Results are written to stdout as JSON, one document per
//! line; logs go to stderr (or journald).

use anyhow::{Context, Result};
use boardwatch::{
    config::Config,
    discovery::{serial::SerialDiscovery, DiscoveryManager},
    lookup::{RemoteLookup, VidPidClient},
    session::{Explorer, Instance, InstanceRegistry},
    signatures::{SignatureDatabase, SignatureFile},
    tracing::{self, prelude::*},
    BoardListRequest, BoardListWatchRequest, BoardService, Error,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::{path::PathBuf, sync::Arc};
use tokio::signal::unix::{self, SignalKind};

#[derive(Parser)]
#[command(name = "boardwatch", version, about = "Identify boards attached to serial ports")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Board signature file (JSON), overriding the configuration
    #[arg(long, global = true)]
    signatures: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the boards currently attached
    List {
        /// Milliseconds to let discovery settle before listing
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Print board connect/disconnect events until interrupted
    Watch,
    /// Ask the identification service about a USB VID/PID
    Lookup { vid: String, pid: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing::init_journald_or_stderr();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(path) = cli.signatures {
        config.signatures.path = Some(path);
    }

    let remote: Arc<dyn RemoteLookup> = Arc::new(
        VidPidClient::new(config.lookup.base_url.as_str(), config.lookup.timeout())
            .context("failed to initialize HTTP client")?,
    );

    match cli.command {
        Command::Lookup { vid, pid } => lookup(remote.as_ref(), &vid, &pid).await,
        Command::List { timeout } => {
            let (service, instance) = build_service(&config, remote)?;
            let timeout_ms = timeout.unwrap_or(config.list.timeout_ms);
            list(&service, instance, timeout_ms).await
        }
        Command::Watch => {
            let (service, instance) = build_service(&config, remote)?;
            watch(&service, instance).await
        }
    }
}

fn build_service(
    config: &Config,
    remote: Arc<dyn RemoteLookup>,
) -> Result<(BoardService, Instance)> {
    let signatures: Arc<dyn SignatureDatabase> = match &config.signatures.path {
        Some(path) => Arc::new(
            SignatureFile::load(path)
                .with_context(|| format!("failed to load signatures from {}", path.display()))?,
        ),
        None => {
            info!("No signature file configured, using the identification service only.");
            Arc::new(SignatureFile::empty())
        }
    };

    let mut discovery = DiscoveryManager::new();
    if config.discovery.serial {
        discovery.add(Arc::new(SerialDiscovery::new(config.discovery.poll_interval())));
    }

    let registry = Arc::new(InstanceRegistry::new());
    let instance = registry.create(Explorer::new(discovery, signatures));
    let service =
        BoardService::new(registry, remote).with_watch_capacity(config.watch.channel_capacity);

    Ok((service, instance))
}

async fn lookup(remote: &dyn RemoteLookup, vid: &str, pid: &str) -> Result<()> {
    let boards = match remote.by_vid_pid(vid, pid).await {
        Ok(boards) => boards,
        Err(Error::NotFound) => {
            info!(vid = %vid, pid = %pid, "Board not found.");
            Vec::new()
        }
        Err(e) => return Err(e.into()),
    };

    let items: Vec<_> = boards.into_iter().map(boardwatch::BoardListItem::from).collect();
    print_json(&items)
}

async fn list(service: &BoardService, instance: Instance, timeout_ms: u64) -> Result<()> {
    let request = BoardListRequest {
        instance,
        timeout_ms,
    };

    match service.list(request).await {
        Ok(listing) => {
            for e in &listing.discovery_start_errors {
                warn!(error = %e, "Discovery did not start.");
            }
            for port in &listing.ports {
                print_json(port)?;
            }
            Ok(())
        }
        Err(failure) => {
            for e in &failure.discovery_start_errors {
                warn!(error = %e, "Discovery did not start.");
            }
            Err(failure.error.into())
        }
    }
}

async fn watch(service: &BoardService, instance: Instance) -> Result<()> {
    let (mut events, handle) = service.watch(BoardListWatchRequest { instance })?;
    info!("Started.");

    let mut sigint = unix::signal(SignalKind::interrupt())?;
    let mut sigterm = unix::signal(SignalKind::terminate())?;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => print_json(&event)?,
                None => break,
            },
            _ = sigint.recv(), if !handle.is_cancelled() => handle.cancel(),
            _ = sigterm.recv(), if !handle.is_cancelled() => handle.cancel(),
        }
    }

    trace!("Shutting down.");
    handle.wait().await;
    info!("Exiting.");
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}
