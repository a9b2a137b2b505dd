mod file_server;
mod sync_worker;
mod watcher;
mod working_set;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use meshsync_config::{Args, ClusterTopology};
use meshsync_core::{Coordinator, LoopbackConsensus};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::watcher::FsWatcher;
use crate::working_set::WorkingSet;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let cluster = ClusterTopology::parse(&args.cluster, &args.host, args.cluster_port)
        .context("failed to parse --cluster")?;
    let cluster_size = cluster.size();
    let local_id = cluster.local_node().id();
    let cluster = Arc::new(cluster);

    info!(
        node = %local_id,
        cluster_size,
        path = %args.path.display(),
        "starting meshsync node"
    );

    // The consensus engine is an external collaborator (spec §1); this
    // in-process stand-in is only suitable for a single-node demonstration.
    let consensus = Arc::new(LoopbackConsensus::new(local_id, cluster_size));
    let coordinator = Coordinator::new(consensus);

    tokio::fs::create_dir_all(&args.path)
        .await
        .with_context(|| format!("failed to create managed root {}", args.path.display()))?;

    let file_server_listener = TcpListener::bind((args.host.as_str(), args.file_server_port))
        .await
        .with_context(|| format!("failed to bind file-serving endpoint on {}", args.host))?;
    let file_server_app = file_server::router(args.path.clone());
    let file_server =
        tokio::spawn(async move { axum::serve(file_server_listener, file_server_app).await });

    let working_set = Arc::new(WorkingSet::new());
    let _watcher = FsWatcher::start(args.path.clone(), coordinator.clone(), Arc::clone(&working_set))
        .context("failed to start filesystem watcher")?;

    let http = reqwest::Client::new();
    let sync_worker = tokio::spawn(sync_worker::run(
        coordinator,
        Arc::clone(&cluster),
        args.path.clone(),
        working_set,
        http,
    ));

    tokio::select! {
        result = file_server => {
            result.context("file server task panicked")?.context("file server exited")?;
        }
        _ = sync_worker => {
            info!("sync worker exited");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("received interrupt, shutting down");
        }
    }

    Ok(())
}
