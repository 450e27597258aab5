use std::path::PathBuf;
use std::sync::Arc;

use caravel_build::{ArtifactBuilder, BuildError, EsbuildBundler};
use caravel_core::CaravelConfig;
use caravel_dev::{
    ChangeEvent, ChangeKind, DevLoop, NodeSpawner, ProcessSupervisor, RebuildDriver, SourceWatcher,
};
use tokio::sync::{mpsc, watch, Mutex};

/// Bundles on a blocking thread so the watcher and supervisor stay
/// responsive during builds.
struct LocalRebuild {
    config: CaravelConfig,
    project_dir: PathBuf,
}

impl RebuildDriver for LocalRebuild {
    async fn build(&self) -> Result<PathBuf, BuildError> {
        let config = self.config.clone();
        let project_dir = self.project_dir.clone();
        tokio::task::spawn_blocking(move || {
            ArtifactBuilder::new(EsbuildBundler::new()).build(&config, &project_dir)
        })
        .await
        .unwrap_or_else(|e| std::panic::resume_unwind(e.into_panic()))
    }
}

/// Run the local dev loop: watch sources, rebuild on change, restart the
/// service on success.
pub async fn run() -> anyhow::Result<()> {
    let project_dir = PathBuf::from(".");
    let config = CaravelConfig::load(&project_dir)?;
    tracing::debug!(name = %config.name, entry = %config.build.entry, "config loaded");

    let supervisor = Arc::new(Mutex::new(ProcessSupervisor::new(
        NodeSpawner::new(),
        config.port,
    )));

    let (tx, rx) = mpsc::channel(256);
    // Watch the directory the entry point lives under, wherever the
    // config puts it
    let source_root = config.source_root();
    let _watcher = SourceWatcher::spawn(&project_dir.join(&source_root), tx.clone())?;

    let driver = LocalRebuild {
        config: config.clone(),
        project_dir: project_dir.clone(),
    };
    let dev_loop = DevLoop::new(driver, supervisor, rx);

    // Prime the loop so the service builds and starts before the first edit
    tx.send(ChangeEvent {
        path: PathBuf::from(&config.build.entry),
        kind: ChangeKind::Modified,
    })
    .await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let loop_task = tokio::spawn(dev_loop.run(shutdown_rx));

    println!(
        "Watching {}/ on port {} (Ctrl-C to stop)",
        source_root.display(),
        config.port
    );
    tokio::signal::ctrl_c().await?;
    println!();
    println!("Shutting down...");

    let _ = shutdown_tx.send(true);
    loop_task.await?;

    Ok(())
}
