use std::path::PathBuf;
use std::sync::Arc;

use caravel_cloud::{AwsClient, S3RemoteStore};
use caravel_core::CaravelConfig;
use caravel_dev::{NodeSpawner, ProcessSupervisor, SyncPoller};
use tokio::sync::{watch, Mutex};

/// Run the hot-reload sync agent.
///
/// Polls the hot-reload bucket, resyncs the file tree on marker change,
/// and restarts the supervised service. Intended to run inside the
/// deployed container, where caravel.toml may be absent and the bucket
/// and port are passed as flags instead.
pub async fn agent(bucket: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let project_dir = PathBuf::from(".");

    let (bucket, port, region, profile) = match (bucket, port) {
        (Some(bucket), Some(port)) => (
            bucket,
            port,
            std::env::var("AWS_REGION").unwrap_or_else(|_| "us-west-2".to_owned()),
            std::env::var("AWS_PROFILE").unwrap_or_else(|_| "default".to_owned()),
        ),
        (bucket, port) => {
            let config = CaravelConfig::load(&project_dir)?;
            (
                bucket.unwrap_or_else(|| config.hot_reload_bucket()),
                port.unwrap_or(config.port),
                config.aws.region.clone(),
                config.aws.profile.clone(),
            )
        }
    };

    let supervisor = Arc::new(Mutex::new(ProcessSupervisor::new(NodeSpawner::new(), port)));

    // Start the service on whatever tree is already present; the first
    // poll resyncs regardless because no marker has been seen yet
    supervisor.lock().await.replace(&project_dir).await?;

    let store = S3RemoteStore::new(AwsClient::new(region, profile), bucket);
    let poller = SyncPoller::new(store, supervisor.clone(), project_dir);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let poll_task = tokio::spawn(poller.run(shutdown_rx));

    tokio::signal::ctrl_c().await?;
    let _ = shutdown_tx.send(true);
    poll_task.await?;

    supervisor.lock().await.stop().await?;

    Ok(())
}
