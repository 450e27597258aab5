use std::path::PathBuf;

use caravel_build::dockerfile::DockerfileGenerator;
use caravel_build::{ArtifactBuilder, EsbuildBundler};
use caravel_cloud::{DockerClient, PublishPipeline};
use caravel_core::CaravelConfig;

/// Build the artifact and publish it, or run it locally with --local.
pub async fn deploy(local: bool) -> anyhow::Result<()> {
    let project_dir = PathBuf::from(".");
    let config = CaravelConfig::load(&project_dir)?;

    println!("Building artifact...");
    let config_for_build = config.clone();
    let build_dir = project_dir.clone();
    let artifact_dir = tokio::task::spawn_blocking(move || {
        ArtifactBuilder::new(EsbuildBundler::new()).build(&config_for_build, &build_dir)
    })
    .await
    .unwrap_or_else(|e| std::panic::resume_unwind(e.into_panic()))?;

    // The artifact doubles as the docker build context
    let dockerfile = DockerfileGenerator::new(&config).render();
    std::fs::write(artifact_dir.join("Dockerfile"), dockerfile)?;

    if local {
        let docker = DockerClient::new();
        docker.check_daemon().await?;

        let tag = config.repository_name();
        println!("Building image '{tag}'...");
        docker.build_image(&artifact_dir, &tag).await?;

        println!("Running on http://localhost:{} (Ctrl-C to stop)", config.port);
        docker.run_container(&tag, config.port).await?;
        return Ok(());
    }

    println!("Publishing...");
    let pipeline = PublishPipeline::new(&config);
    let tag = pipeline.publish(&artifact_dir, &config).await?;

    println!();
    println!("Deployed: {tag}");

    Ok(())
}
