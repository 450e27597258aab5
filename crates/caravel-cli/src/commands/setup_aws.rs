use std::path::PathBuf;

use caravel_cloud::Provisioner;
use caravel_core::CaravelConfig;

/// Phase one: create the container registry and base resources.
pub async fn setup_aws() -> anyhow::Result<()> {
    let project_dir = PathBuf::from(".");
    let config = CaravelConfig::load(&project_dir)?;

    println!("Provisioning registry for '{}'...", config.name);
    Provisioner::new().setup(&config).await?;

    println!();
    println!("Setup complete. Next:");
    println!("  caravel deploy         # push the first image");
    println!("  caravel deploy-aws     # create the service around it");

    Ok(())
}

/// Phase two: create the compute service. Fails fast when setup has not
/// run yet.
pub async fn deploy_aws() -> anyhow::Result<()> {
    let project_dir = PathBuf::from(".");
    let config = CaravelConfig::load(&project_dir)?;

    println!("Provisioning service for '{}'...", config.name);
    Provisioner::new().deploy(&config).await?;

    println!();
    println!("Service '{}' provisioned.", config.service_name());

    Ok(())
}
