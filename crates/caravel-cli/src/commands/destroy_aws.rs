use std::io::Write;
use std::path::PathBuf;

use caravel_cloud::Provisioner;
use caravel_core::CaravelConfig;

/// Tear down everything both provisioning phases created.
pub async fn destroy_aws(skip_confirm: bool) -> anyhow::Result<()> {
    let project_dir = PathBuf::from(".");
    let config = CaravelConfig::load(&project_dir)?;

    if !skip_confirm {
        println!("This will delete:");
        println!("  - ECS service '{}'", config.service_name());
        println!("  - ECS cluster '{}'", config.cluster_name());
        println!(
            "  - ECR repository '{}' and its images",
            config.repository_name()
        );
        println!("  - Hot-reload bucket '{}'", config.hot_reload_bucket());
        println!();
        print!("Are you sure? [y/N] ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if !matches!(input.trim(), "y" | "Y" | "yes" | "YES") {
            println!("Aborted.");
            return Ok(());
        }
    }

    println!("Destroying stack for '{}'...", config.name);
    Provisioner::new().destroy(&config).await?;

    println!();
    println!("Destroy complete.");

    Ok(())
}
