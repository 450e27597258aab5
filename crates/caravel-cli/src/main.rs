mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "caravel",
    about = "Build, run, and ship containerized Node services on AWS"
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new Caravel project
    New {
        /// Project name
        name: String,
    },
    /// Add Caravel to an existing Node project
    Init,
    /// Watch sources, rebuild, and restart the service locally
    Run,
    /// Build, containerize, and publish to the remote service
    Deploy {
        /// Build the image and run it locally instead of publishing
        #[arg(long)]
        local: bool,
    },
    /// Provision the container registry (run once, before deploy-aws)
    SetupAws,
    /// Provision the compute service around the pushed image
    DeployAws,
    /// Tear down all provisioned infrastructure
    DestroyAws {
        /// Skip confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Poll the hot-reload bucket and restart on updates (runs in the container)
    Agent {
        /// Bucket to poll; defaults to the one derived from caravel.toml
        #[arg(long)]
        bucket: Option<String>,
        /// Port the supervised process listens on
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::New { name } => commands::new_project(&name).await?,
        Commands::Init => commands::init_project().await?,
        Commands::Run => commands::run().await?,
        Commands::Deploy { local } => commands::deploy(local).await?,
        Commands::SetupAws => commands::setup_aws().await?,
        Commands::DeployAws => commands::deploy_aws().await?,
        Commands::DestroyAws { yes } => commands::destroy_aws(yes).await?,
        Commands::Agent { bucket, port } => commands::agent(bucket, port).await?,
    }

    Ok(())
}
