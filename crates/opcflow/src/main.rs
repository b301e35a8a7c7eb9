mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "opcflow")]
#[command(about = "Declarative security lists, protocols and SSH keys for OPC compute", long_about = None)]
struct Cli {
    /// Project directory holding the manifest and `.opcflow/` state
    #[arg(short, long, global = true, default_value = ".", env = "OPCFLOW_PROJECT")]
    project: PathBuf,

    /// Manifest file (default: <project>/opcflow.kdl)
    #[arg(short, long, global = true)]
    manifest: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show what apply would change
    Plan {
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create, update, replace and delete resources to match the manifest
    Apply,
    /// Re-read every resource in state
    Refresh,
    /// Adopt an existing remote object into state
    Import {
        /// Resource kind (security-list, security-application, security-protocol, ssh-key)
        kind: String,
        /// Resource name
        name: String,
    },
    /// Delete managed resources
    Destroy {
        /// Resource kind; only the named resource is deleted
        #[arg(requires = "name")]
        kind: Option<String>,
        /// Resource name
        name: Option<String>,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let project = commands::Project::open(&cli.project, cli.manifest.as_deref());

    match cli.command {
        Commands::Plan { json } => commands::plan::handle(&project, json).await,
        Commands::Apply => commands::apply::handle(&project).await,
        Commands::Refresh => commands::refresh::handle(&project).await,
        Commands::Import { kind, name } => commands::import::handle(&project, &kind, &name).await,
        Commands::Destroy { kind, name, yes } => {
            commands::destroy::handle(&project, kind.as_deref(), name.as_deref(), yes).await
        }
    }
}
