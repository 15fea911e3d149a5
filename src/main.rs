use clap::Parser;
use tracing_subscriber::EnvFilter;

use filedeck::cli;
use filedeck::error::Result;
use filedeck::manager::FileManager;
use filedeck::storage;

use filedeck::cli::Args;
use filedeck::config::load_storage_config;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run_app(args).await {
        log::error!("{e}");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run_app(args: Args) -> Result<()> {
    let config = load_storage_config()?;
    storage::prepare_local_roots(&config).await?;
    let backend = storage::connect(&config).await?;
    cli::run(args, FileManager::new(backend)).await?;
    Ok(())
}
