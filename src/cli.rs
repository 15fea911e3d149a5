use clap::Parser;
use std::net::SocketAddr;

use crate::error::Result;
use crate::manager::FileManager;
use crate::server;

#[derive(Parser, Debug)]
#[command(
    name = "filedeck",
    version,
    about = "File-management HTTP backend with trash and restore over local disk or object storage"
)]
pub struct Args {
    /// Address the HTTP server listens on.
    #[arg(long, env = "FILEDECK_BIND", default_value = "127.0.0.1:5000")]
    pub bind: SocketAddr,
}

pub async fn run(args: Args, manager: FileManager) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    log::info!(
        "Starting server on {} (provider {:?})",
        args.bind,
        manager.backend().provider()
    );
    server::serve(listener, manager).await
}
