use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "searchflow-fixture")]
#[command(about = "Static fixture site for searchflow end-to-end runs")]
struct Args {
    /// Address to bind (port 0 picks a free port)
    #[arg(long, env = "SEARCHFLOW_FIXTURE_ADDR", default_value = "127.0.0.1:0")]
    addr: SocketAddr,

    /// Directory containing the fixture pages
    #[arg(long, env = "SEARCHFLOW_FIXTURE_ASSETS", default_value = "crates/fixture/assets")]
    assets: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if !args.assets.is_dir() {
        anyhow::bail!("assets directory not found: {}", args.assets.display());
    }

    let listener = tokio::net::TcpListener::bind(args.addr).await?;
    let addr = listener.local_addr()?;

    info!(
        "Serving fixture site from {} on http://{}",
        args.assets.display(),
        addr
    );

    axum::serve(listener, searchflow_fixture::router(&args.assets)).await?;
    Ok(())
}
