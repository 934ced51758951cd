use anyhow::Context;
use clap::Parser;
use geodoc::server::run_server;
use geodoc::{Config, Geodoc};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value_t = 8000)]
    port: u16,

    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Directory for collection snapshots; in-memory when omitted
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// JSON or TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn load_config(path: &Path) -> anyhow::Result<Config> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => Config::from_toml(&raw)?,
        _ => Config::from_json(&raw)?,
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "geodoc_server=info,geodoc=info,info".into()),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };

    let db = if let Some(path) = args.data_dir {
        info!("Opening database at {}", path.display());
        Geodoc::builder().path(path).config(config).build()?
    } else {
        info!("Opening in-memory database");
        Geodoc::builder().config(config).build()?
    };

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl_c signal: {}", e);
            std::future::pending::<()>().await;
        }
    };

    run_server(addr, db, shutdown).await?;

    Ok(())
}
