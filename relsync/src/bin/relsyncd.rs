use clap::Parser;
use relsync::{Relsync, RelsyncConfig, RelsyncError};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "relsyncd", version, about = "Relationship sync and permission query server")]
struct Cli {
    /// Path to the YAML config file
    #[arg(short, long, default_value = "relsync.yaml")]
    config: PathBuf,
    /// Override server.bind
    #[arg(short, long)]
    bind: Option<String>,
    /// Load and validate the config, then exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() {
    relsync::init_tracing();
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        tracing::error!(error = %err, "relsyncd exited with an error");
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), RelsyncError> {
    let mut config = RelsyncConfig::load(&cli.config)?;
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }
    if cli.check {
        println!("config OK: {}", cli.config.display());
        return Ok(());
    }

    let relsync = Relsync::connect(config).await?;
    relsync.serve().await
}
