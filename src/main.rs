use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use offline_cache::config::{self, WorkerConfig};
use offline_cache::host::{commands, server};
use offline_cache::logging::init_logging;

#[derive(Parser)]
#[command(name = "offline-cache")]
#[command(version, about = "Offline cache worker with network-first cache fallback")]
struct Cli {
    /// Path to a JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to the cache database
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Origin base URL, overriding the config file
    #[arg(long, global = true)]
    origin: Option<String>,

    /// Write logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Install, activate, then serve requests (default)
    Serve {
        /// Address to listen on, overriding the config file
        #[arg(long)]
        listen: Option<String>,
    },
    /// Precache the manifest into the current cache version
    Install,
    /// Delete every cache except the current version
    Activate,
    /// List caches and their entries
    Caches,
    /// Run a single GET through the fetch handler
    Fetch { url: String },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(&config::log_path(), cli.log_json)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut worker_config = WorkerConfig::load(cli.config.as_deref())?;
    if let Some(origin) = cli.origin {
        worker_config.origin.url = origin;
    }
    let db_path = cli.db.unwrap_or_else(config::db_path);

    let manager = commands::build_manager(&worker_config, &db_path)?;
    let mut stdout = std::io::stdout();

    match cli.command.unwrap_or(Command::Serve { listen: None }) {
        Command::Serve { listen } => {
            let listen = listen.unwrap_or(worker_config.server.listen);
            server::run_server(Arc::new(manager), &listen).await
        }
        Command::Install => commands::install(&manager, &mut stdout).await,
        Command::Activate => commands::activate(&manager, &mut stdout).await,
        Command::Caches => {
            commands::list_caches(manager.storage().as_ref(), manager.version(), &mut stdout)
        }
        Command::Fetch { url } => commands::fetch(&manager, &url, &mut stdout).await,
    }
}
