use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "kanban-sync")]
#[command(version, about = "Realtime kanban board server")]
pub struct Cli {
    /// Port to serve on
    #[arg(short, long, env = "PORT", default_value_t = kanban_sync::server::DEFAULT_PORT)]
    pub port: u16,

    /// Interface to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Board file, created on first save
    #[arg(long, env = "KANBAN_DATA_FILE", default_value = kanban_sync::server::DEFAULT_DATA_FILE)]
    pub data_file: PathBuf,

    /// Serve the client from this directory instead of the embedded bundle
    #[arg(long, env = "KANBAN_STATIC_DIR")]
    pub static_dir: Option<PathBuf>,

    /// Write an empty board file (if none exists) and exit
    #[arg(long)]
    pub init: bool,

    /// Open a browser once the server is up
    #[arg(long)]
    pub open: bool,

    /// Enable dev mode (permissive CORS for a separately served client)
    #[arg(long)]
    pub dev: bool,

    /// Emit logs as JSON lines
    #[arg(long, env = "KANBAN_LOG_JSON")]
    pub log_json: bool,

    #[arg(short, long)]
    pub verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Environment fallbacks for the flags above may come from `.env`.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let _log_guard = kanban_sync::logging::init(cli.verbose, cli.log_json);

    if cli.init {
        return cmd::cmd_init(&cli.data_file).await;
    }
    cmd::cmd_serve(cli).await
}
