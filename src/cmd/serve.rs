//! Board server command - the default `kanban-sync` invocation.

use anyhow::Result;

use kanban_sync::server::{ServerConfig, start_server};

use crate::Cli;

pub async fn cmd_serve(cli: Cli) -> Result<()> {
    // Spawn browser open before starting the server (which blocks)
    if cli.open {
        let host = match cli.host.as_str() {
            "0.0.0.0" | "::" => "localhost",
            other => other,
        };
        let url = format!("http://{}:{}", host, cli.port);
        tokio::spawn(async move {
            // Small delay to let the server start binding
            tokio::time::sleep(tokio::time::Duration::from_millis(500)).await;
            if let Err(e) = open::that(&url) {
                tracing::warn!(error = %e, %url, "failed to open browser");
            }
        });
    }

    start_server(ServerConfig {
        host: cli.host,
        port: cli.port,
        data_file: cli.data_file,
        static_dir: cli.static_dir,
        dev_mode: cli.dev,
    })
    .await
}
