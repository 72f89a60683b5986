//! Board file initialization - `kanban-sync --init`.

use anyhow::{Context, Result};
use std::path::Path;

use kanban_sync::persistence::JsonFileStore;

pub async fn cmd_init(data_file: &Path) -> Result<()> {
    let store = JsonFileStore::new(data_file);
    let created = store
        .init()
        .await
        .with_context(|| format!("Failed to initialize board at {}", data_file.display()))?;

    if created {
        println!("Initialized board at {}", data_file.display());
    } else {
        println!("Board already exists at {}", data_file.display());
    }
    Ok(())
}
