//! Durable mirror of the board.
//!
//! [`BoardPersistence`] is the seam between the board actor and storage.
//! [`JsonFileStore`] writes a pretty-printed JSON document; [`MemoryStore`]
//! keeps snapshots in memory for embedding and tests.
//!
//! Loading never fails: a missing, unreadable, unparseable or malformed file
//! yields the default three-column board.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::board::Board;
use crate::errors::PersistenceError;

#[async_trait]
pub trait BoardPersistence: Send + Sync {
    /// Board to start from. Falls back to [`Board::default`] on any failure.
    async fn load(&self) -> Board;

    /// Overwrite the stored board with `board`.
    async fn save(&self, board: &Board) -> Result<(), PersistenceError>;
}

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and validate the board file. `Ok(None)` when it does not exist.
    pub async fn read(&self) -> Result<Option<Board>, PersistenceError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(PersistenceError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let board: Board =
            serde_json::from_str(&raw).map_err(|source| PersistenceError::Parse {
                path: self.path.clone(),
                source,
            })?;
        board
            .validate()
            .map_err(|source| PersistenceError::InvalidLayout {
                path: self.path.clone(),
                source,
            })?;
        Ok(Some(board))
    }

    /// Write the default board unless a file already exists.
    /// Returns `true` when a new file was created.
    pub async fn init(&self) -> Result<bool, PersistenceError> {
        if tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(false);
        }
        self.save(&Board::default()).await?;
        Ok(true)
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

#[async_trait]
impl BoardPersistence for JsonFileStore {
    async fn load(&self) -> Board {
        match self.read().await {
            Ok(Some(board)) => {
                tracing::info!(
                    path = %self.path.display(),
                    tasks = board.task_count(),
                    "loaded board"
                );
                board
            }
            Ok(None) => {
                tracing::info!(path = %self.path.display(), "no board file yet, starting empty");
                Board::default()
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not load board, starting empty");
                Board::default()
            }
        }
    }

    async fn save(&self, board: &Board) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| PersistenceError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let json = serde_json::to_string_pretty(board).map_err(PersistenceError::Serialize)?;

        // Write beside the target and rename over it so readers never see a
        // half-written document.
        let temp = self.temp_path();
        tokio::fs::write(&temp, json)
            .await
            .map_err(|source| PersistenceError::Write {
                path: temp.clone(),
                source,
            })?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|source| PersistenceError::Rename {
                from: temp.clone(),
                path: self.path.clone(),
                source,
            })?;

        tracing::debug!(path = %self.path.display(), tasks = board.task_count(), "board saved");
        Ok(())
    }
}

/// In-memory persistence. Records every saved snapshot.
#[derive(Debug, Default)]
pub struct MemoryStore {
    initial: Board,
    saved: Mutex<Vec<Board>>,
    fail_saves: bool,
}

impl MemoryStore {
    pub fn new(initial: Board) -> Self {
        Self {
            initial,
            ..Default::default()
        }
    }

    /// A store whose every save fails, for exercising the failure path.
    pub fn failing() -> Self {
        Self {
            fail_saves: true,
            ..Default::default()
        }
    }

    pub async fn saves(&self) -> Vec<Board> {
        self.saved.lock().await.clone()
    }

    pub async fn save_count(&self) -> usize {
        self.saved.lock().await.len()
    }
}

#[async_trait]
impl BoardPersistence for MemoryStore {
    async fn load(&self) -> Board {
        self.initial.clone()
    }

    async fn save(&self, board: &Board) -> Result<(), PersistenceError> {
        if self.fail_saves {
            return Err(PersistenceError::Write {
                path: PathBuf::from(":memory:"),
                source: std::io::Error::other("saves disabled"),
            });
        }
        self.saved.lock().await.push(board.clone());
        Ok(())
    }
}
