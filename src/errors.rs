//! Typed errors for the kanban server.
//!
//! - `PersistenceError` - reading or writing the board file
//! - `LayoutError` - a parsed board that breaks the fixed column layout
//! - `HubError` - talking to the board actor after it has stopped

use std::path::PathBuf;

use thiserror::Error;

use crate::board::ColumnId;

/// Structural problems in an otherwise well-formed board.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("missing column {0}")]
    MissingColumn(ColumnId),

    #[error("column {found} is stored under key {key}")]
    MisplacedColumn { key: ColumnId, found: ColumnId },

    #[error("duplicate task id {0}")]
    DuplicateTaskId(String),
}

/// Errors from the persistence adapter.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Failed to read board file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse board file at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Board file at {path} has an invalid layout: {source}")]
    InvalidLayout {
        path: PathBuf,
        #[source]
        source: LayoutError,
    },

    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize board: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Failed to write board file at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move {from} into place at {path}: {source}")]
    Rename {
        from: PathBuf,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from a [`crate::hub::BoardHub`] handle.
#[derive(Debug, Error)]
pub enum HubError {
    #[error("Board hub has shut down")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persistence_error_read_carries_path() {
        let path = PathBuf::from("/data/kanban-data.json");
        let err = PersistenceError::Read {
            path: path.clone(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        match &err {
            PersistenceError::Read { path: p, source } => {
                assert_eq!(p, &path);
                assert_eq!(source.kind(), std::io::ErrorKind::PermissionDenied);
            }
            _ => panic!("Expected Read"),
        }
        assert!(err.to_string().contains("/data/kanban-data.json"));
    }

    #[test]
    fn persistence_error_parse_exposes_source() {
        use std::error::Error as _;
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = PersistenceError::Parse {
            path: PathBuf::from("board.json"),
            source,
        };
        assert!(err.source().is_some());
    }

    #[test]
    fn invalid_layout_wraps_layout_error() {
        use std::error::Error as _;
        let err = PersistenceError::InvalidLayout {
            path: PathBuf::from("board.json"),
            source: LayoutError::MissingColumn(ColumnId::Doing),
        };
        assert!(err.to_string().contains("missing column column-2"));
        assert!(err.source().is_some());
    }

    #[test]
    fn layout_error_messages_name_the_problem() {
        let err = LayoutError::MisplacedColumn {
            key: ColumnId::Todo,
            found: ColumnId::Done,
        };
        assert_eq!(err.to_string(), "column column-3 is stored under key column-1");
        assert_eq!(
            LayoutError::DuplicateTaskId("task-7".to_string()).to_string(),
            "duplicate task id task-7"
        );
    }

    #[test]
    fn all_error_types_implement_std_error_trait() {
        fn assert_std_error<E: std::error::Error + Send + Sync + 'static>(_: &E) {}
        assert_std_error(&HubError::Closed);
        assert_std_error(&LayoutError::DuplicateTaskId(String::new()));
        assert_std_error(&PersistenceError::InvalidLayout {
            path: PathBuf::new(),
            source: LayoutError::MissingColumn(ColumnId::Todo),
        });
    }
}
