//! Integration tests for the kanban-sync binary.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper to create a kanban-sync Command with no inherited configuration
fn kanban() -> Command {
    let mut cmd = cargo_bin_cmd!("kanban-sync");
    for var in ["PORT", "HOST", "KANBAN_DATA_FILE", "KANBAN_STATIC_DIR", "KANBAN_LOG_JSON"] {
        cmd.env_remove(var);
    }
    cmd
}

fn read_board(path: &std::path::Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_help_lists_flags() {
        kanban()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("--port"))
            .stdout(predicate::str::contains("--data-file"))
            .stdout(predicate::str::contains("--static-dir"));
    }

    #[test]
    fn test_version() {
        kanban().arg("--version").assert().success();
    }

    #[test]
    fn test_rejects_invalid_port() {
        kanban().args(["--port", "not-a-port"]).assert().failure();
    }
}

// =============================================================================
// Board File Initialization
// =============================================================================

mod init {
    use super::*;

    #[test]
    fn test_init_creates_default_board() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data/kanban-data.json");

        kanban()
            .arg("--init")
            .arg("--data-file")
            .arg(&path)
            .assert()
            .success()
            .stdout(predicate::str::contains("Initialized board"));

        let board = read_board(&path);
        for (id, title) in [("column-1", "To-do"), ("column-2", "Doing"), ("column-3", "Done")] {
            assert_eq!(board[id]["id"], id);
            assert_eq!(board[id]["title"], title);
            assert_eq!(board[id]["tasks"], serde_json::json!([]));
        }
    }

    #[test]
    fn test_init_keeps_existing_board() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kanban-data.json");
        let existing = serde_json::json!({
            "column-1": {"id": "column-1", "title": "To-do", "tasks": [{
                "id": "task-1", "content": "keep me", "assignee": "unassigned",
                "dueDate": "", "createdAt": "2024-01-01T00:00:00.000Z", "priority": "low"
            }]},
            "column-2": {"id": "column-2", "title": "Doing", "tasks": []},
            "column-3": {"id": "column-3", "title": "Done", "tasks": []}
        });
        fs::write(&path, existing.to_string()).unwrap();

        kanban()
            .arg("--init")
            .arg("--data-file")
            .arg(&path)
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));

        assert_eq!(read_board(&path), existing);
    }

    #[test]
    fn test_init_honors_data_file_env() {
        let dir = TempDir::new().unwrap();

        kanban()
            .current_dir(dir.path())
            .env("KANBAN_DATA_FILE", "from-env.json")
            .arg("--init")
            .assert()
            .success();

        assert!(dir.path().join("from-env.json").exists());
        assert!(!dir.path().join("kanban-data.json").exists());
    }

    #[test]
    fn test_init_defaults_to_working_directory() {
        let dir = TempDir::new().unwrap();

        kanban()
            .current_dir(dir.path())
            .arg("--init")
            .assert()
            .success();

        assert!(dir.path().join("kanban-data.json").exists());
    }
}
