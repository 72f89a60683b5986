//! Board model and its mutation primitives.
//!
//! A [`Board`] is a fixed set of three columns (`column-1` To-do, `column-2`
//! Doing, `column-3` Done), each holding an ordered list of [`Task`]s. The
//! serialized form is a JSON object keyed by column id, which is both the
//! on-disk format and the payload of every snapshot sent to clients.
//!
//! All mutations are plain synchronous calls; ownership and sequencing are
//! handled by [`crate::hub`].

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::LayoutError;

/// Assignee recorded for tasks created without one.
pub const UNASSIGNED: &str = "unassigned";

/// Prefix of generated task identifiers (`task-<unix millis>`).
pub const TASK_ID_PREFIX: &str = "task-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ColumnId {
    #[serde(rename = "column-1")]
    Todo,
    #[serde(rename = "column-2")]
    Doing,
    #[serde(rename = "column-3")]
    Done,
}

impl ColumnId {
    /// Every column, in display order. New tasks land in the first one.
    pub const ALL: [ColumnId; 3] = [Self::Todo, Self::Doing, Self::Done];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "column-1",
            Self::Doing => "column-2",
            Self::Done => "column-3",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Todo => "To-do",
            Self::Doing => "Doing",
            Self::Done => "Done",
        }
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "column-1" => Ok(Self::Todo),
            "column-2" => Ok(Self::Doing),
            "column-3" => Ok(Self::Done),
            _ => Err(format!("Invalid column: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            _ => Err(format!("Invalid priority: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub content: String,
    pub assignee: String,
    /// `YYYY-MM-DD`, or empty when the task has no due date.
    pub due_date: String,
    pub created_at: String,
    pub priority: Priority,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub id: ColumnId,
    pub title: String,
    pub tasks: Vec<Task>,
}

impl Column {
    pub fn new(id: ColumnId) -> Self {
        Self {
            id,
            title: id.title().to_string(),
            tasks: Vec::new(),
        }
    }

    pub fn position(&self, task_id: &str) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == task_id)
    }

    fn take(&mut self, task_id: &str) -> Option<Task> {
        self.position(task_id).map(|i| self.tasks.remove(i))
    }
}

/// Unvalidated add-task request, exactly as a client sends it.
///
/// Every optional field falls back through [`TaskDraft::into_task`]; that is
/// the only place defaults are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskDraft {
    pub content: String,
    #[serde(deserialize_with = "lenient_string")]
    pub assignee: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub due_date: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub created_at: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub priority: Option<String>,
}

/// Accept any JSON value for an optional text field; non-strings become `None`.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Some(s),
        _ => None,
    })
}

impl TaskDraft {
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// Build a task with defaults applied. Returns `None` for blank content.
    pub fn into_task(self, id: String, now: DateTime<Utc>) -> Option<Task> {
        if self.is_blank() {
            return None;
        }

        let assignee = self
            .assignee
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| UNASSIGNED.to_string());
        let priority = self
            .priority
            .as_deref()
            .and_then(|p| p.trim().to_ascii_lowercase().parse::<Priority>().ok())
            .unwrap_or_default();

        Some(Task {
            id,
            content: self.content,
            assignee,
            due_date: normalize_due_date(self.due_date.as_deref()),
            created_at: normalize_created_at(self.created_at.as_deref(), now),
            priority,
        })
    }
}

/// Reduce a client-supplied due date to `YYYY-MM-DD`.
///
/// Accepts a plain calendar date or an RFC 3339 datetime (taken in UTC).
/// Anything else becomes the empty string.
pub fn normalize_due_date(raw: Option<&str>) -> String {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return String::new();
    };
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.format("%Y-%m-%d").to_string();
    }
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => dt.with_timezone(&Utc).date_naive().format("%Y-%m-%d").to_string(),
        Err(_) => String::new(),
    }
}

/// Canonical creation timestamp: RFC 3339 in UTC with millisecond precision.
pub fn normalize_created_at(raw: Option<&str>, now: DateTime<Utc>) -> String {
    raw.map(str::trim)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(now)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Issues `task-<unix millis>` identifiers.
///
/// Ids are strictly increasing for the life of the generator and skip any id
/// already present on the board, so a clock step backwards or a loaded board
/// carrying future ids never produces a collision.
#[derive(Debug, Default)]
pub struct TaskIdGenerator {
    last: i64,
}

impl TaskIdGenerator {
    pub fn next_id(&mut self, board: &Board, now: DateTime<Utc>) -> String {
        let mut stamp = now.timestamp_millis().max(self.last + 1);
        while board.contains_task(&format!("{TASK_ID_PREFIX}{stamp}")) {
            stamp += 1;
        }
        self.last = stamp;
        format!("{TASK_ID_PREFIX}{stamp}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board {
    columns: BTreeMap<ColumnId, Column>,
}

impl Default for Board {
    fn default() -> Self {
        Self {
            columns: ColumnId::ALL
                .into_iter()
                .map(|id| (id, Column::new(id)))
                .collect(),
        }
    }
}

impl Board {
    pub fn column(&self, id: ColumnId) -> Option<&Column> {
        self.columns.get(&id)
    }

    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.values()
    }

    pub fn task_count(&self) -> usize {
        self.columns.values().map(|c| c.tasks.len()).sum()
    }

    pub fn contains_task(&self, task_id: &str) -> bool {
        self.columns.values().any(|c| c.position(task_id).is_some())
    }

    pub fn position(&self, column: ColumnId, task_id: &str) -> Option<usize> {
        self.columns.get(&column)?.position(task_id)
    }

    /// Move `task_id` out of `source` and insert it into `dest` at
    /// `dest_index`, appending when the index is past the end.
    ///
    /// Returns `false` without touching the board when either column is
    /// missing or the task is not in `source`.
    pub fn move_task(
        &mut self,
        source: ColumnId,
        dest: ColumnId,
        dest_index: usize,
        task_id: &str,
    ) -> bool {
        if !self.columns.contains_key(&dest) {
            return false;
        }
        let Some(task) = self.columns.get_mut(&source).and_then(|c| c.take(task_id)) else {
            return false;
        };
        if let Some(column) = self.columns.get_mut(&dest) {
            let index = dest_index.min(column.tasks.len());
            column.tasks.insert(index, task);
        }
        true
    }

    /// Append a new task to the first column. Blank drafts are rejected.
    pub fn add_task(
        &mut self,
        draft: TaskDraft,
        ids: &mut TaskIdGenerator,
        now: DateTime<Utc>,
    ) -> Option<&Task> {
        if draft.is_blank() {
            return None;
        }
        let id = ids.next_id(self, now);
        let task = draft.into_task(id, now)?;
        let column = self.columns.get_mut(&ColumnId::ALL[0])?;
        column.tasks.push(task);
        column.tasks.last()
    }

    /// Remove `task_id` from `column`. Returns whether anything was removed.
    pub fn delete_task(&mut self, column: ColumnId, task_id: &str) -> bool {
        self.columns
            .get_mut(&column)
            .and_then(|c| c.take(task_id))
            .is_some()
    }

    /// Value copy of the current state.
    pub fn snapshot(&self) -> Board {
        self.clone()
    }

    /// Check the fixed column layout and board-wide task id uniqueness.
    pub fn validate(&self) -> Result<(), LayoutError> {
        for id in ColumnId::ALL {
            match self.columns.get(&id) {
                None => return Err(LayoutError::MissingColumn(id)),
                Some(column) if column.id != id => {
                    return Err(LayoutError::MisplacedColumn {
                        key: id,
                        found: column.id,
                    });
                }
                Some(_) => {}
            }
        }

        let mut seen = HashSet::new();
        for task in self.columns.values().flat_map(|c| &c.tasks) {
            if !seen.insert(task.id.as_str()) {
                return Err(LayoutError::DuplicateTaskId(task.id.clone()));
            }
        }
        Ok(())
    }
}
