//! Task domain model.
//!
//! # Responsibility
//! - Define the structured form of one checkbox line.
//! - Define the read model handed to store callers.
//!
//! # Invariants
//! - `indent` is captured at parse time and only changed by rendering.
//! - `tags` is an insertion-ordered set of normalized (lowercase) names.
//! - `legacy_id`, when present, is an 8-character lowercase hex token.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Stable 8-character task identifier managed by the identity map.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type TaskId = String;

/// Checkbox state of one task line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// `- [ ]`
    Pending,
    /// `- [x]` or `- [X]`
    Done,
}

impl TaskStatus {
    /// Returns the character placed between the checkbox brackets.
    pub fn checkbox_char(self) -> char {
        match self {
            Self::Pending => ' ',
            Self::Done => 'x',
        }
    }
}

/// Task priority, ordered by severity when sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    High,
    Normal,
    Low,
    Someday,
    None,
}

impl Priority {
    /// Sort rank; lower ranks are rendered first under priority sorting.
    pub fn severity_rank(self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Normal => 2,
            Self::Low => 3,
            Self::None => 4,
            Self::Someday => 5,
        }
    }

    /// Canonical lowercase name used by annotations and serialization.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Normal => "normal",
            Self::Low => "low",
            Self::Someday => "someday",
            Self::None => "none",
        }
    }
}

impl Display for Priority {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a priority name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPriority(pub String);

impl Display for UnknownPriority {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown priority: `{}`", self.0)
    }
}

impl std::error::Error for UnknownPriority {}

impl FromStr for Priority {
    type Err = UnknownPriority;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "critical" | "highest" => Ok(Self::Critical),
            "high" => Ok(Self::High),
            "normal" | "medium" => Ok(Self::Normal),
            "low" => Ok(Self::Low),
            "someday" | "lowest" => Ok(Self::Someday),
            "none" | "" => Ok(Self::None),
            other => Err(UnknownPriority(other.to_string())),
        }
    }
}

/// Structured representation of one checkbox line inside a section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Reconciled identifier. Assigned on parse or add, never rendered.
    pub id: TaskId,
    /// Free text with all codec tokens stripped.
    pub text: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub tags: Vec<String>,
    pub created_at: Option<NaiveDateTime>,
    /// Leading whitespace width before the checkbox marker.
    pub indent: usize,
    /// Explicit id recovered from an old-format line; dropped on render.
    pub legacy_id: Option<String>,
}

impl Task {
    /// Creates a pending top-level task with the given id and text.
    pub fn new(id: impl Into<TaskId>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            status: TaskStatus::Pending,
            priority: Priority::None,
            tags: Vec::new(),
            created_at: None,
            indent: 0,
            legacy_id: None,
        }
    }

    /// Returns whether the checkbox is ticked.
    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Done
    }

    /// Returns the first tag, which decides the section a new task lands in.
    pub fn primary_tag(&self) -> Option<&str> {
        self.tags.first().map(String::as_str)
    }
}

/// Normalizes one tag value: trims, strips a leading `#`, lowercases.
///
/// Returns `None` for blank input.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim().trim_start_matches('#').trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Normalizes tag values and removes duplicates, keeping first occurrence.
pub fn normalize_tags<S: AsRef<str>>(tags: &[S]) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        if let Some(value) = normalize_tag(tag.as_ref()) {
            if !unique.contains(&value) {
                unique.push(value);
            }
        }
    }
    unique
}

/// Read model returned by store operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub text: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub tags: Vec<String>,
    pub created_at: Option<NaiveDateTime>,
    pub indent: usize,
    /// Section key the task lives under; `None` for the untagged section.
    pub project: Option<String>,
    /// Nearest strictly-less-indented predecessor in the same section.
    pub blocked_by: Option<TaskId>,
}

impl TaskRecord {
    pub fn from_task(task: &Task, project: Option<&str>, blocked_by: Option<&TaskId>) -> Self {
        Self {
            id: task.id.clone(),
            text: task.text.clone(),
            status: task.status,
            priority: task.priority,
            tags: task.tags.clone(),
            created_at: task.created_at,
            indent: task.indent,
            project: project.map(str::to_string),
            blocked_by: blocked_by.cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_tags, Priority};

    #[test]
    fn priority_parses_names_and_aliases() {
        assert_eq!("HIGH".parse::<Priority>(), Ok(Priority::High));
        assert_eq!(" medium ".parse::<Priority>(), Ok(Priority::Normal));
        assert_eq!("lowest".parse::<Priority>(), Ok(Priority::Someday));
        assert!("urgent-ish".parse::<Priority>().is_err());
    }

    #[test]
    fn severity_rank_orders_someday_last() {
        let mut all = vec![
            Priority::Someday,
            Priority::None,
            Priority::Low,
            Priority::Critical,
            Priority::Normal,
            Priority::High,
        ];
        all.sort_by_key(|priority| priority.severity_rank());
        assert_eq!(
            all,
            vec![
                Priority::Critical,
                Priority::High,
                Priority::Normal,
                Priority::Low,
                Priority::None,
                Priority::Someday,
            ]
        );
    }

    #[test]
    fn normalize_tags_keeps_insertion_order_and_dedups() {
        let tags = normalize_tags(&["Work", "#urgent", " work ", "", "Home"]);
        assert_eq!(tags, vec!["work", "urgent", "home"]);
    }
}
