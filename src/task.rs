//! Task model for the kanban board.
//!
//! Tasks are rows in the remote store's `tasks` table. Field names match the
//! table columns so records round-trip through the store unchanged.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const TITLE_MAX_LEN: usize = 200;
pub const DESCRIPTION_MAX_LEN: usize = 2000;
pub const NOTES_MAX_LEN: usize = 5000;

/// Board column a task sits in. `Archived` hides a task from the board
/// without deleting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Complete,
    Archived,
}

impl TaskStatus {
    /// Statuses shown as board columns, left to right.
    pub const BOARD: [TaskStatus; 3] = [TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Complete];

    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Todo,
        TaskStatus::InProgress,
        TaskStatus::Complete,
        TaskStatus::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Complete => "complete",
            TaskStatus::Archived => "archived",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "To do",
            TaskStatus::InProgress => "In progress",
            TaskStatus::Complete => "Complete",
            TaskStatus::Archived => "Archived",
        }
    }

    /// Position on the board, `None` for archived tasks.
    pub fn column(&self) -> Option<usize> {
        Self::BOARD.iter().position(|status| status == self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskCategory {
    Dev,
    Research,
    Admin,
    Cron,
    Communication,
}

impl TaskCategory {
    pub const ALL: [TaskCategory; 5] = [
        TaskCategory::Dev,
        TaskCategory::Research,
        TaskCategory::Admin,
        TaskCategory::Cron,
        TaskCategory::Communication,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskCategory::Dev => "dev",
            TaskCategory::Research => "research",
            TaskCategory::Admin => "admin",
            TaskCategory::Cron => "cron",
            TaskCategory::Communication => "communication",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Assignee {
    Arie,
    Jasper,
}

impl Assignee {
    pub const ALL: [Assignee; 2] = [Assignee::Arie, Assignee::Jasper];

    pub fn as_str(&self) -> &'static str {
        match self {
            Assignee::Arie => "Arie",
            Assignee::Jasper => "Jasper",
        }
    }
}

macro_rules! str_enum_impls {
    ($ty:ty, $what:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = Error;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                let trimmed = s.trim();
                <$ty>::ALL
                    .iter()
                    .copied()
                    .find(|value| value.as_str().eq_ignore_ascii_case(trimmed))
                    .ok_or_else(|| {
                        let expected: Vec<&str> = <$ty>::ALL.iter().map(|v| v.as_str()).collect();
                        Error::InvalidArgument(format!(
                            "invalid {} '{}' (expected {})",
                            $what,
                            trimmed,
                            expected.join("|")
                        ))
                    })
            }
        }
    };
}

str_enum_impls!(TaskStatus, "status");
str_enum_impls!(Priority, "priority");
str_enum_impls!(TaskCategory, "category");
str_enum_impls!(Assignee, "assignee");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub category: TaskCategory,
    #[serde(default)]
    pub assignee: Option<Assignee>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Due date in the past on a task that is still open.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        match self.due_date {
            Some(due) => {
                due < now && !matches!(self.status, TaskStatus::Complete | TaskStatus::Archived)
            }
            None => false,
        }
    }

    /// Apply a patch locally, the way the store would.
    pub fn apply_patch(&mut self, patch: &TaskPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(assignee) = patch.assignee {
            self.assignee = assignee;
        }
        if let Some(notes) = &patch.notes {
            self.notes = notes.clone();
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(updated_at) = patch.updated_at {
            self.updated_at = updated_at;
        }
        if let Some(completed_at) = patch.completed_at {
            self.completed_at = completed_at;
        }
    }
}

/// Insert payload: a task without store-assigned fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_new_status")]
    pub status: TaskStatus,
    pub priority: Priority,
    pub category: TaskCategory,
    #[serde(default)]
    pub assignee: Option<Assignee>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

fn default_new_status() -> TaskStatus {
    TaskStatus::Todo
}

impl NewTask {
    pub fn new(title: impl Into<String>, priority: Priority, category: TaskCategory) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            status: TaskStatus::Todo,
            priority,
            category,
            assignee: None,
            notes: String::new(),
            due_date: None,
        }
    }

    /// Sanitize text fields and check length bounds. New tasks always start
    /// in `todo`.
    pub fn validated(mut self) -> Result<Self> {
        self.title = sanitize_input(&self.title);
        self.description = sanitize_input(&self.description);
        self.notes = sanitize_input(&self.notes);
        self.status = TaskStatus::Todo;
        validate_fields(&self.title, &self.description, &self.notes)?;
        self.title = self.title.trim().to_string();
        Ok(self)
    }
}

/// Partial update. `None` leaves a column untouched; `Some(None)` clears a
/// nullable column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<TaskCategory>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_nullable"
    )]
    pub assignee: Option<Option<Assignee>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_nullable"
    )]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_nullable"
    )]
    pub completed_at: Option<Option<DateTime<Utc>>>,
}

fn deserialize_nullable<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Sanitize and bound-check the text columns this patch touches.
    pub fn validated(mut self) -> Result<Self> {
        if let Some(title) = self.title.take() {
            let title = sanitize_input(&title);
            validate_title(&title)?;
            self.title = Some(title.trim().to_string());
        }
        if let Some(description) = self.description.take() {
            let description = sanitize_input(&description);
            validate_max("description", &description, DESCRIPTION_MAX_LEN)?;
            self.description = Some(description);
        }
        if let Some(notes) = self.notes.take() {
            let notes = sanitize_input(&notes);
            validate_max("notes", &notes, NOTES_MAX_LEN)?;
            self.notes = Some(notes);
        }
        Ok(self)
    }

    /// Add bookkeeping timestamps: `updated_at` always, `completed_at` when
    /// the patch moves a task into `complete`.
    pub fn stamped(mut self, now: DateTime<Utc>) -> Self {
        self.updated_at = Some(now);
        if self.status == Some(TaskStatus::Complete) && self.completed_at.is_none() {
            self.completed_at = Some(Some(now));
        }
        self
    }
}

fn validate_fields(title: &str, description: &str, notes: &str) -> Result<()> {
    validate_title(title)?;
    validate_max("description", description, DESCRIPTION_MAX_LEN)?;
    validate_max("notes", notes, NOTES_MAX_LEN)?;
    Ok(())
}

fn validate_title(title: &str) -> Result<()> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation("title is required".to_string()));
    }
    validate_max("title", trimmed, TITLE_MAX_LEN)
}

fn validate_max(field: &str, value: &str, max: usize) -> Result<()> {
    if value.chars().count() > max {
        return Err(Error::Validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

/// Escape HTML special characters so stored text never renders as markup.
pub fn sanitize_input(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    out
}

/// Parse a due date: `today`, `tomorrow`, `next-week`, `none`, or
/// `YYYY-MM-DD` / RFC 3339. Day-only inputs resolve to midnight UTC.
pub fn parse_due_date(raw: &str, today: NaiveDate) -> Result<Option<DateTime<Utc>>> {
    let trimmed = raw.trim();
    let day = match trimmed.to_ascii_lowercase().as_str() {
        "" | "none" => return Ok(None),
        "today" => today,
        "tomorrow" => today + chrono::Duration::days(1),
        "next-week" | "+1w" => today + chrono::Duration::days(7),
        _ => {
            if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
                return Ok(Some(parsed.with_timezone(&Utc)));
            }
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|_| {
                Error::InvalidArgument(format!(
                    "invalid due date '{trimmed}' (expected today|tomorrow|next-week|YYYY-MM-DD)"
                ))
            })?
        }
    };
    Ok(day.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_task() -> Task {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        Task {
            id: "t-1".to_string(),
            title: "Buy milk".to_string(),
            description: String::new(),
            status: TaskStatus::Todo,
            priority: Priority::Low,
            category: TaskCategory::Admin,
            assignee: None,
            notes: String::new(),
            due_date: None,
            created_at: at,
            updated_at: at,
            completed_at: None,
        }
    }

    #[test]
    fn status_wire_names() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::InProgress).unwrap(),
            "\"in-progress\""
        );
        assert_eq!("archived".parse::<TaskStatus>().unwrap(), TaskStatus::Archived);
        assert!("done".parse::<TaskStatus>().is_err());
        assert_eq!(TaskStatus::Archived.column(), None);
        assert_eq!(TaskStatus::Complete.column(), Some(2));
    }

    #[test]
    fn new_task_validation_bounds() {
        let ok = NewTask::new("  Buy milk  ", Priority::Low, TaskCategory::Admin)
            .validated()
            .unwrap();
        assert_eq!(ok.title, "Buy milk");

        let empty = NewTask::new("   ", Priority::Low, TaskCategory::Admin).validated();
        assert!(matches!(empty, Err(Error::Validation(_))));

        let long = NewTask::new("x".repeat(201), Priority::Low, TaskCategory::Admin).validated();
        assert!(matches!(long, Err(Error::Validation(_))));

        let mut notes = NewTask::new("ok", Priority::Low, TaskCategory::Admin);
        notes.notes = "n".repeat(NOTES_MAX_LEN + 1);
        assert!(matches!(notes.validated(), Err(Error::Validation(_))));
    }

    #[test]
    fn new_task_forces_todo_and_sanitizes() {
        let mut input = NewTask::new("<b>bold</b>", Priority::High, TaskCategory::Dev);
        input.status = TaskStatus::Complete;
        let task = input.validated().unwrap();
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.title, "&lt;b&gt;bold&lt;/b&gt;");
    }

    #[test]
    fn patch_serializes_only_present_fields() {
        let patch = TaskPatch {
            assignee: Some(None),
            ..TaskPatch::status(TaskStatus::Complete)
        };
        let value = serde_json::to_value(&patch).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "status": "complete", "assignee": null })
        );

        let back: TaskPatch = serde_json::from_value(value).unwrap();
        assert_eq!(back, patch);
    }

    #[test]
    fn stamped_sets_completed_only_on_complete() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();
        let done = TaskPatch::status(TaskStatus::Complete).stamped(now);
        assert_eq!(done.completed_at, Some(Some(now)));
        assert_eq!(done.updated_at, Some(now));

        let archived = TaskPatch::status(TaskStatus::Archived).stamped(now);
        assert_eq!(archived.completed_at, None);
    }

    #[test]
    fn apply_patch_keeps_identity_and_creation() {
        let mut task = sample_task();
        let created = task.created_at;
        task.apply_patch(&TaskPatch::status(TaskStatus::InProgress));
        assert_eq!(task.id, "t-1");
        assert_eq!(task.created_at, created);
        assert_eq!(task.status, TaskStatus::InProgress);
    }

    #[test]
    fn overdue_ignores_finished_tasks() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 0, 0, 0).unwrap();
        let mut task = sample_task();
        task.due_date = Some(Utc.with_ymd_and_hms(2026, 3, 5, 0, 0, 0).unwrap());
        assert!(task.is_overdue(now));
        task.status = TaskStatus::Complete;
        assert!(!task.is_overdue(now));
    }

    #[test]
    fn due_date_shortcuts() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let tomorrow = parse_due_date("tomorrow", today).unwrap().unwrap();
        assert_eq!(tomorrow.date_naive(), NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
        let week = parse_due_date("next-week", today).unwrap().unwrap();
        assert_eq!(week.date_naive(), NaiveDate::from_ymd_opt(2026, 3, 8).unwrap());
        assert_eq!(parse_due_date("none", today).unwrap(), None);
        assert!(parse_due_date("someday", today).is_err());
        let explicit = parse_due_date("2026-04-01", today).unwrap().unwrap();
        assert_eq!(explicit.date_naive(), NaiveDate::from_ymd_opt(2026, 4, 1).unwrap());
    }
}
