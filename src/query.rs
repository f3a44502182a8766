//! Task filters and pagination.
//!
//! The same [`TaskFilters`] value drives both the PostgREST query string sent
//! to the remote store and in-process matching for the memory store, so the
//! two backends agree on what a filter means.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::task::{Assignee, Priority, Task, TaskCategory, TaskStatus};

pub const DEFAULT_PAGE_SIZE: usize = 50;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFilters {
    /// Case-insensitive substring over title, description and notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<TaskCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<Assignee>,
    /// `Some(true)`: due date set, `Some(false)`: no due date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_due_date: Option<bool>,
    /// Empty means every status.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub statuses: Vec<TaskStatus>,
}

impl TaskFilters {
    pub fn is_empty(&self) -> bool {
        self.search_term().is_none()
            && self.priority.is_none()
            && self.category.is_none()
            && self.assignee.is_none()
            && self.has_due_date.is_none()
            && self.statuses.is_empty()
    }

    /// Search text with surrounding whitespace removed, `None` when blank.
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }

    pub fn matches(&self, task: &Task) -> bool {
        if let Some(term) = self.search_term() {
            let needle = term.to_lowercase();
            let hit = [&task.title, &task.description, &task.notes]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        if let Some(priority) = self.priority {
            if task.priority != priority {
                return false;
            }
        }
        if let Some(category) = self.category {
            if task.category != category {
                return false;
            }
        }
        if let Some(assignee) = self.assignee {
            if task.assignee != Some(assignee) {
                return false;
            }
        }
        if let Some(has_due) = self.has_due_date {
            if task.due_date.is_some() != has_due {
                return false;
            }
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&task.status) {
            return false;
        }
        true
    }

    /// PostgREST query parameters for this filter set, excluding ordering.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(term) = self.search_term() {
            let pattern = postgrest_like_pattern(term);
            pairs.push((
                "or".to_string(),
                format!(
                    "(title.ilike.{pattern},description.ilike.{pattern},notes.ilike.{pattern})"
                ),
            ));
        }
        if let Some(priority) = self.priority {
            pairs.push(("priority".to_string(), format!("eq.{priority}")));
        }
        if let Some(category) = self.category {
            pairs.push(("category".to_string(), format!("eq.{category}")));
        }
        if let Some(assignee) = self.assignee {
            pairs.push(("assignee".to_string(), format!("eq.{assignee}")));
        }
        match self.has_due_date {
            Some(true) => pairs.push(("due_date".to_string(), "not.is.null".to_string())),
            Some(false) => pairs.push(("due_date".to_string(), "is.null".to_string())),
            None => {}
        }
        if !self.statuses.is_empty() {
            let list: Vec<&str> = self.statuses.iter().map(|status| status.as_str()).collect();
            pairs.push(("status".to_string(), format!("in.({})", list.join(","))));
        }
        pairs
    }
}

/// Wrap a search term as a quoted `ilike` pattern. `%` and `_` are matched
/// literally, like the in-memory filter. Quoting keeps commas and parentheses
/// in the term from breaking the surrounding `or=(...)` list.
fn postgrest_like_pattern(term: &str) -> String {
    let literal = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    let quoted = literal.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"*{quoted}*\"")
}

/// Offset pagination with a 1-based page number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: usize,
    pub page_size: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    pub fn new(page: usize, page_size: usize) -> Result<Self> {
        if page == 0 {
            return Err(Error::InvalidArgument("page must be >= 1".to_string()));
        }
        if page_size == 0 {
            return Err(Error::InvalidArgument("page size must be >= 1".to_string()));
        }
        Ok(Self { page, page_size })
    }

    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1) * self.page_size
    }

    /// Inclusive row range, as used by the `Range` header.
    pub fn range(&self) -> (usize, usize) {
        let from = self.offset();
        (from, from + self.page_size.saturating_sub(1))
    }

    pub fn next(&self) -> Self {
        Self {
            page: self.page + 1,
            page_size: self.page_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TasksPage {
    pub tasks: Vec<Task>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub has_more: bool,
}

impl TasksPage {
    pub fn new(tasks: Vec<Task>, total: usize, pagination: Pagination) -> Self {
        let has_more = pagination.offset() + tasks.len() < total;
        Self {
            tasks,
            total,
            page: pagination.page,
            page_size: pagination.page_size,
            has_more,
        }
    }
}
