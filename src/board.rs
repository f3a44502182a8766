//! Optimistic Mutation Coordinator.
//!
//! Every mutation runs in two phases: [`BoardState::begin`] snapshots the
//! visible task list and applies the change locally, then
//! [`BoardState::settle`] either confirms it or restores the snapshot once the
//! remote call has finished. [`Board`] drives both phases inline for the CLI
//! and tests; the terminal board runs the remote call on a worker thread in
//! between.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::{Error, Result};
use crate::events::{EventKind, EventSink};
use crate::query::{Pagination, TaskFilters, TasksPage, DEFAULT_PAGE_SIZE};
use crate::store::{TaskClient, TaskStore};
use crate::task::{NewTask, Task, TaskPatch, TaskStatus};

pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Success,
    Error,
    Info,
}

/// Transient user-facing message (status line, stderr).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            message: message.into(),
        }
    }
}

/// What the board currently shows.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardState {
    pub tasks: Vec<Task>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub has_more: bool,
    pub filters: TaskFilters,
    pub loading: bool,
    pub error: Option<String>,
}

impl Default for BoardState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

/// A mutation applied locally whose remote call has not finished yet.
#[derive(Debug, Clone)]
#[must_use = "a pending mutation must be settled"]
pub struct PendingMutation {
    action: &'static str,
    success: String,
    snapshot: Vec<Task>,
    total: usize,
}

impl PendingMutation {
    pub fn action(&self) -> &'static str {
        self.action
    }
}

impl BoardState {
    pub fn new(page_size: usize) -> Self {
        Self {
            tasks: Vec::new(),
            total: 0,
            page: 1,
            page_size: page_size.max(1),
            has_more: false,
            filters: TaskFilters::default(),
            loading: false,
            error: None,
        }
    }

    pub fn find(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// Tasks in one column, in list order.
    pub fn column(&self, status: TaskStatus) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(move |task| task.status == status)
    }

    /// Install a fetched page; page 1 replaces the list, later pages append.
    pub fn apply_page(&mut self, page: TasksPage) {
        if page.page <= 1 {
            self.tasks = page.tasks;
        } else {
            self.tasks.extend(page.tasks);
        }
        self.total = page.total;
        self.page = page.page;
        self.has_more = page.has_more;
        self.loading = false;
        self.error = None;
    }

    pub fn fail_load(&mut self, err: &Error) {
        self.loading = false;
        self.error = Some(err.to_string());
    }

    /// Snapshot the visible list, then apply `change` to it.
    pub fn begin(
        &mut self,
        action: &'static str,
        success: impl Into<String>,
        change: impl FnOnce(&mut Vec<Task>),
    ) -> PendingMutation {
        let pending = PendingMutation {
            action,
            success: success.into(),
            snapshot: self.tasks.clone(),
            total: self.total,
        };
        let before = self.tasks.len();
        change(&mut self.tasks);
        let removed = before.saturating_sub(self.tasks.len());
        self.total = self.total.saturating_sub(removed);
        pending
    }

    /// Confirm or roll back a pending mutation. A confirmed update replaces
    /// the local row with the stored one.
    pub fn settle<T: Settled>(&mut self, pending: PendingMutation, outcome: &Result<T>) -> Notice {
        match outcome {
            Ok(value) => {
                if let Some(stored) = value.stored_task() {
                    if let Some(slot) = self.tasks.iter_mut().find(|task| task.id == stored.id) {
                        *slot = stored.clone();
                    }
                }
                Notice::success(pending.success)
            }
            Err(err) => {
                tracing::warn!(action = pending.action, error = %err, "rolling back optimistic change");
                self.tasks = pending.snapshot;
                self.total = pending.total;
                Notice::error(format!("Failed to {}: {err}", pending.action))
            }
        }
    }

    /// Insert a created task at the top of the list.
    pub fn prepend(&mut self, task: Task) {
        self.tasks.insert(0, task);
        self.total += 1;
    }
}

/// Remote results that may carry the stored row back.
pub trait Settled {
    fn stored_task(&self) -> Option<&Task> {
        None
    }
}

impl Settled for Task {
    fn stored_task(&self) -> Option<&Task> {
        Some(self)
    }
}

impl Settled for () {}

/// Local change for a status move.
pub fn set_status(id: &str, status: TaskStatus) -> impl FnOnce(&mut Vec<Task>) + '_ {
    move |tasks: &mut Vec<Task>| {
        if let Some(task) = tasks.iter_mut().find(|task| task.id == id) {
            task.status = status;
        }
    }
}

/// Local change for a partial edit.
pub fn patch_task<'a>(id: &'a str, patch: &'a TaskPatch) -> impl FnOnce(&mut Vec<Task>) + 'a {
    move |tasks: &mut Vec<Task>| {
        if let Some(task) = tasks.iter_mut().find(|task| task.id == id) {
            task.apply_patch(patch);
        }
    }
}

/// Local change for a delete.
pub fn drop_task(id: &str) -> impl FnOnce(&mut Vec<Task>) + '_ {
    move |tasks: &mut Vec<Task>| tasks.retain(|task| task.id != id)
}

pub fn move_message(status: TaskStatus) -> (&'static str, String) {
    match status {
        TaskStatus::Archived => ("archive task", "Task archived".to_string()),
        other => ("move task", format!("Task moved to {}", other.label())),
    }
}

/// Trailing-edge debounce for search input.
#[derive(Debug, Clone)]
pub struct SearchDebouncer {
    delay: Duration,
    pending: Option<(String, Instant)>,
}

impl Default for SearchDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_DEBOUNCE)
    }
}

impl SearchDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Record new input; restarts the quiet period.
    pub fn input(&mut self, text: impl Into<String>, now: Instant) {
        self.pending = Some((text.into(), now));
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, at)| *at + self.delay)
    }

    /// The settled search text, once the quiet period has elapsed.
    pub fn ready(&mut self, now: Instant) -> Option<String> {
        match self.deadline() {
            Some(deadline) if now >= deadline => self.pending.take().map(|(text, _)| text),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Forget queued input.
    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

/// Board state plus the client that mutates it.
pub struct Board<S> {
    client: TaskClient<S>,
    state: BoardState,
    search: SearchDebouncer,
    notices: Vec<Notice>,
    events: Option<EventSink>,
}

impl<S: TaskStore> Board<S> {
    pub fn new(client: TaskClient<S>, page_size: usize) -> Self {
        Self {
            client,
            state: BoardState::new(page_size),
            search: SearchDebouncer::default(),
            notices: Vec::new(),
            events: None,
        }
    }

    pub fn with_debounce(mut self, delay: Duration) -> Self {
        self.search = SearchDebouncer::new(delay);
        self
    }

    pub fn with_events(mut self, sink: Option<EventSink>) -> Self {
        self.events = sink;
        self
    }

    pub fn state(&self) -> &BoardState {
        &self.state
    }

    pub fn client(&self) -> &TaskClient<S> {
        &self.client
    }

    /// Drain notices emitted since the last call.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Fetch page 1 with the current filters.
    pub async fn load(&mut self) -> Result<()> {
        self.fetch_page(1).await
    }

    /// Reload page 1 with the current filters, dropping appended pages.
    pub async fn refresh(&mut self) -> Result<()> {
        self.load().await
    }

    /// Append the next page; `false` when there was nothing more to load.
    pub async fn load_more(&mut self) -> Result<bool> {
        if !self.state.has_more || self.state.loading {
            return Ok(false);
        }
        self.fetch_page(self.state.page + 1).await?;
        Ok(true)
    }

    /// Replace the filters and reload from page 1.
    pub async fn set_filters(&mut self, filters: TaskFilters) -> Result<()> {
        self.state.filters = filters;
        self.load().await
    }

    /// Queue search text; applied by [`Board::poll_search`] once typing stops.
    pub fn set_search(&mut self, text: impl Into<String>, now: Instant) {
        self.search.input(text, now);
    }

    /// Apply debounced search text if it has settled. Returns whether a
    /// reload happened.
    pub async fn poll_search(&mut self, now: Instant) -> Result<bool> {
        let Some(text) = self.search.ready(now) else {
            return Ok(false);
        };
        let mut filters = self.state.filters.clone();
        filters.search = if text.trim().is_empty() { None } else { Some(text) };
        if filters == self.state.filters {
            return Ok(false);
        }
        self.set_filters(filters).await?;
        Ok(true)
    }

    /// Validate and create. Not optimistic: the row appears once stored.
    pub async fn add_task(&mut self, input: NewTask) -> Result<Task> {
        let input = match input.validated() {
            Ok(input) => input,
            Err(err) => return Err(self.reject(err)),
        };
        match self.client.create(&input).await {
            Ok(task) => {
                self.state.prepend(task.clone());
                self.notices.push(Notice::success("Task added"));
                self.emit(EventKind::TaskCreated, &task.id, &task);
                Ok(task)
            }
            Err(err) => {
                self.notices
                    .push(Notice::error(format!("Failed to add task: {err}")));
                Err(err)
            }
        }
    }

    /// Validate and apply a partial edit optimistically.
    pub async fn edit_task(&mut self, id: &str, patch: TaskPatch) -> Result<Task> {
        let patch = match patch.validated() {
            Ok(patch) if patch.is_empty() => {
                return Err(self.reject(Error::InvalidArgument("nothing to change".to_string())))
            }
            Ok(patch) => patch,
            Err(err) => return Err(self.reject(err)),
        };
        let pending = self
            .state
            .begin("save task", "Task saved", patch_task(id, &patch));
        let outcome = self.client.update(id, &patch).await;
        self.finish(id, pending, outcome, EventKind::TaskUpdated)
    }

    /// Optimistic status change.
    pub async fn move_task(&mut self, id: &str, status: TaskStatus) -> Result<Task> {
        let (action, success) = move_message(status);
        let pending = self.state.begin(action, success, set_status(id, status));
        let outcome = self.client.update(id, &TaskPatch::status(status)).await;
        let kind = match status {
            TaskStatus::Archived => EventKind::TaskArchived,
            _ => EventKind::TaskMoved,
        };
        self.finish(id, pending, outcome, kind)
    }

    /// Optimistic removal.
    pub async fn remove_task(&mut self, id: &str) -> Result<()> {
        let pending = self
            .state
            .begin("delete task", "Task deleted", drop_task(id));
        let outcome = self.client.delete(id).await;
        self.finish(id, pending, outcome, EventKind::TaskDeleted)
    }

    pub async fn archive_task(&mut self, id: &str) -> Result<Task> {
        self.move_task(id, TaskStatus::Archived).await
    }

    /// Bring an archived task back, into the complete column.
    pub async fn restore_task(&mut self, id: &str) -> Result<Task> {
        let pending = self.state.begin(
            "restore task",
            "Task restored",
            set_status(id, TaskStatus::Complete),
        );
        let outcome = self
            .client
            .update(id, &TaskPatch::status(TaskStatus::Complete))
            .await;
        self.finish(id, pending, outcome, EventKind::TaskRestored)
    }

    /// Archive every visible complete task, one move at a time. Failures roll
    /// back individually and do not stop the sweep. Returns how many were
    /// archived.
    pub async fn archive_all_complete(&mut self) -> usize {
        let ids: Vec<String> = self
            .state
            .column(TaskStatus::Complete)
            .map(|task| task.id.clone())
            .collect();
        let mut archived = 0;
        for id in ids {
            if self.archive_task(&id).await.is_ok() {
                archived += 1;
            }
        }
        archived
    }

    async fn fetch_page(&mut self, page: usize) -> Result<()> {
        self.state.loading = true;
        let pagination = Pagination {
            page,
            page_size: self.state.page_size,
        };
        match self.client.fetch(&self.state.filters, pagination).await {
            Ok(fetched) => {
                self.state.apply_page(fetched);
                Ok(())
            }
            Err(err) => {
                self.state.fail_load(&err);
                self.notices
                    .push(Notice::error(format!("Failed to load tasks: {err}")));
                Err(err)
            }
        }
    }

    fn finish<T: Settled + Serialize>(
        &mut self,
        id: &str,
        pending: PendingMutation,
        outcome: Result<T>,
        kind: EventKind,
    ) -> Result<T> {
        let action = pending.action();
        let notice = self.state.settle(pending, &outcome);
        self.notices.push(notice);
        if let Some(sink) = self.events.as_mut() {
            sink.record_settled(kind, id, action, &outcome);
        }
        outcome
    }

    fn reject(&mut self, err: Error) -> Error {
        self.notices.push(Notice::error(err.to_string()));
        err
    }

    fn emit<T: Serialize>(&mut self, kind: EventKind, task_id: &str, data: &T) {
        let Some(sink) = self.events.as_mut() else {
            return;
        };
        if let Err(err) = sink.record(kind, Some(task_id), data) {
            tracing::warn!(error = %err, "failed to write event");
        }
    }
}
