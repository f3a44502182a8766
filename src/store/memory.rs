//! In-process task store.
//!
//! Mirrors the remote store's semantics (ordering, filters, not-found
//! handling, timestamps) so the board and CLI can run against it offline and
//! in tests. Failures can be queued to exercise retry and rollback paths.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::query::{Pagination, TaskFilters, TasksPage};
use crate::task::{NewTask, Task, TaskPatch};

use super::TaskStore;

#[derive(Default)]
pub struct MemoryTaskStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    tasks: Vec<Task>,
    failures: VecDeque<Error>,
    calls: usize,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                tasks,
                ..Inner::default()
            }),
        }
    }

    /// Make the next call fail with `error`. Queued failures are consumed in
    /// order, one per call.
    pub fn fail_next(&self, error: Error) {
        self.lock().failures.push_back(error);
    }

    /// Number of calls received, failed ones included.
    pub fn calls(&self) -> usize {
        self.lock().calls
    }

    pub fn snapshot(&self) -> Vec<Task> {
        self.lock().tasks.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A panic while holding the lock leaves plain data behind; keep going.
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn begin_call(&self) -> Result<std::sync::MutexGuard<'_, Inner>> {
        let mut inner = self.lock();
        inner.calls += 1;
        if let Some(err) = inner.failures.pop_front() {
            return Err(err);
        }
        Ok(inner)
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn fetch(&self, filters: &TaskFilters, pagination: Pagination) -> Result<TasksPage> {
        let inner = self.begin_call()?;
        let mut matching: Vec<Task> = inner
            .tasks
            .iter()
            .filter(|task| filters.matches(task))
            .cloned()
            .collect();
        matching.sort_by(|left, right| {
            right
                .created_at
                .cmp(&left.created_at)
                .then_with(|| left.id.cmp(&right.id))
        });
        let total = matching.len();
        let page: Vec<Task> = matching
            .into_iter()
            .skip(pagination.offset())
            .take(pagination.page_size)
            .collect();
        Ok(TasksPage::new(page, total, pagination))
    }

    async fn create(&self, task: &NewTask) -> Result<Task> {
        let mut inner = self.begin_call()?;
        let now = Utc::now();
        let record = Task {
            id: Uuid::new_v4().to_string(),
            title: task.title.clone(),
            description: task.description.clone(),
            status: task.status,
            priority: task.priority,
            category: task.category,
            assignee: task.assignee,
            notes: task.notes.clone(),
            due_date: task.due_date,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };
        inner.tasks.push(record.clone());
        Ok(record)
    }

    async fn update(&self, id: &str, patch: &TaskPatch) -> Result<Task> {
        let mut inner = self.begin_call()?;
        let task = inner
            .tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))?;
        let stamped = patch.clone().stamped(Utc::now());
        task.apply_patch(&stamped);
        Ok(task.clone())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut inner = self.begin_call()?;
        let before = inner.tasks.len();
        inner.tasks.retain(|task| task.id != id);
        if inner.tasks.len() == before {
            return Err(Error::TaskNotFound(id.to_string()));
        }
        Ok(())
    }
}
