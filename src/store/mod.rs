//! Task Data Client.
//!
//! [`TaskStore`] is the seam to the remote data store: filtered, paginated
//! reads and single-row mutations. [`TaskClient`] wraps any store with the
//! retry policy; callers above this module only ever talk to a client.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Config;
use crate::error::Result;
use crate::query::{Pagination, TaskFilters, TasksPage};
use crate::retry::RetryPolicy;
use crate::task::{NewTask, Task, TaskPatch};

pub mod memory;
pub mod rest;

pub use memory::MemoryTaskStore;
pub use rest::RestTaskStore;

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Tasks matching `filters`, newest first, for one page.
    async fn fetch(&self, filters: &TaskFilters, pagination: Pagination) -> Result<TasksPage>;

    /// Insert a task and return the stored row.
    async fn create(&self, task: &NewTask) -> Result<Task>;

    /// Apply a partial update; `TaskNotFound` when no row has `id`.
    async fn update(&self, id: &str, patch: &TaskPatch) -> Result<Task>;

    /// Delete by id; `TaskNotFound` when no row has `id`.
    async fn delete(&self, id: &str) -> Result<()>;
}

#[async_trait]
impl<S: TaskStore + ?Sized> TaskStore for Arc<S> {
    async fn fetch(&self, filters: &TaskFilters, pagination: Pagination) -> Result<TasksPage> {
        (**self).fetch(filters, pagination).await
    }

    async fn create(&self, task: &NewTask) -> Result<Task> {
        (**self).create(task).await
    }

    async fn update(&self, id: &str, patch: &TaskPatch) -> Result<Task> {
        (**self).update(id, patch).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        (**self).delete(id).await
    }
}

/// A store plus the retry policy every call goes through.
#[derive(Clone)]
pub struct TaskClient<S> {
    store: S,
    policy: RetryPolicy,
}

impl<S: TaskStore> TaskClient<S> {
    pub fn new(store: S, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    pub async fn fetch(&self, filters: &TaskFilters, pagination: Pagination) -> Result<TasksPage> {
        self.policy
            .run("fetch", || self.store.fetch(filters, pagination))
            .await
    }

    pub async fn create(&self, task: &NewTask) -> Result<Task> {
        self.policy.run("create", || self.store.create(task)).await
    }

    pub async fn update(&self, id: &str, patch: &TaskPatch) -> Result<Task> {
        self.policy.run("update", || self.store.update(id, patch)).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.policy.run("delete", || self.store.delete(id)).await
    }
}

/// Client for the configured remote store, or `NotConfigured`.
pub fn remote_client(config: &Config) -> Result<TaskClient<RestTaskStore>> {
    let store = RestTaskStore::from_config(&config.store)?;
    Ok(TaskClient::new(store, RetryPolicy::from(&config.retry)))
}
