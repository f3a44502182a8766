//! Background threads for the board: one owns the task client and a
//! single-threaded runtime, the other watches the documents root.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};

use crate::document::{DocumentLoader, DocumentMeta};
use crate::error::Result;
use crate::query::{Pagination, TaskFilters, TasksPage};
use crate::store::{TaskClient, TaskStore};
use crate::task::{NewTask, Task, TaskPatch};

const WATCH_DEBOUNCE_MS: u64 = 200;

pub(crate) enum Request {
    Fetch {
        filters: TaskFilters,
        pagination: Pagination,
    },
    Create(NewTask),
    Update {
        token: u64,
        id: String,
        patch: TaskPatch,
    },
    Delete {
        token: u64,
        id: String,
    },
}

pub(crate) enum UiMsg {
    Page(Result<TasksPage>),
    Created(Result<Task>),
    Updated { token: u64, outcome: Result<Task> },
    Deleted { token: u64, outcome: Result<()> },
    DocsLoaded(Result<Vec<DocumentMeta>>),
    WatchError(String),
}

/// Serve requests one at a time until the UI hangs up.
pub(crate) fn spawn_worker<S: TaskStore + 'static>(
    client: TaskClient<S>,
    req_rx: Receiver<Request>,
    ui_tx: Sender<UiMsg>,
) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    thread::spawn(move || {
        while let Ok(req) = req_rx.recv() {
            let msg = runtime.block_on(handle(&client, req));
            if ui_tx.send(msg).is_err() {
                break;
            }
        }
    });
    Ok(())
}

async fn handle<S: TaskStore>(client: &TaskClient<S>, req: Request) -> UiMsg {
    match req {
        Request::Fetch {
            filters,
            pagination,
        } => UiMsg::Page(client.fetch(&filters, pagination).await),
        Request::Create(input) => UiMsg::Created(client.create(&input).await),
        Request::Update { token, id, patch } => UiMsg::Updated {
            token,
            outcome: client.update(&id, &patch).await,
        },
        Request::Delete { token, id } => UiMsg::Deleted {
            token,
            outcome: client.delete(&id).await,
        },
    }
}

/// Reload the document list whenever something under the root changes.
pub(crate) fn spawn_watch(root: PathBuf, ui_tx: Sender<UiMsg>) {
    if !root.is_dir() {
        return;
    }

    thread::spawn(move || {
        let (event_tx, event_rx) = mpsc::channel();
        let watcher: notify::Result<RecommendedWatcher> = notify::recommended_watcher(move |res| {
            let _ = event_tx.send(res);
        });
        let mut watcher = match watcher {
            Ok(watcher) => watcher,
            Err(err) => {
                let _ = ui_tx.send(UiMsg::WatchError(err.to_string()));
                return;
            }
        };
        if let Err(err) = watcher.watch(&root, RecursiveMode::Recursive) {
            let _ = ui_tx.send(UiMsg::WatchError(err.to_string()));
            return;
        }

        let loader = DocumentLoader::new(&root);
        let debounce = Duration::from_millis(WATCH_DEBOUNCE_MS);
        let mut pending: Option<Instant> = None;

        loop {
            let timeout = pending
                .map(|deadline| deadline.saturating_duration_since(Instant::now()))
                .unwrap_or(Duration::from_secs(3600));
            match event_rx.recv_timeout(timeout) {
                Ok(Ok(_)) => {
                    pending = Some(Instant::now() + debounce);
                }
                Ok(Err(err)) => {
                    let _ = ui_tx.send(UiMsg::WatchError(err.to_string()));
                }
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    if pending.take().is_some()
                        && ui_tx.send(UiMsg::DocsLoaded(loader.list_all())).is_err()
                    {
                        break;
                    }
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RetryPolicy;
    use crate::store::MemoryTaskStore;
    use crate::task::{Priority, TaskCategory};
    use std::sync::Arc;

    #[test]
    fn worker_answers_in_order() {
        let store = Arc::new(MemoryTaskStore::new());
        let client = TaskClient::new(store, RetryPolicy::none());
        let (req_tx, req_rx) = mpsc::channel();
        let (ui_tx, ui_rx) = mpsc::channel();
        spawn_worker(client, req_rx, ui_tx).unwrap();

        req_tx
            .send(Request::Create(NewTask::new(
                "Buy milk",
                Priority::Low,
                TaskCategory::Admin,
            )))
            .unwrap();
        req_tx
            .send(Request::Fetch {
                filters: TaskFilters::default(),
                pagination: Pagination::default(),
            })
            .unwrap();

        let timeout = Duration::from_secs(5);
        match ui_rx.recv_timeout(timeout).unwrap() {
            UiMsg::Created(Ok(task)) => assert_eq!(task.title, "Buy milk"),
            _ => panic!("expected created task"),
        }
        match ui_rx.recv_timeout(timeout).unwrap() {
            UiMsg::Page(Ok(page)) => assert_eq!(page.total, 1),
            _ => panic!("expected page"),
        }

        req_tx
            .send(Request::Delete {
                token: 7,
                id: "missing".to_string(),
            })
            .unwrap();
        match ui_rx.recv_timeout(timeout).unwrap() {
            UiMsg::Deleted { token, outcome } => {
                assert_eq!(token, 7);
                assert!(outcome.is_err());
            }
            _ => panic!("expected delete reply"),
        }
    }
}
