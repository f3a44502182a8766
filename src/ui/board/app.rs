use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use serde::Serialize;

use crate::board::{
    drop_task, move_message, patch_task, set_status, BoardState, Notice, NoticeKind,
    PendingMutation, SearchDebouncer, Settled,
};
use crate::config::Config;
use crate::document::{DocumentLoader, DocumentMeta};
use crate::error::{Error, Result};
use crate::events::{EventKind, EventSink};
use crate::markdown::{self, TextLine};
use crate::prefs::{PrefsStore, Tab, UiPrefs};
use crate::query::{Pagination, TaskFilters};
use crate::store::remote_client;
use crate::task::{Assignee, NewTask, Priority, Task, TaskCategory, TaskPatch, TaskStatus};

use super::editor::{self, EditorAction, EditorKind, TaskEditor};
use super::view;
use super::worker::{self, Request, UiMsg};

const EVENT_POLL_MS: u64 = 120;
const NOTICE_TTL: Duration = Duration::from_secs(4);
const DOC_SCROLL_PAGE: u16 = 10;

pub(crate) struct DeleteConfirmState {
    pub(crate) task_id: String,
    pub(crate) title: String,
}

/// The document currently shown on the documents tab.
pub(crate) struct OpenDocument {
    pub(crate) slug: String,
    pub(crate) title: String,
    pub(crate) lines: Vec<TextLine>,
}

enum Submission {
    Create(NewTask),
    Edit { id: String, patch: TaskPatch },
}

/// An optimistic change waiting on the worker, with what to record once it
/// settles.
struct InFlight {
    pending: PendingMutation,
    task_id: String,
    kind: EventKind,
}

/// Filter fields the board can cycle from the keyboard.
#[derive(Debug, Clone, Copy)]
enum FilterField {
    Priority,
    Category,
    Assignee,
    DueDate,
}

pub struct AppState {
    pub(crate) tab: Tab,
    pub(crate) prefs: UiPrefs,
    prefs_store: Option<PrefsStore>,
    pub(crate) board: BoardState,
    /// Set once any page has loaded; before that a load error takes over
    /// the whole tasks tab.
    pub(crate) loaded: bool,
    pub(crate) store_error: Option<String>,
    requests: Option<Sender<Request>>,
    pending: HashMap<u64, InFlight>,
    events: Option<EventSink>,
    next_token: u64,
    pub(crate) column: TaskStatus,
    rows: [usize; 4],
    pub(crate) show_archived: bool,
    pub(crate) search_text: String,
    pub(crate) search_active: bool,
    pub(crate) search: SearchDebouncer,
    pub(crate) editor: Option<TaskEditor>,
    pub(crate) delete_confirm: Option<DeleteConfirmState>,
    pub(crate) show_help: bool,
    pub(crate) notice: Option<(Notice, Instant)>,
    loader: DocumentLoader,
    pub(crate) docs: Vec<DocumentMeta>,
    pub(crate) doc_selected: usize,
    pub(crate) doc_open: Option<OpenDocument>,
    pub(crate) doc_scroll: u16,
    pub(crate) doc_error: Option<String>,
    pub(crate) watch_error: Option<String>,
}

pub fn run(config: &Config, docs_root: &Path, events: Option<EventSink>) -> Result<()> {
    let prefs_store = match PrefsStore::locate(config.board.prefs_path.as_deref()) {
        Ok(store) => Some(store),
        Err(err) => {
            tracing::warn!(error = %err, "preferences disabled");
            None
        }
    };
    let mut app = AppState::new(
        config.board.page_size,
        DocumentLoader::new(docs_root),
        prefs_store,
    )
    .with_search_debounce(Duration::from_millis(config.board.search_debounce_ms))
    .with_events(events);

    let (ui_tx, ui_rx) = mpsc::channel();
    match remote_client(config) {
        Ok(client) => {
            let (req_tx, req_rx) = mpsc::channel();
            worker::spawn_worker(client, req_rx, ui_tx.clone())?;
            app.connect(req_tx);
        }
        Err(err) => app.store_error = Some(err.to_string()),
    }
    worker::spawn_watch(docs_root.to_path_buf(), ui_tx);

    app.reload_documents();
    app.request_page(1);
    run_terminal(&mut app, ui_rx)
}

fn run_terminal(app: &mut AppState, ui_rx: Receiver<UiMsg>) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, app, ui_rx);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
    ui_rx: Receiver<UiMsg>,
) -> Result<()> {
    let mut dirty = true;
    loop {
        while let Ok(msg) = ui_rx.try_recv() {
            app.handle_ui_msg(msg);
            dirty = true;
        }
        if app.tick(Instant::now()) {
            dirty = true;
        }

        if dirty {
            terminal.draw(|frame| view::render(frame, app))?;
            dirty = false;
        }

        if event::poll(Duration::from_millis(EVENT_POLL_MS))? {
            match event::read()? {
                Event::Key(key) => {
                    if app.handle_key(key, Instant::now()) {
                        break;
                    }
                    dirty = true;
                }
                Event::Resize(_, _) => dirty = true,
                _ => {}
            }
        }
    }
    Ok(())
}

fn worker_gone() -> Error {
    Error::OperationFailed("task worker stopped".to_string())
}

/// The value after `current` in `all`. Wraps through `None`, which means
/// the filter is off.
fn cycle<T: Copy + PartialEq>(current: Option<T>, all: &[T]) -> Option<T> {
    match current {
        None => all.first().copied(),
        Some(value) => all
            .iter()
            .position(|candidate| *candidate == value)
            .and_then(|index| all.get(index + 1))
            .copied(),
    }
}

fn slot(status: TaskStatus) -> usize {
    TaskStatus::ALL
        .iter()
        .position(|entry| *entry == status)
        .unwrap_or(0)
}

impl AppState {
    pub fn new(page_size: usize, loader: DocumentLoader, prefs_store: Option<PrefsStore>) -> Self {
        let prefs = prefs_store
            .as_ref()
            .map(PrefsStore::load)
            .unwrap_or_default();
        let column = match prefs.active_column {
            Some(TaskStatus::Archived) | None => TaskStatus::Todo,
            Some(status) => status,
        };
        Self {
            tab: prefs.active_tab,
            prefs,
            prefs_store,
            board: BoardState::new(page_size),
            loaded: false,
            store_error: None,
            requests: None,
            pending: HashMap::new(),
            events: None,
            next_token: 0,
            column,
            rows: [0; 4],
            show_archived: false,
            search_text: String::new(),
            search_active: false,
            search: SearchDebouncer::default(),
            editor: None,
            delete_confirm: None,
            show_help: false,
            notice: None,
            loader,
            docs: Vec::new(),
            doc_selected: 0,
            doc_open: None,
            doc_scroll: 0,
            doc_error: None,
            watch_error: None,
        }
    }

    pub fn with_search_debounce(mut self, delay: Duration) -> Self {
        self.search = SearchDebouncer::new(delay);
        self
    }

    pub fn with_events(mut self, events: Option<EventSink>) -> Self {
        self.events = events;
        self
    }

    pub(crate) fn connect(&mut self, requests: Sender<Request>) {
        self.requests = Some(requests);
        self.store_error = None;
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.requests.is_some()
    }

    pub(crate) fn columns(&self) -> Vec<TaskStatus> {
        let mut columns = TaskStatus::BOARD.to_vec();
        if self.show_archived {
            columns.push(TaskStatus::Archived);
        }
        columns
    }

    pub(crate) fn selected_row(&self, status: TaskStatus) -> usize {
        self.rows[slot(status)]
    }

    pub(crate) fn selected_task(&self) -> Option<&Task> {
        self.board
            .column(self.column)
            .nth(self.selected_row(self.column))
    }

    pub(crate) fn pending_count(&self) -> usize {
        self.pending.len()
    }

    fn set_notice(&mut self, notice: Notice) {
        self.notice = Some((notice, Instant::now()));
    }

    fn set_info(&mut self, message: impl Into<String>) {
        self.set_notice(Notice::info(message));
    }

    fn set_error(&mut self, message: impl Into<String>) {
        self.set_notice(Notice::error(message));
    }

    /// Time-driven work: settle debounced search, expire the notice.
    /// Returns whether anything visible changed.
    pub(crate) fn tick(&mut self, now: Instant) -> bool {
        let mut changed = false;
        if let Some(text) = self.search.ready(now) {
            let mut filters = self.board.filters.clone();
            filters.search = if text.trim().is_empty() {
                None
            } else {
                Some(text)
            };
            if filters != self.board.filters {
                self.board.filters = filters;
                self.request_page(1);
                changed = true;
            }
        }
        let expired = matches!(&self.notice, Some((_, at)) if now.duration_since(*at) >= NOTICE_TTL);
        if expired {
            self.notice = None;
            changed = true;
        }
        changed
    }

    pub(crate) fn handle_ui_msg(&mut self, msg: UiMsg) {
        match msg {
            UiMsg::Page(Ok(page)) => {
                self.board.apply_page(page);
                self.loaded = true;
                self.clamp_rows();
            }
            UiMsg::Page(Err(err)) => {
                self.board.fail_load(&err);
                self.set_error(format!("Failed to load tasks: {err}"));
            }
            UiMsg::Created(Ok(task)) => {
                if let Some(sink) = self.events.as_mut() {
                    sink.record_settled(EventKind::TaskCreated, &task.id, "add task", &Ok(&task));
                }
                self.board.prepend(task);
                self.set_notice(Notice::success("Task added"));
            }
            UiMsg::Created(Err(err)) => self.set_error(format!("Failed to add task: {err}")),
            UiMsg::Updated { token, outcome } => self.settle(token, &outcome),
            UiMsg::Deleted { token, outcome } => self.settle(token, &outcome),
            UiMsg::DocsLoaded(Ok(docs)) => self.set_documents(docs),
            UiMsg::DocsLoaded(Err(err)) => self.doc_error = Some(err.to_string()),
            UiMsg::WatchError(err) => self.watch_error = Some(format!("watch error: {err}")),
        }
    }

    fn settle<T: Settled + Serialize>(&mut self, token: u64, outcome: &Result<T>) {
        if let Some(flight) = self.pending.remove(&token) {
            self.conclude(flight, outcome);
        }
    }

    fn conclude<T: Settled + Serialize>(&mut self, flight: InFlight, outcome: &Result<T>) {
        let action = flight.pending.action();
        let notice = self.board.settle(flight.pending, outcome);
        if let Some(sink) = self.events.as_mut() {
            sink.record_settled(flight.kind, &flight.task_id, action, outcome);
        }
        self.set_notice(notice);
        self.clamp_rows();
    }

    /// Returns true when the app should quit.
    pub(crate) fn handle_key(&mut self, key: KeyEvent, now: Instant) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return true;
        }

        if let Some(editor) = self.editor.as_mut() {
            match editor.handle_key(key) {
                EditorAction::Cancel => self.editor = None,
                EditorAction::Submit => self.submit_editor(),
                EditorAction::None => {}
            }
            return false;
        }

        if let Some(confirm) = self.delete_confirm.take() {
            match key.code {
                KeyCode::Char('y') | KeyCode::Enter => self.delete(confirm.task_id),
                KeyCode::Char('n') | KeyCode::Char('q') | KeyCode::Esc => {
                    self.set_info("cancelled");
                }
                _ => self.delete_confirm = Some(confirm),
            }
            return false;
        }

        if self.show_help {
            if matches!(
                key.code,
                KeyCode::Char('?') | KeyCode::Char('q') | KeyCode::Esc | KeyCode::Enter
            ) {
                self.show_help = false;
            }
            return false;
        }

        if self.search_active {
            self.handle_search_key(key, now);
            return false;
        }

        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Tab | KeyCode::BackTab => self.switch_tab(),
            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Esc => self.notice = None,
            _ => match self.tab {
                Tab::Tasks => self.handle_task_key(key),
                Tab::Documents => self.handle_document_key(key),
            },
        }
        false
    }

    fn handle_search_key(&mut self, key: KeyEvent, now: Instant) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Enter => {
                self.search_active = false;
                return;
            }
            KeyCode::Esc => {
                self.search_active = false;
                self.search_text.clear();
            }
            KeyCode::Char('u') if ctrl => self.search_text.clear(),
            KeyCode::Backspace => {
                self.search_text.pop();
            }
            KeyCode::Char(ch) if !ctrl => self.search_text.push(ch),
            _ => return,
        }
        self.search.input(self.search_text.clone(), now);
    }

    fn handle_task_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('h') | KeyCode::Left => self.focus_column(-1),
            KeyCode::Char('l') | KeyCode::Right => self.focus_column(1),
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
            KeyCode::Char('H') | KeyCode::Char('<') => self.move_selected(-1),
            KeyCode::Char('L') | KeyCode::Char('>') => self.move_selected(1),
            KeyCode::Char('/') => self.search_active = true,
            KeyCode::Char('r') => self.request_page(1),
            KeyCode::Char('m') => self.load_more(),
            KeyCode::Char('c') => {
                self.prefs.toggle_collapsed(self.column);
                self.save_prefs();
            }
            KeyCode::Char('A') => self.toggle_archived(),
            KeyCode::Char('p') => self.cycle_filter(FilterField::Priority),
            KeyCode::Char('t') => self.cycle_filter(FilterField::Category),
            KeyCode::Char('u') => self.cycle_filter(FilterField::Assignee),
            KeyCode::Char('D') => self.cycle_filter(FilterField::DueDate),
            KeyCode::Char('F') => self.clear_filters(),
            KeyCode::Char('n') => {
                if self.require_store() {
                    self.editor = Some(TaskEditor::new_task());
                }
            }
            KeyCode::Char('e') | KeyCode::Enter => {
                if let Some(task) = self.selected_task() {
                    self.editor = Some(TaskEditor::edit_task(task));
                }
            }
            KeyCode::Char('d') => {
                if let Some(task) = self.selected_task() {
                    self.delete_confirm = Some(DeleteConfirmState {
                        task_id: task.id.clone(),
                        title: task.title.clone(),
                    });
                }
            }
            KeyCode::Char('a') => self.archive_selected(),
            KeyCode::Char('R') => self.restore_selected(),
            KeyCode::Char('X') => self.archive_all_complete(),
            _ => {}
        }
    }

    fn handle_document_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.select_document(1),
            KeyCode::Char('k') | KeyCode::Up => self.select_document(-1),
            KeyCode::Char('J') | KeyCode::PageDown => {
                self.doc_scroll = self.doc_scroll.saturating_add(DOC_SCROLL_PAGE);
            }
            KeyCode::Char('K') | KeyCode::PageUp => {
                self.doc_scroll = self.doc_scroll.saturating_sub(DOC_SCROLL_PAGE);
            }
            KeyCode::Char('g') => self.doc_scroll = 0,
            KeyCode::Char('r') => self.reload_documents(),
            _ => {}
        }
    }

    fn switch_tab(&mut self) {
        self.tab = self.tab.toggle();
        self.prefs.active_tab = self.tab;
        self.save_prefs();
    }

    fn save_prefs(&mut self) {
        let Some(store) = &self.prefs_store else {
            return;
        };
        if let Err(err) = store.save(&self.prefs) {
            self.set_error(format!("Failed to save preferences: {err}"));
        }
    }

    fn require_store(&mut self) -> bool {
        if self.is_connected() {
            return true;
        }
        let message = self
            .store_error
            .clone()
            .unwrap_or_else(|| "task store not configured".to_string());
        self.set_error(message);
        false
    }

    fn focus_column(&mut self, delta: isize) {
        let columns = self.columns();
        let current = columns
            .iter()
            .position(|status| *status == self.column)
            .unwrap_or(0) as isize;
        let next = (current + delta).clamp(0, columns.len() as isize - 1) as usize;
        if columns[next] != self.column {
            self.column = columns[next];
            self.prefs.active_column = Some(self.column);
            self.save_prefs();
        }
    }

    fn move_selection(&mut self, delta: isize) {
        let len = self.board.column(self.column).count();
        if len == 0 {
            return;
        }
        let row = &mut self.rows[slot(self.column)];
        *row = (*row as isize + delta).clamp(0, len as isize - 1) as usize;
    }

    fn clamp_rows(&mut self) {
        for status in TaskStatus::ALL {
            let len = self.board.column(status).count();
            let row = &mut self.rows[slot(status)];
            *row = (*row).min(len.saturating_sub(1));
        }
    }

    /// Put the cursor on `id` wherever it now lives.
    fn follow(&mut self, id: &str) {
        let Some(status) = self.board.find(id).map(|task| task.status) else {
            return;
        };
        if status == TaskStatus::Archived && !self.show_archived {
            self.clamp_rows();
            return;
        }
        if let Some(row) = self.board.column(status).position(|task| task.id == id) {
            self.column = status;
            self.rows[slot(status)] = row;
        }
    }

    pub(crate) fn request_page(&mut self, page: usize) {
        let Some(requests) = &self.requests else {
            return;
        };
        let request = Request::Fetch {
            filters: self.board.filters.clone(),
            pagination: Pagination {
                page,
                page_size: self.board.page_size,
            },
        };
        if requests.send(request).is_ok() {
            self.board.loading = true;
        } else {
            self.board.fail_load(&worker_gone());
        }
    }

    fn cycle_filter(&mut self, field: FilterField) {
        let mut filters = self.board.filters.clone();
        match field {
            FilterField::Priority => filters.priority = cycle(filters.priority, &Priority::ALL),
            FilterField::Category => {
                filters.category = cycle(filters.category, &TaskCategory::ALL);
            }
            FilterField::Assignee => filters.assignee = cycle(filters.assignee, &Assignee::ALL),
            FilterField::DueDate => {
                filters.has_due_date = cycle(filters.has_due_date, &[true, false]);
            }
        }
        self.apply_filters(filters);
    }

    /// Drop search text and field filters; the status scope stays.
    fn clear_filters(&mut self) {
        self.search_text.clear();
        self.search.cancel();
        let filters = TaskFilters {
            statuses: self.board.filters.statuses.clone(),
            ..TaskFilters::default()
        };
        if filters == self.board.filters {
            self.set_info("No filters to clear");
            return;
        }
        self.apply_filters(filters);
        self.set_info("Filters cleared");
    }

    fn apply_filters(&mut self, filters: TaskFilters) {
        if filters != self.board.filters {
            self.board.filters = filters;
            self.request_page(1);
        }
    }

    fn load_more(&mut self) {
        if self.board.loading {
            return;
        }
        if !self.board.has_more {
            self.set_info("All tasks loaded");
            return;
        }
        self.request_page(self.board.page + 1);
    }

    fn toggle_archived(&mut self) {
        self.show_archived = !self.show_archived;
        if !self.show_archived && self.column == TaskStatus::Archived {
            self.column = TaskStatus::Complete;
        }
        let message = if self.show_archived {
            "Showing archived tasks"
        } else {
            "Hiding archived tasks"
        };
        self.set_info(message);
    }

    fn send_update(&mut self, patch: TaskPatch, flight: InFlight) {
        let token = self.next_token;
        self.next_token += 1;
        let request = Request::Update {
            token,
            id: flight.task_id.clone(),
            patch,
        };
        let sent = self
            .requests
            .as_ref()
            .map(|requests| requests.send(request).is_ok())
            .unwrap_or(false);
        if sent {
            self.pending.insert(token, flight);
        } else {
            self.conclude::<Task>(flight, &Err(worker_gone()));
        }
    }

    fn change_status(&mut self, id: String, status: TaskStatus) {
        let (action, success) = move_message(status);
        let pending = self.board.begin(action, success, set_status(&id, status));
        self.follow(&id);
        let kind = match status {
            TaskStatus::Archived => EventKind::TaskArchived,
            _ => EventKind::TaskMoved,
        };
        let flight = InFlight {
            pending,
            task_id: id,
            kind,
        };
        self.send_update(TaskPatch::status(status), flight);
    }

    /// Keyboard stand-in for dragging a card to the neighbouring column.
    fn move_selected(&mut self, delta: isize) {
        if !self.require_store() {
            return;
        }
        let Some(task) = self.selected_task() else {
            return;
        };
        let Some(column) = task.status.column() else {
            self.set_info("Archived tasks come back with R");
            return;
        };
        let target = column as isize + delta;
        if target < 0 || target >= TaskStatus::BOARD.len() as isize {
            return;
        }
        let id = task.id.clone();
        self.change_status(id, TaskStatus::BOARD[target as usize]);
    }

    fn archive_selected(&mut self) {
        if !self.require_store() {
            return;
        }
        match self.selected_task() {
            Some(task) if task.status != TaskStatus::Archived => {
                let id = task.id.clone();
                self.change_status(id, TaskStatus::Archived);
            }
            _ => {}
        }
    }

    fn restore_selected(&mut self) {
        if !self.require_store() {
            return;
        }
        match self.selected_task() {
            Some(task) if task.status == TaskStatus::Archived => {
                let id = task.id.clone();
                let pending = self.board.begin(
                    "restore task",
                    "Task restored",
                    set_status(&id, TaskStatus::Complete),
                );
                self.clamp_rows();
                let flight = InFlight {
                    pending,
                    task_id: id,
                    kind: EventKind::TaskRestored,
                };
                self.send_update(TaskPatch::status(TaskStatus::Complete), flight);
            }
            _ => self.set_info("Select an archived task to restore"),
        }
    }

    fn archive_all_complete(&mut self) {
        if !self.require_store() {
            return;
        }
        let ids: Vec<String> = self
            .board
            .column(TaskStatus::Complete)
            .map(|task| task.id.clone())
            .collect();
        if ids.is_empty() {
            self.set_info("No complete tasks to archive");
            return;
        }
        for id in ids {
            let (action, success) = move_message(TaskStatus::Archived);
            let pending = self
                .board
                .begin(action, success, set_status(&id, TaskStatus::Archived));
            let flight = InFlight {
                pending,
                task_id: id,
                kind: EventKind::TaskArchived,
            };
            self.send_update(TaskPatch::status(TaskStatus::Archived), flight);
        }
        self.clamp_rows();
    }

    fn delete(&mut self, id: String) {
        if !self.require_store() {
            return;
        }
        let pending = self
            .board
            .begin("delete task", "Task deleted", drop_task(&id));
        self.clamp_rows();
        let token = self.next_token;
        self.next_token += 1;
        let flight = InFlight {
            pending,
            task_id: id.clone(),
            kind: EventKind::TaskDeleted,
        };
        let sent = self
            .requests
            .as_ref()
            .map(|requests| requests.send(Request::Delete { token, id }).is_ok())
            .unwrap_or(false);
        if sent {
            self.pending.insert(token, flight);
        } else {
            self.conclude::<()>(flight, &Err(worker_gone()));
        }
    }

    fn submit_editor(&mut self) {
        let Some(editor) = self.editor.as_ref() else {
            return;
        };
        let today = editor::today();
        let submission = match editor.kind() {
            EditorKind::NewTask => editor
                .build_new(today)
                .and_then(NewTask::validated)
                .map(Submission::Create),
            EditorKind::EditTask => match editor.task_id().and_then(|id| self.board.find(id)) {
                Some(original) => editor
                    .build_patch(original, today)
                    .and_then(TaskPatch::validated)
                    .map(|patch| Submission::Edit {
                        id: original.id.clone(),
                        patch,
                    }),
                None => Err(Error::TaskNotFound(
                    editor.task_id().unwrap_or_default().to_string(),
                )),
            },
        };

        let submission = match submission {
            Ok(submission) => submission,
            Err(err) => {
                if let Some(editor) = self.editor.as_mut() {
                    editor.set_error(err.to_string());
                }
                return;
            }
        };
        self.editor = None;

        match submission {
            Submission::Create(input) => {
                let sent = self
                    .requests
                    .as_ref()
                    .map(|requests| requests.send(Request::Create(input)).is_ok())
                    .unwrap_or(false);
                if sent {
                    self.set_info("Adding task...");
                } else {
                    self.set_error(format!("Failed to add task: {}", worker_gone()));
                }
            }
            Submission::Edit { id, patch } => {
                if patch.is_empty() {
                    self.set_info("No changes");
                    return;
                }
                let pending = self
                    .board
                    .begin("save task", "Task saved", patch_task(&id, &patch));
                let flight = InFlight {
                    pending,
                    task_id: id,
                    kind: EventKind::TaskUpdated,
                };
                self.send_update(patch, flight);
            }
        }
    }

    pub(crate) fn reload_documents(&mut self) {
        match self.loader.list_all() {
            Ok(docs) => self.set_documents(docs),
            Err(err) => self.doc_error = Some(err.to_string()),
        }
    }

    fn set_documents(&mut self, docs: Vec<DocumentMeta>) {
        let current = self.docs.get(self.doc_selected).map(|doc| doc.slug.clone());
        self.docs = docs;
        self.doc_error = None;
        self.doc_selected = current
            .and_then(|slug| self.docs.iter().position(|doc| doc.slug == slug))
            .unwrap_or(0);
        self.open_selected_document();
    }

    fn select_document(&mut self, delta: isize) {
        if self.docs.is_empty() {
            return;
        }
        let last = self.docs.len() as isize - 1;
        let next = (self.doc_selected as isize + delta).clamp(0, last) as usize;
        if next != self.doc_selected {
            self.doc_selected = next;
            self.open_selected_document();
        }
    }

    fn open_selected_document(&mut self) {
        let Some(slug) = self.docs.get(self.doc_selected).map(|doc| doc.slug.clone()) else {
            self.doc_open = None;
            return;
        };
        let same = self.doc_open.as_ref().map(|open| open.slug == slug) == Some(true);
        if !same {
            self.doc_scroll = 0;
        }
        match self.loader.get(&slug) {
            Ok(Some(document)) => {
                self.doc_open = Some(OpenDocument {
                    lines: markdown::to_lines(&document.content),
                    title: document.title,
                    slug,
                });
            }
            Ok(None) => {
                self.doc_open = None;
                self.doc_error = Some("Document not found".to_string());
            }
            Err(err) => {
                self.doc_open = None;
                self.doc_error = Some(err.to_string());
            }
        }
    }

    pub(crate) fn notice_kind(&self) -> Option<NoticeKind> {
        self.notice.as_ref().map(|(notice, _)| notice.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::TasksPage;
    use chrono::Utc;
    use std::fs;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn task(id: &str, status: TaskStatus) -> Task {
        let now = Utc::now();
        Task {
            id: id.to_string(),
            title: format!("task {id}"),
            description: String::new(),
            status,
            priority: Priority::Medium,
            category: TaskCategory::Dev,
            assignee: None,
            notes: String::new(),
            due_date: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    struct Harness {
        app: AppState,
        requests: Receiver<Request>,
        _dir: tempfile::TempDir,
    }

    fn harness(tasks: Vec<Task>) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let loader = DocumentLoader::new(dir.path().join("docs"));
        let prefs = PrefsStore::new(dir.path().join("prefs.json"));
        let mut app = AppState::new(10, loader, Some(prefs));
        let (req_tx, req_rx) = mpsc::channel();
        app.connect(req_tx);
        let total = tasks.len();
        app.handle_ui_msg(UiMsg::Page(Ok(TasksPage::new(
            tasks,
            total,
            Pagination::new(1, 10).unwrap(),
        ))));
        Harness {
            app,
            requests: req_rx,
            _dir: dir,
        }
    }

    fn press(app: &mut AppState, code: KeyCode) -> bool {
        app.handle_key(key(code), Instant::now())
    }

    #[test]
    fn moving_a_card_is_optimistic_and_rolls_back() {
        let mut h = harness(vec![task("a", TaskStatus::Todo)]);
        press(&mut h.app, KeyCode::Char('L'));

        assert_eq!(h.app.board.tasks[0].status, TaskStatus::InProgress);
        assert_eq!(h.app.column, TaskStatus::InProgress);
        let token = match h.requests.try_recv().unwrap() {
            Request::Update { token, id, patch } => {
                assert_eq!(id, "a");
                assert_eq!(patch.status, Some(TaskStatus::InProgress));
                token
            }
            _ => panic!("expected update"),
        };

        h.app.handle_ui_msg(UiMsg::Updated {
            token,
            outcome: Err(Error::Remote("offline".to_string())),
        });
        assert_eq!(h.app.board.tasks[0].status, TaskStatus::Todo);
        let (notice, _) = h.app.notice.as_ref().unwrap();
        assert_eq!(notice.kind, NoticeKind::Error);
        assert!(notice.message.starts_with("Failed to move task"));
        assert_eq!(h.app.pending_count(), 0);
    }

    #[test]
    fn delete_needs_confirmation() {
        let mut h = harness(vec![task("a", TaskStatus::Todo), task("b", TaskStatus::Todo)]);
        press(&mut h.app, KeyCode::Char('d'));
        assert!(h.app.delete_confirm.is_some());
        press(&mut h.app, KeyCode::Char('n'));
        assert!(h.app.delete_confirm.is_none());
        assert!(h.requests.try_recv().is_err());

        press(&mut h.app, KeyCode::Char('d'));
        press(&mut h.app, KeyCode::Char('y'));
        assert_eq!(h.app.board.tasks.len(), 1);
        assert_eq!(h.app.board.total, 1);
        let token = match h.requests.try_recv().unwrap() {
            Request::Delete { token, id } => {
                assert_eq!(id, "a");
                token
            }
            _ => panic!("expected delete"),
        };
        h.app.handle_ui_msg(UiMsg::Deleted {
            token,
            outcome: Ok(()),
        });
        let (notice, _) = h.app.notice.as_ref().unwrap();
        assert_eq!(notice.message, "Task deleted");
    }

    #[test]
    fn empty_title_keeps_the_form_open() {
        let mut h = harness(Vec::new());
        press(&mut h.app, KeyCode::Char('n'));
        assert!(h.app.editor.is_some());
        h.app.handle_key(
            KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL),
            Instant::now(),
        );
        let editor = h.app.editor.as_ref().unwrap();
        assert_eq!(editor.error(), Some("Validation failed: title is required"));
        assert!(h.requests.try_recv().is_err());
    }

    #[test]
    fn created_task_lands_on_top() {
        let mut h = harness(vec![task("a", TaskStatus::Todo)]);
        h.app
            .handle_ui_msg(UiMsg::Created(Ok(task("new", TaskStatus::Todo))));
        assert_eq!(h.app.board.tasks[0].id, "new");
        assert_eq!(h.app.board.total, 2);
    }

    #[test]
    fn search_reloads_after_typing_stops() {
        let mut h = harness(Vec::new());
        let start = Instant::now();
        h.app.handle_key(key(KeyCode::Char('/')), start);
        for ch in "milk".chars() {
            h.app.handle_key(key(KeyCode::Char(ch)), start);
        }
        h.app.handle_key(key(KeyCode::Enter), start);
        assert!(!h.app.search_active);
        assert!(!h.app.tick(start + Duration::from_millis(10)));
        assert!(h.requests.try_recv().is_err());

        assert!(h.app.tick(start + Duration::from_millis(400)));
        match h.requests.try_recv().unwrap() {
            Request::Fetch {
                filters,
                pagination,
            } => {
                assert_eq!(filters.search.as_deref(), Some("milk"));
                assert_eq!(pagination.page, 1);
            }
            _ => panic!("expected fetch"),
        }
    }

    fn next_fetch(requests: &Receiver<Request>) -> TaskFilters {
        match requests.try_recv().unwrap() {
            Request::Fetch {
                filters,
                pagination,
            } => {
                assert_eq!(pagination.page, 1);
                filters
            }
            _ => panic!("expected fetch"),
        }
    }

    #[test]
    fn filter_keys_cycle_and_refetch() {
        let mut h = harness(vec![task("a", TaskStatus::Todo)]);
        press(&mut h.app, KeyCode::Char('p'));
        assert_eq!(next_fetch(&h.requests).priority, Some(Priority::Low));
        press(&mut h.app, KeyCode::Char('p'));
        press(&mut h.app, KeyCode::Char('p'));
        assert_eq!(next_fetch(&h.requests).priority, Some(Priority::Medium));
        assert_eq!(next_fetch(&h.requests).priority, Some(Priority::High));

        press(&mut h.app, KeyCode::Char('t'));
        press(&mut h.app, KeyCode::Char('u'));
        press(&mut h.app, KeyCode::Char('D'));
        let filters = next_fetch(&h.requests);
        assert_eq!(filters.category, Some(TaskCategory::Dev));
        let filters = next_fetch(&h.requests);
        assert_eq!(filters.assignee, Some(Assignee::Arie));
        let filters = next_fetch(&h.requests);
        assert_eq!(filters.has_due_date, Some(true));
        assert_eq!(filters.priority, Some(Priority::High));
        assert_eq!(h.app.board.filters, filters);

        press(&mut h.app, KeyCode::Char('p'));
        assert_eq!(next_fetch(&h.requests).priority, None);

        press(&mut h.app, KeyCode::Char('F'));
        let cleared = next_fetch(&h.requests);
        assert!(cleared.is_empty());
        assert!(h.app.board.filters.is_empty());
        press(&mut h.app, KeyCode::Char('F'));
        assert!(h.requests.try_recv().is_err());
    }

    #[test]
    fn settled_mutations_are_recorded_as_events() {
        let mut h = harness(vec![task("a", TaskStatus::Todo), task("b", TaskStatus::Todo)]);
        let path = h._dir.path().join("events.jsonl");
        h.app.events = Some(EventSink::file(&path).unwrap());

        press(&mut h.app, KeyCode::Char('L'));
        let first = match h.requests.try_recv().unwrap() {
            Request::Update { token, .. } => token,
            _ => panic!("expected update"),
        };
        h.app.handle_ui_msg(UiMsg::Updated {
            token: first,
            outcome: Err(Error::Remote("offline".to_string())),
        });
        h.app
            .handle_ui_msg(UiMsg::Created(Ok(task("c", TaskStatus::Todo))));

        let lines: Vec<serde_json::Value> = fs::read_to_string(&path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "mutation_rolled_back");
        assert_eq!(lines[0]["task_id"], "a");
        assert_eq!(lines[0]["data"]["action"], "move task");
        assert_eq!(lines[1]["event"], "task_created");
        assert_eq!(lines[1]["task_id"], "c");
    }

    #[test]
    fn archive_all_complete_queues_one_update_each() {
        let mut h = harness(vec![
            task("a", TaskStatus::Complete),
            task("b", TaskStatus::Todo),
            task("c", TaskStatus::Complete),
        ]);
        press(&mut h.app, KeyCode::Char('X'));
        assert_eq!(h.app.board.column(TaskStatus::Archived).count(), 2);
        assert_eq!(h.requests.try_iter().count(), 2);
        assert_eq!(h.app.pending_count(), 2);
    }

    #[test]
    fn restore_moves_archived_task_to_complete() {
        let mut h = harness(vec![task("a", TaskStatus::Archived)]);
        press(&mut h.app, KeyCode::Char('A'));
        press(&mut h.app, KeyCode::Char('l'));
        press(&mut h.app, KeyCode::Char('l'));
        press(&mut h.app, KeyCode::Char('l'));
        assert_eq!(h.app.column, TaskStatus::Archived);
        press(&mut h.app, KeyCode::Char('R'));
        assert_eq!(h.app.board.tasks[0].status, TaskStatus::Complete);
        assert!(matches!(
            h.requests.try_recv().unwrap(),
            Request::Update { patch, .. } if patch.status == Some(TaskStatus::Complete)
        ));
    }

    #[test]
    fn unconfigured_store_blocks_mutations() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = AppState::new(10, DocumentLoader::new(dir.path()), None);
        app.store_error = Some("task store not configured".to_string());
        press(&mut app, KeyCode::Char('n'));
        assert!(app.editor.is_none());
        assert_eq!(app.notice_kind(), Some(NoticeKind::Error));
    }

    #[test]
    fn layout_choices_are_persisted() {
        let mut h = harness(Vec::new());
        press(&mut h.app, KeyCode::Char('l'));
        press(&mut h.app, KeyCode::Char('c'));
        press(&mut h.app, KeyCode::Tab);

        let path = h._dir.path().join("prefs.json");
        let saved = PrefsStore::new(&path).load();
        assert_eq!(saved.active_column, Some(TaskStatus::InProgress));
        assert_eq!(saved.collapsed_columns, vec![TaskStatus::InProgress]);
        assert_eq!(saved.active_tab, Tab::Documents);

        let reopened = AppState::new(10, DocumentLoader::new(h._dir.path()), Some(PrefsStore::new(&path)));
        assert_eq!(reopened.tab, Tab::Documents);
        assert_eq!(reopened.column, TaskStatus::InProgress);
    }

    #[test]
    fn documents_tab_opens_the_newest_document() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("docs");
        fs::create_dir_all(root.join("notes")).unwrap();
        fs::write(root.join("notes/hello.md"), "# Hello\n\nFirst paragraph.\n").unwrap();
        let mut app = AppState::new(10, DocumentLoader::new(&root), None);
        app.reload_documents();

        assert_eq!(app.docs.len(), 1);
        let open = app.doc_open.as_ref().unwrap();
        assert_eq!(open.slug, "notes/hello");
        assert_eq!(open.title, "Hello");
        assert!(open.lines.iter().any(|line| line.text == "First paragraph."));
    }
}
