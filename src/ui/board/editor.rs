use chrono::{Local, NaiveDate};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::error::Result;
use crate::task::{
    parse_due_date, Assignee, NewTask, Priority, Task, TaskCategory, TaskPatch,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorKind {
    NewTask,
    EditTask,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldId {
    Title,
    Description,
    Priority,
    Category,
    Assignee,
    Due,
    Notes,
}

impl FieldId {
    pub fn label(&self) -> &'static str {
        match self {
            FieldId::Title => "Title",
            FieldId::Description => "Description",
            FieldId::Priority => "Priority",
            FieldId::Category => "Category",
            FieldId::Assignee => "Assignee",
            FieldId::Due => "Due",
            FieldId::Notes => "Notes",
        }
    }

    /// Choice fields cycle with left/right/space instead of taking text.
    pub fn is_choice(&self) -> bool {
        matches!(self, FieldId::Priority | FieldId::Category | FieldId::Assignee)
    }
}

const FIELDS: [FieldId; 7] = [
    FieldId::Title,
    FieldId::Description,
    FieldId::Priority,
    FieldId::Category,
    FieldId::Assignee,
    FieldId::Due,
    FieldId::Notes,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorAction {
    None,
    Cancel,
    Submit,
}

/// Task form shared by "new" and "edit".
#[derive(Debug, Clone)]
pub struct TaskEditor {
    kind: EditorKind,
    task_id: Option<String>,
    title: String,
    description: String,
    notes: String,
    due: String,
    priority: Priority,
    category: TaskCategory,
    assignee: Option<Assignee>,
    active: usize,
    error: Option<String>,
}

impl TaskEditor {
    pub fn new_task() -> Self {
        Self {
            kind: EditorKind::NewTask,
            task_id: None,
            title: String::new(),
            description: String::new(),
            notes: String::new(),
            due: String::new(),
            priority: Priority::Medium,
            category: TaskCategory::Dev,
            assignee: None,
            active: 0,
            error: None,
        }
    }

    pub fn edit_task(task: &Task) -> Self {
        Self {
            kind: EditorKind::EditTask,
            task_id: Some(task.id.clone()),
            title: task.title.clone(),
            description: task.description.clone(),
            notes: task.notes.clone(),
            due: task
                .due_date
                .map(|due| due.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            priority: task.priority,
            category: task.category,
            assignee: task.assignee,
            active: 0,
            error: None,
        }
    }

    pub fn kind(&self) -> EditorKind {
        self.kind
    }

    pub fn task_id(&self) -> Option<&str> {
        self.task_id.as_deref()
    }

    pub fn fields(&self) -> &'static [FieldId] {
        &FIELDS
    }

    pub fn active(&self) -> FieldId {
        FIELDS[self.active]
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_error(&mut self, message: String) {
        self.error = Some(message);
    }

    pub fn display_value(&self, field: FieldId) -> String {
        match field {
            FieldId::Title => self.title.clone(),
            FieldId::Description => self.description.clone(),
            FieldId::Notes => self.notes.clone(),
            FieldId::Due => self.due.clone(),
            FieldId::Priority => self.priority.to_string(),
            FieldId::Category => self.category.to_string(),
            FieldId::Assignee => self
                .assignee
                .map(|a| a.to_string())
                .unwrap_or_else(|| "unassigned".to_string()),
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> EditorAction {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl {
            match key.code {
                KeyCode::Char('s') => return EditorAction::Submit,
                KeyCode::Char('u') => {
                    if let Some(text) = self.text_mut() {
                        text.clear();
                    }
                }
                // Quick due dates.
                KeyCode::Char('t') => self.due = "today".to_string(),
                KeyCode::Char('o') => self.due = "tomorrow".to_string(),
                KeyCode::Char('w') => self.due = "next-week".to_string(),
                _ => {}
            }
            self.error = None;
            return EditorAction::None;
        }

        match key.code {
            KeyCode::Esc => return EditorAction::Cancel,
            KeyCode::Tab | KeyCode::Down => self.move_active(1),
            KeyCode::BackTab | KeyCode::Up => self.move_active(-1),
            KeyCode::Enter => {
                if self.active + 1 >= FIELDS.len() {
                    return EditorAction::Submit;
                }
                self.move_active(1);
            }
            KeyCode::Left if self.active().is_choice() => self.cycle(-1),
            KeyCode::Right if self.active().is_choice() => self.cycle(1),
            KeyCode::Char(' ') if self.active().is_choice() => self.cycle(1),
            KeyCode::Backspace => {
                if let Some(text) = self.text_mut() {
                    text.pop();
                }
            }
            KeyCode::Char(ch) if !ch.is_control() => {
                if let Some(text) = self.text_mut() {
                    text.push(ch);
                }
            }
            _ => {}
        }
        self.error = None;
        EditorAction::None
    }

    /// Insert payload for a new task. Validation happens in the board.
    pub fn build_new(&self, today: NaiveDate) -> Result<NewTask> {
        let mut input = NewTask::new(self.title.clone(), self.priority, self.category);
        input.description = self.description.clone();
        input.notes = self.notes.clone();
        input.assignee = self.assignee;
        input.due_date = parse_due_date(&self.due, today)?;
        Ok(input)
    }

    /// Patch holding only the fields that differ from `original`.
    pub fn build_patch(&self, original: &Task, today: NaiveDate) -> Result<TaskPatch> {
        let due = parse_due_date(&self.due, today)?;
        let mut patch = TaskPatch::default();
        if self.title != original.title {
            patch.title = Some(self.title.clone());
        }
        if self.description != original.description {
            patch.description = Some(self.description.clone());
        }
        if self.notes != original.notes {
            patch.notes = Some(self.notes.clone());
        }
        if self.priority != original.priority {
            patch.priority = Some(self.priority);
        }
        if self.category != original.category {
            patch.category = Some(self.category);
        }
        if self.assignee != original.assignee {
            patch.assignee = Some(self.assignee);
        }
        let same_day = match (due, original.due_date) {
            (Some(a), Some(b)) => a.date_naive() == b.date_naive(),
            (None, None) => true,
            _ => false,
        };
        if !same_day {
            patch.due_date = Some(due);
        }
        Ok(patch)
    }

    fn text_mut(&mut self) -> Option<&mut String> {
        match self.active() {
            FieldId::Title => Some(&mut self.title),
            FieldId::Description => Some(&mut self.description),
            FieldId::Notes => Some(&mut self.notes),
            FieldId::Due => Some(&mut self.due),
            _ => None,
        }
    }

    fn cycle(&mut self, delta: isize) {
        match self.active() {
            FieldId::Priority => self.priority = step(&Priority::ALL, self.priority, delta),
            FieldId::Category => self.category = step(&TaskCategory::ALL, self.category, delta),
            FieldId::Assignee => {
                let options = [None, Some(Assignee::Arie), Some(Assignee::Jasper)];
                self.assignee = step(&options, self.assignee, delta);
            }
            _ => {}
        }
    }

    fn move_active(&mut self, delta: isize) {
        let len = FIELDS.len() as isize;
        self.active = (self.active as isize + delta).rem_euclid(len) as usize;
    }
}

fn step<T: Copy + PartialEq>(options: &[T], current: T, delta: isize) -> T {
    let len = options.len() as isize;
    let index = options.iter().position(|o| *o == current).unwrap_or(0) as isize;
    options[(index + delta).rem_euclid(len) as usize]
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}
