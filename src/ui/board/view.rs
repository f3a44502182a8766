use chrono::{DateTime, Utc};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

use crate::board::NoticeKind;
use crate::config::{CONFIG_FILE, ENV_STORE_KEY, ENV_STORE_URL};
use crate::markdown::{BlockKind, TextLine};
use crate::prefs::Tab;
use crate::query::TaskFilters;
use crate::task::{Priority, Task, TaskStatus};

use super::app::{AppState, DeleteConfirmState};
use super::editor::{EditorKind, TaskEditor};

const HELP_KEY_WIDTH: usize = 14;
const COLLAPSED_WIDTH: u16 = 7;
const CARD_HEIGHT: usize = 3;
const COLOR_TEXT: Color = Color::Rgb(234, 236, 239);
const COLOR_MUTED: Color = Color::Rgb(160, 165, 172);
const COLOR_MUTED_DARK: Color = Color::Rgb(118, 124, 130);
const COLOR_BG_MUTED: Color = Color::Rgb(52, 56, 60);
const COLOR_INFO: Color = Color::Rgb(116, 198, 219);
const COLOR_WARNING: Color = Color::Rgb(244, 200, 98);
const COLOR_ERROR: Color = Color::Rgb(255, 107, 107);
const COLOR_SUCCESS: Color = Color::Rgb(126, 210, 146);
const COLOR_ACCENT: Color = Color::Rgb(122, 170, 255);
const COLOR_BORDER_LIST: Color = Color::Rgb(92, 126, 166);
const COLOR_BORDER_DETAIL: Color = Color::Rgb(180, 156, 92);
const COLOR_MAGENTA: Color = Color::Rgb(214, 140, 230);

pub fn render(frame: &mut Frame, app: &AppState) {
    let area = frame.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(area);

    render_tabs(frame, app, chunks[0]);
    match app.tab {
        Tab::Tasks => render_tasks(frame, app, chunks[1]),
        Tab::Documents => render_documents(frame, app, chunks[1]),
    }
    render_footer(frame, app, chunks[2]);

    if let Some(editor) = app.editor.as_ref() {
        render_editor_modal(frame, area, editor);
    }
    if let Some(state) = app.delete_confirm.as_ref() {
        render_delete_confirm_modal(frame, area, state);
    }
    if app.show_help {
        render_help_modal(frame, area, app.tab);
    }
}

fn render_tabs(frame: &mut Frame, app: &AppState, area: Rect) {
    let tabs = [
        ("Tasks", app.tab == Tab::Tasks, app.board.total, COLOR_INFO),
        ("Documents", app.tab == Tab::Documents, app.docs.len(), COLOR_ACCENT),
    ];

    let mut spans = Vec::new();
    for (idx, (label, selected, count, color)) in tabs.into_iter().enumerate() {
        if idx > 0 {
            spans.push(Span::styled("  ", Style::default().fg(COLOR_MUTED_DARK)));
        }
        let text = format!("{label} ({count})");
        let style = if selected {
            Style::default()
                .fg(color)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(COLOR_MUTED)
        };
        spans.push(Span::styled(text, style));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_tasks(frame: &mut Frame, app: &AppState, area: Rect) {
    if !app.is_connected() {
        let message = app
            .store_error
            .clone()
            .unwrap_or_else(|| "Task store not configured".to_string());
        let lines = vec![
            Line::from(Span::styled(
                message,
                Style::default().fg(COLOR_WARNING).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(Span::styled(
                format!("Set {ENV_STORE_URL} and {ENV_STORE_KEY}, or [store] in {CONFIG_FILE}."),
                Style::default().fg(COLOR_MUTED),
            )),
            Line::from(Span::styled(
                "Documents still work: press tab.",
                Style::default().fg(COLOR_MUTED_DARK),
            )),
        ];
        render_notice_panel(frame, area, "Tasks", lines);
        return;
    }

    if !app.loaded {
        let lines = match &app.board.error {
            Some(err) => vec![
                Line::from(Span::styled(
                    "Failed to load tasks",
                    Style::default().fg(COLOR_ERROR).add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                Line::from(Span::styled(err.clone(), Style::default().fg(COLOR_MUTED))),
                Line::from(""),
                Line::from(Span::styled(
                    "press r to retry",
                    Style::default().fg(COLOR_ACCENT),
                )),
            ],
            None => vec![Line::from(Span::styled(
                "Loading tasks...",
                Style::default().fg(COLOR_MUTED),
            ))],
        };
        render_notice_panel(frame, area, "Tasks", lines);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)].as_ref())
        .split(area);
    render_filter_bar(frame, app, chunks[0]);

    let columns = app.columns();
    let expanded = columns
        .iter()
        .filter(|status| !app.prefs.is_collapsed(**status))
        .count()
        .max(1) as u32;
    let constraints: Vec<Constraint> = columns
        .iter()
        .map(|status| {
            if app.prefs.is_collapsed(*status) {
                Constraint::Length(COLLAPSED_WIDTH)
            } else {
                Constraint::Ratio(1, expanded)
            }
        })
        .collect();
    let areas = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(chunks[1]);

    for (status, column_area) in columns.iter().zip(areas.iter()) {
        render_column(frame, app, *status, *column_area);
    }
}

fn render_filter_bar(frame: &mut Frame, app: &AppState, area: Rect) {
    let mut spans = Vec::new();
    if app.search_active || !app.search_text.is_empty() {
        let style = if app.search_active {
            Style::default().fg(COLOR_TEXT).bg(COLOR_BG_MUTED)
        } else {
            Style::default().fg(COLOR_MUTED)
        };
        spans.push(Span::styled("/", Style::default().fg(COLOR_ACCENT)));
        spans.push(Span::styled(app.search_text.clone(), style));
        if app.search_active {
            spans.push(Span::styled(
                " ",
                Style::default().add_modifier(Modifier::REVERSED),
            ));
        }
    } else {
        spans.push(Span::styled(
            "/ to search",
            Style::default().fg(COLOR_MUTED_DARK),
        ));
    }
    for label in filter_labels(&app.board.filters) {
        spans.push(Span::styled(
            format!("  [{label}]"),
            Style::default().fg(COLOR_WARNING),
        ));
    }
    if app.search.is_pending() {
        spans.push(Span::styled("  searching...", Style::default().fg(COLOR_MUTED)));
    } else if app.board.loading {
        spans.push(Span::styled("  loading...", Style::default().fg(COLOR_INFO)));
    }
    if app.show_archived {
        spans.push(Span::styled(
            "  showing archived",
            Style::default().fg(COLOR_MAGENTA),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Active field filters, in the order their keys appear in help.
fn filter_labels(filters: &TaskFilters) -> Vec<String> {
    let mut labels = Vec::new();
    if let Some(priority) = filters.priority {
        labels.push(format!("priority {priority}"));
    }
    if let Some(category) = filters.category {
        labels.push(format!("category {category}"));
    }
    if let Some(assignee) = filters.assignee {
        labels.push(format!("@{assignee}"));
    }
    match filters.has_due_date {
        Some(true) => labels.push("has due date".to_string()),
        Some(false) => labels.push("no due date".to_string()),
        None => {}
    }
    labels
}

fn render_column(frame: &mut Frame, app: &AppState, status: TaskStatus, area: Rect) {
    let focused = app.column == status;
    let tasks: Vec<&Task> = app.board.column(status).collect();
    let border = if focused {
        COLOR_ACCENT
    } else {
        COLOR_BORDER_LIST
    };

    if app.prefs.is_collapsed(status) {
        let label: String = status.label().chars().take(3).collect();
        let lines = vec![
            Line::from(Span::styled(label, status_style(status))),
            Line::from(Span::styled(
                tasks.len().to_string(),
                Style::default().fg(COLOR_MUTED),
            )),
        ];
        let widget = Paragraph::new(lines).alignment(Alignment::Center).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border)),
        );
        frame.render_widget(widget, area);
        return;
    }

    let title = Line::from(vec![
        Span::styled(format!(" {} ", status.label()), status_style(status)),
        Span::styled(
            format!(" {} ", tasks.len()),
            Style::default().fg(COLOR_MUTED),
        ),
    ]);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(title);
    let inner_width = area.width.saturating_sub(2) as usize;
    let inner_height = area.height.saturating_sub(2) as usize;

    let mut lines: Vec<Line<'static>> = Vec::new();
    if tasks.is_empty() {
        lines.push(Line::from(Span::styled(
            "No tasks",
            Style::default().fg(COLOR_MUTED_DARK),
        )));
    } else {
        let selected = focused.then(|| app.selected_row(status));
        let (start, end) = list_window(tasks.len(), selected, inner_height / CARD_HEIGHT);
        let now = Utc::now();
        for (offset, task) in tasks[start..end].iter().enumerate() {
            let is_selected = selected == Some(start + offset);
            lines.extend(card_lines(task, is_selected, inner_width, now));
        }
    }

    let widget = Paragraph::new(lines).block(block);
    frame.render_widget(widget, area);
}

fn card_lines(task: &Task, selected: bool, width: usize, now: DateTime<Utc>) -> Vec<Line<'static>> {
    let title_style = if selected {
        Style::default()
            .fg(COLOR_TEXT)
            .bg(COLOR_BG_MUTED)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(COLOR_TEXT)
    };
    let marker = if selected { "> " } else { "  " };
    let title = Line::from(vec![
        Span::styled(marker, Style::default().fg(COLOR_ACCENT)),
        Span::styled(
            pad_text(&task.title, width.saturating_sub(2)),
            title_style,
        ),
    ]);

    let mut meta = vec![
        Span::raw("  "),
        Span::styled(
            task.priority.as_str().to_string(),
            Style::default().fg(priority_color(task.priority)),
        ),
        Span::styled(
            format!(" {}", task.category),
            Style::default().fg(COLOR_MUTED),
        ),
    ];
    if let Some(assignee) = task.assignee {
        meta.push(Span::styled(
            format!(" @{assignee}"),
            Style::default().fg(COLOR_INFO),
        ));
    }
    if let Some(due) = task.due_date {
        let overdue = task.is_overdue(now);
        let style = if overdue {
            Style::default().fg(COLOR_ERROR).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(COLOR_MUTED_DARK)
        };
        let text = if overdue {
            format!(" due {} overdue", due.format("%m-%d"))
        } else {
            format!(" due {}", due.format("%m-%d"))
        };
        meta.push(Span::styled(text, style));
    }
    vec![title, Line::from(meta), Line::from("")]
}

fn render_documents(frame: &mut Frame, app: &AppState, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)].as_ref())
        .split(area);

    let list_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(COLOR_BORDER_LIST))
        .title("Documents");
    let width = chunks[0].width.saturating_sub(2) as usize;
    let height = chunks[0].height.saturating_sub(2) as usize;
    let mut lines: Vec<Line<'static>> = Vec::new();
    if app.docs.is_empty() {
        lines.push(Line::from(Span::styled(
            "No documents",
            Style::default().fg(COLOR_MUTED_DARK),
        )));
    }
    let (start, end) = list_window(app.docs.len(), Some(app.doc_selected), height / 2);
    for (offset, doc) in app.docs[start..end].iter().enumerate() {
        let selected = start + offset == app.doc_selected;
        let style = if selected {
            Style::default()
                .fg(COLOR_TEXT)
                .bg(COLOR_BG_MUTED)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(COLOR_TEXT)
        };
        lines.push(Line::from(Span::styled(pad_text(&doc.title, width), style)));
        lines.push(Line::from(vec![
            Span::styled(doc.category.clone(), Style::default().fg(COLOR_MAGENTA)),
            Span::styled(
                format!("  {}", format_timestamp(doc.updated_at)),
                Style::default().fg(COLOR_MUTED_DARK),
            ),
        ]));
    }
    frame.render_widget(Paragraph::new(lines).block(list_block), chunks[0]);

    let detail_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(COLOR_BORDER_DETAIL));
    let widget = match (&app.doc_open, &app.doc_error) {
        (_, Some(err)) => Paragraph::new(Line::from(Span::styled(
            err.clone(),
            Style::default().fg(COLOR_ERROR),
        )))
        .block(detail_block),
        (Some(open), None) => Paragraph::new(document_lines(&open.lines))
            .block(detail_block.title(open.title.clone()))
            .wrap(Wrap { trim: false })
            .scroll((app.doc_scroll, 0)),
        (None, None) => Paragraph::new(Line::from(Span::styled(
            "Select a document",
            Style::default().fg(COLOR_MUTED_DARK),
        )))
        .block(detail_block),
    };
    frame.render_widget(widget, chunks[1]);
}

fn document_lines(lines: &[TextLine]) -> Vec<Line<'static>> {
    lines
        .iter()
        .map(|line| {
            let style = match line.kind {
                BlockKind::Heading(1) => Style::default()
                    .fg(COLOR_MAGENTA)
                    .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
                BlockKind::Heading(_) => Style::default()
                    .fg(COLOR_ACCENT)
                    .add_modifier(Modifier::BOLD),
                BlockKind::Code => Style::default().fg(COLOR_SUCCESS),
                BlockKind::Quote => Style::default()
                    .fg(COLOR_MUTED)
                    .add_modifier(Modifier::ITALIC),
                BlockKind::Rule => Style::default().fg(COLOR_MUTED_DARK),
                BlockKind::ListItem | BlockKind::Paragraph => Style::default().fg(COLOR_TEXT),
            };
            Line::from(Span::styled(line.text.clone(), style))
        })
        .collect()
}

fn render_footer(frame: &mut Frame, app: &AppState, area: Rect) {
    let hint = match app.tab {
        Tab::Tasks => "h/l column  j/k task  H/L move  n new  e edit  p/t/u/D filter  ? help  q quit",
        Tab::Documents => "j/k document  J/K scroll  r reload  tab tasks  ? help  q quit",
    };
    let hint_span = Span::styled(hint, Style::default().fg(COLOR_INFO));
    let line = match (&app.notice, app.notice_kind()) {
        (Some((notice, _)), Some(kind)) => {
            let style = match kind {
                NoticeKind::Error => Style::default()
                    .fg(COLOR_ERROR)
                    .add_modifier(Modifier::BOLD),
                NoticeKind::Success => Style::default().fg(COLOR_SUCCESS),
                NoticeKind::Info => Style::default().fg(COLOR_WARNING),
            };
            Line::from(vec![
                hint_span,
                Span::raw("  |  "),
                Span::styled(notice.message.clone(), style),
            ])
        }
        _ => match &app.watch_error {
            Some(err) => Line::from(vec![
                hint_span,
                Span::raw("  |  "),
                Span::styled(err.clone(), Style::default().fg(COLOR_WARNING)),
            ]),
            None => Line::from(hint_span),
        },
    };
    let counts_line = Line::from(Span::styled(
        count_summary(app),
        Style::default().fg(COLOR_ACCENT),
    ));
    let widget = Paragraph::new(vec![line, counts_line])
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(Style::default().fg(COLOR_BORDER_LIST)),
        );
    frame.render_widget(widget, area);
}

fn count_summary(app: &AppState) -> String {
    match app.tab {
        Tab::Documents => format!("{} documents", app.docs.len()),
        Tab::Tasks => {
            let mut parts: Vec<String> = TaskStatus::BOARD
                .iter()
                .map(|status| format!("{} {}", status.label(), app.board.column(*status).count()))
                .collect();
            parts.push(format!(
                "loaded {} of {}",
                app.board.tasks.len(),
                app.board.total
            ));
            if app.board.has_more {
                parts.push("m for more".to_string());
            }
            if app.pending_count() > 0 {
                parts.push(format!("{} saving", app.pending_count()));
            }
            parts.join("  |  ")
        }
    }
}

fn render_notice_panel(frame: &mut Frame, area: Rect, title: &str, lines: Vec<Line<'static>>) {
    let widget = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(COLOR_BORDER_LIST))
                .title(title.to_string()),
        );
    frame.render_widget(widget, area);
}

fn render_editor_modal(frame: &mut Frame, area: Rect, editor: &TaskEditor) {
    let content_width = area.width.saturating_sub(8).min(72);
    let height = (editor.fields().len() as u16 + 7).min(area.height.saturating_sub(2));
    let modal = centered_rect(content_width, height, area);
    frame.render_widget(Clear, modal);

    let width = content_width.saturating_sub(4) as usize;
    let label_width = 12;
    let mut lines: Vec<Line<'static>> = Vec::new();
    for field in editor.fields() {
        let active = *field == editor.active();
        let label_style = if active {
            Style::default().fg(COLOR_ACCENT).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(COLOR_MUTED_DARK)
        };
        let mut value = editor.display_value(*field);
        if field.is_choice() {
            value = format!("< {value} >");
        }
        let value_style = if active {
            Style::default().fg(COLOR_TEXT).bg(COLOR_BG_MUTED)
        } else {
            Style::default().fg(COLOR_TEXT)
        };
        lines.push(Line::from(vec![
            Span::styled(pad_text(field.label(), label_width), label_style),
            Span::styled(
                truncate_text(&value, width.saturating_sub(label_width)),
                value_style,
            ),
        ]));
    }
    lines.push(Line::from(""));
    if let Some(err) = editor.error() {
        lines.push(Line::from(Span::styled(
            err.to_string(),
            Style::default().fg(COLOR_ERROR).add_modifier(Modifier::BOLD),
        )));
    } else {
        lines.push(Line::from(Span::styled(
            "due: today | tomorrow | next-week | YYYY-MM-DD",
            Style::default().fg(COLOR_MUTED_DARK),
        )));
    }
    lines.push(Line::from(Span::styled(
        "tab next  ctrl+s save  ctrl+t/o/w due today/tomorrow/next week  esc cancel",
        Style::default().fg(COLOR_MUTED_DARK),
    )));

    let title = match editor.kind() {
        EditorKind::NewTask => "New Task",
        EditorKind::EditTask => "Edit Task",
    };
    let widget = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(COLOR_BORDER_DETAIL))
                .title(title),
        );
    frame.render_widget(widget, modal);
}

fn render_delete_confirm_modal(frame: &mut Frame, area: Rect, state: &DeleteConfirmState) {
    let content_width = area.width.saturating_sub(8).min(64);
    let height = 8u16.min(area.height.saturating_sub(2));
    let modal = centered_rect(content_width, height, area);
    frame.render_widget(Clear, modal);

    let title_width = (content_width as usize).saturating_sub(8);
    let lines = vec![
        Line::from(Span::styled(
            "Delete task?",
            Style::default()
                .fg(COLOR_ERROR)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("Title: ", Style::default().fg(COLOR_MUTED_DARK)),
            Span::styled(
                truncate_text(&state.title, title_width),
                Style::default().fg(COLOR_TEXT),
            ),
        ]),
        Line::from(Span::styled(
            format!("ID: {}", state.task_id),
            Style::default().fg(COLOR_MUTED),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "y/enter delete  n/esc cancel",
            Style::default().fg(COLOR_MUTED_DARK),
        )),
    ];
    let widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Delete Task"))
        .wrap(Wrap { trim: true });
    frame.render_widget(widget, modal);
}

fn render_help_modal(frame: &mut Frame, area: Rect, tab: Tab) {
    let content_width = area.width.saturating_sub(8).min(60);
    let width = content_width.saturating_sub(4) as usize;
    let lines = match tab {
        Tab::Tasks => task_help_lines(width),
        Tab::Documents => document_help_lines(width),
    };
    let height = (lines.len() as u16 + 2).min(area.height.saturating_sub(2));
    let modal = centered_rect(content_width, height, area);
    frame.render_widget(Clear, modal);
    let widget = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(COLOR_BORDER_LIST))
            .title("Help"),
    );
    frame.render_widget(widget, modal);
}

fn task_help_lines(width: usize) -> Vec<Line<'static>> {
    vec![
        help_header("Board"),
        help_line("h/l", "focus column", width),
        help_line("j/k", "select task", width),
        help_line("H/L or </>", "move task to the next column", width),
        help_line("n", "new task", width),
        help_line("e/enter", "edit task", width),
        help_line("d", "delete task", width),
        help_line("a", "archive task", width),
        help_line("R", "restore archived task", width),
        help_line("X", "archive all complete", width),
        help_line("A", "show/hide archived column", width),
        help_line("c", "collapse column", width),
        help_line("/", "search tasks", width),
        help_line("p", "filter by priority", width),
        help_line("t", "filter by category", width),
        help_line("u", "filter by assignee", width),
        help_line("D", "filter by due date", width),
        help_line("F", "clear filters", width),
        help_line("m", "load more", width),
        help_line("r", "reload", width),
        help_line("tab", "documents", width),
        help_line("q", "quit", width),
        help_line("?", "hide help", width),
    ]
}

fn document_help_lines(width: usize) -> Vec<Line<'static>> {
    vec![
        help_header("Documents"),
        help_line("j/k", "select document", width),
        help_line("J/K", "scroll page down/up", width),
        help_line("g", "back to top", width),
        help_line("r", "reload list", width),
        help_line("tab", "tasks", width),
        help_line("q", "quit", width),
        help_line("?", "hide help", width),
    ]
}

fn help_header(title: &str) -> Line<'static> {
    Line::from(Span::styled(
        title.to_string(),
        Style::default().fg(COLOR_INFO).add_modifier(Modifier::BOLD),
    ))
}

fn help_line(keys: &str, desc: &str, width: usize) -> Line<'static> {
    let key_text = pad_text(keys, HELP_KEY_WIDTH.min(width));
    let desc_width = width.saturating_sub(HELP_KEY_WIDTH + 1);
    let desc_text = truncate_text(desc, desc_width);
    Line::from(vec![
        Span::styled(
            key_text,
            Style::default()
                .fg(COLOR_ACCENT)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(desc_text, Style::default().fg(COLOR_MUTED)),
    ])
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width.saturating_sub(2));
    let height = height.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn list_window(total: usize, selected: Option<usize>, height: usize) -> (usize, usize) {
    if total == 0 || height == 0 {
        return (0, 0);
    }
    if total <= height {
        return (0, total);
    }
    let selected = selected.unwrap_or(0);
    let mut start = selected.saturating_sub(height / 2);
    if start + height > total {
        start = total - height;
    }
    (start, start + height)
}

fn status_style(status: TaskStatus) -> Style {
    let (fg, bg) = match status {
        TaskStatus::Todo => (Color::Rgb(80, 250, 123), Color::Rgb(26, 61, 42)),
        TaskStatus::InProgress => (Color::Rgb(139, 233, 253), Color::Rgb(26, 51, 68)),
        TaskStatus::Complete => (Color::Rgb(98, 114, 164), Color::Rgb(42, 42, 61)),
        TaskStatus::Archived => (COLOR_TEXT, COLOR_BG_MUTED),
    };
    Style::default().fg(fg).bg(bg)
}

fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::High => Color::Rgb(255, 87, 87),
        Priority::Medium => COLOR_WARNING,
        Priority::Low => COLOR_MUTED_DARK,
    }
}

fn pad_text(value: &str, width: usize) -> String {
    let text = truncate_text(value, width);
    format!("{text:width$}")
}

fn truncate_text(value: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= max {
        return value.to_string();
    }
    if max <= 3 {
        return chars[..max].iter().collect();
    }
    let mut out: String = chars[..(max - 3)].iter().collect();
    out.push_str("...");
    out
}

fn format_timestamp(value: DateTime<Utc>) -> String {
    value.format("%Y-%m-%d %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_window_keeps_selection_visible() {
        assert_eq!(list_window(0, None, 5), (0, 0));
        assert_eq!(list_window(3, Some(2), 5), (0, 3));
        assert_eq!(list_window(20, Some(10), 4), (8, 12));
        assert_eq!(list_window(20, Some(19), 4), (16, 20));
    }

    #[test]
    fn filter_labels_follow_active_fields() {
        use crate::task::{Assignee, TaskCategory};

        assert!(filter_labels(&TaskFilters::default()).is_empty());
        let filters = TaskFilters {
            search: Some("milk".to_string()),
            priority: Some(Priority::High),
            category: Some(TaskCategory::Admin),
            assignee: Some(Assignee::Jasper),
            has_due_date: Some(false),
            ..TaskFilters::default()
        };
        assert_eq!(
            filter_labels(&filters),
            ["priority high", "category admin", "@Jasper", "no due date"]
        );
    }

    #[test]
    fn truncate_marks_cut_text() {
        assert_eq!(truncate_text("kanban board", 8), "kanba...");
        assert_eq!(truncate_text("ok", 8), "ok");
        assert_eq!(pad_text("ab", 4), "ab  ");
    }
}
