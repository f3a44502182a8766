//! pinboard task commands
//!
//! Every mutation goes through [`Board`], so the CLI gets the same
//! validation, notices and event stream as the interactive board.

use chrono::{Local, Utc};
use serde::Serialize;

use crate::board::{Board, NoticeKind};
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput};
use crate::query::{Pagination, TaskFilters, TasksPage};
use crate::store::{remote_client, RestTaskStore};
use crate::task::{parse_due_date, Assignee, NewTask, Priority, Task, TaskCategory, TaskPatch, TaskStatus};

use super::{Context, TaskCommands, TaskFieldArgs, TaskFilterArgs};

#[derive(Serialize)]
struct ArchiveCompleteOutput {
    archived: usize,
    failed: usize,
}

#[derive(Serialize)]
struct DeletedOutput<'a> {
    id: &'a str,
    deleted: bool,
}

pub fn run(ctx: &Context, cmd: TaskCommands) -> Result<()> {
    let client = remote_client(&ctx.config)?;
    let mut board = Board::new(client, ctx.config.board.page_size).with_events(ctx.open_events()?);
    let runtime = super::runtime()?;

    match cmd {
        TaskCommands::List {
            filters,
            page,
            page_size,
        } => {
            let filters = build_filters(&filters)?;
            let pagination =
                Pagination::new(page, page_size.unwrap_or(ctx.config.board.page_size))?;
            let fetched = runtime.block_on(board.client().fetch(&filters, pagination))?;
            emit_list(ctx, &fetched)
        }
        TaskCommands::Add { title, fields } => {
            let input = new_task(title, &fields)?;
            let task = runtime.block_on(board.add_task(input))?;
            emit_task(ctx, &mut board, "task add", &task)
        }
        TaskCommands::Edit { id, title, fields } => {
            let patch = build_patch(title, &fields)?;
            let task = runtime.block_on(board.edit_task(&id, patch))?;
            emit_task(ctx, &mut board, "task edit", &task)
        }
        TaskCommands::Move { id, status } => {
            let status: TaskStatus = status.parse()?;
            let task = runtime.block_on(board.move_task(&id, status))?;
            emit_task(ctx, &mut board, "task move", &task)
        }
        TaskCommands::Archive { id } => {
            let task = runtime.block_on(board.archive_task(&id))?;
            emit_task(ctx, &mut board, "task archive", &task)
        }
        TaskCommands::Restore { id } => {
            let task = runtime.block_on(board.restore_task(&id))?;
            emit_task(ctx, &mut board, "task restore", &task)
        }
        TaskCommands::ArchiveComplete => {
            let (archived, failed) = runtime.block_on(archive_complete(&mut board))?;
            let mut human = HumanOutput::new("Archived complete tasks");
            human.push_summary("Archived", archived.to_string());
            if failed > 0 {
                human.push_summary("Failed", failed.to_string());
            }
            human.push_notices(board.take_notices());
            emit_success(
                ctx.output,
                "task archive-complete",
                &ArchiveCompleteOutput { archived, failed },
                Some(&human),
            )
        }
        TaskCommands::Rm { id } => {
            runtime.block_on(board.remove_task(&id))?;
            let mut human = HumanOutput::new("Task deleted");
            human.push_summary("ID", id.as_str());
            emit_success(
                ctx.output,
                "task rm",
                &DeletedOutput {
                    id: &id,
                    deleted: true,
                },
                Some(&human),
            )
        }
    }
}

/// Load every complete task, then archive them. Returns (archived, failed).
async fn archive_complete(board: &mut Board<RestTaskStore>) -> Result<(usize, usize)> {
    board
        .set_filters(TaskFilters {
            statuses: vec![TaskStatus::Complete],
            ..TaskFilters::default()
        })
        .await?;
    while board.load_more().await? {}
    let candidates = board.state().column(TaskStatus::Complete).count();
    let archived = board.archive_all_complete().await;
    Ok((archived, candidates - archived))
}

fn build_filters(args: &TaskFilterArgs) -> Result<TaskFilters> {
    let mut statuses = args
        .status
        .iter()
        .map(|raw| raw.parse::<TaskStatus>())
        .collect::<Result<Vec<_>>>()?;
    if statuses.is_empty() && !args.archived {
        statuses = TaskStatus::BOARD.to_vec();
    }
    let has_due_date = match (args.due, args.no_due) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    };
    Ok(TaskFilters {
        search: args.search.clone(),
        priority: args.priority.as_deref().map(str::parse).transpose()?,
        category: args.category.as_deref().map(str::parse).transpose()?,
        assignee: args.assignee.as_deref().map(str::parse).transpose()?,
        has_due_date,
        statuses,
    })
}

fn today() -> chrono::NaiveDate {
    Local::now().date_naive()
}

fn parse_assignee(raw: &str) -> Result<Option<Assignee>> {
    match raw.trim() {
        "" | "none" => Ok(None),
        other => other.parse().map(Some),
    }
}

fn new_task(title: String, fields: &TaskFieldArgs) -> Result<NewTask> {
    let priority = match fields.priority.as_deref() {
        Some(raw) => raw.parse()?,
        None => Priority::Medium,
    };
    let category = match fields.category.as_deref() {
        Some(raw) => raw.parse()?,
        None => TaskCategory::Dev,
    };
    let mut input = NewTask::new(title, priority, category);
    if let Some(description) = &fields.description {
        input.description = description.clone();
    }
    if let Some(notes) = &fields.notes {
        input.notes = notes.clone();
    }
    if let Some(raw) = fields.assignee.as_deref() {
        input.assignee = parse_assignee(raw)?;
    }
    if let Some(raw) = fields.due.as_deref() {
        input.due_date = parse_due_date(raw, today())?;
    }
    Ok(input)
}

fn build_patch(title: Option<String>, fields: &TaskFieldArgs) -> Result<TaskPatch> {
    let patch = TaskPatch {
        title,
        description: fields.description.clone(),
        priority: fields.priority.as_deref().map(str::parse).transpose()?,
        category: fields.category.as_deref().map(str::parse).transpose()?,
        assignee: fields.assignee.as_deref().map(parse_assignee).transpose()?,
        notes: fields.notes.clone(),
        due_date: fields
            .due
            .as_deref()
            .map(|raw| parse_due_date(raw, today()))
            .transpose()?,
        ..TaskPatch::default()
    };
    if patch.is_empty() {
        return Err(Error::InvalidArgument(
            "nothing to change (pass --title, --priority, ...)".to_string(),
        ));
    }
    Ok(patch)
}

fn task_line(task: &Task) -> String {
    let mut line = format!(
        "[{}][{}][{}] {} {}",
        task.status, task.priority, task.category, task.id, task.title
    );
    if let Some(assignee) = task.assignee {
        line.push_str(&format!(" @{assignee}"));
    }
    if let Some(due) = task.due_date {
        line.push_str(&format!(" (due {})", due.format("%Y-%m-%d")));
        if task.is_overdue(Utc::now()) {
            line.push_str(" OVERDUE");
        }
    }
    line
}

fn emit_list(ctx: &Context, page: &TasksPage) -> Result<()> {
    let mut human = HumanOutput::new("Tasks");
    human.push_summary("Total", page.total.to_string());
    human.push_summary("Page", format!("{} ({} per page)", page.page, page.page_size));
    for task in &page.tasks {
        human.push_detail(task_line(task));
    }
    if page.has_more {
        human.push_next_step(format!("pinboard task list --page {}", page.page + 1));
    }
    emit_success(ctx.output, "task list", page, Some(&human))
}

fn emit_task<S: crate::store::TaskStore>(
    ctx: &Context,
    board: &mut Board<S>,
    command: &str,
    task: &Task,
) -> Result<()> {
    let header = board
        .take_notices()
        .into_iter()
        .rev()
        .find(|notice| notice.kind == NoticeKind::Success)
        .map(|notice| notice.message)
        .unwrap_or_else(|| "Done".to_string());
    let mut human = HumanOutput::new(header);
    human.push_summary("ID", task.id.as_str());
    human.push_summary("Title", task.title.as_str());
    human.push_summary("Status", task.status.as_str());
    human.push_summary("Priority", task.priority.as_str());
    human.push_summary("Category", task.category.as_str());
    if let Some(assignee) = task.assignee {
        human.push_summary("Assignee", assignee.as_str());
    }
    if let Some(due) = task.due_date {
        human.push_summary("Due", due.format("%Y-%m-%d").to_string());
    }
    emit_success(ctx.output, command, task, Some(&human))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_hides_archived_by_default() {
        let filters = build_filters(&TaskFilterArgs::default()).unwrap();
        assert_eq!(filters.statuses, TaskStatus::BOARD.to_vec());

        let all = build_filters(&TaskFilterArgs {
            archived: true,
            ..TaskFilterArgs::default()
        })
        .unwrap();
        assert!(all.statuses.is_empty());
    }

    #[test]
    fn filters_parse_enums_and_due_flags() {
        let filters = build_filters(&TaskFilterArgs {
            priority: Some("HIGH".to_string()),
            assignee: Some("jasper".to_string()),
            no_due: true,
            status: vec!["todo".to_string()],
            ..TaskFilterArgs::default()
        })
        .unwrap();
        assert_eq!(filters.priority, Some(Priority::High));
        assert_eq!(filters.assignee, Some(Assignee::Jasper));
        assert_eq!(filters.has_due_date, Some(false));
        assert_eq!(filters.statuses, vec![TaskStatus::Todo]);

        let bad = build_filters(&TaskFilterArgs {
            category: Some("chores".to_string()),
            ..TaskFilterArgs::default()
        });
        assert!(matches!(bad, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn patch_clears_assignee_with_none() {
        let patch = build_patch(
            None,
            &TaskFieldArgs {
                assignee: Some("none".to_string()),
                ..TaskFieldArgs::default()
            },
        )
        .unwrap();
        assert_eq!(patch.assignee, Some(None));
        assert!(build_patch(None, &TaskFieldArgs::default()).is_err());
    }
}
