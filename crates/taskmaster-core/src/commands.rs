use anyhow::bail;
use chrono::{DateTime, Datelike, Local, NaiveDate, Utc};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::calendar::{MonthCursor, bucket_by_due, month_grid};
use crate::cli::{Command, ModifyArgs};
use crate::render::{Renderer, short_id};
use crate::store::TaskStore;
use crate::task::{Status, Task, TaskDraft, listing_order};

#[instrument(skip(store, renderer, command))]
pub fn dispatch(
    store: &mut TaskStore,
    renderer: &mut Renderer,
    command: Option<Command>,
) -> anyhow::Result<()> {
    let now = Utc::now();
    let today = Local::now().date_naive();
    let command = command.unwrap_or(Command::List { status: None });

    debug!(?command, "dispatching command");

    match command {
        Command::Add {
            title,
            description,
            due,
            status,
        } => cmd_add(store, title, description, due, status, now),
        Command::Modify(args) => cmd_modify(store, args),
        Command::Delete { id } => cmd_delete(store, &id),
        Command::List { status } => cmd_list(store, renderer, status, today),
        Command::Day { date } => cmd_day(store, renderer, date, today),
        Command::Cal { month, select } => cmd_cal(store, renderer, month, select, today),
        Command::Login => cmd_login(store),
        Command::Logout => cmd_logout(store),
        Command::Export => cmd_export(store),
    }
}

#[instrument(skip(store, title, description, due, status, now))]
fn cmd_add(
    store: &mut TaskStore,
    title: String,
    description: Option<String>,
    due: Option<NaiveDate>,
    status: Option<Status>,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command add");

    let title = title.trim().to_string();
    if title.is_empty() {
        bail!("task title must not be empty");
    }

    let id = Uuid::new_v4();
    store.add(
        TaskDraft {
            id: Some(id),
            title,
            description: description.filter(|text| !text.trim().is_empty()),
            due_date: due,
            status,
            created_at: None,
        },
        now,
    );

    println!("Created task {}.", short_id(id));
    Ok(())
}

#[instrument(skip(store, args), fields(needle = %args.id))]
fn cmd_modify(store: &mut TaskStore, args: ModifyArgs) -> anyhow::Result<()> {
    info!("command modify");

    let no_changes = args.title.is_none()
        && args.description.is_none()
        && !args.no_description
        && args.due.is_none()
        && !args.no_due
        && args.status.is_none();
    if no_changes {
        bail!("modify requires at least one change");
    }

    let Some(mut task) = resolve_task(store, &args.id)? else {
        println!("No task found matching '{}'.", args.id);
        return Ok(());
    };

    if let Some(new_title) = args.title {
        let new_title = new_title.trim().to_string();
        if new_title.is_empty() {
            bail!("task title must not be empty");
        }
        task.title = new_title;
    }
    if args.no_description {
        task.description = None;
    } else if let Some(text) = args.description {
        task.description = Some(text);
    }
    if args.no_due {
        task.due_date = None;
    } else if let Some(date) = args.due {
        task.due_date = Some(date);
    }
    if let Some(new_status) = args.status {
        task.status = new_status;
    }

    if store.update(task) {
        println!("Modified 1 task(s).");
    } else {
        println!("No task found matching '{}'.", args.id);
    }
    Ok(())
}

#[instrument(skip(store), fields(needle = %needle))]
fn cmd_delete(store: &mut TaskStore, needle: &str) -> anyhow::Result<()> {
    info!("command delete");

    let Some(task) = resolve_task(store, needle)? else {
        println!("Deleted 0 task(s).");
        return Ok(());
    };

    let removed = store.delete(task.id);
    println!("Deleted {} task(s).", u8::from(removed));
    Ok(())
}

#[instrument(skip(store, renderer, today))]
fn cmd_list(
    store: &mut TaskStore,
    renderer: &mut Renderer,
    status: Option<Status>,
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command list");

    let mut rows: Vec<Task> = store
        .tasks()
        .iter()
        .filter(|task| status.is_none_or(|wanted| task.status == wanted))
        .cloned()
        .collect();

    if rows.is_empty() {
        println!("No matching tasks.");
        return Ok(());
    }

    rows.sort_by(listing_order);
    renderer.print_task_table(&rows, today)?;
    Ok(())
}

#[instrument(skip(store, renderer, today))]
fn cmd_day(
    store: &mut TaskStore,
    renderer: &mut Renderer,
    date: NaiveDate,
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command day");

    let rows: Vec<Task> = store.tasks_for_date(date).into_iter().cloned().collect();
    if rows.is_empty() {
        println!("No tasks due {date}.");
        return Ok(());
    }

    renderer.print_task_table(&rows, today)?;
    Ok(())
}

#[instrument(skip(store, renderer, today))]
fn cmd_cal(
    store: &mut TaskStore,
    renderer: &mut Renderer,
    month: Option<NaiveDate>,
    select: Option<NaiveDate>,
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command cal");

    let focus = month
        .or(select)
        .unwrap_or_else(|| today.with_day(1).unwrap_or(today));
    let mut cursor = MonthCursor::new(focus);
    cursor.select(select);

    let grid = month_grid(cursor.focus(), today, cursor.selected());
    let buckets = bucket_by_due(store.tasks());
    renderer.print_month(&grid, &buckets)?;

    if let Some(date) = cursor.selected() {
        println!();
        let rows: Vec<Task> = store.tasks_for_date(date).into_iter().cloned().collect();
        if rows.is_empty() {
            println!("No tasks on {date}.");
        } else {
            println!("Tasks on {date}:");
            renderer.print_task_table(&rows, today)?;
        }
    }

    Ok(())
}

#[instrument(skip(store))]
fn cmd_login(store: &mut TaskStore) -> anyhow::Result<()> {
    info!("command login");

    if store.is_logged_in() {
        println!("Already logged in.");
        return Ok(());
    }
    store.login()?;
    println!("Logged in.");
    Ok(())
}

#[instrument(skip(store))]
fn cmd_logout(store: &mut TaskStore) -> anyhow::Result<()> {
    info!("command logout");

    if !store.is_logged_in() {
        println!("Not logged in.");
        return Ok(());
    }
    store.logout()?;
    println!("Logged out.");
    Ok(())
}

#[instrument(skip(store))]
fn cmd_export(store: &mut TaskStore) -> anyhow::Result<()> {
    info!("command export");

    let out = serde_json::to_string(store.tasks())?;
    println!("{out}");
    Ok(())
}

/// Matches a task by full id or unique id prefix. `Ok(None)` when nothing
/// matches; an ambiguous prefix is an error.
fn resolve_task(store: &TaskStore, needle: &str) -> anyhow::Result<Option<Task>> {
    let needle = needle.trim().to_ascii_lowercase();
    if needle.is_empty() {
        bail!("task id must not be empty");
    }

    let mut matches = store
        .tasks()
        .iter()
        .filter(|task| task.id.to_string().starts_with(&needle));

    let Some(first) = matches.next() else {
        return Ok(None);
    };
    if matches.next().is_some() {
        bail!("task id prefix '{needle}' is ambiguous");
    }

    debug!(id = %short_id(first.id), "resolved task");
    Ok(Some(first.clone()))
}
