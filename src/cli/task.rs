//! tickoff task command implementations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::category::Category;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::filter::{CategoryProgress, Progress};
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::session::{self, SessionStore};
use crate::storage::{FileStore, PersistenceGateway};
use crate::store::{StoreOptions, TaskStore};
use crate::task::Task;

pub struct AddOptions {
    pub text: String,
    pub category: Option<String>,
    pub user: Option<String>,
    pub data_dir: PathBuf,
    pub output: OutputOptions,
}

pub struct ListOptions {
    pub category: Option<String>,
    pub user: Option<String>,
    pub data_dir: PathBuf,
    pub output: OutputOptions,
}

pub struct IdOptions {
    pub id: String,
    pub user: Option<String>,
    pub data_dir: PathBuf,
    pub output: OutputOptions,
}

pub struct ViewOptions {
    pub user: Option<String>,
    pub data_dir: PathBuf,
    pub output: OutputOptions,
}

#[derive(Serialize)]
struct AddOutput {
    user: String,
    task: Option<Task>,
}

#[derive(Serialize)]
struct ListOutput<'a> {
    user: String,
    category: Option<Category>,
    total: usize,
    progress: Progress,
    tasks: Vec<&'a Task>,
}

#[derive(Serialize)]
struct ChangeOutput {
    user: String,
    id: String,
    changed: bool,
    task: Option<Task>,
}

#[derive(Serialize)]
struct CategoryRow {
    #[serde(flatten)]
    entry: CategoryProgress,
    label: &'static str,
    description: &'static str,
}

#[derive(Serialize)]
struct CategoriesOutput {
    user: String,
    overall: Progress,
    categories: Vec<CategoryRow>,
}

struct TaskContext {
    store: TaskStore,
    user: String,
}

pub async fn run_add(options: AddOptions) -> Result<()> {
    let category = parse_category(options.category.as_deref())?;
    let mut ctx = load_context(options.user, &options.data_dir).await?;

    let task = ctx.store.add(&options.text, category);
    let failed_saves = ctx.store.flush().await;

    let mut human = match task.as_ref() {
        Some(task) => {
            let mut human = HumanOutput::new("Task added");
            human.push_summary("ID", task.id.clone());
            human.push_summary("Text", task.text.clone());
            human.push_summary("Category", task.category.label());
            human
        }
        None => {
            let mut human = HumanOutput::new("Nothing added");
            human.push_warning("task text is empty; nothing added");
            human
        }
    };
    push_store_warnings(&mut human, &ctx.store, failed_saves);
    human.push_summary("User", ctx.user.clone());

    let output = AddOutput {
        user: ctx.user,
        task,
    };
    emit_success(options.output, "add", &output, Some(&human))
}

pub async fn run_list(options: ListOptions) -> Result<()> {
    let category = parse_category(options.category.as_deref())?;
    let mut ctx = load_context(options.user, &options.data_dir).await?;
    ctx.store.select_category(category);

    let visible = ctx.store.visible();
    let progress = Progress::of(visible.iter().copied());

    let header = match category {
        Some(category) => format!("{} tasks", category.label()),
        None => "Tasks".to_string(),
    };
    let mut human = HumanOutput::new(header);
    human.push_summary("User", ctx.user.clone());
    human.push_summary("Total", visible.len().to_string());
    human.push_summary("Progress", format_progress(&progress));
    push_store_warnings(&mut human, &ctx.store, 0);
    for task in &visible {
        human.push_detail(format_task_line(task));
    }
    if visible.is_empty() {
        human.push_next_step("tickoff add <text> --category <category>");
    }

    let output = ListOutput {
        user: ctx.user.clone(),
        category,
        total: visible.len(),
        progress,
        tasks: visible,
    };
    emit_success(options.output, "list", &output, Some(&human))
}

pub async fn run_toggle(options: IdOptions) -> Result<()> {
    let mut ctx = load_context(options.user, &options.data_dir).await?;
    let id = resolve_task_id(&ctx.store, &options.id)?;

    let task = ctx.store.toggle_completion(&id).cloned();
    let failed_saves = ctx.store.flush().await;

    let mut human = match task.as_ref() {
        Some(task) if task.completed => HumanOutput::new("Task completed"),
        Some(_) => HumanOutput::new("Task reopened"),
        None => HumanOutput::new("No change"),
    };
    human.push_summary("ID", id.clone());
    match task.as_ref() {
        Some(task) => human.push_summary("Text", task.text.clone()),
        None => {
            human.push_warning(format!("no task with id {id}; no change"));
            human.push_next_step("tickoff list");
        }
    }
    push_store_warnings(&mut human, &ctx.store, failed_saves);

    let output = ChangeOutput {
        user: ctx.user,
        id,
        changed: task.is_some(),
        task,
    };
    emit_success(options.output, "toggle", &output, Some(&human))
}

pub async fn run_remove(options: IdOptions) -> Result<()> {
    let mut ctx = load_context(options.user, &options.data_dir).await?;
    let id = resolve_task_id(&ctx.store, &options.id)?;

    let task = ctx.store.remove(&id);
    let failed_saves = ctx.store.flush().await;

    let mut human = match task.as_ref() {
        Some(_) => HumanOutput::new("Task removed"),
        None => HumanOutput::new("No change"),
    };
    human.push_summary("ID", id.clone());
    match task.as_ref() {
        Some(task) => human.push_summary("Text", task.text.clone()),
        None => human.push_warning(format!("no task with id {id}; no change")),
    }
    push_store_warnings(&mut human, &ctx.store, failed_saves);

    let output = ChangeOutput {
        user: ctx.user,
        id,
        changed: task.is_some(),
        task,
    };
    emit_success(options.output, "rm", &output, Some(&human))
}

pub async fn run_categories(options: ViewOptions) -> Result<()> {
    let ctx = load_context(options.user, &options.data_dir).await?;
    let overall = ctx.store.overall_progress();
    let categories: Vec<CategoryRow> = ctx
        .store
        .progress()
        .into_iter()
        .map(|entry| CategoryRow {
            label: entry.category.label(),
            description: entry.category.description(),
            entry,
        })
        .collect();

    let mut human = HumanOutput::new("Categories");
    human.push_summary("User", ctx.user.clone());
    human.push_summary("Overall", format_progress(&overall));
    push_store_warnings(&mut human, &ctx.store, 0);
    for row in &categories {
        human.push_detail(format!(
            "{:<9} {} ({})",
            row.label,
            format_progress(&row.entry.progress),
            row.description
        ));
    }

    let output = CategoriesOutput {
        user: ctx.user,
        overall,
        categories,
    };
    emit_success(options.output, "categories", &output, Some(&human))
}

pub async fn run_stats(options: ViewOptions) -> Result<()> {
    let ctx = load_context(options.user, &options.data_dir).await?;
    let stats = ctx.store.stats(Utc::now());

    let mut human = HumanOutput::new("Task stats");
    human.push_summary("User", ctx.user.clone());
    human.push_summary("Total", stats.total_tasks.to_string());
    human.push_summary("Completed", stats.completed_tasks.to_string());
    human.push_summary("Pending", stats.pending_tasks.to_string());
    human.push_summary("Completion rate", format!("{}%", stats.completion_rate));
    human.push_summary("Daily average", stats.daily_average.to_string());
    human.push_summary(
        format!("Last {} days", stats.recent_activity.window_days),
        format!(
            "{} created, {} completed",
            stats.recent_activity.created, stats.recent_activity.completed
        ),
    );
    push_store_warnings(&mut human, &ctx.store, 0);
    for entry in stats
        .category_breakdown
        .iter()
        .filter(|entry| entry.progress.total > 0)
    {
        human.push_detail(format!(
            "{}: {}",
            entry.category.label(),
            format_progress(&entry.progress)
        ));
    }

    emit_success(options.output, "stats", &stats, Some(&human))
}

async fn load_context(user: Option<String>, data_dir: &Path) -> Result<TaskContext> {
    let config = Config::load_from_dir(data_dir);
    let sessions = SessionStore::new(data_dir);
    let user = session::resolve_user(user.as_deref(), &sessions, &config)?;

    let gateway = PersistenceGateway::new(Arc::new(FileStore::in_data_dir(data_dir)));
    let store = TaskStore::open(gateway, StoreOptions::from(&config), user.clone()).await;

    Ok(TaskContext { store, user })
}

fn parse_category(value: Option<&str>) -> Result<Option<Category>> {
    value.map(str::parse).transpose()
}

/// Unknown ids pass through unchanged so toggle/rm stay silent no-ops.
fn resolve_task_id(store: &TaskStore, input: &str) -> Result<String> {
    match store.resolve_id(input) {
        Ok(id) => Ok(id),
        Err(Error::TaskNotFound(_)) => Ok(input.trim().to_string()),
        Err(err) => Err(err),
    }
}

fn push_store_warnings(human: &mut HumanOutput, store: &TaskStore, failed_saves: usize) {
    if let Some(err) = store.load_error() {
        human.push_warning(format!("stored tasks could not be read ({err}); showing none"));
    }
    if failed_saves > 0 {
        human.push_warning("changes could not be saved; rerun with RUST_LOG=tickoff=warn for details");
    }
}

fn format_progress(progress: &Progress) -> String {
    format!(
        "{}/{} done ({}%)",
        progress.completed, progress.total, progress.percentage
    )
}

fn format_task_line(task: &Task) -> String {
    let mark = if task.completed { "x" } else { " " };
    format!("[{mark}] {} {} ({})", task.id, task.text, task.category)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_category_accepts_names_and_none() {
        assert_eq!(parse_category(None).unwrap(), None);
        assert_eq!(
            parse_category(Some("Shopping")).unwrap(),
            Some(Category::Shopping)
        );
        assert!(matches!(
            parse_category(Some("errands")),
            Err(Error::UnknownCategory(_))
        ));
    }

    #[test]
    fn task_line_marks_completion() {
        let mut task = Task::new("01abc", "Buy milk", Category::Shopping, Utc::now()).unwrap();
        assert_eq!(format_task_line(&task), "[ ] 01abc Buy milk (shopping)");
        task.toggle(Utc::now());
        assert_eq!(format_task_line(&task), "[x] 01abc Buy milk (shopping)");
    }
}
