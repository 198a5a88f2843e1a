//! Category filtering and per-category progress.
//!
//! Everything here is a pure function of the task slice it is given.

use serde::Serialize;

use crate::category::Category;
use crate::task::Task;

/// Completed/total counts with a rounded percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    pub pending: usize,
    pub percentage: u32,
}

impl Progress {
    pub fn from_counts(completed: usize, total: usize) -> Self {
        Self {
            completed,
            total,
            pending: total.saturating_sub(completed),
            percentage: percentage(completed, total),
        }
    }

    pub fn of<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        let (completed, total) = tasks.into_iter().fold((0, 0), |(done, all), task| {
            (done + usize::from(task.completed), all + 1)
        });
        Self::from_counts(completed, total)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryProgress {
    pub category: Category,
    #[serde(flatten)]
    pub progress: Progress,
}

/// `round(100 * part / whole)`, rounding halves up; 0 when `whole` is 0.
pub fn percentage(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    let part = part as u128;
    let whole = whole as u128;
    ((200 * part + whole) / (2 * whole)) as u32
}

/// Tasks in `category`, or all of them when `category` is `None`, in their
/// original order.
pub fn filter(tasks: &[Task], category: Option<Category>) -> Vec<&Task> {
    match category {
        None => tasks.iter().collect(),
        Some(category) => tasks.iter().filter(|task| task.category == category).collect(),
    }
}

/// Progress of one category.
pub fn category_progress(tasks: &[Task], category: Category) -> Progress {
    Progress::of(tasks.iter().filter(|task| task.category == category))
}

/// Progress for every category, in [`Category::ALL`] order, including empty ones.
pub fn per_category_progress(tasks: &[Task]) -> Vec<CategoryProgress> {
    Category::ALL
        .into_iter()
        .map(|category| CategoryProgress {
            category,
            progress: category_progress(tasks, category),
        })
        .collect()
}

/// Progress across the whole collection.
pub fn overall_progress(tasks: &[Task]) -> Progress {
    Progress::of(tasks)
}
