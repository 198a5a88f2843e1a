use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::filter::{self, CategoryProgress};
use crate::task::Task;

/// Default trailing window for recent activity
pub const DEFAULT_RECENT_WINDOW_DAYS: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentActivity {
    pub window_days: u32,
    pub created: usize,
    pub completed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub generated_at: DateTime<Utc>,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub pending_tasks: usize,
    pub completion_rate: u32,
    pub category_breakdown: Vec<CategoryProgress>,
    pub recent_activity: RecentActivity,
    pub daily_average: usize,
}

/// Aggregate `tasks` as of `now`. Never touches the collection or storage.
pub fn compute(tasks: &[Task], now: DateTime<Utc>, window_days: u32) -> TaskStats {
    let total_tasks = tasks.len();
    let completed_tasks = tasks.iter().filter(|task| task.completed).count();

    TaskStats {
        generated_at: now,
        total_tasks,
        completed_tasks,
        pending_tasks: total_tasks - completed_tasks,
        completion_rate: filter::percentage(completed_tasks, total_tasks),
        category_breakdown: filter::per_category_progress(tasks),
        recent_activity: recent_activity(tasks, now, window_days),
        daily_average: daily_average(total_tasks),
    }
}

/// Tasks created at or after `now - window_days`, and how many of those are done.
pub fn recent_activity(tasks: &[Task], now: DateTime<Utc>, window_days: u32) -> RecentActivity {
    // Windows reaching past chrono's range count every task.
    let since = now
        .checked_sub_signed(Duration::days(i64::from(window_days)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let (created, completed) = tasks
        .iter()
        .filter(|task| task.created_at >= since)
        .fold((0, 0), |(created, completed), task| {
            (created + 1, completed + usize::from(task.completed))
        });

    RecentActivity {
        window_days,
        created,
        completed,
    }
}

/// Total tasks spread over a week, rounded half up.
fn daily_average(total_tasks: usize) -> usize {
    (total_tasks * 2 + 7) / 14
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 15, 12, 0, 0).unwrap()
    }

    fn task(id: &str, category: Category, age_days: i64, completed: bool) -> Task {
        let created = now() - Duration::days(age_days);
        let mut task = Task::new(id, id, category, created).unwrap();
        if completed {
            task.toggle(created + Duration::hours(1));
        }
        task
    }

    #[test]
    fn empty_collection_has_zero_rates() {
        let stats = compute(&[], now(), DEFAULT_RECENT_WINDOW_DAYS);
        assert_eq!(stats.total_tasks, 0);
        assert_eq!(stats.completed_tasks, 0);
        assert_eq!(stats.pending_tasks, 0);
        assert_eq!(stats.completion_rate, 0);
        assert_eq!(stats.daily_average, 0);
        assert_eq!(stats.category_breakdown.len(), 5);
        assert!(stats
            .category_breakdown
            .iter()
            .all(|entry| entry.progress.percentage == 0 && entry.progress.total == 0));
        assert_eq!(stats.recent_activity.created, 0);
    }

    #[test]
    fn single_completed_shopping_task() {
        let tasks = vec![task("milk", Category::Shopping, 0, true)];
        let stats = compute(&tasks, now(), DEFAULT_RECENT_WINDOW_DAYS);
        assert_eq!(stats.total_tasks, 1);
        assert_eq!(stats.completed_tasks, 1);
        assert_eq!(stats.completion_rate, 100);

        let shopping = stats
            .category_breakdown
            .iter()
            .find(|entry| entry.category == Category::Shopping)
            .unwrap();
        assert_eq!(shopping.progress.completed, 1);
        assert_eq!(shopping.progress.total, 1);
        assert_eq!(shopping.progress.percentage, 100);
    }

    #[test]
    fn counts_and_rate() {
        let tasks = vec![
            task("a", Category::Work, 0, true),
            task("b", Category::Work, 1, false),
            task("c", Category::Health, 2, true),
        ];
        let stats = compute(&tasks, now(), DEFAULT_RECENT_WINDOW_DAYS);
        assert_eq!(stats.pending_tasks, 1);
        assert_eq!(stats.completion_rate, 67);
    }

    #[test]
    fn recent_activity_uses_trailing_window() {
        let tasks = vec![
            task("today", Category::Work, 0, true),
            task("edge", Category::Work, 7, true),
            task("old", Category::Work, 8, true),
            task("recent-open", Category::Personal, 3, false),
        ];
        let recent = recent_activity(&tasks, now(), 7);
        assert_eq!(recent.window_days, 7);
        assert_eq!(recent.created, 3);
        assert_eq!(recent.completed, 2);

        let narrow = recent_activity(&tasks, now(), 1);
        assert_eq!(narrow.created, 1);
    }

    #[test]
    fn oversized_window_counts_everything() {
        let tasks = vec![
            task("today", Category::Work, 0, true),
            task("ancient", Category::Work, 40_000, false),
        ];
        let recent = recent_activity(&tasks, now(), u32::MAX);
        assert_eq!(recent.window_days, u32::MAX);
        assert_eq!(recent.created, 2);
        assert_eq!(recent.completed, 1);

        let stats = compute(&[], now(), u32::MAX);
        assert_eq!(stats.recent_activity.created, 0);
    }

    #[test]
    fn daily_average_rounds_half_up() {
        assert_eq!(daily_average(0), 0);
        assert_eq!(daily_average(3), 0);
        assert_eq!(daily_average(4), 1);
        assert_eq!(daily_average(7), 1);
        assert_eq!(daily_average(11), 2);
    }

    #[test]
    fn serializes_camel_case() {
        let stats = compute(&[], now(), 7);
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["completionRate"], 0);
        assert_eq!(json["recentActivity"]["windowDays"], 7);
        assert!(json["categoryBreakdown"].is_array());
    }
}
