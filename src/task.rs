//! Task records.
//!
//! A task is a single to-do item. Records are persisted as camelCase JSON so
//! that stored collections look like:
//!
//! ```text
//! [{"id":"01j9...","text":"Buy milk","completed":true,"category":"shopping",
//!   "createdAt":"2026-10-15T09:30:00Z","completedAt":"2026-10-15T10:02:11Z"}]
//! ```

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::{Generator, Ulid};

use crate::category::{self, Category};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, deserialize_with = "category::deserialize_lenient")]
    pub category: Category,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Build a fresh, incomplete task. Returns `None` when `text` is blank.
    pub fn new(
        id: impl Into<String>,
        text: &str,
        category: Category,
        created_at: DateTime<Utc>,
    ) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        Some(Self {
            id: id.into(),
            text: text.to_string(),
            completed: false,
            category,
            created_at,
            completed_at: None,
        })
    }

    /// Flip completion, keeping `completed_at` in step with `completed`.
    pub fn toggle(&mut self, now: DateTime<Utc>) {
        if self.completed {
            self.completed = false;
            self.completed_at = None;
        } else {
            self.completed = true;
            self.completed_at = Some(now);
        }
    }

    /// Repair records written before `completedAt` existed, or edited by hand.
    ///
    /// Returns true when the record was changed.
    pub fn normalize(&mut self) -> bool {
        match (self.completed, self.completed_at) {
            (true, None) => {
                self.completed_at = Some(self.created_at);
                true
            }
            (false, Some(_)) => {
                self.completed_at = None;
                true
            }
            _ => false,
        }
    }
}

/// Monotonic ULID source for task ids.
///
/// Ids from one generator sort in creation order even within the same
/// millisecond; `next_unique` also skips anything already present in the
/// collection.
pub struct TaskIdGenerator {
    inner: Generator,
}

impl TaskIdGenerator {
    pub fn new() -> Self {
        Self {
            inner: Generator::new(),
        }
    }

    pub fn next_unique(&mut self, existing: &HashSet<&str>) -> String {
        loop {
            let id = self.next_id();
            if !existing.contains(id.as_str()) {
                return id;
            }
        }
    }

    fn next_id(&mut self) -> String {
        // Overflow only happens after 2^80 ids in one millisecond; fall back
        // to a fresh random ULID rather than failing the add.
        let ulid = self.inner.generate().unwrap_or_else(|_| Ulid::new());
        ulid.to_string().to_lowercase()
    }
}

impl Default for TaskIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TaskIdGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskIdGenerator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn new_trims_and_rejects_blank() {
        let task = Task::new("t1", "  Buy milk \n", Category::Shopping, at(10)).unwrap();
        assert_eq!(task.text, "Buy milk");
        assert!(!task.completed);
        assert!(task.completed_at.is_none());

        assert!(Task::new("t2", "", Category::Work, at(10)).is_none());
        assert!(Task::new("t3", "   ", Category::Work, at(10)).is_none());
    }

    #[test]
    fn toggle_sets_and_clears_completed_at() {
        let mut task = Task::new("t1", "Run", Category::Health, at(10)).unwrap();
        task.toggle(at(20));
        assert!(task.completed);
        assert_eq!(task.completed_at, Some(at(20)));

        task.toggle(at(30));
        assert!(!task.completed);
        assert!(task.completed_at.is_none());
        assert_eq!(task.created_at, at(10));
    }

    #[test]
    fn legacy_record_without_category_or_completed_at() {
        let raw = r#"{"id":"1697350000000","text":"Old","completed":true,"createdAt":"2023-10-15T06:06:40.000Z"}"#;
        let mut task: Task = serde_json::from_str(raw).unwrap();
        assert_eq!(task.category, Category::Others);
        assert!(task.completed_at.is_none());

        assert!(task.normalize());
        assert_eq!(task.completed_at, Some(task.created_at));
        assert!(!task.normalize());
    }

    #[test]
    fn unknown_or_null_category_loads_as_others() {
        let raw = r#"{"id":"a","text":"x","completed":false,"category":"errands","createdAt":"2026-01-01T00:00:00Z"}"#;
        let task: Task = serde_json::from_str(raw).unwrap();
        assert_eq!(task.category, Category::Others);

        let raw = r#"{"id":"b","text":"x","completed":false,"category":null,"createdAt":"2026-01-01T00:00:00Z"}"#;
        let task: Task = serde_json::from_str(raw).unwrap();
        assert_eq!(task.category, Category::Others);
    }

    #[test]
    fn stray_completed_at_is_dropped() {
        let mut task = Task::new("t1", "x", Category::Work, at(1)).unwrap();
        task.completed_at = Some(at(2));
        assert!(task.normalize());
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn serializes_camel_case_and_omits_absent_completed_at() {
        let task = Task::new("t1", "Write report", Category::Work, at(0)).unwrap();
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["createdAt"], "1970-01-01T00:00:00Z");
        assert_eq!(json["category"], "work");
        assert!(json.get("completedAt").is_none());
        assert!(json.get("created_at").is_none());
    }

    #[test]
    fn generator_skips_existing_and_is_monotonic() {
        let mut ids = TaskIdGenerator::new();
        let first = ids.next_unique(&HashSet::new());
        let second = ids.next_unique(&HashSet::new());
        assert_ne!(first, second);
        assert!(first < second);
        assert_eq!(first.len(), 26);
        assert_eq!(first, first.to_lowercase());

        let existing: HashSet<&str> = [first.as_str(), second.as_str()].into_iter().collect();
        let third = ids.next_unique(&existing);
        assert!(!existing.contains(third.as_str()));
    }
}
