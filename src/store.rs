//! In-memory task collection for the active user.
//!
//! The store owns the authoritative task list for one user. Every mutation
//! applies in memory first and then hands a snapshot of the full collection
//! to a [`SaveQueue`], which writes it in the background. Intents never
//! wait for the write and never see its errors: a failed save is logged and
//! the in-memory state stays authoritative for the session.
//!
//! Views (`visible`, `progress`, `stats`) are recomputed on every read, so
//! they always reflect the latest mutation.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};

use crate::category::Category;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::filter::{self, CategoryProgress, Progress};
use crate::stats::{self, TaskStats, DEFAULT_RECENT_WINDOW_DAYS};
use crate::storage::PersistenceGateway;
use crate::task::{Task, TaskIdGenerator};

/// Shortest id prefix accepted by [`TaskStore::resolve_id`]
pub const MIN_ID_PREFIX_LEN: usize = 4;

enum SaveRequest {
    Save { user: String, tasks: Vec<Task> },
    Flush(oneshot::Sender<()>),
}

/// Background writer for one store. Requests are handled strictly in order,
/// so the last enqueued collection is the one left in storage.
#[derive(Debug, Clone)]
pub struct SaveQueue {
    tx: mpsc::UnboundedSender<SaveRequest>,
    failures: Arc<AtomicUsize>,
}

impl SaveQueue {
    /// Start the writer task. Must be called from within a Tokio runtime.
    pub fn spawn(gateway: PersistenceGateway) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let failures = Arc::new(AtomicUsize::new(0));
        tokio::spawn(run_writer(gateway, rx, Arc::clone(&failures)));
        Self { tx, failures }
    }

    /// Queue a full-collection write and return immediately.
    pub fn enqueue(&self, user: &str, tasks: Vec<Task>) {
        let request = SaveRequest::Save {
            user: user.to_string(),
            tasks,
        };
        if self.tx.send(request).is_err() {
            self.failures.fetch_add(1, Ordering::SeqCst);
            tracing::error!(user, "save queue closed; write dropped");
        }
    }

    /// Resolve once every write queued before this call has been attempted.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(SaveRequest::Flush(done_tx)).is_err() {
            return;
        }
        let _ = done_rx.await;
    }

    /// Writes that failed since the queue started
    pub fn failed_saves(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }
}

async fn run_writer(
    gateway: PersistenceGateway,
    mut rx: mpsc::UnboundedReceiver<SaveRequest>,
    failures: Arc<AtomicUsize>,
) {
    while let Some(request) = rx.recv().await {
        match request {
            SaveRequest::Save { user, tasks } => {
                let gateway = gateway.clone();
                let key_user = user.clone();
                let count = tasks.len();
                let result =
                    tokio::task::spawn_blocking(move || gateway.save(&key_user, &tasks)).await;
                match result {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => {
                        failures.fetch_add(1, Ordering::SeqCst);
                        tracing::warn!(%user, count, error = %err, "saving tasks failed");
                    }
                    Err(err) => {
                        failures.fetch_add(1, Ordering::SeqCst);
                        tracing::error!(%user, count, error = %err, "save worker panicked");
                    }
                }
            }
            SaveRequest::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}

/// Defaults a store applies to new tasks and statistics.
#[derive(Debug, Clone, Copy)]
pub struct StoreOptions {
    pub default_category: Category,
    pub recent_window_days: u32,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            default_category: Category::Others,
            recent_window_days: DEFAULT_RECENT_WINDOW_DAYS,
        }
    }
}

impl From<&Config> for StoreOptions {
    fn from(config: &Config) -> Self {
        Self {
            default_category: config.tasks.default_category,
            recent_window_days: config.stats.recent_window_days,
        }
    }
}

#[derive(Debug)]
pub struct TaskStore {
    gateway: PersistenceGateway,
    saves: SaveQueue,
    options: StoreOptions,
    user: Option<String>,
    tasks: Vec<Task>,
    selected: Option<Category>,
    ids: TaskIdGenerator,
    load_error: Option<String>,
}

impl TaskStore {
    /// Create an empty store with no active user. Must be called from
    /// within a Tokio runtime.
    pub fn new(gateway: PersistenceGateway, options: StoreOptions) -> Self {
        let saves = SaveQueue::spawn(gateway.clone());
        Self {
            gateway,
            saves,
            options,
            user: None,
            tasks: Vec::new(),
            selected: None,
            ids: TaskIdGenerator::new(),
            load_error: None,
        }
    }

    /// [`TaskStore::new`] followed by [`TaskStore::initialize`].
    pub async fn open(
        gateway: PersistenceGateway,
        options: StoreOptions,
        user: impl Into<String>,
    ) -> Self {
        let mut store = Self::new(gateway, options);
        store.initialize(user).await;
        store
    }

    /// Switch to `user` and load their collection.
    ///
    /// State is reset first. A missing record or a failed load leaves the
    /// collection empty. Pending writes are flushed before reading so the
    /// load never observes an older record than this store produced.
    pub async fn initialize(&mut self, user: impl Into<String>) {
        let user = user.into();
        self.tasks.clear();
        self.selected = None;
        self.load_error = None;
        self.user = Some(user.clone());

        self.saves.flush().await;

        let gateway = self.gateway.clone();
        let key_user = user.clone();
        match tokio::task::spawn_blocking(move || gateway.load(&key_user)).await {
            Ok(Ok(Some(tasks))) => {
                tracing::debug!(%user, count = tasks.len(), "task store initialized");
                self.tasks = tasks;
            }
            Ok(Ok(None)) => {
                tracing::debug!(%user, "no stored tasks; starting empty");
            }
            Ok(Err(err)) => {
                tracing::warn!(%user, error = %err, "loading tasks failed; starting empty");
                self.load_error = Some(err.to_string());
            }
            Err(err) => {
                tracing::error!(%user, error = %err, "load worker panicked; starting empty");
                self.load_error = Some(err.to_string());
            }
        }
    }

    /// Create a task at the front of the collection.
    ///
    /// Blank text is rejected with `None` and nothing is written.
    pub fn add(&mut self, text: &str, category: Option<Category>) -> Option<Task> {
        if text.trim().is_empty() {
            return None;
        }
        let existing: HashSet<&str> = self.tasks.iter().map(|task| task.id.as_str()).collect();
        let id = self.ids.next_unique(&existing);
        let category = category.unwrap_or(self.options.default_category);
        let task = Task::new(id, text, category, Utc::now())?;

        self.tasks.insert(0, task.clone());
        self.persist();
        Some(task)
    }

    /// Flip completion of task `id`; `None` when no such task exists.
    pub fn toggle_completion(&mut self, id: &str) -> Option<&Task> {
        let index = self.position(id)?;
        self.tasks[index].toggle(Utc::now());
        self.persist();
        self.tasks.get(index)
    }

    /// Remove task `id`; `None` when no such task exists.
    pub fn remove(&mut self, id: &str) -> Option<Task> {
        let index = self.position(id)?;
        let removed = self.tasks.remove(index);
        self.persist();
        Some(removed)
    }

    pub fn select_category(&mut self, category: Option<Category>) {
        self.selected = category;
    }

    pub fn selected_category(&self) -> Option<Category> {
        self.selected
    }

    /// Tasks passing the selected category, in collection order
    pub fn visible(&self) -> Vec<&Task> {
        filter::filter(&self.tasks, self.selected)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn find(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Why the last `initialize` started empty, if its load failed.
    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn progress(&self) -> Vec<CategoryProgress> {
        filter::per_category_progress(&self.tasks)
    }

    pub fn overall_progress(&self) -> Progress {
        filter::overall_progress(&self.tasks)
    }

    pub fn stats(&self, now: DateTime<Utc>) -> TaskStats {
        stats::compute(&self.tasks, now, self.options.recent_window_days)
    }

    /// Resolve a full id or a unique prefix (case-insensitive, at least
    /// [`MIN_ID_PREFIX_LEN`] characters) to a task id.
    pub fn resolve_id(&self, input: &str) -> Result<String> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidArgument("task id cannot be empty".to_string()));
        }

        if let Some(task) = self.tasks.iter().find(|task| task.id == trimmed) {
            return Ok(task.id.clone());
        }

        let needle = trimmed.to_lowercase();
        if needle.len() < MIN_ID_PREFIX_LEN {
            return Err(Error::TaskNotFound(trimmed.to_string()));
        }

        let mut matches: Vec<&str> = self
            .tasks
            .iter()
            .map(|task| task.id.as_str())
            .filter(|id| id.to_lowercase().starts_with(&needle))
            .collect();
        matches.sort_unstable();
        matches.dedup();

        match matches.as_slice() {
            [] => Err(Error::TaskNotFound(trimmed.to_string())),
            [only] => Ok(only.to_string()),
            many => Err(Error::AmbiguousTaskId {
                input: trimmed.to_string(),
                candidates: many.join(", "),
            }),
        }
    }

    /// Wait until every write queued so far has been attempted.
    ///
    /// Returns the number of writes that have failed over the store's life.
    pub async fn flush(&self) -> usize {
        self.saves.flush().await;
        self.saves.failed_saves()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.tasks.iter().position(|task| task.id == id)
    }

    fn persist(&self) {
        match self.user.as_deref() {
            Some(user) => self.saves.enqueue(user, self.tasks.clone()),
            None => tracing::debug!("no active user; skipping save"),
        }
    }
}
