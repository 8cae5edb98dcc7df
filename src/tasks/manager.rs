//! Task manager
//!
//! Ordered in-memory task list with an optional repository mirror. The
//! in-memory list is authoritative: repository failures are logged and put
//! the manager in degraded mode, but never fail the operation. While
//! degraded, every write rewrites the whole list into the repository until
//! one succeeds.

use tracing::{debug, info, warn};

use super::store::{StoreError, TaskRepository, TaskRow};
use super::{Priority, Task};

/// Manages the to-do list
pub struct TaskManager {
    tasks: Vec<Task>,
    repo: Option<Box<dyn TaskRepository>>,
    /// Set when the repository no longer matches the in-memory list
    degraded: bool,
}

impl Default for TaskManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TaskManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskManager")
            .field("tasks", &self.tasks)
            .field("has_repository", &self.repo.is_some())
            .field("degraded", &self.degraded)
            .finish()
    }
}

impl TaskManager {
    /// Create a manager without persistence
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            repo: None,
            degraded: false,
        }
    }

    /// Create a manager that mirrors every change to `repo`
    pub fn with_repository(repo: Box<dyn TaskRepository>) -> Self {
        Self {
            tasks: Vec::new(),
            repo: Some(repo),
            degraded: false,
        }
    }

    /// Whether the repository has fallen behind the in-memory list
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Current tasks in list order
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Append a task
    ///
    /// Returns the repository row id when the task was stored.
    pub fn add(&mut self, task: Task) -> Option<i64> {
        debug!(title = %task.title, priority = %task.priority, "Adding task");
        let stored = task.clone();
        self.tasks.push(task);
        if self.degraded {
            return self.resync().and_then(|ids| ids.last().copied());
        }
        self.mirror("save", |repo| repo.save(&stored))
    }

    /// Remove every task with this title
    pub fn delete(&mut self, title: &str) {
        self.tasks.retain(|t| t.title != title);
        self.mirror("delete", |repo| repo.delete(title));
    }

    /// Mark every task with this title as complete
    pub fn mark_complete(&mut self, title: &str) {
        for task in self.tasks.iter_mut().filter(|t| t.title == title) {
            task.mark_complete();
        }
        self.mirror("update_completion", |repo| {
            repo.update_completion(title, true)
        });
    }

    /// Tasks with the given priority, in list order
    pub fn filter_priority(&self, priority: Priority) -> Vec<Task> {
        self.tasks
            .iter()
            .filter(|t| t.priority == priority)
            .cloned()
            .collect()
    }

    /// Sort High > Medium > Low, keeping list order within a priority
    pub fn sort_priority(&mut self) {
        self.tasks
            .sort_by(|a, b| b.priority.rank().cmp(&a.priority.rank()));
    }

    /// Sort by due date, earliest first; undated tasks go last
    pub fn sort_by_due_date(&mut self) {
        self.tasks.sort_by_key(|t| (t.due_date.is_none(), t.due_date));
    }

    /// Tasks as stored in the repository
    ///
    /// Answers from memory without a repository, while degraded, or when the
    /// repository cannot be read.
    pub fn stored_tasks(&self) -> Vec<Task> {
        match &self.repo {
            Some(repo) if !self.degraded => repo.load_all().unwrap_or_else(|e| {
                warn!("Failed to load tasks from repository: {}", e);
                self.tasks.clone()
            }),
            _ => self.tasks.clone(),
        }
    }

    /// Replace the in-memory list with the repository contents
    ///
    /// Returns the new task count, or `None` without a repository. Tasks
    /// that only existed in memory are dropped.
    pub fn reload(&mut self) -> Option<Result<usize, StoreError>> {
        let repo = self.repo.as_ref()?;
        Some(repo.load_all().map(|tasks| {
            if self.degraded {
                info!("Reloaded tasks, leaving degraded mode");
            }
            self.tasks = tasks;
            self.degraded = false;
            self.tasks.len()
        }))
    }

    /// Raw repository rows, or `None` without a repository
    pub fn rows(&self) -> Option<Result<Vec<TaskRow>, StoreError>> {
        self.repo.as_ref().map(|repo| repo.rows())
    }

    /// Apply one write to the repository, or resync the whole list if the
    /// repository has already missed a write
    fn mirror<T>(
        &mut self,
        operation: &str,
        f: impl FnOnce(&mut Box<dyn TaskRepository>) -> Result<T, StoreError>,
    ) -> Option<T> {
        if self.degraded {
            self.resync();
            return None;
        }

        let repo = self.repo.as_mut()?;
        match f(repo) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(operation, "Task repository write failed: {}", e);
                self.degraded = true;
                None
            }
        }
    }

    /// Rewrite the repository from the in-memory list
    ///
    /// Returns the new row ids on success.
    fn resync(&mut self) -> Option<Vec<i64>> {
        let repo = self.repo.as_mut()?;
        match repo.replace_all(&self.tasks) {
            Ok(ids) => {
                info!(count = ids.len(), "Task repository resynced");
                self.degraded = false;
                Some(ids)
            }
            Err(e) => {
                warn!("Task repository resync failed: {}", e);
                None
            }
        }
    }
}
