//! Task store: the authoritative in-memory list and its mutations.
//!
//! # Responsibility
//! - Own the current task list; expose read-only access to callers.
//! - Apply the six shell-facing mutations and the derived counts.
//! - Keep the durable mirror in sync through the repository.
//!
//! # Invariants
//! - Every mutation persists the candidate list first and commits it to
//!   memory only when the write succeeded; on write failure the in-memory
//!   list is unchanged.
//! - Task ids are minted strictly increasing and never reused, including
//!   across a rehydration from storage.
//! - List order is insertion order; toggle and edit never reorder.

use crate::model::task::{normalize_text, Priority, Task, TaskId};
use crate::repo::task_list_repo::{RepoError, TaskListRepository};
use log::{debug, error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

/// Store error for task mutations and rehydration.
///
/// Exactly two kinds exist: a failed read of the durable mirror and a
/// failed write of it. Neither is fatal to the store; callers decide
/// whether to surface or drop them.
#[derive(Debug)]
pub enum StoreError {
    Load(RepoError),
    Persist(RepoError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Load(err) => write!(f, "task list load failed: {err}"),
            Self::Persist(err) => write!(f, "task list persist failed: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Load(err) | Self::Persist(err) => Some(err),
        }
    }
}

/// Result of rehydrating the store from the durable mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// No blob existed yet; the list is now empty.
    FirstRun,
    /// A stored list was decoded; carries the number of tasks restored.
    Restored(usize),
}

/// Clock-derived id mint.
///
/// Issues epoch-millisecond decimal strings, bumped past the previous
/// issue whenever the clock has not advanced, so rapid mints stay unique.
#[derive(Debug, Default)]
struct IdMint {
    last: u64,
}

impl IdMint {
    fn mint(&mut self) -> TaskId {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_millis() as u64);
        self.last = now_ms.max(self.last + 1);
        self.last.to_string()
    }

    /// Moves the floor past every numeric id already in use.
    fn observe(&mut self, tasks: &[Task]) {
        for task in tasks {
            if let Ok(value) = task.id.parse::<u64>() {
                self.last = self.last.max(value);
            }
        }
    }
}

/// Owns the authoritative task list and its durable mirror.
///
/// The underlying vector is private; callers read through [`tasks`] and
/// mutate only through the operation methods.
///
/// [`tasks`]: TaskStore::tasks
pub struct TaskStore<R: TaskListRepository> {
    repo: R,
    tasks: Vec<Task>,
    id_mint: IdMint,
}

impl<R: TaskListRepository> TaskStore<R> {
    /// Creates an empty store over the given repository.
    ///
    /// The list stays empty until [`load`] rehydrates it.
    ///
    /// [`load`]: TaskStore::load
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            tasks: Vec::new(),
            id_mint: IdMint::default(),
        }
    }

    /// Rehydrates the in-memory list from the durable mirror.
    ///
    /// # Contract
    /// - Absent blob: the list becomes empty, returns `FirstRun`.
    /// - Decoded blob: the list is replaced wholesale, returns
    ///   `Restored(n)`, and the id mint moves past every restored id.
    /// - Read failure: the in-memory list keeps its previous value and the
    ///   error is returned; callers may drop it to degrade silently.
    pub fn load(&mut self) -> Result<LoadOutcome, StoreError> {
        match self.repo.load_tasks() {
            Ok(None) => {
                self.tasks.clear();
                info!("event=store_load module=store status=ok outcome=first_run");
                Ok(LoadOutcome::FirstRun)
            }
            Ok(Some(tasks)) => {
                self.id_mint.observe(&tasks);
                let restored = tasks.len();
                self.tasks = tasks;
                info!("event=store_load module=store status=ok outcome=restored tasks={restored}");
                Ok(LoadOutcome::Restored(restored))
            }
            Err(err) => {
                error!("event=store_load module=store status=error error={err}");
                Err(StoreError::Load(err))
            }
        }
    }

    /// Creates a task from trimmed user input and appends it to the list.
    ///
    /// # Contract
    /// - Blank input (empty after trimming) creates nothing and touches
    ///   neither memory nor storage; returns `Ok(None)`.
    /// - Otherwise returns the created task with `done = false` and a
    ///   fresh id.
    pub fn add(&mut self, text: &str, priority: Priority) -> Result<Option<Task>, StoreError> {
        let Some(text) = normalize_text(text) else {
            debug!("event=task_add module=store status=skipped reason=empty_text");
            return Ok(None);
        };

        let task = Task::new(self.id_mint.mint(), text, priority);
        let mut next = self.tasks.clone();
        next.push(task.clone());
        self.commit(next, "task_add")?;
        Ok(Some(task))
    }

    /// Flips `done` on the task matching `id`.
    ///
    /// No match is a silent no-op; the list is persisted afterward either
    /// way.
    pub fn toggle(&mut self, id: &str) -> Result<(), StoreError> {
        let mut next = self.tasks.clone();
        if let Some(task) = next.iter_mut().find(|task| task.id == id) {
            task.toggle_done();
        }
        self.commit(next, "task_toggle")
    }

    /// Replaces text and priority on the task matching `id`, preserving
    /// `id` and `done`.
    ///
    /// No match is a silent no-op; the list is persisted afterward either
    /// way. Unlike [`add`], blank text is accepted here.
    ///
    /// [`add`]: TaskStore::add
    pub fn edit(&mut self, id: &str, text: &str, priority: Priority) -> Result<(), StoreError> {
        let mut next = self.tasks.clone();
        if let Some(task) = next.iter_mut().find(|task| task.id == id) {
            task.apply_edit(text, priority);
        }
        self.commit(next, "task_edit")
    }

    /// Deletes the task matching `id`; no-op when absent.
    pub fn remove(&mut self, id: &str) -> Result<(), StoreError> {
        let mut next = self.tasks.clone();
        next.retain(|task| task.id != id);
        self.commit(next, "task_remove")
    }

    /// Drops every completed task, keeping pending ones in order.
    pub fn clear_completed(&mut self) -> Result<(), StoreError> {
        let mut next = self.tasks.clone();
        next.retain(|task| !task.done);
        self.commit(next, "clear_completed")
    }

    /// Read-only view of the current list, in insertion order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Number of tasks with `done = true`.
    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|task| task.done).count()
    }

    /// Number of tasks with `done = false`.
    pub fn pending_count(&self) -> usize {
        self.tasks.len() - self.completed_count()
    }

    /// Persists `next` and commits it to memory only on write success.
    ///
    /// On write failure the in-memory list is left at its pre-call value,
    /// rolling back the optimistic mutation.
    fn commit(&mut self, next: Vec<Task>, event: &'static str) -> Result<(), StoreError> {
        match self.repo.save_tasks(&next) {
            Ok(()) => {
                self.tasks = next;
                info!(
                    "event={event} module=store status=ok tasks={}",
                    self.tasks.len()
                );
                Ok(())
            }
            Err(err) => {
                error!("event={event} module=store status=error error={err}");
                Err(StoreError::Persist(err))
            }
        }
    }
}
