//! Task domain model.
//!
//! # Responsibility
//! - Define the canonical task record shared by store, storage and FFI.
//! - Provide in-place mutation helpers with stable identity semantics.
//!
//! # Invariants
//! - `id` is stable and never reused for another task.
//! - `toggle_done` and `apply_edit` never change `id`.
//! - Wire shape is `{id, text, done, priority}` with priority labels
//!   `Low | Medium | High`.

use serde::{Deserialize, Serialize};

/// Stable identifier for a task.
///
/// Clock-derived decimal string minted by the store; kept as a type alias
/// to make semantic intent explicit in signatures.
pub type TaskId = String;

/// Urgency tag attached to every task.
///
/// Serialized with its exact variant name so blobs stay readable by the
/// shell and by earlier app versions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// Returns the wire label for this priority.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }

    /// Parses a wire label back into a priority.
    ///
    /// Accepts exactly the labels produced by [`Priority::as_str`];
    /// returns `None` for anything else.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Low" => Some(Self::Low),
            "Medium" => Some(Self::Medium),
            "High" => Some(Self::High),
            _ => None,
        }
    }
}

/// A single to-do item.
///
/// `done` and `priority` default on deserialization so blobs written by
/// older shell versions without those fields still load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Stable ID, the sole lookup and equality key.
    pub id: TaskId,
    /// User-supplied description. Non-empty after trimming on the add
    /// path; edits are intentionally not re-guarded.
    pub text: String,
    /// Completion flag.
    #[serde(default)]
    pub done: bool,
    /// Urgency tag, `Medium` when absent.
    #[serde(default)]
    pub priority: Priority,
}

impl Task {
    /// Creates a task with the given identity, not yet done.
    pub fn new(id: impl Into<TaskId>, text: impl Into<String>, priority: Priority) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            done: false,
            priority,
        }
    }

    /// Flips the completion flag.
    pub fn toggle_done(&mut self) {
        self.done = !self.done;
    }

    /// Replaces text and priority, leaving `id` and `done` untouched.
    pub fn apply_edit(&mut self, text: impl Into<String>, priority: Priority) {
        self.text = text.into();
        self.priority = priority;
    }
}

/// Trims user input for the add path.
///
/// Returns `None` when nothing remains after trimming, which callers treat
/// as "create nothing".
pub fn normalize_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
