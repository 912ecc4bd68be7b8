//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose the task-store operations to Dart via FRB.
//! - Hold the process-wide store and apply the lenient failure policy:
//!   persistence errors are logged and reported in the envelope while the
//!   shell keeps rendering the current list.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - The store is created once per process and rehydrated at creation,
//!   so every gesture operates on the same in-memory list.

use log::error;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, OnceLock};
use taskify_core::db::open_db;
use taskify_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    Priority, SqliteTaskListRepository, Task, TaskStore,
};

const STORE_DB_FILE_NAME: &str = "taskify.sqlite3";
static STORE_DB_PATH: OnceLock<PathBuf> = OnceLock::new();
static STORE: Mutex<Option<TaskStore<SqliteTaskListRepository>>> = Mutex::new(None);

/// Minimal health-check API used by the splash screen boot probe.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// # FFI contract
/// - Sync call; may perform small file-system setup work.
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on
///   failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Task record shape crossing the FFI boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfiTask {
    /// Stable task ID in string form.
    pub id: String,
    /// User-supplied description.
    pub text: String,
    /// Completion flag.
    pub done: bool,
    /// Priority wire label (`Low|Medium|High`).
    pub priority: String,
}

/// List response envelope: the current list plus derived counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskListResponse {
    /// Whether the triggering operation succeeded.
    pub ok: bool,
    /// Current task list in insertion order.
    pub tasks: Vec<FfiTask>,
    /// Number of completed tasks.
    pub completed_count: u32,
    /// Number of pending tasks.
    pub pending_count: u32,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

/// Action response envelope for task creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskActionResponse {
    /// Whether the operation created a task.
    pub ok: bool,
    /// Created task ID on success.
    pub task_id: Option<String>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

/// Loads the current task list and derived counts.
///
/// # FFI contract
/// - Sync call, DB-backed on first use only.
/// - Never panics.
/// - On storage failure, returns the list the store already holds with
///   `ok=false`; the shell may ignore the failure.
#[flutter_rust_bridge::frb(sync)]
pub fn load_tasks() -> TaskListResponse {
    with_store(|store| list_response(store, true, "Loaded."))
        .unwrap_or_else(unavailable_list_response)
}

/// Creates a task from user input.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Blank text (after trimming) creates nothing and reports `ok=false`.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn add_task(text: String, priority: String) -> TaskActionResponse {
    let Some(priority) = Priority::parse(priority.as_str()) else {
        return TaskActionResponse {
            ok: false,
            task_id: None,
            message: format!("unknown priority `{priority}`"),
        };
    };

    let result = with_store(|store| match store.add(text.as_str(), priority) {
        Ok(Some(task)) => TaskActionResponse {
            ok: true,
            task_id: Some(task.id),
            message: "Task created.".to_string(),
        },
        Ok(None) => TaskActionResponse {
            ok: false,
            task_id: None,
            message: "Task text is empty; nothing was created.".to_string(),
        },
        Err(err) => TaskActionResponse {
            ok: false,
            task_id: None,
            message: format!("add_task failed: {err}"),
        },
    });

    result.unwrap_or_else(|message| TaskActionResponse {
        ok: false,
        task_id: None,
        message,
    })
}

/// Flips the completion flag of the task matching `id`.
///
/// # FFI contract
/// - Sync call, DB-backed execution; unknown ids are a silent no-op.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn toggle_task(id: String) -> TaskListResponse {
    mutate(move |store| store.toggle(id.as_str()), "toggle_task")
}

/// Replaces text and priority of the task matching `id`.
///
/// # FFI contract
/// - Sync call, DB-backed execution; unknown ids are a silent no-op.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn edit_task(id: String, text: String, priority: String) -> TaskListResponse {
    let Some(priority) = Priority::parse(priority.as_str()) else {
        return with_store(|store| {
            list_response(store, false, format!("unknown priority `{priority}`"))
        })
        .unwrap_or_else(unavailable_list_response);
    };

    mutate(
        move |store| store.edit(id.as_str(), text.as_str(), priority),
        "edit_task",
    )
}

/// Deletes the task matching `id`.
///
/// # FFI contract
/// - Sync call, DB-backed execution; unknown ids are a silent no-op.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn remove_task(id: String) -> TaskListResponse {
    mutate(move |store| store.remove(id.as_str()), "remove_task")
}

/// Removes every completed task.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn clear_completed() -> TaskListResponse {
    mutate(|store| store.clear_completed(), "clear_completed")
}

fn mutate(
    op: impl FnOnce(&mut TaskStore<SqliteTaskListRepository>) -> Result<(), taskify_core::StoreError>,
    name: &'static str,
) -> TaskListResponse {
    with_store(|store| match op(store) {
        Ok(()) => list_response(store, true, "Done."),
        // Lenient policy: the store already rolled back, so the returned
        // list is the pre-call state the shell should keep showing.
        Err(err) => list_response(store, false, format!("{name} failed: {err}")),
    })
    .unwrap_or_else(unavailable_list_response)
}

fn list_response(
    store: &TaskStore<SqliteTaskListRepository>,
    ok: bool,
    message: impl Into<String>,
) -> TaskListResponse {
    TaskListResponse {
        ok,
        tasks: store.tasks().iter().map(to_ffi_task).collect(),
        completed_count: store.completed_count() as u32,
        pending_count: store.pending_count() as u32,
        message: message.into(),
    }
}

fn unavailable_list_response(message: String) -> TaskListResponse {
    TaskListResponse {
        ok: false,
        tasks: Vec::new(),
        completed_count: 0,
        pending_count: 0,
        message,
    }
}

fn to_ffi_task(task: &Task) -> FfiTask {
    FfiTask {
        id: task.id.clone(),
        text: task.text.clone(),
        done: task.done,
        priority: task.priority.as_str().to_string(),
    }
}

fn resolve_store_db_path() -> PathBuf {
    STORE_DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var("TASKIFY_DB_PATH") {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(STORE_DB_FILE_NAME)
        })
        .clone()
}

/// Runs `f` against the process-wide store, creating it on first use.
///
/// Store creation opens the database and rehydrates the list once; a
/// failed rehydration is logged and the store starts empty (the original
/// shell degrades the same way). Only a failed database open is reported
/// to the caller.
fn with_store<T>(
    f: impl FnOnce(&mut TaskStore<SqliteTaskListRepository>) -> T,
) -> Result<T, String> {
    let mut guard = lock_store();

    if guard.is_none() {
        let db_path = resolve_store_db_path();
        let conn = open_db(&db_path).map_err(|err| format!("store DB open failed: {err}"))?;
        let repo = SqliteTaskListRepository::try_new(conn)
            .map_err(|err| format!("store repo init failed: {err}"))?;
        let mut store = TaskStore::new(repo);
        if let Err(err) = store.load() {
            error!("event=ffi_store_init module=ffi status=degraded error={err}");
        }
        *guard = Some(store);
    }

    match guard.as_mut() {
        Some(store) => Ok(f(store)),
        None => Err("store unavailable".to_string()),
    }
}

fn lock_store() -> MutexGuard<'static, Option<TaskStore<SqliteTaskListRepository>>> {
    match STORE.lock() {
        Ok(guard) => guard,
        // A panic while holding the lock cannot corrupt the list beyond
        // what the durable mirror already holds; recover the guard.
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        add_task, clear_completed, core_version, edit_task, init_logging, load_tasks, ping,
        remove_task, toggle_task, FfiTask,
    };
    use std::sync::{Mutex, MutexGuard};
    use std::time::{SystemTime, UNIX_EPOCH};

    // The exported API shares one process-wide store; store-touching tests
    // take this lock so parallel test threads cannot clear each other's
    // completed tasks mid-scenario.
    static STORE_TESTS: Mutex<()> = Mutex::new(());

    fn serial() -> MutexGuard<'static, ()> {
        match STORE_TESTS.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), String::new());
        assert!(!error.is_empty());
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        let error = init_logging("verbose".to_string(), "tmp/logs".to_string());
        assert!(!error.is_empty());
    }

    #[test]
    fn add_task_rejects_blank_text() {
        let _guard = serial();
        let response = add_task("   ".to_string(), "High".to_string());
        assert!(!response.ok);
        assert!(response.task_id.is_none());
    }

    #[test]
    fn add_task_rejects_unknown_priority() {
        let _guard = serial();
        let response = add_task("valid text".to_string(), "Urgent".to_string());
        assert!(!response.ok);
        assert!(response.message.contains("unknown priority"));
    }

    #[test]
    fn added_task_appears_in_loaded_list() {
        let _guard = serial();
        let text = unique_token("ffi-add");
        let created = add_task(text.clone(), "High".to_string());
        assert!(created.ok, "{}", created.message);
        let task_id = created.task_id.expect("created task should have an id");

        let listed = load_tasks();
        assert!(listed.ok, "{}", listed.message);
        let task = find_task(&listed.tasks, &task_id);
        assert_eq!(task.text, text);
        assert_eq!(task.priority, "High");
        assert!(!task.done);
    }

    #[test]
    fn toggle_round_trip_through_ffi() {
        let _guard = serial();
        let text = unique_token("ffi-toggle");
        let task_id = add_task(text, "Low".to_string()).task_id.unwrap();

        let toggled = toggle_task(task_id.clone());
        assert!(toggled.ok, "{}", toggled.message);
        assert!(find_task(&toggled.tasks, &task_id).done);

        let restored = toggle_task(task_id.clone());
        assert!(!find_task(&restored.tasks, &task_id).done);
    }

    #[test]
    fn edit_preserves_done_flag() {
        let _guard = serial();
        let text = unique_token("ffi-edit");
        let task_id = add_task(text, "Low".to_string()).task_id.unwrap();
        toggle_task(task_id.clone());

        let edited_text = unique_token("ffi-edited");
        let response = edit_task(task_id.clone(), edited_text.clone(), "Medium".to_string());
        assert!(response.ok, "{}", response.message);

        let task = find_task(&response.tasks, &task_id);
        assert_eq!(task.text, edited_text);
        assert_eq!(task.priority, "Medium");
        assert!(task.done);
    }

    #[test]
    fn remove_task_drops_it_from_the_list() {
        let _guard = serial();
        let text = unique_token("ffi-remove");
        let task_id = add_task(text, "Medium".to_string()).task_id.unwrap();

        let response = remove_task(task_id.clone());
        assert!(response.ok, "{}", response.message);
        assert!(response.tasks.iter().all(|task| task.id != task_id));
    }

    #[test]
    fn clear_completed_removes_done_tasks_only() {
        let _guard = serial();
        let done_text = unique_token("ffi-clear-done");
        let pending_text = unique_token("ffi-clear-pending");
        let done_id = add_task(done_text, "Low".to_string()).task_id.unwrap();
        let pending_id = add_task(pending_text, "Low".to_string()).task_id.unwrap();
        toggle_task(done_id.clone());

        let response = clear_completed();
        assert!(response.ok, "{}", response.message);
        assert!(response.tasks.iter().all(|task| task.id != done_id));
        assert!(response.tasks.iter().any(|task| task.id == pending_id));
    }

    #[test]
    fn counts_reflect_done_flags() {
        let _guard = serial();
        let response = load_tasks();
        let done = response.tasks.iter().filter(|task| task.done).count() as u32;
        assert_eq!(response.completed_count, done);
        assert_eq!(
            response.pending_count,
            response.tasks.len() as u32 - done
        );
    }

    fn find_task<'a>(tasks: &'a [FfiTask], id: &str) -> &'a FfiTask {
        tasks
            .iter()
            .find(|task| task.id == id)
            .expect("task should be present in the list")
    }

    fn unique_token(prefix: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time went backwards")
            .as_nanos();
        format!("{prefix}-{nanos}")
    }
}
