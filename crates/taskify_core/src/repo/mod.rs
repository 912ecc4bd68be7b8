//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the durable-mirror contract for the task list.
//! - Isolate SQLite and blob-codec details from store orchestration.
//!
//! # Invariants
//! - The repository owns the fixed storage key exclusively; no other
//!   component reads or writes it.
//! - Repository APIs distinguish "no data yet" from "corrupt data".

pub mod task_list_repo;
