//! Flutter-facing FFI crate for the Taskify shell.

pub mod api;
