//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `taskify_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

fn main() {
    println!("taskify_core ping={}", taskify_core::ping());
    println!("taskify_core version={}", taskify_core::core_version());
}
