//! Purpose: Library crate behind the `native-smoke` harness binary and its tests.
//! Exports: `core` (library search and loading, harness, errors).
//! Role: Keeps the native boundary testable without spawning the binary.
//! Invariants: All dynamic loading goes through `core::library`.
pub mod core;
