//! Purpose: Fixture native library for the `native-smoke` harness.
//! Exports: `run` (C ABI, no arguments, returns `bool`).
//! Role: Stand-in for the real library under test; built by the integration tests.
//! Invariants: `run` is exported unmangled unless the `no-entry` feature is on.
//! Invariants: `run` returns `false` only with the `fail` feature.

#[cfg(not(feature = "no-entry"))]
#[unsafe(no_mangle)]
pub extern "C" fn run() -> bool {
    !cfg!(feature = "fail")
}

#[cfg(feature = "no-entry")]
#[unsafe(no_mangle)]
pub extern "C" fn native_test_version() -> u32 {
    1
}
