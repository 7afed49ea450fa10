//! Purpose: Invoke the native entry point once and turn its result into pass/fail.
//! Exports: `EntryPoint`, `Harness`, `check_outcome`, `NATIVE_CALL_FAILED`.
//! Role: Core of the smoke test; the CLI only wires arguments and exit codes around it.
//! Invariants: Exactly one invocation per `run`; no retries, no timeouts.
//! Invariants: A `false` result always surfaces as `ErrorKind::NativeCallFailed`.
//! Invariants: No state is carried between runs.
use tracing::{debug, debug_span};

use super::error::{Error, ErrorKind};
use super::library::{self, LibrarySearch};

/// Diagnostic text for a failed native self-test.
pub const NATIVE_CALL_FAILED: &str = "Native call failed";

/// Something that can be called once for a boolean self-test result.
pub trait EntryPoint {
    fn invoke(&self) -> bool;
}

impl<F> EntryPoint for F
where
    F: Fn() -> bool,
{
    fn invoke(&self) -> bool {
        self()
    }
}

pub fn check_outcome(success: bool) -> Result<(), Error> {
    if success {
        Ok(())
    } else {
        Err(Error::new(ErrorKind::NativeCallFailed).with_message(NATIVE_CALL_FAILED))
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Harness;

impl Harness {
    pub fn new() -> Self {
        Self
    }

    pub fn run(&self, entry: &dyn EntryPoint) -> Result<(), Error> {
        let success = entry.invoke();
        debug!(success, "native entry point returned");
        check_outcome(success)
    }

    /// Load, bind, and invoke in one step. The library is unloaded before returning.
    pub fn run_library(&self, search: &LibrarySearch) -> Result<(), Error> {
        let span = debug_span!("native", library = search.name());
        let _guard = span.enter();
        let entry = library::load(search)?;
        debug!(path = %entry.path().display(), "invoking entry point");
        self.run(&entry)
    }
}
