//! Purpose: Locate, load, and bind the native library under test.
//! Exports: `LibrarySearch`, `Candidate`, `BoundEntry`, `library_file_name`, `load`.
//! Role: The only place that crosses into the platform dynamic loader.
//! Invariants: Probe directories are tried in insertion order, then the loader search path.
//! Invariants: The first candidate that loads is final; a missing symbol never falls through.
//! Invariants: `BoundEntry` owns the library handle for as long as its function pointer lives.
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};

use libloading::Library;
use tracing::debug;

use super::error::{Error, ErrorKind};
use super::harness::EntryPoint;

/// Logical name of the library the harness exercises.
pub const LIBRARY_NAME: &str = "native_test";

/// Exported symbol the harness invokes. Matched exactly, no decoration.
pub const ENTRY_SYMBOL: &str = "run";

/// `bool run(void)` with the platform C calling convention.
pub type RunFn = unsafe extern "C" fn() -> bool;

/// Platform file name for a logical library name (`libfoo.so`, `libfoo.dylib`, `foo.dll`).
pub fn library_file_name(name: impl AsRef<OsStr>) -> OsString {
    libloading::library_filename(name)
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CandidateOrigin {
    Directory,
    LoaderPath,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Candidate {
    pub path: PathBuf,
    pub origin: CandidateOrigin,
}

#[derive(Clone, Debug)]
pub struct LibrarySearch {
    name: String,
    dirs: Vec<PathBuf>,
}

impl LibrarySearch {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dirs: Vec::new(),
        }
    }

    /// Empty paths are ignored; they would otherwise collapse into the bare loader-path name.
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        if !dir.as_os_str().is_empty() {
            self.dirs.push(dir);
        }
        self
    }

    /// Explicit directory first, then the running executable's directory.
    pub fn default_for_exe(name: impl Into<String>, explicit_dir: Option<PathBuf>) -> Self {
        let mut search = Self::new(name);
        if let Some(dir) = explicit_dir {
            search = search.with_dir(dir);
        }
        if let Some(dir) = exe_dir() {
            search = search.with_dir(dir);
        }
        search
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    pub fn file_name(&self) -> OsString {
        library_file_name(&self.name)
    }

    /// Concrete load attempts in order. Directory entries whose file is absent are skipped;
    /// the bare file name for the loader search path is always last.
    pub fn candidates(&self) -> Vec<Candidate> {
        let file_name = self.file_name();
        let mut candidates: Vec<Candidate> = self
            .dirs
            .iter()
            .map(|dir| dir.join(&file_name))
            .filter(|path| path.is_file())
            .map(|path| Candidate {
                path,
                origin: CandidateOrigin::Directory,
            })
            .collect();
        candidates.push(Candidate {
            path: PathBuf::from(file_name),
            origin: CandidateOrigin::LoaderPath,
        });
        candidates
    }
}

fn exe_dir() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    exe.parent().map(Path::to_path_buf)
}

/// A loaded library with its `run` entry point resolved.
pub struct BoundEntry {
    func: RunFn,
    path: PathBuf,
    _library: Library,
}

impl BoundEntry {
    pub fn bind(library: Library, path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();
        // SAFETY: `RunFn` is the declared signature of the exported entry point, and the
        // pointer is copied out only into a value that also owns `library`.
        let func = unsafe { library.get::<RunFn>(ENTRY_SYMBOL.as_bytes()) }
            .map(|symbol| *symbol)
            .map_err(|err| {
                Error::new(ErrorKind::SymbolResolve)
                    .with_message(format!("native library does not export `{ENTRY_SYMBOL}`"))
                    .with_symbol(ENTRY_SYMBOL)
                    .with_path(&path)
                    .with_source(err)
            })?;
        debug!(path = %path.display(), symbol = ENTRY_SYMBOL, "bound entry point");
        Ok(Self {
            func,
            path,
            _library: library,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EntryPoint for BoundEntry {
    fn invoke(&self) -> bool {
        // SAFETY: the library stays loaded while `self` exists; the callee takes no
        // arguments and returns a C `bool`.
        unsafe { (self.func)() }
    }
}

impl fmt::Debug for BoundEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundEntry")
            .field("path", &self.path)
            .field("symbol", &ENTRY_SYMBOL)
            .finish()
    }
}

/// Load the first candidate that the platform loader accepts and bind its entry point.
pub fn load(search: &LibrarySearch) -> Result<BoundEntry, Error> {
    let mut last_err = None;
    for candidate in search.candidates() {
        debug!(path = %candidate.path.display(), origin = ?candidate.origin, "loading candidate");
        // SAFETY: loading runs the target library's initializers.
        match unsafe { Library::new(&candidate.path) } {
            Ok(library) => return BoundEntry::bind(library, candidate.path),
            Err(err) => {
                debug!(path = %candidate.path.display(), error = %err, "candidate failed to load");
                last_err = Some(err);
            }
        }
    }

    let mut err = Error::new(ErrorKind::LibraryLoad)
        .with_message(format!("failed to load native library `{}`", search.name()))
        .with_hint(load_hint(search));
    if let Some(source) = last_err {
        err = err.with_source(source);
    }
    Err(err)
}

fn load_hint(search: &LibrarySearch) -> String {
    let file_name = search.file_name();
    let file_name = file_name.to_string_lossy();
    if search.dirs().is_empty() {
        return format!("Place {file_name} on the loader search path or pass --lib-dir.");
    }
    let dirs: Vec<String> = search
        .dirs()
        .iter()
        .map(|dir| dir.display().to_string())
        .collect();
    format!(
        "Searched {} and the loader search path for {file_name}; pass --lib-dir to point elsewhere.",
        dirs.join(", ")
    )
}
