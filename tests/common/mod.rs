// Shared helpers: build the fixture native library into a scratch directory.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;

use native_smoke::core::library::library_file_name;

#[derive(Copy, Clone, Debug)]
pub enum Fixture {
    Pass,
    Fail,
    NoEntry,
}

impl Fixture {
    fn feature(self) -> Option<&'static str> {
        match self {
            Fixture::Pass => None,
            Fixture::Fail => Some("fail"),
            Fixture::NoEntry => Some("no-entry"),
        }
    }
}

fn fixture_source() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join("native-test")
        .join("src")
        .join("lib.rs")
}

/// Compile the fixture as a cdylib called `name` into `dir`; returns the library path.
pub fn build_fixture(dir: &Path, name: &str, fixture: Fixture) -> PathBuf {
    let out = dir.join(library_file_name(name));
    let rustc = std::env::var_os("RUSTC").unwrap_or_else(|| "rustc".into());
    let mut cmd = Command::new(rustc);
    cmd.args(["--edition", "2024", "--crate-type", "cdylib", "--crate-name", name])
        .arg("-o")
        .arg(&out)
        .arg(fixture_source());
    if let Some(feature) = fixture.feature() {
        cmd.arg("--cfg").arg(format!("feature=\"{feature}\""));
    }
    let output = cmd.output().expect("spawn rustc");
    assert!(
        output.status.success(),
        "rustc failed for {fixture:?}: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(out.is_file(), "missing fixture output {}", out.display());
    out
}
