//! Purpose: `native-smoke` CLI entry point.
//! Role: Binary crate root; parses args, runs the harness once, maps the outcome to an exit code.
//! Invariants: Success writes nothing to stdout or stderr at the default log level.
//! Invariants: Failures are emitted on stderr as text (TTY) or a single JSON line.
//! Invariants: Process exit code is derived from `to_exit_code`.
#![allow(clippy::result_large_err)]
use std::error::Error as StdError;
use std::ffi::OsString;
use std::io::{self, IsTerminal};
use std::path::PathBuf;

use clap::{Parser, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind};
use native_smoke::core::error::{Error, ErrorKind, to_exit_code};
use native_smoke::core::harness::Harness;
use native_smoke::core::library::{LIBRARY_NAME, LibrarySearch};
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

const LIB_DIR_ENV: &str = "NATIVE_SMOKE_LIB_DIR";

#[derive(Parser)]
#[command(
    name = "native-smoke",
    version,
    about = "Load the native_test library and check that its `run` entry point returns true",
    after_help = r#"EXIT STATUS
  0  run returned true
  2  usage error
  3  native library could not be loaded
  4  native library does not export `run`
  5  run returned false (Native call failed)

ENVIRONMENT
  NATIVE_SMOKE_LIB_DIR  directory probed before the executable's directory
  RUST_LOG              tracing filter (default: warn)"#
)]
struct Cli {
    #[arg(
        long,
        help = "Directory to search for the native library first",
        value_hint = ValueHint::DirPath
    )]
    lib_dir: Option<PathBuf>,
    #[arg(
        long,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics: auto|always|never"
    )]
    color: ColorMode,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

fn main() {
    let exit_code = match run(std::env::args_os()) {
        Ok(code) => code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run(args: impl IntoIterator<Item = OsString>) -> Result<i32, (Error, ColorMode)> {
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                return Ok(0);
            }
            _ => {
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(clap_error_summary(&err))
                        .with_hint("Try `native-smoke --help`."),
                    ColorMode::Auto,
                ));
            }
        },
    };

    init_tracing();

    let lib_dir = cli.lib_dir.or_else(|| {
        std::env::var_os(LIB_DIR_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
    });
    let search = LibrarySearch::default_for_exe(LIBRARY_NAME, lib_dir);

    Harness::new()
        .run_library(&search)
        .map(|()| 0)
        .map_err(|err| (err, cli.color))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(io::stderr().is_terminal())
        .with_writer(io::stderr)
        .try_init();
}

enum AnsiColor {
    Red,
    Yellow,
}

fn colorize_label(label: &str, enabled: bool, color: AnsiColor) -> String {
    if !enabled {
        return label.to_string();
    }
    let code = match color {
        AnsiColor::Red => "31",
        AnsiColor::Yellow => "33",
    };
    format!("\u{1b}[{code}m{label}\u{1b}[0m")
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    err.message()
        .map(str::to_string)
        .unwrap_or_else(|| format!("{:?}", err.kind()))
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".into(), json!(err.kind()));
    inner.insert("message".into(), json!(error_message(err)));
    let optional = [
        ("hint", err.hint().map(str::to_string)),
        ("path", err.path().map(|path| path.display().to_string())),
        ("symbol", err.symbol().map(str::to_string)),
    ];
    for (key, value) in optional {
        if let Some(value) = value {
            inner.insert(key.into(), json!(value));
        }
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".into(), json!(causes));
    }
    json!({ "error": inner })
}

fn error_text(err: &Error, use_color: bool) -> String {
    let details = [
        ("hint:", err.hint().map(str::to_string)),
        ("path:", err.path().map(|path| path.display().to_string())),
        ("symbol:", err.symbol().map(str::to_string)),
        ("caused by:", error_causes(err).into_iter().next()),
    ];
    let mut lines = vec![format!(
        "{} {}",
        colorize_label("error:", use_color, AnsiColor::Red),
        error_message(err)
    )];
    for (label, value) in details {
        if let Some(value) = value {
            lines.push(format!(
                "{} {value}",
                colorize_label(label, use_color, AnsiColor::Yellow)
            ));
        }
    }
    lines.join("\n")
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}

#[cfg(test)]
mod tests {
    use super::{ColorMode, error_json, error_text, run};
    use native_smoke::core::error::{Error, ErrorKind};
    use std::ffi::OsString;

    fn args(values: &[&str]) -> Vec<OsString> {
        values.iter().map(OsString::from).collect()
    }

    #[test]
    fn error_text_respects_color_flag() {
        let err = Error::new(ErrorKind::NativeCallFailed).with_message("Native call failed");
        let colored = error_text(&err, true);
        let plain = error_text(&err, false);
        assert!(colored.contains("\u{1b}[31merror:\u{1b}[0m"));
        assert_eq!(plain, "error: Native call failed");
        assert!(!plain.contains("\u{1b}["));
    }

    #[test]
    fn error_text_lists_symbol_path_and_cause() {
        let io = std::io::Error::other("undefined symbol: run");
        let err = Error::new(ErrorKind::SymbolResolve)
            .with_message("native library does not export `run`")
            .with_symbol("run")
            .with_path("/tmp/libnative_test.so")
            .with_source(io);
        let text = error_text(&err, false);
        assert!(text.contains("symbol: run"));
        assert!(text.contains("path: /tmp/libnative_test.so"));
        assert!(text.contains("caused by: undefined symbol: run"));
    }

    #[test]
    fn error_json_shape() {
        let err = Error::new(ErrorKind::NativeCallFailed).with_message("Native call failed");
        let value = error_json(&err);
        let inner = value
            .get("error")
            .and_then(|v| v.as_object())
            .expect("error object");
        assert_eq!(
            inner.get("kind").and_then(|v| v.as_str()),
            Some("NativeCallFailed")
        );
        assert_eq!(
            inner.get("message").and_then(|v| v.as_str()),
            Some("Native call failed")
        );
        assert!(inner.get("causes").is_none());
    }

    #[test]
    fn message_falls_back_to_kind_name() {
        let err = Error::new(ErrorKind::Internal);
        assert_eq!(error_text(&err, false), "error: Internal");
        assert_eq!(error_json(&err)["error"]["message"], "Internal");
    }

    #[test]
    fn unknown_flag_is_usage_error() {
        let (err, _) = run(args(&["native-smoke", "--bogus"])).expect_err("usage");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn color_mode_auto_follows_tty() {
        assert!(ColorMode::Auto.use_color(true));
        assert!(!ColorMode::Auto.use_color(false));
        assert!(ColorMode::Always.use_color(false));
        assert!(!ColorMode::Never.use_color(true));
    }
}
