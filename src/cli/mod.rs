//! CLI subcommand implementations for the `djitxt` binary.
//!
//! Argument parsing uses clap derive macros. The top-level [`app::Cli`]
//! struct and [`app::Commands`] enum live in [`app`] and are shared between
//! `main.rs` and `build.rs` (man pages, shell completions) via `include!()`.
//!
//! Each subcommand module has an `Options` struct holding the parsed
//! arguments and a `pub fn execute(opts, writer) -> Result<(), DjiError>`
//! entry point. Output goes to a `&mut dyn Write`, so tests can capture it
//! and the global `--output` flag can redirect it to a file.
//!
//! # Subcommands
//!
//! | Command | Module | Purpose |
//! |---------|--------|---------|
//! | `djitxt info` | [`info`] | Header layout, record counts, type distribution, details area |
//! | `djitxt parse` | [`parse`] | Decoded records (or telemetry rows) as JSON |
//! | `djitxt show` | [`show`] | Text view of every record of one type |
//! | `djitxt unscramble` | [`unscramble`] | Write `FILE.unscrambled` with canonical payloads |
//!
//! Diagnostics (truncated tails, malformed records) are `tracing` events on
//! stderr; `-v`/`-q` adjust how many are shown. The `wprintln!` macro wraps
//! `writeln!` to convert `io::Error` into `DjiError`.

pub mod app;
pub mod info;
pub mod parse;
pub mod show;
pub mod unscramble;

/// Write a line to the given writer, converting io::Error to DjiError.
macro_rules! wprintln {
    ($w:expr) => {
        writeln!($w).map_err(|e| $crate::DjiError::Io(e.to_string()))
    };
    ($w:expr, $($arg:tt)*) => {
        writeln!($w, $($arg)*).map_err(|e| $crate::DjiError::Io(e.to_string()))
    };
}

pub(crate) use wprintln;

use crate::txtlog::log_file::TxtLog;
use crate::txtlog::record_types::RecordType;
use crate::DjiError;

/// Open a flight log, selecting mmap or buffered I/O.
///
/// With `raw`, payloads are read as stored without applying the keystream.
/// Unscrambled copies are detected from their header either way.
pub(crate) fn open_log(path: &str, use_mmap: bool, raw: bool) -> Result<TxtLog, DjiError> {
    let mut log = if use_mmap {
        TxtLog::open_mmap(path)?
    } else {
        TxtLog::open(path)?
    };
    if raw {
        let d = log.descrambler().without_keystream();
        log.set_descrambler(d);
    }
    Ok(log)
}

/// Resolve a `--type` argument (name or numeric code).
pub(crate) fn parse_record_type(arg: &str) -> Result<RecordType, DjiError> {
    RecordType::from_name(arg).ok_or_else(|| {
        DjiError::Argument(format!(
            "Unknown record type '{}' (use a name such as OSD or a code 0-255)",
            arg
        ))
    })
}

/// Serialize `value` as JSON, compact or pretty.
pub(crate) fn to_json<T: serde::Serialize + ?Sized>(
    value: &T,
    pretty: bool,
) -> Result<String, DjiError> {
    let result = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    result.map_err(|e| DjiError::Parse(format!("JSON serialization error: {}", e)))
}
