//! DJI flight log (TXT) decoding toolkit.
//!
//! The `djitxt-utils` crate (library name `djitxt`) decodes the binary flight
//! log container written by DJI drone controller apps: a fixed 100-byte
//! header, a stream of variable-length framed telemetry records (many of
//! them scrambled on disk), and a trailing details area.
//!
//! # CLI Reference
//!
//! ## Installation
//!
//! ```text
//! cargo install djitxt-utils
//! ```
//!
//! ## Subcommands
//!
//! | Command | Purpose |
//! |---------|---------|
//! | [`djitxt info`](cli::app::Commands::Info) | Header layout, record statistics, type distribution, details area |
//! | [`djitxt parse`](cli::app::Commands::Parse) | Decode all records to JSON (flat list or rows) |
//! | [`djitxt show`](cli::app::Commands::Show) | Show every record of a single type |
//! | [`djitxt unscramble`](cli::app::Commands::Unscramble) | Write a descrambled copy of the container |
//!
//! ## Global options
//!
//! All subcommands accept `--color <auto|always|never>`, `--output <file>`,
//! `-v`/`-q` for log verbosity, `--threads` and `--mmap`.
//!
//! # Library API
//!
//! ```no_run
//! use djitxt::txtlog::log_file::TxtLog;
//!
//! let log = TxtLog::open("DJIFlightRecord_2024-05-01_[10-11-12].txt").unwrap();
//! println!("Format version: {}", log.header().format_version);
//!
//! let report = log.decode();
//! println!("{} records, {} malformed", report.records.len(), report.diagnostics.len());
//! ```
//!
//! ## Key entry points
//!
//! | Type / Function | Purpose |
//! |-----------------|---------|
//! | [`TxtLog`](txtlog::log_file::TxtLog) | Open a log file or buffer, scan, decode, rewrite |
//! | [`FileHeader`](txtlog::header::FileHeader) | Parse the 100-byte file header |
//! | [`RecordScanner`](txtlog::scanner::RecordScanner) | Lazy, restartable frame iterator |
//! | [`Descrambler`](txtlog::scramble::Descrambler) | Reverse the per-record payload scrambling |
//! | [`decode_record`](txtlog::decode::decode_record) | Typed decoding of one canonical payload |
//! | [`StatsAccumulator`](txtlog::stats::StatsAccumulator) | Record counts and type histogram |
//!
//! ## Feature flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli` | on | The `djitxt` binary, parallel decoding (`rayon`), mmap I/O. |

#[cfg(feature = "cli")]
pub mod cli;
pub mod txtlog;
pub mod util;

use thiserror::Error;

/// Errors returned by `djitxt` operations.
#[derive(Error, Debug)]
pub enum DjiError {
    /// An I/O error occurred (file open, read, or write failure).
    #[error("I/O error: {0}")]
    Io(String),

    /// A parse error occurred (malformed binary data or unexpected values).
    #[error("Parse error: {0}")]
    Parse(String),

    /// An invalid argument was supplied (unknown record type name, bad option, etc.).
    #[error("Invalid argument: {0}")]
    Argument(String),

    /// The buffer is shorter than the fixed file header.
    #[error("Truncated header: need 100 bytes, got {len}")]
    TruncatedHeader { len: usize },

    /// The header is present but its area sizes are inconsistent.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// A record payload is too short for its type's fixed layout.
    #[error(
        "Malformed {record_type} record at offset {offset}: expected at least {expected} bytes, got {actual}"
    )]
    MalformedRecord {
        record_type: String,
        offset: usize,
        expected: usize,
        actual: usize,
    },
}
