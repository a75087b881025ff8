//! DJI TXT flight log binary format parsing.
//!
//! A log is a 100-byte header ([`header`]), a record area of framed records
//! ([`scanner`]), and a details area. Record payloads are descrambled
//! ([`scramble`]) and decoded by type ([`decode`]); [`pipeline`] composes
//! these steps with statistics collection ([`stats`]).
//!
//! Start with [`log_file::TxtLog`] to open a log file.

pub mod constants;
pub mod decode;
pub mod header;
pub mod log_file;
pub mod pipeline;
pub mod record_types;
pub mod scanner;
pub mod scramble;
pub mod stats;
