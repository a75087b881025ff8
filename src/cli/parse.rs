use std::io::Write;

use crate::cli::{open_log, parse_record_type, to_json, wprintln};
use crate::txtlog::decode::DecodedRecord;
use crate::txtlog::log_file::DecodeOptions;
use crate::txtlog::pipeline::{filter_records, group_rows};
use crate::DjiError;

/// Options for the parse subcommand.
pub struct ParseOptions {
    pub file: String,
    /// Only emit records of this type.
    pub record_type: Option<String>,
    /// Group records into rows.
    pub rows: bool,
    pub pretty: bool,
    /// Input was already unscrambled.
    pub raw: bool,
    pub threads: usize,
    pub mmap: bool,
}

/// Decode a flight log and write it as JSON.
///
/// Without filters the whole decode report is written: every record in file
/// order (invalid frames included, flagged `"valid": false`), the per-record
/// diagnostics, truncated-tail information and the scan statistics.
///
/// `--type` narrows the output to a JSON array of the valid records of one
/// type. `--rows` writes an array of telemetry rows instead, each keyed by
/// record type name and closed by an OSD record; combined with `--type`, rows
/// are built from the filtered records only.
///
/// Malformed records never abort the command. Their raw payload is kept in
/// the output and a warning is logged on stderr.
pub fn execute(opts: &ParseOptions, writer: &mut dyn Write) -> Result<(), DjiError> {
    let filter = opts
        .record_type
        .as_deref()
        .map(parse_record_type)
        .transpose()?;

    let log = open_log(&opts.file, opts.mmap, false)?;
    let report = log.decode_with(&DecodeOptions {
        descramble: !opts.raw,
        threads: opts.threads,
    });

    let json = match (filter, opts.rows) {
        (None, false) => to_json(&report, opts.pretty)?,
        (None, true) => to_json(&group_rows(&report.records), opts.pretty)?,
        (Some(t), rows) => {
            let selected = filter_records(&report.records, t);
            if rows {
                let owned: Vec<DecodedRecord> = selected.into_iter().cloned().collect();
                to_json(&group_rows(&owned), opts.pretty)?
            } else {
                to_json(&selected, opts.pretty)?
            }
        }
    };

    wprintln!(writer, "{}", json)?;
    Ok(())
}
