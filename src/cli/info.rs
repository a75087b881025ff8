use std::io::Write;

use colored::Colorize;
use serde::Serialize;

use crate::cli::{open_log, to_json, wprintln};
use crate::txtlog::header::FileHeader;
use crate::txtlog::log_file::TxtLog;
use crate::txtlog::scanner::TruncatedTail;
use crate::txtlog::stats::{ScanStats, StatsAccumulator};
use crate::util::hex::{format_bytes, format_offset, hex_dump};
use crate::DjiError;

/// Options for the `djitxt info` subcommand.
pub struct InfoOptions {
    /// Path to the flight log.
    pub file: String,
    /// Show the header section.
    pub header: bool,
    /// Show record counts.
    pub records: bool,
    /// Show the type distribution.
    pub distribution: bool,
    /// Show a hex dump of the details area.
    pub details: bool,
    /// Emit output as JSON.
    pub json: bool,
    /// Memory-map the input.
    pub mmap: bool,
}

impl InfoOptions {
    /// No section flag means every section.
    fn all(&self) -> bool {
        !(self.header || self.records || self.distribution || self.details)
    }
}

#[derive(Serialize)]
struct DistributionEntry {
    record_type: String,
    code: u8,
    count: u64,
}

#[derive(Serialize)]
struct DetailsJson {
    offset: usize,
    size: usize,
    hex: String,
}

#[derive(Serialize)]
struct InfoJson<'a> {
    file: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    header: Option<&'a FileHeader>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scrambled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<&'a ScanStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    truncated_tail: Option<TruncatedTail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    unconsumed_bytes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    distribution: Option<Vec<DistributionEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<DetailsJson>,
}

/// Scan results the report sections draw from.
struct ScanSummary {
    stats: ScanStats,
    truncated_tail: Option<TruncatedTail>,
    unconsumed_bytes: usize,
}

fn scan(log: &TxtLog) -> ScanSummary {
    let header = log.header();
    let mut acc = StatsAccumulator::new(header.record_area_size, header.format_version);
    let mut frames = log.frames();
    for frame in frames.by_ref() {
        acc.observe(&frame);
    }
    ScanSummary {
        stats: acc.finalize(),
        truncated_tail: frames.truncated_tail(),
        unconsumed_bytes: frames.unconsumed_bytes(),
    }
}

/// Summarize a flight log without decoding its payloads.
///
/// Four sections are available, each selected by its own flag (all of them
/// are shown when none is given):
///
/// - **Header**: file size, the 100-byte header, record and details area
///   extents, format version, and whether payloads are scrambled.
/// - **Records**: total, valid and invalid frame counts, any truncated
///   trailing frame and the number of record-area bytes left unconsumed.
/// - **Distribution**: per-type counts, most frequent first, with percentages
///   of the valid records.
/// - **Details**: the bytes after the record area, as a hex dump addressed by
///   file offset.
///
/// With `--json`, the same sections are emitted as one JSON object.
pub fn execute(opts: &InfoOptions, writer: &mut dyn Write) -> Result<(), DjiError> {
    let log = open_log(&opts.file, opts.mmap, false)?;
    let summary = scan(&log);

    if opts.json {
        return execute_json(opts, &log, &summary, writer);
    }

    wprintln!(writer, "{}", format!("Flight log: {}", opts.file).bold())?;

    if opts.all() || opts.header {
        wprintln!(writer)?;
        print_header(writer, &log)?;
    }
    if opts.all() || opts.records {
        wprintln!(writer)?;
        print_records(writer, &summary)?;
    }
    if opts.all() || opts.distribution {
        wprintln!(writer)?;
        print_distribution(writer, &summary.stats)?;
    }
    if opts.all() || opts.details {
        wprintln!(writer)?;
        print_details(writer, &log)?;
    }

    Ok(())
}

fn execute_json(
    opts: &InfoOptions,
    log: &TxtLog,
    summary: &ScanSummary,
    writer: &mut dyn Write,
) -> Result<(), DjiError> {
    let show_header = opts.all() || opts.header;
    let show_records = opts.all() || opts.records;
    let show_dist = opts.all() || opts.distribution;
    let show_details = opts.all() || opts.details;

    let info = InfoJson {
        file: &opts.file,
        header: show_header.then(|| log.header()),
        scrambled: show_header.then(|| log.descrambler().is_enabled()),
        stats: show_records.then_some(&summary.stats),
        truncated_tail: if show_records {
            summary.truncated_tail
        } else {
            None
        },
        unconsumed_bytes: show_records.then_some(summary.unconsumed_bytes),
        distribution: show_dist.then(|| {
            summary
                .stats
                .distribution()
                .into_iter()
                .map(|(t, count)| DistributionEntry {
                    record_type: t.to_string(),
                    code: t.as_u8(),
                    count,
                })
                .collect()
        }),
        details: show_details.then(|| DetailsJson {
            offset: log.header().details_area().start,
            size: log.details_area().len(),
            hex: format_bytes(log.details_area()),
        }),
    };

    wprintln!(writer, "{}", to_json(&info, true)?)?;
    Ok(())
}

fn print_header(writer: &mut dyn Write, log: &TxtLog) -> Result<(), DjiError> {
    let h = log.header();
    let records = h.record_area();
    let details = h.details_area();

    wprintln!(writer, "{}", "File Header".bold())?;
    wprintln!(writer, "  File Size:      {} bytes", h.total_file_size)?;
    wprintln!(writer, "  Header Size:    {} bytes", h.header_size)?;
    wprintln!(
        writer,
        "  Record Area:    {} bytes at {}",
        h.record_area_size,
        format_offset(records.start)
    )?;
    wprintln!(
        writer,
        "  Details Area:   {} bytes at {}",
        h.details_area_size,
        format_offset(details.start)
    )?;
    wprintln!(writer, "  Format Version: {}", h.format_version)?;
    wprintln!(
        writer,
        "  Scrambled:      {}",
        if log.descrambler().is_enabled() {
            "yes"
        } else if h.unscrambled_copy {
            "no (unscrambled copy)"
        } else {
            "no"
        }
    )?;
    if h.is_clamped() {
        wprintln!(
            writer,
            "  {}",
            format!(
                "Header declares records up to byte {}, file ends at {}",
                h.header_record_size, h.total_file_size
            )
            .yellow()
        )?;
    }
    Ok(())
}

fn print_records(writer: &mut dyn Write, summary: &ScanSummary) -> Result<(), DjiError> {
    let stats = &summary.stats;

    wprintln!(writer, "{}", "Records".bold())?;
    wprintln!(writer, "  Total:          {}", stats.record_count)?;
    wprintln!(writer, "  Valid:          {}", stats.valid_record_count())?;
    if stats.invalid_record_count > 0 {
        wprintln!(
            writer,
            "  Invalid:        {}",
            stats.invalid_record_count.to_string().yellow()
        )?;
    } else {
        wprintln!(writer, "  Invalid:        0")?;
    }

    match &summary.truncated_tail {
        Some(tail) => wprintln!(
            writer,
            "  Truncated:      {}",
            format!(
                "frame at {} declares {} bytes, {} available",
                format_offset(tail.offset),
                tail.declared_length,
                tail.available
            )
            .red()
        )?,
        None if summary.unconsumed_bytes > 0 => wprintln!(
            writer,
            "  Trailing:       {} bytes too short for a frame",
            summary.unconsumed_bytes
        )?,
        None => wprintln!(writer, "  Area Status:    {}", "complete".green())?,
    }
    Ok(())
}

fn print_distribution(writer: &mut dyn Write, stats: &ScanStats) -> Result<(), DjiError> {
    wprintln!(writer, "{}", "Record Type Distribution".bold())?;

    let dist = stats.distribution();
    if dist.is_empty() {
        wprintln!(writer, "  (no valid records)")?;
        return Ok(());
    }

    let total = stats.valid_record_count() as f64;
    for (t, count) in dist {
        let pct = count as f64 * 100.0 / total;
        let name = if t.is_known() {
            t.to_string()
        } else {
            t.to_string().dimmed().to_string()
        };
        wprintln!(writer, "  {:3}  {:20} {:>8}  {:5.1}%", t.as_u8(), name, count, pct)?;
    }
    Ok(())
}

fn print_details(writer: &mut dyn Write, log: &TxtLog) -> Result<(), DjiError> {
    let details = log.details_area();
    let start = log.header().details_area().start;

    wprintln!(writer, "{}", "Details Area".bold())?;
    if details.is_empty() {
        wprintln!(writer, "  (empty)")?;
        return Ok(());
    }
    wprintln!(writer, "  {} bytes at {}", details.len(), format_offset(start))?;
    for line in hex_dump(details, start).lines() {
        wprintln!(writer, "  {}", line)?;
    }
    Ok(())
}
