use std::io::Write;

use colored::Colorize;

use crate::cli::{open_log, parse_record_type, wprintln};
use crate::txtlog::constants::FRAME_OVERHEAD;
use crate::txtlog::decode::RecordValue;
use crate::txtlog::pipeline::process_frame;
use crate::util::hex::{format_offset, format_preview, hex_dump};
use crate::DjiError;

/// Bytes of opaque payload shown inline before eliding.
const PREVIEW_BYTES: usize = 32;

/// Options for the show subcommand.
pub struct ShowOptions {
    pub file: String,
    pub record_type: String,
    /// Append a hex dump of each canonical payload.
    pub hex: bool,
    pub raw: bool,
    pub mmap: bool,
}

/// Print every valid record of one type, one block per record.
///
/// Each block gives the record's ordinal, file offset and payload length,
/// followed by its decoded fields. Opaque payloads (raw types, JPEG) show a
/// short hex preview, and `--hex` adds a full dump of the descrambled
/// payload addressed by file offset.
pub fn execute(opts: &ShowOptions, writer: &mut dyn Write) -> Result<(), DjiError> {
    let wanted = parse_record_type(&opts.record_type)?;
    let log = open_log(&opts.file, opts.mmap, opts.raw)?;
    let descrambler = log.descrambler();

    let mut count = 0u64;
    let mut malformed = 0u64;
    for frame in log.frames() {
        if !frame.is_valid() || frame.kind() != wanted {
            continue;
        }
        count += 1;
        let (rec, diag) = process_frame(&frame, descrambler);

        wprintln!(
            writer,
            "{} {} at {} ({} bytes)",
            format!("#{}", count).bold(),
            rec.record_type,
            format_offset(rec.offset),
            frame.length
        )?;
        if let Some(d) = diag {
            malformed += 1;
            wprintln!(writer, "  {}", d.message.yellow())?;
        }
        print_value(writer, &rec.value)?;

        if opts.hex {
            let payload = descrambler.descramble(frame.record_type, frame.payload);
            if !payload.is_empty() {
                wprintln!(writer, "{}", hex_dump(&payload, frame.offset + FRAME_OVERHEAD))?;
            }
        }
        wprintln!(writer)?;
    }

    let summary = format!("{} {} record(s)", count, wanted);
    if malformed > 0 {
        wprintln!(writer, "{}, {}", summary, format!("{} malformed", malformed).yellow())?;
    } else {
        wprintln!(writer, "{}", summary)?;
    }
    Ok(())
}

fn print_value(writer: &mut dyn Write, value: &RecordValue) -> Result<(), DjiError> {
    match value {
        RecordValue::Text(s) => wprintln!(writer, "  text: {:?}", s),
        RecordValue::Raw(bytes) => {
            wprintln!(writer, "  raw: {}", format_preview(&bytes.0, PREVIEW_BYTES))
        }
        RecordValue::Jpeg(bytes) => {
            wprintln!(writer, "  jpeg: {}", format_preview(&bytes.0, PREVIEW_BYTES))
        }
        structured => {
            let json = serde_json::to_value(structured)
                .map_err(|e| DjiError::Parse(format!("JSON serialization error: {}", e)))?;
            if let serde_json::Value::Object(fields) = json {
                for (name, v) in fields {
                    wprintln!(writer, "  {:28} {}", format!("{}:", name), v)?;
                }
            }
            Ok(())
        }
    }
}
