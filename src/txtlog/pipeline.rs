//! Scan, descramble and decode a record area in one pass.
//!
//! [`decode_area`] drives a [`RecordScanner`] over the record area, feeds
//! every frame to a [`StatsAccumulator`], and runs valid frames through the
//! [`Descrambler`] and [`decode_record`]. Per-record failures are collected
//! as [`RecordDiagnostic`]s next to the decoded records; the scan itself
//! never fails.
//!
//! With the `cli` feature, [`decode_area_parallel`] keeps the scan
//! sequential (frame boundaries depend on the cursor) and fans the decode
//! step out over a rayon pool, preserving file order.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::txtlog::decode::{decode_record, DecodedRecord, RecordValue};
use crate::txtlog::header::{mark_unscrambled, FileHeader};
use crate::txtlog::record_types::RecordType;
use crate::txtlog::scanner::{RawRecordFrame, RecordScanner, TruncatedTail};
use crate::txtlog::scramble::Descrambler;
use crate::txtlog::stats::{ScanStats, StatsAccumulator};
use crate::DjiError;

/// A record that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordDiagnostic {
    pub offset: usize,
    pub record_type: RecordType,
    pub message: String,
}

impl RecordDiagnostic {
    fn from_error(frame: &RawRecordFrame<'_>, err: &DjiError) -> Self {
        RecordDiagnostic {
            offset: frame.offset,
            record_type: frame.kind(),
            message: err.to_string(),
        }
    }
}

/// Result of decoding one record area.
#[derive(Debug, Clone, Serialize)]
pub struct DecodeReport {
    /// One record per scanned frame, in file order.
    pub records: Vec<DecodedRecord>,
    /// Valid records whose payload did not fit their layout. Each such
    /// record is still present in `records`, holding its raw payload.
    pub diagnostics: Vec<RecordDiagnostic>,
    /// Set when the scan stopped on a frame running past the area.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncated_tail: Option<TruncatedTail>,
    /// Record-area bytes not covered by any frame.
    pub unconsumed_bytes: usize,
    pub stats: ScanStats,
}

impl DecodeReport {
    /// Records whose marker byte was correct.
    pub fn valid_records(&self) -> impl Iterator<Item = &DecodedRecord> {
        self.records.iter().filter(|r| r.valid)
    }
}

/// Turn one frame into exactly one record, plus a diagnostic if its
/// payload was malformed.
///
/// Valid frames are descrambled and their key byte dropped before decoding.
/// Invalid frames keep their stored payload. Malformed valid frames keep
/// their record body as raw bytes.
pub fn process_frame(
    frame: &RawRecordFrame<'_>,
    descrambler: &Descrambler,
) -> (DecodedRecord, Option<RecordDiagnostic>) {
    if !frame.is_valid() {
        return (
            DecodedRecord::raw(frame.offset, frame.record_type, frame.payload, false),
            None,
        );
    }

    let payload = descrambler.descramble(frame.record_type, frame.payload);
    let body = descrambler.record_body(frame.record_type, &payload);
    match decode_record(frame.record_type, body, frame.offset) {
        Ok(rec) => (rec, None),
        Err(e) => {
            warn!(offset = frame.offset, "{}", e);
            (
                DecodedRecord::raw(frame.offset, frame.record_type, body, true),
                Some(RecordDiagnostic::from_error(frame, &e)),
            )
        }
    }
}

fn scanner_for<'a>(data: &'a [u8], header: &FileHeader) -> RecordScanner<'a> {
    let area = header.record_area();
    RecordScanner::new(&data[area.clone()], area.start)
}

fn finish_report(
    results: impl IntoIterator<Item = (DecodedRecord, Option<RecordDiagnostic>)>,
    scanner: &RecordScanner<'_>,
    stats: StatsAccumulator,
) -> DecodeReport {
    let mut records = Vec::new();
    let mut diagnostics = Vec::new();
    for (rec, diag) in results {
        records.push(rec);
        diagnostics.extend(diag);
    }

    let report = DecodeReport {
        records,
        diagnostics,
        truncated_tail: scanner.truncated_tail(),
        unconsumed_bytes: scanner.unconsumed_bytes(),
        stats: stats.finalize(),
    };
    debug!(
        records = report.records.len(),
        malformed = report.diagnostics.len(),
        invalid = report.stats.invalid_record_count,
        unconsumed = report.unconsumed_bytes,
        "record area decoded"
    );
    report
}

/// Decode the record area of `data` sequentially.
///
/// `data` is the whole file; `header` must have been parsed from it.
pub fn decode_area(data: &[u8], header: &FileHeader, descrambler: &Descrambler) -> DecodeReport {
    let mut scanner = scanner_for(data, header);
    let mut stats = StatsAccumulator::new(header.record_area_size, header.format_version);
    let mut results = Vec::new();

    for frame in scanner.by_ref() {
        stats.observe(&frame);
        results.push(process_frame(&frame, descrambler));
    }

    finish_report(results, &scanner, stats)
}

/// Decode the record area, running the per-record decode on the rayon pool.
///
/// Produces the same report as [`decode_area`].
#[cfg(feature = "cli")]
pub fn decode_area_parallel(
    data: &[u8],
    header: &FileHeader,
    descrambler: &Descrambler,
) -> DecodeReport {
    use rayon::prelude::*;

    let mut scanner = scanner_for(data, header);
    let mut stats = StatsAccumulator::new(header.record_area_size, header.format_version);
    let mut frames = Vec::new();
    for frame in scanner.by_ref() {
        stats.observe(&frame);
        frames.push(frame);
    }

    let results: Vec<_> = frames
        .par_iter()
        .map(|frame| process_frame(frame, descrambler))
        .collect();

    finish_report(results, &scanner, stats)
}

/// Count frames without decoding them.
pub fn scan_stats(data: &[u8], header: &FileHeader) -> ScanStats {
    let mut stats = StatsAccumulator::new(header.record_area_size, header.format_version);
    for frame in scanner_for(data, header) {
        stats.observe(&frame);
    }
    stats.finalize()
}

/// Valid records of a single type, in file order.
pub fn filter_records(records: &[DecodedRecord], record_type: RecordType) -> Vec<&DecodedRecord> {
    records
        .iter()
        .filter(|r| r.valid && r.record_type == record_type)
        .collect()
}

/// One telemetry sample: the latest record of each type, keyed by type name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RecordRow {
    pub fields: BTreeMap<String, RecordValue>,
}

impl RecordRow {
    pub fn get(&self, record_type: RecordType) -> Option<&RecordValue> {
        self.fields.get(&record_type.to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Group records into rows. Each OSD record closes the current row.
///
/// Within a row, a later record of the same type replaces an earlier one.
/// Records after the last OSD form a final, partial row. Invalid records
/// are left out.
pub fn group_rows(records: &[DecodedRecord]) -> Vec<RecordRow> {
    let mut rows = Vec::new();
    let mut row = RecordRow::default();
    for rec in records.iter().filter(|r| r.valid) {
        row.fields
            .insert(rec.record_type.to_string(), rec.value.clone());
        if rec.record_type == RecordType::Osd {
            rows.push(std::mem::take(&mut row));
        }
    }
    if !row.is_empty() {
        rows.push(row);
    }
    rows
}

/// Copy of the container with every scrambled payload replaced by its
/// canonical form.
///
/// Framing is untouched: the output has the same length, the same frame
/// prologues, key bytes, trailing bytes and details area as the input.
/// Invalid-marker frames are copied as stored. When anything was
/// descrambled, the header gets the unscrambled-copy tag so that
/// [`Descrambler::for_header`] reads the copy without a keystream.
pub fn rewrite_unscrambled(data: &[u8], header: &FileHeader, descrambler: &Descrambler) -> Vec<u8> {
    let mut out = data.to_vec();
    if !descrambler.is_enabled() {
        return out;
    }
    mark_unscrambled(&mut out);
    let mut rewritten = 0u64;
    for frame in scanner_for(data, header) {
        if !frame.is_valid() {
            continue;
        }
        let start = frame.offset + frame.frame_len() - frame.payload.len();
        let payload = &mut out[start..start + frame.payload.len()];
        if descrambler.descramble_in_place(frame.record_type, payload) {
            rewritten += 1;
        }
    }
    debug!(rewritten, "payloads descrambled for rewrite");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::txtlog::decode::{RawBytes, OSD_LEN};
    use crate::txtlog::scramble::scramble;
    use byteorder::{ByteOrder, LittleEndian};

    fn build_log(version: u8, frames: &[(u8, u8, Vec<u8>)], tail: &[u8], details: &[u8]) -> Vec<u8> {
        let mut area = Vec::new();
        for (marker, t, payload) in frames {
            area.push(*marker);
            area.push(*t);
            area.push(payload.len() as u8);
            area.extend_from_slice(payload);
        }
        area.extend_from_slice(tail);

        let mut data = vec![0u8; 100];
        LittleEndian::write_u32(&mut data[0..], (100 + area.len()) as u32);
        data[8] = version;
        data.extend(area);
        data.extend_from_slice(details);
        data
    }

    #[test]
    fn test_decode_single_valid_frame() {
        let data = build_log(1, &[(0xFF, 1, vec![1, 2, 3, 4])], &[], &[]);
        let header = FileHeader::parse(&data).unwrap();
        let report = decode_area(&data, &header, &Descrambler::for_header(&header));
        assert_eq!(report.records.len(), 1);
        let rec = &report.records[0];
        assert!(rec.valid);
        assert_eq!(rec.record_type, RecordType::Osd);
        assert_eq!(rec.offset, 100);
        assert_eq!(report.stats.record_count, 1);
        assert_eq!(report.stats.invalid_record_count, 0);
        assert!(report.truncated_tail.is_none());

        // Too short for the OSD layout: kept raw, with a diagnostic
        assert_eq!(rec.value, RecordValue::Raw(RawBytes(vec![1, 2, 3, 4])));
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].offset, 100);
    }

    #[test]
    fn test_decode_scrambled_osd() {
        let mut plain = vec![0u8; OSD_LEN + 1];
        plain[0] = 0x33;
        plain[1 + 36] = 11;
        let stored = scramble(1, &plain);
        let data = build_log(12, &[(0xFF, 1, stored)], &[], b"details");
        let header = FileHeader::parse(&data).unwrap();
        let report = decode_area(&data, &header, &Descrambler::for_header(&header));
        assert_eq!(report.records.len(), 1);
        let RecordValue::Osd(osd) = &report.records[0].value else {
            panic!("expected OSD value");
        };
        assert_eq!(osd.gps_num, 11);
    }

    #[test]
    fn test_scrambled_warning_has_no_key_byte() {
        let stored = scramble(10, b"ZMotor overload");
        let data = build_log(12, &[(0xFF, 10, stored)], &[], &[]);
        let header = FileHeader::parse(&data).unwrap();
        let report = decode_area(&data, &header, &Descrambler::for_header(&header));
        assert_eq!(
            report.records[0].value,
            RecordValue::Text("Motor overload".to_string())
        );
    }

    #[test]
    fn test_malformed_scrambled_keeps_body() {
        let stored = scramble(3, &[0x44, 1, 2, 3]);
        let data = build_log(12, &[(0xFF, 3, stored)], &[], &[]);
        let header = FileHeader::parse(&data).unwrap();
        let report = decode_area(&data, &header, &Descrambler::for_header(&header));
        assert_eq!(report.records[0].value, RecordValue::Raw(RawBytes(vec![1, 2, 3])));
        assert_eq!(report.diagnostics.len(), 1);
    }

    #[test]
    fn test_invalid_frames_not_decoded() {
        let data = build_log(
            1,
            &[(0x00, 9, b"hidden".to_vec()), (0xFF, 9, b"shown".to_vec())],
            &[],
            &[],
        );
        let header = FileHeader::parse(&data).unwrap();
        let report = decode_area(&data, &header, &Descrambler::disabled());
        assert_eq!(report.records.len(), 2);
        assert!(!report.records[0].valid);
        assert_eq!(
            report.records[0].value,
            RecordValue::Raw(RawBytes(b"hidden".to_vec()))
        );
        let valid: Vec<_> = report.valid_records().collect();
        assert_eq!(valid.len(), 1);
        assert_eq!(valid[0].value, RecordValue::Text("shown".to_string()));
        assert_eq!(report.stats.invalid_record_count, 1);
        assert_eq!(report.stats.type_count.get(&9), Some(&1));
        assert!(report.diagnostics.is_empty());
    }

    #[test]
    fn test_truncated_tail_reported() {
        let data = build_log(1, &[(0xFF, 9, b"ok".to_vec())], &[0xFF, 1, 4, 0xAA, 0xBB], &[]);
        let header = FileHeader::parse(&data).unwrap();
        let report = decode_area(&data, &header, &Descrambler::disabled());
        assert_eq!(report.records.len(), 1);
        assert!(report.diagnostics.is_empty());
        let tail = report.truncated_tail.unwrap();
        assert_eq!(tail.declared_length, 4);
        assert_eq!(tail.available, 2);
        assert_eq!(report.unconsumed_bytes, 5);
    }

    #[test]
    fn test_scan_stats_matches_report() {
        let data = build_log(
            7,
            &[(0xFF, 9, b"a".to_vec()), (0x10, 2, vec![]), (0xFF, 57, vec![1, 2])],
            &[0xFF],
            &[],
        );
        let header = FileHeader::parse(&data).unwrap();
        let report = decode_area(&data, &header, &Descrambler::for_header(&header));
        assert_eq!(scan_stats(&data, &header), report.stats);
    }

    #[test]
    fn test_group_rows_closes_on_osd() {
        let rec = |t: RecordType, v: RecordValue| DecodedRecord {
            offset: 0,
            record_type: t,
            valid: true,
            value: v,
        };
        let osd = match decode_record(1, &[0u8; OSD_LEN], 0).unwrap().value {
            v @ RecordValue::Osd(_) => v,
            _ => unreachable!(),
        };
        let records = vec![
            rec(RecordType::AppTip, RecordValue::Text("a".into())),
            rec(RecordType::AppTip, RecordValue::Text("b".into())),
            rec(RecordType::Osd, osd.clone()),
            rec(RecordType::AppWarn, RecordValue::Text("c".into())),
            DecodedRecord::raw(0, 1, &[0; 3], false),
        ];
        let rows = group_rows(&records);
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0].get(RecordType::AppTip),
            Some(&RecordValue::Text("b".into()))
        );
        assert_eq!(rows[0].get(RecordType::Osd), Some(&osd));
        assert!(rows[1].get(RecordType::Osd).is_none());
    }

    #[test]
    fn test_filter_records() {
        let data = build_log(
            1,
            &[
                (0xFF, 9, b"x".to_vec()),
                (0xFF, 10, b"y".to_vec()),
                (0xFF, 9, b"z".to_vec()),
            ],
            &[],
            &[],
        );
        let header = FileHeader::parse(&data).unwrap();
        let report = decode_area(&data, &header, &Descrambler::disabled());
        let tips = filter_records(&report.records, RecordType::AppTip);
        assert_eq!(tips.len(), 2);
        assert!(filter_records(&report.records, RecordType::Gimbal).is_empty());
    }

    #[test]
    fn test_rewrite_unscrambled_preserves_framing() {
        let plain_tip = b"\x07Return home".to_vec();
        let jpeg = vec![0xFF, 0xD8, 0xFF, 0xE0];
        let data = build_log(
            12,
            &[
                (0xFF, 9, scramble(9, &plain_tip)),
                (0x00, 9, vec![1, 2, 3]),
                (0xFF, 57, jpeg.clone()),
            ],
            &[0xFF, 1],
            b"DETAILS",
        );
        let header = FileHeader::parse(&data).unwrap();
        let out = rewrite_unscrambled(&data, &header, &Descrambler::for_header(&header));

        assert_eq!(out.len(), data.len());
        assert_eq!(&out[..9], &data[..9]);
        assert_eq!(&out[13..100], &data[13..100]);
        assert_eq!(&out[103..103 + plain_tip.len()], plain_tip.as_slice());
        assert!(out.ends_with(b"\xFF\x01DETAILS"));

        // The tagged copy reads back to the same records with its own header
        let copy_header = FileHeader::parse(&out).unwrap();
        assert!(copy_header.unscrambled_copy);
        let again = decode_area(&out, &copy_header, &Descrambler::for_header(&copy_header));
        let original = decode_area(&data, &header, &Descrambler::for_header(&header));
        assert_eq!(again.records, original.records);
        assert_eq!(
            again.records[0].value,
            RecordValue::Text("Return home".to_string())
        );
    }

    #[test]
    fn test_rewrite_of_unscrambled_era_is_verbatim() {
        let data = build_log(4, &[(0xFF, 9, b"Takeoff".to_vec())], &[], b"D");
        let header = FileHeader::parse(&data).unwrap();
        let out = rewrite_unscrambled(&data, &header, &Descrambler::for_header(&header));
        assert_eq!(out, data);
    }

    #[cfg(feature = "cli")]
    #[test]
    fn test_parallel_matches_sequential() {
        let mut frames = Vec::new();
        for i in 0..200u8 {
            let marker = if i % 13 == 0 { 0 } else { 0xFF };
            let t = [1u8, 3, 9, 57, 130][i as usize % 5];
            let payload: Vec<u8> = (0..(i % 60)).collect();
            frames.push((marker, t, scramble(t, &payload)));
        }
        let data = build_log(13, &frames, &[0xFF, 2, 40], &[]);
        let header = FileHeader::parse(&data).unwrap();
        let d = Descrambler::for_header(&header);
        let seq = decode_area(&data, &header, &d);
        let par = decode_area_parallel(&data, &header, &d);
        assert_eq!(seq.records, par.records);
        assert_eq!(seq.diagnostics, par.diagnostics);
        assert_eq!(seq.stats, par.stats);
        assert_eq!(seq.truncated_tail, par.truncated_tail);
    }
}
