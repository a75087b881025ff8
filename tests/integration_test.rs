//! Integration tests for djitxt-utils.
//!
//! These tests construct synthetic flight logs (header, framed records,
//! details area) and run the full scan/descramble/decode pipeline on them.

use byteorder::{ByteOrder, LittleEndian};
use std::io::Write;
use tempfile::NamedTempFile;

use djitxt::txtlog::constants::*;
use djitxt::txtlog::decode::{RecordValue, GIMBAL_LEN, OSD_LEN};
use djitxt::txtlog::header::FileHeader;
use djitxt::txtlog::log_file::{DecodeOptions, TxtLog};
use djitxt::txtlog::pipeline::{filter_records, group_rows};
use djitxt::txtlog::record_types::{RecordType, KNOWN_RECORD_TYPES};
use djitxt::txtlog::scanner::RecordScanner;
use djitxt::txtlog::scramble::{scramble, Descrambler};
use djitxt::DjiError;

/// One frame: marker, type code, payload as stored.
struct Frame {
    marker: u8,
    record_type: u8,
    payload: Vec<u8>,
}

fn valid(record_type: u8, payload: &[u8]) -> Frame {
    Frame {
        marker: RECORD_MARKER,
        record_type,
        payload: payload.to_vec(),
    }
}

/// Same as [`valid`], scrambled the way a version >= 6 log stores it.
fn scrambled(record_type: u8, plain: &[u8]) -> Frame {
    valid(record_type, &scramble(record_type, plain))
}

/// Build a log: header, frames, `tail` bytes, details area.
fn build_log(version: u8, frames: &[Frame], tail: &[u8], details: &[u8]) -> Vec<u8> {
    let mut area = Vec::new();
    for f in frames {
        area.push(f.marker);
        area.push(f.record_type);
        area.push(f.payload.len() as u8);
        area.extend_from_slice(&f.payload);
    }
    area.extend_from_slice(tail);

    let mut data = vec![0u8; SIZE_FILE_HEADER];
    LittleEndian::write_u32(
        &mut data[HDR_HEADER_RECORD_SIZE_LO..],
        (SIZE_FILE_HEADER + area.len()) as u32,
    );
    data[HDR_FILE_VERSION] = version;
    data.extend(area);
    data.extend_from_slice(details);
    data
}

fn write_log(data: &[u8]) -> NamedTempFile {
    let mut tmp = NamedTempFile::new().unwrap();
    tmp.write_all(data).unwrap();
    tmp.flush().unwrap();
    tmp
}

/// OSD payload as a version >= 6 log holds it: key byte, then the fields.
fn osd_payload(gps_num: u8) -> Vec<u8> {
    let mut p = vec![0u8; 1 + OSD_LEN];
    p[0] = 0x5C;
    let f = &mut p[1..];
    // longitude/latitude in radians
    LittleEndian::write_f64(&mut f[0..], 0.5_f64.to_radians());
    LittleEndian::write_f64(&mut f[8..], 45.0_f64.to_radians());
    LittleEndian::write_i16(&mut f[16..], 1234); // 123.4 m
    f[36] = gps_num;
    p
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

#[test]
fn test_header_only_file_has_no_records() {
    let data = build_log(12, &[], &[], &[]);
    assert_eq!(data.len(), 100);

    let log = TxtLog::from_bytes(data).unwrap();
    assert_eq!(log.header().record_area_size, 0);
    assert_eq!(log.header().details_area_size, 0);
    assert_eq!(log.frames().count(), 0);

    let report = log.decode();
    assert!(report.records.is_empty());
    assert_eq!(report.stats.record_count, 0);
}

#[test]
fn test_header_area_sizes_sum_to_file_size() {
    for (area_len, details_len) in [(0usize, 0usize), (3, 0), (0, 17), (250, 1000)] {
        let frames: Vec<Frame> = (0..area_len / 3)
            .map(|_| valid(RecordType::Recover.as_u8(), &[]))
            .collect();
        let data = build_log(3, &frames, &vec![0; area_len % 3], &vec![0xEE; details_len]);
        let h = FileHeader::parse(&data).unwrap();
        assert_eq!(
            h.header_size + h.record_area_size + h.details_area_size,
            h.total_file_size
        );
        assert_eq!(h.details_area_size as usize, details_len);
    }
}

#[test]
fn test_truncated_header_fails_open() {
    let tmp = write_log(&[0xFF; 99]);
    match TxtLog::open(tmp.path()) {
        Err(DjiError::TruncatedHeader { len }) => assert_eq!(len, 99),
        other => panic!("expected TruncatedHeader, got {:?}", other),
    }
}

#[test]
fn test_size_field_below_header_is_invalid() {
    let mut data = build_log(12, &[], &[], b"details");
    LittleEndian::write_u32(&mut data[HDR_HEADER_RECORD_SIZE_LO..], 64);
    assert!(matches!(
        TxtLog::from_bytes(data),
        Err(DjiError::InvalidHeader(_))
    ));
}

#[test]
fn test_cut_short_file_clamps_record_area() {
    let mut data = build_log(12, &[scrambled(9, b"\x02Takeoff")], &[], &[]);
    // Declare far more record bytes than were written
    LittleEndian::write_u32(&mut data[HDR_HEADER_RECORD_SIZE_LO..], 10_000);

    let log = TxtLog::from_bytes(data).unwrap();
    assert!(log.header().is_clamped());
    assert_eq!(log.header().details_area_size, 0);

    let tips = log.records_of_type(RecordType::AppTip);
    assert_eq!(tips.len(), 1);
    assert_eq!(tips[0].value, RecordValue::Text("Takeoff".to_string()));
}

// ---------------------------------------------------------------------------
// Scanning
// ---------------------------------------------------------------------------

#[test]
fn test_single_valid_frame_yields_one_record() {
    let data = build_log(3, &[valid(1, &[0x10, 0x20, 0x30, 0x40])], &[], &[]);
    let log = TxtLog::from_bytes(data).unwrap();
    let report = log.decode();

    assert_eq!(report.records.len(), 1);
    assert!(report.records[0].valid);
    assert_eq!(report.records[0].record_type, RecordType::Osd);
    assert_eq!(report.stats.invalid_record_count, 0);
    assert_eq!(report.stats.type_count.get(&1), Some(&1));
}

#[test]
fn test_truncated_payload_is_a_note_not_an_error() {
    // Declares 4 payload bytes, only 2 present
    let data = build_log(3, &[], &[RECORD_MARKER, 1, 4, 0xAA, 0xBB], &[]);
    let log = TxtLog::from_bytes(data).unwrap();
    let report = log.decode();

    assert!(report.records.is_empty());
    assert!(report.diagnostics.is_empty());
    let tail = report.truncated_tail.expect("truncated tail");
    assert_eq!(tail.offset, 100);
    assert_eq!(tail.declared_length, 4);
    assert_eq!(tail.available, 2);
    assert_eq!(report.unconsumed_bytes, 5);
}

#[test]
fn test_invalid_marker_advances_cursor() {
    let data = build_log(
        3,
        &[
            Frame {
                marker: 0x00,
                record_type: 9,
                payload: b"skipped".to_vec(),
            },
            valid(10, b"after"),
        ],
        &[],
        &[],
    );
    let log = TxtLog::from_bytes(data).unwrap();
    let frames: Vec<_> = log.frames().collect();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[1].offset, 100 + FRAME_OVERHEAD + 7);

    let stats = log.stats();
    assert_eq!(stats.invalid_record_count, 1);
    assert_eq!(stats.type_count.get(&9), None);
    assert_eq!(stats.type_count.get(&10), Some(&1));
}

#[test]
fn test_scan_is_restartable() {
    let frames: Vec<Frame> = (0..40u8)
        .map(|i| Frame {
            marker: if i % 5 == 0 { 0x7E } else { RECORD_MARKER },
            record_type: i % 25,
            payload: vec![i; (i % 9) as usize],
        })
        .collect();
    let data = build_log(12, &frames, &[RECORD_MARKER, 3], &[]);
    let log = TxtLog::from_bytes(data).unwrap();

    let first: Vec<_> = log.frames().collect();
    let second: Vec<_> = log.frames().collect();
    assert_eq!(first, second);
    assert_eq!(first.len(), 40);

    // A bare scanner over the same bytes agrees too
    let area = log.record_area();
    let third: Vec<_> = RecordScanner::new(area, 100).collect();
    assert_eq!(first, third);
}

#[test]
fn test_record_count_invariant() {
    let frames: Vec<Frame> = (0..120u8)
        .map(|i| Frame {
            marker: if i % 11 == 0 { 0 } else { RECORD_MARKER },
            record_type: [1u8, 3, 9, 57, 200][i as usize % 5],
            payload: vec![0; (i % 4) as usize],
        })
        .collect();
    let data = build_log(12, &frames, &[], &[]);
    let stats = TxtLog::from_bytes(data).unwrap().stats();
    let typed: u64 = stats.type_count.values().sum();
    assert_eq!(stats.record_count, 120);
    assert_eq!(stats.record_count, typed + stats.invalid_record_count);
}

// ---------------------------------------------------------------------------
// Descrambling
// ---------------------------------------------------------------------------

#[test]
fn test_scramble_round_trip_for_every_catalogued_type() {
    let d = Descrambler::for_version(12);
    for t in KNOWN_RECORD_TYPES {
        let code = t.as_u8();
        for len in [0usize, 1, 2, 9, 64, 255] {
            let plain: Vec<u8> = (0..len).map(|i| (i * 37 + code as usize) as u8).collect();
            let stored = scramble(code, &plain);
            assert_eq!(stored.len(), plain.len());
            assert_eq!(d.descramble(code, &stored).as_ref(), plain.as_slice());
        }
    }
}

#[test]
fn test_unscrambled_types_are_identity() {
    let d = Descrambler::for_version(12);
    let data = b"\xFF\xD8\xFF\xE0JFIF";
    assert_eq!(d.descramble(RecordType::Jpeg.as_u8(), data).as_ref(), data);
    assert_eq!(d.descramble(150, data).as_ref(), data);
    // Pre-scrambling logs leave everything alone
    assert_eq!(
        Descrambler::for_version(SCRAMBLE_MIN_VERSION - 1)
            .descramble(1, data)
            .as_ref(),
        data
    );
}

#[test]
fn test_scrambled_log_decodes_to_plain_values() {
    let mut gimbal = vec![0u8; 1 + GIMBAL_LEN];
    gimbal[0] = 0x41; // key byte
    LittleEndian::write_i16(&mut gimbal[1..], -900); // pitch -90.0
    let data = build_log(
        12,
        &[
            scrambled(3, &gimbal),
            scrambled(1, &osd_payload(14)),
            valid(57, &[0xFF, 0xD8, 0xFF, 0xD9]),
        ],
        &[],
        b"AIRCRAFT SN",
    );
    let log = TxtLog::from_bytes(data).unwrap();
    let report = log.decode();
    assert!(report.diagnostics.is_empty());

    let RecordValue::Gimbal(g) = &report.records[0].value else {
        panic!("expected gimbal");
    };
    assert_eq!(g.pitch, -90.0);

    let RecordValue::Osd(osd) = &report.records[1].value else {
        panic!("expected OSD");
    };
    assert_eq!(osd.gps_num, 14);
    assert!((osd.latitude - 45.0).abs() < 1e-9);
    assert!((osd.height - 123.4).abs() < 1e-9);

    assert!(matches!(report.records[2].value, RecordValue::Jpeg(_)));
    assert_eq!(log.details_area(), b"AIRCRAFT SN");
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

#[test]
fn test_unknown_type_decodes_raw() {
    let data = build_log(12, &[valid(222, &[9, 8, 7])], &[], &[]);
    let report = TxtLog::from_bytes(data).unwrap().decode();
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].record_type, RecordType::Unknown(222));
    assert!(matches!(report.records[0].value, RecordValue::Raw(ref b) if b.0 == [9, 8, 7]));
    assert!(report.diagnostics.is_empty());
}

#[test]
fn test_malformed_record_does_not_stop_the_scan() {
    let data = build_log(
        12,
        &[
            scrambled(1, &[0x40, 1, 2, 3]), // far too short for OSD
            scrambled(10, b"\x09Weak GPS"),
        ],
        &[],
        &[],
    );
    let report = TxtLog::from_bytes(data).unwrap().decode();
    assert_eq!(report.records.len(), 2);
    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].offset, 100);
    assert_eq!(report.diagnostics[0].record_type, RecordType::Osd);
    assert!(matches!(report.records[0].value, RecordValue::Raw(ref b) if b.0 == [1, 2, 3]));
    assert_eq!(
        report.records[1].value,
        RecordValue::Text("Weak GPS".to_string())
    );
}

#[test]
fn test_scrambled_warning_decodes_to_exact_message() {
    let data = build_log(12, &[scrambled(10, b"ZMotor overload")], &[], &[]);
    let tmp = write_log(&data);
    let log = TxtLog::open(tmp.path()).unwrap();

    let warns = log.records_of_type(RecordType::AppWarn);
    assert_eq!(warns.len(), 1);
    assert_eq!(warns[0].value, RecordValue::Text("Motor overload".to_string()));
}

#[test]
fn test_key_byte_kept_in_pre_scrambling_logs() {
    let data = build_log(
        SCRAMBLE_MIN_VERSION as u8 - 1,
        &[valid(10, b"ZMotor overload")],
        &[],
        &[],
    );
    let warns = TxtLog::from_bytes(data)
        .unwrap()
        .records_of_type(RecordType::AppWarn);
    assert_eq!(warns[0].value, RecordValue::Text("ZMotor overload".to_string()));
}

#[test]
fn test_rows_and_filter() {
    let data = build_log(
        12,
        &[
            scrambled(9, b"\x01Ready"),
            scrambled(1, &osd_payload(7)),
            scrambled(10, b"\x01Low battery"),
            scrambled(1, &osd_payload(8)),
            scrambled(9, b"\x01Landing"),
        ],
        &[],
        &[],
    );
    let report = TxtLog::from_bytes(data).unwrap().decode();

    let rows = group_rows(&report.records);
    assert_eq!(rows.len(), 3);
    assert!(rows[0].get(RecordType::AppTip).is_some());
    assert!(rows[1].get(RecordType::AppWarn).is_some());
    assert!(rows[2].get(RecordType::Osd).is_none());

    let osds = filter_records(&report.records, RecordType::Osd);
    assert_eq!(osds.len(), 2);
    assert!(osds[0].offset < osds[1].offset);
}

// ---------------------------------------------------------------------------
// Files, options, rewrite
// ---------------------------------------------------------------------------

#[test]
fn test_open_and_mmap_agree() {
    let data = build_log(
        12,
        &[scrambled(1, &osd_payload(9)), scrambled(11, &[0u8; 30])],
        &[RECORD_MARKER],
        b"details",
    );
    let tmp = write_log(&data);

    let read = TxtLog::open(tmp.path()).unwrap();
    assert_eq!(read.as_bytes(), data.as_slice());

    #[cfg(feature = "cli")]
    {
        let mapped = TxtLog::open_mmap(tmp.path()).unwrap();
        assert_eq!(mapped.header(), read.header());
        assert_eq!(mapped.decode().records, read.decode().records);
    }
}

#[test]
fn test_parallel_decode_matches_sequential() {
    let frames: Vec<Frame> = (0..300u16)
        .map(|i| {
            let t = [1u8, 2, 3, 4, 7, 8, 9, 11, 14, 57, 99][i as usize % 11];
            scrambled(t, &vec![(i % 256) as u8; (i % 70) as usize])
        })
        .collect();
    let data = build_log(12, &frames, &[], &[]);
    let log = TxtLog::from_bytes(data).unwrap();

    let seq = log.decode_with(&DecodeOptions {
        descramble: true,
        threads: 1,
    });
    let par = log.decode_with(&DecodeOptions {
        descramble: true,
        threads: 0,
    });
    assert_eq!(seq.records, par.records);
    assert_eq!(seq.diagnostics, par.diagnostics);
    assert_eq!(seq.stats, par.stats);
}

#[test]
fn test_unscrambled_copy_round_trip() {
    let data = build_log(
        12,
        &[
            scrambled(1, &osd_payload(5)),
            Frame {
                marker: 0x01,
                record_type: 9,
                payload: vec![4, 4, 4],
            },
            scrambled(9, b"\x03Recording"),
            valid(57, &[0xFF, 0xD8]),
        ],
        &[RECORD_MARKER, 9],
        b"details area",
    );
    let log = TxtLog::from_bytes(data.clone()).unwrap();
    let copy = log.unscrambled_bytes();

    assert_eq!(copy.len(), data.len());
    assert_eq!(&copy[..HDR_UNSCRAMBLED_TAG], &data[..HDR_UNSCRAMBLED_TAG]);
    assert_eq!(&copy[HDR_UNSCRAMBLED_TAG..HDR_UNSCRAMBLED_TAG + 4], &UNSCRAMBLED_TAG);
    assert!(copy.ends_with(b"details area"));

    // Reopened from disk with default options
    let tmp = write_log(&copy);
    let reread = TxtLog::open(tmp.path()).unwrap();
    assert!(reread.header().unscrambled_copy);
    assert_eq!(reread.header().format_version, 12);
    assert_eq!(reread.decode().records, log.decode().records);
    assert_eq!(reread.stats(), log.stats());

    let tips = reread.records_of_type(RecordType::AppTip);
    assert_eq!(tips[0].value, RecordValue::Text("Recording".to_string()));

    // Skipping descrambling on a copy changes nothing
    let raw = reread.decode_with(&DecodeOptions {
        descramble: false,
        threads: 1,
    });
    assert_eq!(raw.records, reread.decode().records);
}
