//! Record area scanning.
//!
//! The record area is a contiguous run of frames, each a 3-byte prologue
//! (marker, type, length) followed by `length` payload bytes. [`RecordScanner`]
//! walks the area without interpreting record types and yields one
//! [`RawRecordFrame`] per frame.
//!
//! Scanning stops cleanly when fewer than [`FRAME_OVERHEAD`] bytes remain, or
//! when a frame declares more payload than is left. The second case is a
//! truncated tail: it is recorded as a [`TruncatedTail`] note rather than an
//! error, since logs routinely end mid-record when recording is interrupted.
//!
//! A frame whose marker is not `0xFF` is still framed by its declared length;
//! only its validity flag is affected.

use serde::Serialize;
use tracing::{debug, warn};

use crate::txtlog::constants::*;
use crate::txtlog::record_types::RecordType;

/// One record frame as found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecordFrame<'a> {
    /// Absolute file offset of the marker byte.
    pub offset: usize,
    /// Marker byte, `0xFF` on well-formed records.
    pub marker: u8,
    /// Raw type code.
    pub record_type: u8,
    /// Declared payload length.
    pub length: u32,
    /// Payload bytes as stored (possibly scrambled).
    pub payload: &'a [u8],
}

impl RawRecordFrame<'_> {
    /// True if the marker byte is the expected sentinel.
    pub fn is_valid(&self) -> bool {
        self.marker == RECORD_MARKER
    }

    /// Catalog type for this frame's code.
    pub fn kind(&self) -> RecordType {
        RecordType::from_u8(self.record_type)
    }

    /// Bytes occupied on disk, prologue included.
    pub fn frame_len(&self) -> usize {
        self.length as usize + FRAME_OVERHEAD
    }
}

/// Diagnostic for a final frame whose payload runs past the record area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TruncatedTail {
    /// Absolute file offset of the truncated frame's marker byte.
    pub offset: usize,
    /// Payload length the frame declares.
    pub declared_length: u32,
    /// Payload bytes actually present.
    pub available: usize,
}

/// Lazy iterator over the frames of a record area.
///
/// The scanner borrows the buffer and never copies payloads. Creating a new
/// scanner over the same bytes reproduces the same frame sequence, and a
/// clone continues independently from the current position.
///
/// # Examples
///
/// ```
/// use djitxt::txtlog::scanner::RecordScanner;
///
/// // marker, type 1, length 2, payload; then an invalid-marker frame
/// let area = [0xFF, 1, 2, 0xAA, 0xBB, 0x00, 9, 0];
/// let frames: Vec<_> = RecordScanner::new(&area, 100).collect();
///
/// assert_eq!(frames.len(), 2);
/// assert_eq!(frames[0].offset, 100);
/// assert_eq!(frames[0].payload, &[0xAA, 0xBB]);
/// assert!(!frames[1].is_valid());
/// ```
#[derive(Debug, Clone)]
pub struct RecordScanner<'a> {
    area: &'a [u8],
    base_offset: usize,
    cursor: usize,
    truncated: Option<TruncatedTail>,
    finished: bool,
}

impl<'a> RecordScanner<'a> {
    /// Scan `area`, reporting offsets relative to `base_offset`.
    ///
    /// `base_offset` is the absolute position of `area[0]` in the file
    /// (normally the header size).
    pub fn new(area: &'a [u8], base_offset: usize) -> Self {
        RecordScanner {
            area,
            base_offset,
            cursor: 0,
            truncated: None,
            finished: false,
        }
    }

    /// Truncated-tail note, available once the scan has stopped on one.
    pub fn truncated_tail(&self) -> Option<TruncatedTail> {
        self.truncated
    }

    /// Bytes of the area not consumed by any yielded frame.
    pub fn unconsumed_bytes(&self) -> usize {
        self.area.len() - self.cursor
    }

    /// Relative cursor position within the area.
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// True once the scan has stopped.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn finish(&mut self) {
        if !self.finished {
            self.finished = true;
            debug!(
                consumed = self.cursor,
                unconsumed = self.unconsumed_bytes(),
                "record scan finished"
            );
        }
    }
}

impl<'a> Iterator for RecordScanner<'a> {
    type Item = RawRecordFrame<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let remaining = &self.area[self.cursor..];
        if remaining.len() < FRAME_OVERHEAD {
            self.finish();
            return None;
        }

        let marker = remaining[FRAME_MARKER];
        let record_type = remaining[FRAME_TYPE];
        let length = remaining[FRAME_LENGTH] as usize;
        let offset = self.base_offset + self.cursor;

        let body = &remaining[FRAME_OVERHEAD..];
        if body.len() < length {
            warn!(
                offset,
                record_type,
                declared = length,
                available = body.len(),
                "truncated record at end of record area"
            );
            self.truncated = Some(TruncatedTail {
                offset,
                declared_length: length as u32,
                available: body.len(),
            });
            self.finish();
            return None;
        }

        self.cursor += FRAME_OVERHEAD + length;
        Some(RawRecordFrame {
            offset,
            marker,
            record_type,
            length: length as u32,
            payload: &body[..length],
        })
    }
}
