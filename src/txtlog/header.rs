//! File header parsing.
//!
//! Every flight log starts with a fixed 100-byte header ([`FileHeader`]).
//! Its first field is the combined size of the header and the record area,
//! which splits the rest of the file into the record area and the trailing
//! details area.

use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;
use tracing::warn;

use crate::txtlog::constants::*;
use crate::DjiError;

/// Parsed file header plus the area sizes derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileHeader {
    /// Length of the whole buffer.
    pub total_file_size: u64,
    /// Always [`SIZE_FILE_HEADER`].
    pub header_size: u64,
    /// Bytes between the header and the details area.
    pub record_area_size: u64,
    /// Bytes after the record area.
    pub details_area_size: u64,
    /// Container format version. Byte 8.
    pub format_version: u32,
    /// Raw header+record size field as stored. Bytes 0-3.
    pub header_record_size: u32,
    /// Upper half of the size field. Bytes 4-7.
    pub header_record_size_hi: u32,
    /// Payloads were already descrambled by [`mark_unscrambled`]. Bytes 9-12.
    pub unscrambled_copy: bool,
}

impl FileHeader {
    /// Parse the header from the start of a full file buffer.
    ///
    /// `total_file_size` is taken from `data.len()`, so pass the whole file,
    /// not just the first 100 bytes, when the area sizes matter.
    ///
    /// A size field pointing past the end of the buffer (a log cut short
    /// while recording) clamps the record area to what is available and
    /// leaves an empty details area.
    ///
    /// # Examples
    ///
    /// ```
    /// use djitxt::txtlog::header::FileHeader;
    ///
    /// let mut data = vec![0u8; 100];
    /// data[0] = 100; // header+record size: no records
    /// data[8] = 12;  // format version
    ///
    /// let hdr = FileHeader::parse(&data).unwrap();
    /// assert_eq!(hdr.record_area_size, 0);
    /// assert_eq!(hdr.format_version, 12);
    /// ```
    pub fn parse(data: &[u8]) -> Result<Self, DjiError> {
        if data.len() < SIZE_FILE_HEADER {
            return Err(DjiError::TruncatedHeader { len: data.len() });
        }

        let total_file_size = data.len() as u64;
        let header_record_size = LittleEndian::read_u32(&data[HDR_HEADER_RECORD_SIZE_LO..]);
        let header_record_size_hi = LittleEndian::read_u32(&data[HDR_HEADER_RECORD_SIZE_HI..]);
        let format_version = u32::from(data[HDR_FILE_VERSION]);
        let unscrambled_copy =
            data[HDR_UNSCRAMBLED_TAG..HDR_UNSCRAMBLED_TAG + UNSCRAMBLED_TAG.len()] == UNSCRAMBLED_TAG;

        let header_size = SIZE_FILE_HEADER as u64;
        let declared_end = u64::from(header_record_size);
        if declared_end < header_size {
            return Err(DjiError::InvalidHeader(format!(
                "header+record size {} is smaller than the {}-byte header",
                declared_end, header_size
            )));
        }

        let records_end = if declared_end > total_file_size {
            warn!(
                declared = declared_end,
                available = total_file_size,
                "record area extends past end of file; clamping"
            );
            total_file_size
        } else {
            declared_end
        };

        Ok(FileHeader {
            total_file_size,
            header_size,
            record_area_size: records_end - header_size,
            details_area_size: total_file_size - records_end,
            format_version,
            header_record_size,
            header_record_size_hi,
            unscrambled_copy,
        })
    }

    /// Absolute byte range of the record area.
    pub fn record_area(&self) -> std::ops::Range<usize> {
        let start = self.header_size as usize;
        start..start + self.record_area_size as usize
    }

    /// Absolute byte range of the details area.
    pub fn details_area(&self) -> std::ops::Range<usize> {
        let start = (self.header_size + self.record_area_size) as usize;
        start..start + self.details_area_size as usize
    }

    /// True if the declared record area was longer than the file.
    pub fn is_clamped(&self) -> bool {
        u64::from(self.header_record_size) > self.header_size + self.record_area_size
    }
}

/// Tag a file buffer as an unscrambled copy.
///
/// Only reserved header bytes change. A buffer shorter than the header is
/// left alone.
pub fn mark_unscrambled(data: &mut [u8]) {
    if data.len() < SIZE_FILE_HEADER {
        return;
    }
    data[HDR_UNSCRAMBLED_TAG..HDR_UNSCRAMBLED_TAG + UNSCRAMBLED_TAG.len()]
        .copy_from_slice(&UNSCRAMBLED_TAG);
}
