//! Flight log file access.
//!
//! Provides [`TxtLog`], the primary entry point for decoding a log. The whole
//! file is held in memory (read into a buffer, or memory-mapped with the
//! `cli` feature) and every operation addresses it by absolute offset. The
//! header is parsed once on open; a header failure fails the open.

use std::ops::Deref;

use tracing::debug;

use crate::txtlog::decode::DecodedRecord;
use crate::txtlog::header::FileHeader;
use crate::txtlog::pipeline::{self, DecodeReport};
use crate::txtlog::record_types::RecordType;
use crate::txtlog::scanner::RecordScanner;
use crate::txtlog::scramble::Descrambler;
use crate::txtlog::stats::ScanStats;
use crate::DjiError;

/// Backing storage for a log's bytes.
enum LogBytes {
    Owned(Vec<u8>),
    #[cfg(feature = "cli")]
    Mapped(memmap2::Mmap),
}

impl Deref for LogBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            LogBytes::Owned(v) => v,
            #[cfg(feature = "cli")]
            LogBytes::Mapped(m) => m,
        }
    }
}

/// Knobs for [`TxtLog::decode_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Descramble payloads when the header calls for it. When off, payloads
    /// are read as stored; key bytes are still dropped.
    pub descramble: bool,
    /// Decode workers. `1` decodes on the calling thread; any other value
    /// uses the global rayon pool (when built with `cli`).
    pub threads: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            descramble: true,
            threads: 1,
        }
    }
}

/// An open DJI TXT flight log.
pub struct TxtLog {
    data: LogBytes,
    header: FileHeader,
    descrambler: Descrambler,
}

impl std::fmt::Debug for TxtLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxtLog")
            .field("header", &self.header)
            .field("descrambler", &self.descrambler)
            .finish_non_exhaustive()
    }
}

impl TxtLog {
    /// Read a log file into memory and parse its header.
    pub fn open<P: AsRef<std::path::Path>>(path: P) -> Result<Self, DjiError> {
        let path = path.as_ref();
        let data = std::fs::read(path)
            .map_err(|e| DjiError::Io(format!("Cannot read {}: {}", path.display(), e)))?;
        debug!(path = %path.display(), size = data.len(), "log file read");
        Self::init(LogBytes::Owned(data))
    }

    /// Open a log file using memory-mapped I/O.
    ///
    /// # Safety
    ///
    /// The underlying `mmap` call is marked `unsafe` because the mapped file
    /// must not be modified by another process while the mapping is active.
    /// Flight logs are analysed after the fact, so this holds in practice.
    #[cfg(feature = "cli")]
    pub fn open_mmap<P: AsRef<std::path::Path>>(path: P) -> Result<Self, DjiError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| DjiError::Io(format!("Cannot open {}: {}", path.display(), e)))?;

        let mmap = unsafe {
            memmap2::Mmap::map(&file)
                .map_err(|e| DjiError::Io(format!("Cannot mmap {}: {}", path.display(), e)))?
        };
        debug!(path = %path.display(), size = mmap.len(), "log file mapped");
        Self::init(LogBytes::Mapped(mmap))
    }

    /// Create a log from an in-memory buffer.
    ///
    /// # Examples
    ///
    /// ```
    /// use djitxt::txtlog::log_file::TxtLog;
    ///
    /// let mut data = vec![0u8; 100];
    /// data[0] = 107;                  // header + record area ends at 107
    /// data.extend_from_slice(&[0xFF, 9, 4]);
    /// data.extend_from_slice(b"Hi!\0");
    ///
    /// let log = TxtLog::from_bytes(data).unwrap();
    /// let report = log.decode();
    /// assert_eq!(report.records.len(), 1);
    /// assert_eq!(report.stats.record_count, 1);
    /// ```
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, DjiError> {
        Self::init(LogBytes::Owned(data))
    }

    fn init(data: LogBytes) -> Result<Self, DjiError> {
        let header = FileHeader::parse(&data)?;
        let descrambler = Descrambler::for_header(&header);
        debug!(
            version = header.format_version,
            records = header.record_area_size,
            details = header.details_area_size,
            descramble = descrambler.is_enabled(),
            unscrambled_copy = header.unscrambled_copy,
            "log header parsed"
        );
        Ok(TxtLog {
            data,
            header,
            descrambler,
        })
    }

    /// Replace the descrambler chosen from the header.
    ///
    /// Copies written by [`unscrambled_bytes`](Self::unscrambled_bytes) are
    /// recognised from their header and need no override.
    pub fn set_descrambler(&mut self, descrambler: Descrambler) {
        self.descrambler = descrambler;
    }

    /// Returns the parsed file header.
    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// Returns the descrambler in use.
    pub fn descrambler(&self) -> &Descrambler {
        &self.descrambler
    }

    /// Returns the whole file.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Returns the file size in bytes.
    pub fn file_size(&self) -> u64 {
        self.header.total_file_size
    }

    /// Returns the record area bytes.
    pub fn record_area(&self) -> &[u8] {
        &self.data[self.header.record_area()]
    }

    /// Returns the details area bytes.
    pub fn details_area(&self) -> &[u8] {
        &self.data[self.header.details_area()]
    }

    /// Fresh lazy scan over the record area.
    pub fn frames(&self) -> RecordScanner<'_> {
        RecordScanner::new(self.record_area(), self.header.header_size as usize)
    }

    /// Record statistics, without decoding payloads.
    pub fn stats(&self) -> ScanStats {
        pipeline::scan_stats(&self.data, &self.header)
    }

    /// Scan and decode every record.
    pub fn decode(&self) -> DecodeReport {
        pipeline::decode_area(&self.data, &self.header, &self.descrambler)
    }

    /// Scan sequentially, decode on the rayon pool.
    #[cfg(feature = "cli")]
    pub fn decode_parallel(&self) -> DecodeReport {
        pipeline::decode_area_parallel(&self.data, &self.header, &self.descrambler)
    }

    /// Decode according to `opts`.
    ///
    /// The parallel and sequential paths produce identical reports.
    pub fn decode_with(&self, opts: &DecodeOptions) -> DecodeReport {
        let descrambler = if opts.descramble {
            self.descrambler
        } else {
            self.descrambler.without_keystream()
        };

        #[cfg(feature = "cli")]
        {
            if opts.threads != 1 {
                return pipeline::decode_area_parallel(&self.data, &self.header, &descrambler);
            }
        }

        pipeline::decode_area(&self.data, &self.header, &descrambler)
    }

    /// Decoded valid records of one type.
    pub fn records_of_type(&self, record_type: RecordType) -> Vec<DecodedRecord> {
        let report = self.decode();
        pipeline::filter_records(&report.records, record_type)
            .into_iter()
            .cloned()
            .collect()
    }

    /// The file with all scrambled payloads replaced by their canonical form.
    ///
    /// The copy is tagged in its header, so [`TxtLog::from_bytes`] on it
    /// decodes the same records without further setup.
    pub fn unscrambled_bytes(&self) -> Vec<u8> {
        pipeline::rewrite_unscrambled(&self.data, &self.header, &self.descrambler)
    }
}
