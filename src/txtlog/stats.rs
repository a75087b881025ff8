//! Record stream statistics.
//!
//! [`StatsAccumulator`] observes raw frames as they are scanned and counts
//! them without touching the frames themselves. Every frame counts toward
//! `record_count`; frames with a bad marker count as invalid and are kept
//! out of the per-type histogram, so that
//! `record_count == sum(type_count) + invalid_record_count` always holds.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::txtlog::record_types::RecordType;
use crate::txtlog::scanner::RawRecordFrame;

/// Summary of one file's record area.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub record_area_size: u64,
    pub version: u32,
    pub record_count: u64,
    /// Valid frames per type code.
    pub type_count: BTreeMap<u8, u64>,
    pub invalid_record_count: u64,
}

impl ScanStats {
    /// Type histogram sorted by descending count, then by code.
    pub fn distribution(&self) -> Vec<(RecordType, u64)> {
        let mut dist: Vec<_> = self
            .type_count
            .iter()
            .map(|(&code, &count)| (RecordType::from_u8(code), count))
            .collect();
        dist.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.as_u8().cmp(&b.0.as_u8())));
        dist
    }

    /// Number of valid frames.
    pub fn valid_record_count(&self) -> u64 {
        self.type_count.values().sum()
    }
}

/// Incremental builder for [`ScanStats`].
///
/// Partial accumulators (one per worker, say) can be combined with
/// [`StatsAccumulator::merge`].
#[derive(Debug, Clone, Default)]
pub struct StatsAccumulator {
    stats: ScanStats,
}

impl StatsAccumulator {
    /// Start counting for a record area of the given size and file version.
    pub fn new(record_area_size: u64, version: u32) -> Self {
        StatsAccumulator {
            stats: ScanStats {
                record_area_size,
                version,
                ..ScanStats::default()
            },
        }
    }

    /// Count one frame.
    pub fn observe(&mut self, frame: &RawRecordFrame<'_>) {
        self.stats.record_count += 1;
        if !frame.is_valid() {
            self.stats.invalid_record_count += 1;
            return;
        }
        *self.stats.type_count.entry(frame.record_type).or_insert(0) += 1;
    }

    /// Fold another accumulator's counts into this one.
    ///
    /// Area size and version are kept from `self`.
    pub fn merge(&mut self, other: StatsAccumulator) {
        self.stats.record_count += other.stats.record_count;
        self.stats.invalid_record_count += other.stats.invalid_record_count;
        for (code, count) in other.stats.type_count {
            *self.stats.type_count.entry(code).or_insert(0) += count;
        }
    }

    /// Counts observed so far.
    pub fn snapshot(&self) -> &ScanStats {
        &self.stats
    }

    /// Finish and return the collected statistics.
    pub fn finalize(self) -> ScanStats {
        self.stats
    }
}
