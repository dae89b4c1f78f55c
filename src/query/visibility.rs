//! Snapshot visibility of segment rows.

use crate::segment::Timestamp;
use crate::segment::insert_record::InsertRecord;

/// Number of leading timestamps that are `<= timestamp`.
pub fn barrier_of(timestamps: &[Timestamp], timestamp: Timestamp) -> usize {
    timestamps.partition_point(|&t| t <= timestamp)
}

/// Number of rows of the record visible at `timestamp`.
///
/// Row timestamps are non-decreasing, so the visible rows form a prefix. The
/// search is bounded by one acquire read of the published row count, so rows
/// appended concurrently are never reported.
pub fn get_barrier(record: &InsertRecord, timestamp: Timestamp) -> usize {
    let row_count = record.row_count();
    if row_count == 0 {
        return 0;
    }

    let chunk_size = record.chunk_size();
    let chunks = record.timestamps().snapshot();
    let at = |row: usize| chunks[row / chunk_size][row % chunk_size];

    let (mut lo, mut hi) = (0, row_count);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if at(mid) <= timestamp {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}
