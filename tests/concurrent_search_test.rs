use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use segsearch::config::SegmentConfig;
use segsearch::error::Result;
use segsearch::index::flat::FlatIndexBuilder;
use segsearch::query::search::float_search;
use segsearch::query::sub_result::INVALID_ID;
use segsearch::query::{MetricType, QueryInfo};
use segsearch::schema::{FieldId, FieldMeta, Schema};
use segsearch::segment::insert_record::InsertBatch;
use segsearch::segment::{GrowingSegment, Timestamp};

const FIELD: FieldId = FieldId(1);
const TOTAL_ROWS: usize = 2_000;
const BATCH: usize = 37;
const TOPK: usize = 5;

/// Distinct one-dimensional value of a row.
fn value(row: usize) -> f32 {
    ((row * 7919) % 10_007) as f32
}

/// Exact answer over the first `visible` rows.
fn expected_ids(visible: usize, query: f32) -> Vec<i64> {
    let mut scored: Vec<(f32, i64)> = (0..visible)
        .map(|row| {
            let diff = value(row) - query;
            (diff * diff, row as i64)
        })
        .collect();
    scored.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    let mut ids: Vec<i64> = scored.into_iter().take(TOPK).map(|(_, id)| id).collect();
    ids.resize(TOPK, INVALID_ID);
    ids
}

#[test]
fn searches_during_ingestion_see_consistent_snapshots() -> Result<()> {
    let schema = Schema::new().with_field(FieldMeta::float_vector(FIELD, "v", 1))?;
    let segment = Arc::new(GrowingSegment::new(schema, SegmentConfig::with_chunk_size(64))?);
    let done = Arc::new(AtomicBool::new(false));

    let writer = {
        let segment = Arc::clone(&segment);
        let done = Arc::clone(&done);
        thread::spawn(move || -> Result<()> {
            let mut row = 0;
            while row < TOTAL_ROWS {
                let rows = BATCH.min(TOTAL_ROWS - row);
                // timestamp of a row is its offset
                let timestamps = (row..row + rows).map(|r| r as Timestamp).collect();
                let data = (row..row + rows).map(value).collect();
                segment.insert(&InsertBatch::new(timestamps).with_float(FIELD, data))?;
                segment.build_small_indexes(&FlatIndexBuilder)?;
                row += rows;
            }
            done.store(true, Ordering::Release);
            Ok(())
        })
    };

    let readers: Vec<_> = (0..3)
        .map(|reader| {
            let segment = Arc::clone(&segment);
            let done = Arc::clone(&done);
            thread::spawn(move || -> Result<usize> {
                let info = QueryInfo::new(FIELD, MetricType::L2, TOPK);
                let query = (reader * 3_001 % 10_007) as f32;
                let mut checked = 0;
                loop {
                    let finished = done.load(Ordering::Acquire);
                    let published = segment.row_count();
                    if published > 0 {
                        // every row below `published` is visible at this snapshot
                        let timestamp = (published - 1) as Timestamp;
                        let result = float_search(&segment, &info, &[query], 1, timestamp, None)?;
                        assert_eq!(result.ids, expected_ids(published, query));
                        checked += 1;
                    }
                    if finished {
                        return Ok(checked);
                    }
                }
            })
        })
        .collect();

    writer.join().expect("writer panicked")?;
    for reader in readers {
        assert!(reader.join().expect("reader panicked")? > 0);
    }
    assert_eq!(segment.row_count(), TOTAL_ROWS);
    assert_eq!(segment.sealed_chunk_count(), TOTAL_ROWS / 64);
    Ok(())
}
