use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use segsearch::config::{SearchConfig, SegmentConfig};
use segsearch::error::Result;
use segsearch::index::flat::FlatIndexBuilder;
use segsearch::query::search::SegmentSearcher;
use segsearch::query::sub_result::{INVALID_ID, SubQueryResult};
use segsearch::query::{MetricType, QueryInfo, SearchRequest};
use segsearch::schema::{FieldId, FieldMeta, Schema};
use segsearch::segment::GrowingSegment;
use segsearch::segment::insert_record::InsertBatch;

const TOPK: usize = 6;
const QUERIES: usize = 3;

/// A partial result as one chunk would return it: sorted rows of distinct
/// ids drawn from the chunk's offset range, some rows short.
fn chunk_result(rng: &mut StdRng, chunk_id: usize) -> Result<SubQueryResult> {
    let mut distances = Vec::with_capacity(QUERIES * TOPK);
    let mut ids = Vec::with_capacity(QUERIES * TOPK);
    for _ in 0..QUERIES {
        let filled = rng.random_range(0..=TOPK);
        let mut row: Vec<(f32, i64)> = (0..filled)
            .map(|slot| {
                // coarse distances force ties across chunks
                let distance = rng.random_range(0..5) as f32;
                (distance, (chunk_id * 100 + slot) as i64)
            })
            .collect();
        row.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        for slot in 0..TOPK {
            let (distance, id) = row.get(slot).copied().unwrap_or((f32::MAX, INVALID_ID));
            distances.push(distance);
            ids.push(id);
        }
    }
    SubQueryResult::from_parts(QUERIES, TOPK, distances, ids)
}

fn fold(parts: &[SubQueryResult]) -> Result<SubQueryResult> {
    let mut acc = SubQueryResult::new(QUERIES, TOPK);
    for part in parts {
        acc.merge_from(part)?;
    }
    Ok(acc)
}

#[test]
fn merge_is_independent_of_chunk_order() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(2024);
    let mut parts = (0..8)
        .map(|chunk_id| chunk_result(&mut rng, chunk_id))
        .collect::<Result<Vec<_>>>()?;

    let expected = fold(&parts)?;
    for _ in 0..20 {
        parts.shuffle(&mut rng);
        assert_eq!(fold(&parts)?, expected);
    }
    Ok(())
}

#[test]
fn merge_tree_matches_linear_fold() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(7);
    let parts = (0..9)
        .map(|chunk_id| chunk_result(&mut rng, chunk_id))
        .collect::<Result<Vec<_>>>()?;

    let mut level = parts.clone();
    while level.len() > 1 {
        let mut next = Vec::new();
        for pair in level.chunks(2) {
            match pair {
                [a, b] => next.push(a.merge(b)?),
                [a] => next.push(a.clone()),
                _ => unreachable!(),
            }
        }
        level = next;
    }

    assert_eq!(level[0], fold(&parts)?);
    Ok(())
}

#[test]
fn parallel_search_equals_sequential_search() -> Result<()> {
    let field = FieldId(7);
    let dim = 16;
    let schema = Schema::new().with_field(FieldMeta::float_vector(field, "embedding", dim))?;
    let segment = GrowingSegment::new(schema, SegmentConfig::with_chunk_size(64))?;

    let mut rng = StdRng::seed_from_u64(99);
    for batch in 0..10u64 {
        let rows = 50;
        // integer coordinates make equal distances likely
        let data = (0..rows * dim)
            .map(|_| rng.random_range(0..3) as f32)
            .collect();
        let timestamps = vec![batch; rows];
        segment.insert(&InsertBatch::new(timestamps).with_float(field, data))?;
        if batch % 3 == 0 {
            segment.build_small_indexes(&FlatIndexBuilder)?;
        }
    }

    let queries: Vec<f32> = (0..10 * dim).map(|_| rng.random_range(0..3) as f32).collect();
    let info = QueryInfo::new(field, MetricType::L2, 20);

    let sequential = SegmentSearcher::new(SearchConfig::sequential())?;
    let parallel = SegmentSearcher::new(SearchConfig {
        parallel: true,
        min_parallel_chunks: 2,
        thread_pool_size: Some(4),
    })?;

    for timestamp in [0, 4, 9] {
        let request = SearchRequest::float(info, &queries, 10, timestamp);
        assert_eq!(
            sequential.search(&segment, &request, None)?,
            parallel.search(&segment, &request, None)?,
            "snapshot {timestamp}"
        );
    }
    Ok(())
}
