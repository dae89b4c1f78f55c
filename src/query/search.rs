//! Hybrid small-index / brute-force search over a growing segment.
//!
//! The pipeline is linear:
//!
//! 1. resolve the visibility barrier of the snapshot timestamp once;
//! 2. query the small index of every chunk in `[0, max_indexed)`;
//! 3. scan every chunk in `[max_indexed, max_chunk)` exactly, clipped to the
//!    barrier;
//! 4. merge all per-chunk results into one top-K and assemble it.
//!
//! Only chunks lying entirely below the barrier are served from their index,
//! so a search at an older snapshot never sees rows an index covers beyond
//! the barrier. The two ranges are contiguous and cover every visible row
//! exactly once. Any failure aborts the whole search; no chunk is skipped.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, trace, warn};

use crate::config::SearchConfig;
use crate::error::{Result, SegSearchError};
use crate::query::bitmap::{DeletionBitmaps, alive_mask};
use crate::query::brute_force::{self, ChunkRows};
use crate::query::result::QueryResult;
use crate::query::sub_result::SubQueryResult;
use crate::query::visibility::get_barrier;
use crate::query::{QueryDataset, QueryInfo, SearchRequest};
use crate::segment::indexing_record::IndexingEntry;
use crate::segment::insert_record::ChunkData;
use crate::segment::{GrowingSegment, Timestamp};

/// How a chunk is searched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkTask {
    /// Served by the chunk's small index.
    Indexed(usize),
    /// Scanned exactly.
    BruteForce(usize),
}

/// Everything a chunk search needs, resolved once per call.
struct SearchContext<'a> {
    segment: &'a GrowingSegment,
    entry: &'a IndexingEntry,
    info: QueryInfo,
    dataset: QueryDataset<'a>,
    barrier: usize,
    deletions: Option<&'a DeletionBitmaps>,
}

/// Executes top-K searches against growing segments.
#[derive(Debug)]
pub struct SegmentSearcher {
    config: SearchConfig,
    pool: Option<ThreadPool>,
}

impl Default for SegmentSearcher {
    fn default() -> Self {
        Self {
            config: SearchConfig::default(),
            pool: None,
        }
    }
}

impl SegmentSearcher {
    /// Create a searcher. A dedicated thread pool is built when the config
    /// sets `thread_pool_size`.
    pub fn new(config: SearchConfig) -> Result<Self> {
        config.validate()?;
        let pool = match config.thread_pool_size {
            Some(size) if config.parallel => Some(
                ThreadPoolBuilder::new()
                    .num_threads(size)
                    .thread_name(|i| format!("segsearch-{i}"))
                    .build()
                    .map_err(|e| SegSearchError::other(format!("failed to build thread pool: {e}")))?,
            ),
            _ => None,
        };
        Ok(Self { config, pool })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Search one segment.
    pub fn search(
        &self,
        segment: &GrowingSegment,
        request: &SearchRequest<'_>,
        deletions: Option<&DeletionBitmaps>,
    ) -> Result<QueryResult> {
        let info = request.info;
        let field = segment.schema().field(info.field_id)?;
        info.metric_type.check_supports(field.data_type)?;
        if info.topk == 0 {
            return Err(SegSearchError::invalid_argument("topk must be positive"));
        }
        let dataset = QueryDataset::new(request.vectors, request.num_queries, field)?;
        let entry = segment.indexing_record().entry(info.field_id)?;
        if let Some(bitmaps) = deletions
            && bitmaps.chunk_size() != segment.chunk_size()
        {
            return Err(SegSearchError::invalid_argument(format!(
                "deletion bitmaps use chunk size {}, segment uses {}",
                bitmaps.chunk_size(),
                segment.chunk_size()
            )));
        }

        let barrier = get_barrier(segment.insert_record(), request.timestamp);
        let chunk_size = segment.chunk_size();
        let max_chunk = barrier.div_ceil(chunk_size);
        let max_indexed = entry.max_indexed_chunk_count().min(barrier / chunk_size);

        debug!(
            field = %info.field_id,
            metric = info.metric_type.name(),
            topk = info.topk,
            num_queries = request.num_queries,
            timestamp = request.timestamp,
            barrier,
            max_indexed,
            max_chunk,
            "searching segment"
        );

        let tasks: Vec<ChunkTask> = (0..max_indexed)
            .map(ChunkTask::Indexed)
            .chain((max_indexed..max_chunk).map(ChunkTask::BruteForce))
            .collect();

        let ctx = SearchContext {
            segment,
            entry,
            info,
            dataset,
            barrier,
            deletions,
        };

        let merged = if self.config.should_parallelize(tasks.len()) {
            match &self.pool {
                Some(pool) => pool.install(|| search_parallel(&ctx, &tasks)),
                None => search_parallel(&ctx, &tasks),
            }
        } else {
            search_sequential(&ctx, &tasks)
        }?;

        Ok(QueryResult::assemble(merged))
    }
}

fn search_sequential(ctx: &SearchContext<'_>, tasks: &[ChunkTask]) -> Result<SubQueryResult> {
    let mut acc = SubQueryResult::new(ctx.dataset.num_queries, ctx.info.topk);
    for task in tasks {
        let partial = search_chunk(ctx, *task)?;
        acc.merge_from(&partial)?;
    }
    Ok(acc)
}

fn search_parallel(ctx: &SearchContext<'_>, tasks: &[ChunkTask]) -> Result<SubQueryResult> {
    let (num_queries, topk) = (ctx.dataset.num_queries, ctx.info.topk);
    tasks
        .par_iter()
        .map(|task| search_chunk(ctx, *task))
        .try_reduce(
            || SubQueryResult::new(num_queries, topk),
            |a, b| a.merge(&b),
        )
}

/// Search one chunk and return its result with segment ids.
fn search_chunk(ctx: &SearchContext<'_>, task: ChunkTask) -> Result<SubQueryResult> {
    let chunk_size = ctx.segment.chunk_size();
    let (chunk_id, mut result) = match task {
        ChunkTask::Indexed(chunk_id) => (chunk_id, search_indexed_chunk(ctx, chunk_id)?),
        ChunkTask::BruteForce(chunk_id) => (chunk_id, search_raw_chunk(ctx, chunk_id)?),
    };
    result.shift_ids((chunk_id * chunk_size) as i64);
    Ok(result)
}

fn search_indexed_chunk(ctx: &SearchContext<'_>, chunk_id: usize) -> Result<SubQueryResult> {
    let index = ctx.entry.get_index(chunk_id)?;
    let alive = alive_mask(ctx.deletions, chunk_id)?;
    trace!(chunk_id, index = index.name(), "querying small index");

    let mut result = index
        .query(&ctx.dataset, ctx.info.topk, ctx.info.metric_type, &alive)
        .inspect_err(|e| warn!(chunk_id, error = %e, "small index query failed"))?;
    if result.num_queries() != ctx.dataset.num_queries || result.topk() != ctx.info.topk {
        return Err(SegSearchError::index(format!(
            "index for chunk {} returned {}x{} results, expected {}x{}",
            chunk_id,
            result.num_queries(),
            result.topk(),
            ctx.dataset.num_queries,
            ctx.info.topk
        )));
    }
    result.sort_rows();
    Ok(result)
}

fn search_raw_chunk(ctx: &SearchContext<'_>, chunk_id: usize) -> Result<SubQueryResult> {
    let chunk_size = ctx.segment.chunk_size();
    let begin = chunk_id * chunk_size;
    let end = ctx.barrier.min(begin + chunk_size);
    let alive = alive_mask(ctx.deletions, chunk_id)?;
    trace!(chunk_id, rows = end - begin, "brute-force scanning chunk");

    let chunk = ctx.segment.get_chunk(ctx.info.field_id, chunk_id)?;
    let rows = match &chunk {
        ChunkData::Float(data) => ChunkRows::Float(data),
        ChunkData::Binary(data) => ChunkRows::Binary(data),
    };
    brute_force::search_chunk(
        &ctx.dataset,
        rows,
        end - begin,
        ctx.info.topk,
        ctx.info.metric_type,
        &alive,
    )
}

/// Search float vectors with the default searcher.
pub fn float_search(
    segment: &GrowingSegment,
    info: &QueryInfo,
    query_data: &[f32],
    num_queries: usize,
    timestamp: Timestamp,
    deletions: Option<&DeletionBitmaps>,
) -> Result<QueryResult> {
    let request = SearchRequest::float(*info, query_data, num_queries, timestamp);
    SegmentSearcher::default().search(segment, &request, deletions)
}

/// Search packed binary vectors with the default searcher.
pub fn binary_search(
    segment: &GrowingSegment,
    info: &QueryInfo,
    query_data: &[u8],
    num_queries: usize,
    timestamp: Timestamp,
    deletions: Option<&DeletionBitmaps>,
) -> Result<QueryResult> {
    let request = SearchRequest::binary(*info, query_data, num_queries, timestamp);
    SegmentSearcher::default().search(segment, &request, deletions)
}
