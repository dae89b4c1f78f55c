//! Exact top-K scans over raw chunk rows.

use rayon::prelude::*;

use crate::error::{Result, SegSearchError};
use crate::query::bitmap::AliveMask;
use crate::query::metric::{MetricType, l2_squared};
use crate::query::sub_result::{SubQueryResult, TopKCollector};
use crate::query::{QueryDataset, QueryVectors};

/// Query rows at which the scan fans out over rayon.
const PARALLEL_QUERY_THRESHOLD: usize = 8;

/// Raw rows of a chunk, row-major.
#[derive(Debug, Clone, Copy)]
pub enum ChunkRows<'a> {
    Float(&'a [f32]),
    Binary(&'a [u8]),
}

/// Scan the first `num_rows` rows of a chunk and keep the `topk` closest
/// alive rows per query. Returned ids are chunk-local.
pub fn search_chunk(
    dataset: &QueryDataset<'_>,
    rows: ChunkRows<'_>,
    num_rows: usize,
    topk: usize,
    metric: MetricType,
    alive: &AliveMask,
) -> Result<SubQueryResult> {
    metric.check_supports(dataset.data_type())?;

    let width = dataset.elements_per_row;
    let stored = match rows {
        ChunkRows::Float(data) => data.len(),
        ChunkRows::Binary(data) => data.len(),
    };
    if stored < num_rows * width {
        return Err(SegSearchError::storage(format!(
            "chunk holds {stored} elements, scan needs {num_rows} rows of {width}"
        )));
    }

    if matches!(
        (dataset.vectors, rows),
        (QueryVectors::Float(_), ChunkRows::Binary(_)) | (QueryVectors::Binary(_), ChunkRows::Float(_))
    ) {
        return Err(SegSearchError::schema(
            "query vectors and chunk rows have different data types",
        ));
    }

    let rows_for_query = |query: usize| -> Vec<(f32, i64)> {
        let mut collector = TopKCollector::new(topk);
        match (dataset.vectors, rows) {
            (QueryVectors::Float(queries), ChunkRows::Float(data)) => {
                let q = &queries[query * width..(query + 1) * width];
                for row in (0..num_rows).filter(|&row| alive.is_alive(row)) {
                    let distance = l2_squared(q, &data[row * width..(row + 1) * width]);
                    collector.collect(distance, row as i64);
                }
            }
            (QueryVectors::Binary(queries), ChunkRows::Binary(data)) => {
                let q = &queries[query * width..(query + 1) * width];
                for row in (0..num_rows).filter(|&row| alive.is_alive(row)) {
                    let distance = metric.binary_distance(q, &data[row * width..(row + 1) * width]);
                    collector.collect(distance, row as i64);
                }
            }
            _ => {}
        }
        collector.into_sorted_vec()
    };

    let per_query: Vec<Vec<(f32, i64)>> = if dataset.num_queries >= PARALLEL_QUERY_THRESHOLD {
        (0..dataset.num_queries)
            .into_par_iter()
            .map(rows_for_query)
            .collect()
    } else {
        (0..dataset.num_queries).map(rows_for_query).collect()
    };

    let mut result = SubQueryResult::new(dataset.num_queries, topk);
    for (query, entries) in per_query.iter().enumerate() {
        result.set_row(query, entries);
    }
    Ok(result)
}
