//! The final result of a segment search.

use serde::{Deserialize, Serialize};

use crate::query::sub_result::{INVALID_ID, SubQueryResult};

/// Merged top-K of a segment search, flattened row-major by query.
///
/// Both arrays hold exactly `topk * num_queries` entries. Ids are segment
/// offsets; unfilled slots carry id `-1` and distance `f32::MAX`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub distances: Vec<f32>,
    pub ids: Vec<i64>,
    pub topk: usize,
    pub num_queries: usize,
}

impl QueryResult {
    /// Package a fully merged result.
    pub fn assemble(result: SubQueryResult) -> Self {
        let topk = result.topk();
        let num_queries = result.num_queries();
        let (distances, ids) = result.into_parts();
        Self {
            distances,
            ids,
            topk,
            num_queries,
        }
    }

    /// A result with every slot unfilled.
    pub fn empty(num_queries: usize, topk: usize) -> Self {
        Self::assemble(SubQueryResult::new(num_queries, topk))
    }

    /// Distances and ids of one query row.
    pub fn row(&self, query: usize) -> (&[f32], &[i64]) {
        let range = query * self.topk..(query + 1) * self.topk;
        (&self.distances[range.clone()], &self.ids[range])
    }

    /// Real (non-sentinel) `(distance, id)` hits of one query row.
    pub fn hits(&self, query: usize) -> Vec<(f32, i64)> {
        let (distances, ids) = self.row(query);
        distances
            .iter()
            .copied()
            .zip(ids.iter().copied())
            .filter(|(_, id)| *id != INVALID_ID)
            .collect()
    }

    /// Number of real hits in one query row.
    pub fn valid_count(&self, query: usize) -> usize {
        self.row(query).1.iter().filter(|id| **id != INVALID_ID).count()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::sub_result::MAX_DISTANCE;

    #[test]
    fn test_assemble_keeps_shape() {
        let mut sub = SubQueryResult::new(2, 3);
        sub.set_row(1, &[(0.5, 42)]);

        let result = QueryResult::assemble(sub);
        assert_eq!(result.len(), 6);
        assert_eq!(result.valid_count(0), 0);
        assert_eq!(result.hits(1), vec![(0.5, 42)]);
        assert_eq!(result.row(1).1, &[42, INVALID_ID, INVALID_ID]);
        assert_eq!(result.row(1).0[2], MAX_DISTANCE);
    }

    #[test]
    fn test_serializes_to_json() {
        let result = QueryResult::empty(1, 1);
        let json = serde_json::to_string(&result).unwrap();
        let back: QueryResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
    }
}
