//! Partial top-K results and the merge that combines them.
//!
//! A [`SubQueryResult`] holds, for each query row, up to `topk`
//! `(distance, id)` pairs in ascending order. Unfilled slots hold
//! [`INVALID_ID`] and [`MAX_DISTANCE`].
//!
//! Entries are ordered by distance (IEEE total order), then by ascending id.
//! Sentinel entries sort after every real entry regardless of distance, so
//! they never displace a real match. With that total order, [`merge_rows`]
//! is commutative and associative: the final top-K does not depend on the
//! order in which chunk results are merged.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::error::{Result, SegSearchError};

/// Id of an unfilled result slot.
pub const INVALID_ID: i64 = -1;

/// Distance of an unfilled result slot.
pub const MAX_DISTANCE: f32 = f32::MAX;

/// Total order on `(distance, id)` entries used by every top-K operation.
pub fn compare_entries(a: (f32, i64), b: (f32, i64)) -> Ordering {
    match (a.1 == INVALID_ID, b.1 == INVALID_ID) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)),
    }
}

/// Merge two ascending rows into the `out` row, keeping the smallest
/// `out.len()` entries.
///
/// Rows may be shorter than the output; the output tail is sentinel-filled.
pub fn merge_rows(
    a_dist: &[f32],
    a_ids: &[i64],
    b_dist: &[f32],
    b_ids: &[i64],
    out_dist: &mut [f32],
    out_ids: &mut [i64],
) {
    let (mut i, mut j) = (0, 0);
    for slot in 0..out_ids.len() {
        let a = (i < a_ids.len()).then(|| (a_dist[i], a_ids[i]));
        let b = (j < b_ids.len()).then(|| (b_dist[j], b_ids[j]));
        let next = match (a, b) {
            (Some(a), Some(b)) => {
                if compare_entries(a, b) != Ordering::Greater {
                    i += 1;
                    a
                } else {
                    j += 1;
                    b
                }
            }
            (Some(a), None) => {
                i += 1;
                a
            }
            (None, Some(b)) => {
                j += 1;
                b
            }
            (None, None) => (MAX_DISTANCE, INVALID_ID),
        };

        if next.1 == INVALID_ID {
            out_dist[slot..].fill(MAX_DISTANCE);
            out_ids[slot..].fill(INVALID_ID);
            return;
        }
        out_dist[slot] = next.0;
        out_ids[slot] = next.1;
    }
}

/// Top-K results of one chunk (or of several chunks merged), per query row.
#[derive(Debug, Clone, PartialEq)]
pub struct SubQueryResult {
    num_queries: usize,
    topk: usize,
    distances: Vec<f32>,
    ids: Vec<i64>,
}

impl SubQueryResult {
    /// Create a result with every slot unfilled.
    pub fn new(num_queries: usize, topk: usize) -> Self {
        Self {
            num_queries,
            topk,
            distances: vec![MAX_DISTANCE; num_queries * topk],
            ids: vec![INVALID_ID; num_queries * topk],
        }
    }

    /// Wrap flat row-major arrays, checking their lengths.
    pub fn from_parts(
        num_queries: usize,
        topk: usize,
        distances: Vec<f32>,
        ids: Vec<i64>,
    ) -> Result<Self> {
        let expected = num_queries * topk;
        if distances.len() != expected || ids.len() != expected {
            return Err(SegSearchError::index(format!(
                "result arrays hold {} distances and {} ids, expected {} ({} queries x top {})",
                distances.len(),
                ids.len(),
                expected,
                num_queries,
                topk
            )));
        }
        Ok(Self {
            num_queries,
            topk,
            distances,
            ids,
        })
    }

    pub fn num_queries(&self) -> usize {
        self.num_queries
    }

    pub fn topk(&self) -> usize {
        self.topk
    }

    pub fn distances(&self) -> &[f32] {
        &self.distances
    }

    pub fn ids(&self) -> &[i64] {
        &self.ids
    }

    /// Distances and ids of one query row.
    pub fn row(&self, query: usize) -> (&[f32], &[i64]) {
        let range = query * self.topk..(query + 1) * self.topk;
        (&self.distances[range.clone()], &self.ids[range])
    }

    /// Overwrite one query row from an ascending list of entries.
    pub fn set_row(&mut self, query: usize, entries: &[(f32, i64)]) {
        let start = query * self.topk;
        for slot in 0..self.topk {
            let (distance, id) = entries
                .get(slot)
                .copied()
                .unwrap_or((MAX_DISTANCE, INVALID_ID));
            self.distances[start + slot] = distance;
            self.ids[start + slot] = id;
        }
    }

    /// Translate chunk-local ids into segment ids. Sentinels are untouched.
    pub fn shift_ids(&mut self, offset: i64) {
        for id in self.ids.iter_mut().filter(|id| **id != INVALID_ID) {
            *id += offset;
        }
    }

    /// Put every row in canonical order: ascending entries, sentinels last.
    ///
    /// Results from an index backend are normalized before merging so that
    /// ties come out in the same order no matter which backend produced them.
    pub fn sort_rows(&mut self) {
        for query in 0..self.num_queries {
            let range = query * self.topk..(query + 1) * self.topk;
            let mut entries: Vec<(f32, i64)> = self.distances[range.clone()]
                .iter()
                .copied()
                .zip(self.ids[range].iter().copied())
                .collect();
            entries.sort_unstable_by(|a, b| compare_entries(*a, *b));
            self.set_row(query, &entries);
        }
    }

    /// Number of real (non-sentinel) entries in a query row.
    pub fn valid_count(&self, query: usize) -> usize {
        self.row(query).1.iter().filter(|id| **id != INVALID_ID).count()
    }

    /// Merge two results into a new one holding the best `topk` per row.
    pub fn merge(&self, other: &SubQueryResult) -> Result<SubQueryResult> {
        if self.num_queries != other.num_queries || self.topk != other.topk {
            return Err(SegSearchError::query(format!(
                "cannot merge results of shape {}x{} and {}x{}",
                self.num_queries, self.topk, other.num_queries, other.topk
            )));
        }

        let mut merged = SubQueryResult::new(self.num_queries, self.topk);
        for query in 0..self.num_queries {
            let (a_dist, a_ids) = self.row(query);
            let (b_dist, b_ids) = other.row(query);
            let range = query * self.topk..(query + 1) * self.topk;
            merge_rows(
                a_dist,
                a_ids,
                b_dist,
                b_ids,
                &mut merged.distances[range.clone()],
                &mut merged.ids[range],
            );
        }
        Ok(merged)
    }

    /// Merge `other` into this result in place.
    pub fn merge_from(&mut self, other: &SubQueryResult) -> Result<()> {
        *self = self.merge(other)?;
        Ok(())
    }

    pub fn into_parts(self) -> (Vec<f32>, Vec<i64>) {
        (self.distances, self.ids)
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    distance: f32,
    id: i64,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: the worst kept entry sits on top
        compare_entries((self.distance, self.id), (other.distance, other.id))
    }
}

/// Bounded collector that keeps the `topk` smallest entries it has seen.
#[derive(Debug)]
pub struct TopKCollector {
    topk: usize,
    heap: BinaryHeap<Candidate>,
}

impl TopKCollector {
    pub fn new(topk: usize) -> Self {
        Self {
            topk,
            heap: BinaryHeap::with_capacity(topk + 1),
        }
    }

    /// Offer an entry; it is kept only if it ranks among the best `topk`.
    pub fn collect(&mut self, distance: f32, id: i64) {
        if self.topk == 0 || id == INVALID_ID {
            return;
        }
        let candidate = Candidate { distance, id };
        if self.heap.len() < self.topk {
            self.heap.push(candidate);
        } else if let Some(worst) = self.heap.peek()
            && candidate < *worst
        {
            self.heap.pop();
            self.heap.push(candidate);
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Kept entries in ascending order.
    pub fn into_sorted_vec(self) -> Vec<(f32, i64)> {
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|c| (c.distance, c.id))
            .collect()
    }
}
