//! Small index backends built over sealed chunks.
//!
//! The search core only needs one capability from an index: answer a batch
//! of top-K queries over its chunk while honoring an alive mask. Any ANN
//! backend can plug in by implementing [`SmallIndex`]; the segment builds
//! indexes through a [`SmallIndexBuilder`].

pub mod flat;

use std::fmt::Debug;
use std::sync::Arc;

use crate::error::Result;
use crate::query::QueryDataset;
use crate::query::bitmap::AliveMask;
use crate::query::metric::MetricType;
use crate::query::sub_result::SubQueryResult;
use crate::schema::FieldMeta;
use crate::segment::insert_record::ChunkData;

/// An approximate-nearest-neighbor index over the rows of one chunk.
pub trait SmallIndex: Send + Sync + Debug {
    /// Return up to `topk` matches per query row with chunk-local ids.
    ///
    /// Rows that are not alive in `alive` must never be returned. Missing
    /// matches are reported as sentinel slots.
    fn query(
        &self,
        dataset: &QueryDataset<'_>,
        topk: usize,
        metric: MetricType,
        alive: &AliveMask,
    ) -> Result<SubQueryResult>;

    /// Number of rows covered by the index.
    fn row_count(&self) -> usize;

    /// Get the name of this index type.
    fn name(&self) -> &'static str;
}

/// Builds a [`SmallIndex`] for a sealed chunk of a field.
pub trait SmallIndexBuilder: Send + Sync + Debug {
    fn build(&self, field: &FieldMeta, chunk: ChunkData) -> Result<Arc<dyn SmallIndex>>;
}
