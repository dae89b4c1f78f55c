//! Flat small index: an exact scan packaged behind the index interface.

use std::sync::Arc;

use crate::error::{Result, SegSearchError};
use crate::index::{SmallIndex, SmallIndexBuilder};
use crate::query::QueryDataset;
use crate::query::bitmap::AliveMask;
use crate::query::brute_force::{self, ChunkRows};
use crate::query::metric::MetricType;
use crate::query::sub_result::SubQueryResult;
use crate::schema::FieldMeta;
use crate::segment::insert_record::ChunkData;

/// Small index that answers queries by scanning its sealed chunk.
#[derive(Debug)]
pub struct FlatSmallIndex {
    chunk: ChunkData,
    row_count: usize,
}

impl FlatSmallIndex {
    /// Create an index over a sealed chunk of the given field.
    pub fn new(field: &FieldMeta, chunk: ChunkData) -> Result<Self> {
        if chunk.data_type() != field.data_type {
            return Err(SegSearchError::schema(format!(
                "field {} holds {}, chunk holds {}",
                field.id,
                field.data_type.name(),
                chunk.data_type().name()
            )));
        }
        let elements = match &chunk {
            ChunkData::Float(data) => data.len(),
            ChunkData::Binary(data) => data.len(),
        };
        let row_count = elements / field.elements_per_row();
        Ok(Self { chunk, row_count })
    }
}

impl SmallIndex for FlatSmallIndex {
    fn query(
        &self,
        dataset: &QueryDataset<'_>,
        topk: usize,
        metric: MetricType,
        alive: &AliveMask,
    ) -> Result<SubQueryResult> {
        let rows = match &self.chunk {
            ChunkData::Float(data) => ChunkRows::Float(data),
            ChunkData::Binary(data) => ChunkRows::Binary(data),
        };
        brute_force::search_chunk(dataset, rows, self.row_count, topk, metric, alive)
    }

    fn row_count(&self) -> usize {
        self.row_count
    }

    fn name(&self) -> &'static str {
        "flat"
    }
}

/// Builder producing [`FlatSmallIndex`] instances.
#[derive(Debug, Default, Clone, Copy)]
pub struct FlatIndexBuilder;

impl SmallIndexBuilder for FlatIndexBuilder {
    fn build(&self, field: &FieldMeta, chunk: ChunkData) -> Result<Arc<dyn SmallIndex>> {
        Ok(Arc::new(FlatSmallIndex::new(field, chunk)?))
    }
}
