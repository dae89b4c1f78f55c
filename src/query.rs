//! Top-K vector search over a growing segment.
//!
//! A search resolves the snapshot barrier, queries the small index of every
//! fully indexed chunk, scans the remaining visible chunks exactly, and
//! merges all partial results into one top-K per query row.
//!
//! # Module Structure
//!
//! - `visibility`: snapshot barrier resolution
//! - `bitmap`: deletion bitmaps and alive masks
//! - `metric`: distance metrics
//! - `sub_result`: partial results and the top-K merge
//! - `brute_force`: exact chunk scans
//! - `search`: the search pipeline
//! - `result`: the assembled query result

pub mod bitmap;
pub mod brute_force;
pub mod metric;
pub mod result;
pub mod search;
pub mod sub_result;
pub mod visibility;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SegSearchError};
use crate::schema::{DataType, FieldId, FieldMeta};
use crate::segment::Timestamp;

pub use self::metric::MetricType;

/// What to search: the field, the metric and how many results per query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryInfo {
    pub field_id: FieldId,
    pub metric_type: MetricType,
    pub topk: usize,
}

impl QueryInfo {
    pub fn new(field_id: FieldId, metric_type: MetricType, topk: usize) -> Self {
        Self {
            field_id,
            metric_type,
            topk,
        }
    }
}

/// Row-major query vectors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QueryVectors<'a> {
    /// `dim` floats per query.
    Float(&'a [f32]),
    /// `dim / 8` packed bytes per query.
    Binary(&'a [u8]),
}

impl QueryVectors<'_> {
    pub fn data_type(&self) -> DataType {
        match self {
            QueryVectors::Float(_) => DataType::FloatVector,
            QueryVectors::Binary(_) => DataType::BinaryVector,
        }
    }

    fn len(&self) -> usize {
        match self {
            QueryVectors::Float(data) => data.len(),
            QueryVectors::Binary(data) => data.len(),
        }
    }
}

/// Query vectors checked against a field: the view handed to searchers and
/// small index backends.
#[derive(Debug, Clone, Copy)]
pub struct QueryDataset<'a> {
    pub vectors: QueryVectors<'a>,
    pub num_queries: usize,
    /// Floats or bytes per query vector.
    pub elements_per_row: usize,
}

impl<'a> QueryDataset<'a> {
    /// Validate query vectors against a field.
    pub fn new(vectors: QueryVectors<'a>, num_queries: usize, field: &FieldMeta) -> Result<Self> {
        if vectors.data_type() != field.data_type {
            return Err(SegSearchError::schema(format!(
                "field {} holds {}, query carries {}",
                field.id,
                field.data_type.name(),
                vectors.data_type().name()
            )));
        }
        let elements_per_row = field.elements_per_row();
        if vectors.len() != num_queries * elements_per_row {
            return Err(SegSearchError::query(format!(
                "query buffer holds {} elements, expected {} ({} queries x {})",
                vectors.len(),
                num_queries * elements_per_row,
                num_queries,
                elements_per_row
            )));
        }
        Ok(Self {
            vectors,
            num_queries,
            elements_per_row,
        })
    }

    pub fn data_type(&self) -> DataType {
        self.vectors.data_type()
    }
}

/// A complete search request against one segment.
#[derive(Debug, Clone, Copy)]
pub struct SearchRequest<'a> {
    pub info: QueryInfo,
    pub vectors: QueryVectors<'a>,
    pub num_queries: usize,
    /// Snapshot timestamp; rows inserted later are invisible.
    pub timestamp: Timestamp,
}

impl<'a> SearchRequest<'a> {
    pub fn float(info: QueryInfo, data: &'a [f32], num_queries: usize, timestamp: Timestamp) -> Self {
        Self {
            info,
            vectors: QueryVectors::Float(data),
            num_queries,
            timestamp,
        }
    }

    pub fn binary(info: QueryInfo, data: &'a [u8], num_queries: usize, timestamp: Timestamp) -> Self {
        Self {
            info,
            vectors: QueryVectors::Binary(data),
            num_queries,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_validation() {
        let field = FieldMeta::binary_vector(FieldId(5), "bits", 64);

        let data = [0u8; 16];
        let dataset = QueryDataset::new(QueryVectors::Binary(&data), 2, &field).unwrap();
        assert_eq!(dataset.elements_per_row, 8);

        assert!(matches!(
            QueryDataset::new(QueryVectors::Binary(&data), 3, &field),
            Err(SegSearchError::Query(_))
        ));
        assert!(matches!(
            QueryDataset::new(QueryVectors::Float(&[0.0; 8]), 1, &field),
            Err(SegSearchError::Schema(_))
        ));
    }
}
