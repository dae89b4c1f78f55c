//! # segsearch
//!
//! Top-K vector search over a growing, chunked segment.
//!
//! ## Features
//!
//! - Append-only chunked column storage with atomic row publication
//! - Snapshot reads by insertion timestamp
//! - Per-chunk small indexes that lag ingestion, with exact scans covering
//!   the rest
//! - Deletion bitmaps honored by both search paths
//! - Deterministic top-K merge, sequential or rayon-parallel
//! - Float (squared L2) and binary (Hamming, Jaccard, Tanimoto) metrics

pub mod config;
pub mod error;
pub mod index;
pub mod query;
pub mod schema;
pub mod segment;

pub mod prelude {
    pub use crate::config::{SearchConfig, SegmentConfig};
    pub use crate::error::{Result, SegSearchError};
    pub use crate::index::flat::FlatIndexBuilder;
    pub use crate::index::{SmallIndex, SmallIndexBuilder};
    pub use crate::query::bitmap::DeletionBitmaps;
    pub use crate::query::result::QueryResult;
    pub use crate::query::search::{SegmentSearcher, binary_search, float_search};
    pub use crate::query::{MetricType, QueryInfo, SearchRequest};
    pub use crate::schema::{DataType, FieldId, FieldMeta, Schema};
    pub use crate::segment::insert_record::InsertBatch;
    pub use crate::segment::{GrowingSegment, Timestamp};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
