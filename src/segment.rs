//! A growing segment: chunked raw rows plus per-chunk small indexes.
//!
//! Rows are appended through a single serialized path and published by an
//! atomic row count. Full chunks are sealed and never change again; small
//! indexes are published for sealed chunks in chunk-id order, lagging
//! ingestion. Searches only read published state.

pub mod chunked;
pub mod indexing_record;
pub mod insert_record;

use std::ops::Range;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::config::SegmentConfig;
use crate::error::{Result, SegSearchError};
use crate::index::{SmallIndex, SmallIndexBuilder};
use crate::schema::{FieldId, FieldMeta, Schema};

use self::indexing_record::IndexingRecord;
use self::insert_record::{ChunkData, InsertBatch, InsertRecord};

/// Logical insertion timestamp of a row.
pub type Timestamp = u64;

/// A growing segment of one collection shard.
#[derive(Debug)]
pub struct GrowingSegment {
    schema: Arc<Schema>,
    config: SegmentConfig,
    insert_record: InsertRecord,
    indexing_record: IndexingRecord,
    /// Serializes index builders.
    build_lock: Mutex<()>,
}

impl GrowingSegment {
    pub fn new(schema: Schema, config: SegmentConfig) -> Result<Self> {
        config.validate()?;
        if schema.is_empty() {
            return Err(SegSearchError::schema("segment schema has no fields"));
        }
        let insert_record = InsertRecord::new(&schema, config.chunk_size);
        let indexing_record = IndexingRecord::new(&schema, config.chunk_size);
        Ok(Self {
            schema: Arc::new(schema),
            config,
            insert_record,
            indexing_record,
            build_lock: Mutex::new(()),
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn chunk_size(&self) -> usize {
        self.config.chunk_size
    }

    /// Number of published rows.
    pub fn row_count(&self) -> usize {
        self.insert_record.row_count()
    }

    /// Number of full chunks.
    pub fn sealed_chunk_count(&self) -> usize {
        self.row_count() / self.chunk_size()
    }

    pub fn insert_record(&self) -> &InsertRecord {
        &self.insert_record
    }

    pub fn indexing_record(&self) -> &IndexingRecord {
        &self.indexing_record
    }

    /// Append a batch of rows; returns the segment offsets assigned to them.
    pub fn insert(&self, batch: &InsertBatch) -> Result<Range<usize>> {
        let range = self.insert_record.insert(&self.schema, batch)?;
        debug!(
            rows = range.len(),
            row_count = range.end,
            "inserted rows into segment"
        );
        Ok(range)
    }

    /// Raw contents of a chunk of a field.
    pub fn get_chunk(&self, field_id: FieldId, chunk_id: usize) -> Result<ChunkData> {
        let offset = self
            .schema
            .offset(field_id)
            .ok_or_else(|| SegSearchError::schema(format!("unknown field {field_id}")))?;
        self.insert_record
            .column(offset)
            .and_then(|column| column.get_chunk(chunk_id))
            .ok_or_else(|| {
                SegSearchError::storage(format!("field {field_id} has no chunk {chunk_id}"))
            })
    }

    /// Publish a built index for the next unindexed sealed chunk of a field.
    pub fn publish_index(
        &self,
        field_id: FieldId,
        chunk_id: usize,
        index: Arc<dyn SmallIndex>,
    ) -> Result<()> {
        self.indexing_record
            .publish(field_id, chunk_id, index, self.sealed_chunk_count())
    }

    /// Build and publish indexes for every sealed chunk that has none yet.
    ///
    /// Returns the number of indexes published across all fields.
    pub fn build_small_indexes(&self, builder: &dyn SmallIndexBuilder) -> Result<usize> {
        let _guard = self.build_lock.lock();
        let sealed = self.sealed_chunk_count();
        let mut published = 0;

        for field in self.schema.fields() {
            published += self.build_field_indexes(field, sealed, builder)?;
        }

        if published > 0 {
            debug!(published, sealed, "published small indexes");
        }
        Ok(published)
    }

    fn build_field_indexes(
        &self,
        field: &FieldMeta,
        sealed: usize,
        builder: &dyn SmallIndexBuilder,
    ) -> Result<usize> {
        let entry = self.indexing_record.entry(field.id)?;
        let first = entry.max_indexed_chunk_count();
        for chunk_id in first..sealed {
            let chunk = self.get_chunk(field.id, chunk_id)?;
            let index = builder.build(field, chunk)?;
            self.indexing_record
                .publish(field.id, chunk_id, index, sealed)?;
        }
        Ok(sealed.saturating_sub(first))
    }
}
