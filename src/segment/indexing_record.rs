//! Small indexes published for the sealed chunks of a segment.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use ahash::AHashMap;
use parking_lot::RwLock;

use crate::error::{Result, SegSearchError};
use crate::index::SmallIndex;
use crate::schema::{FieldId, Schema};

/// Chunk indexes of a single vector field.
///
/// Indexes are published in chunk-id order. `max_indexed` counts the
/// leading chunks whose index is complete and is only advanced (with release
/// ordering) after the index has been stored.
#[derive(Debug)]
pub struct IndexingEntry {
    field_id: FieldId,
    chunk_size: usize,
    indexes: RwLock<Vec<Arc<dyn SmallIndex>>>,
    max_indexed: AtomicUsize,
}

impl IndexingEntry {
    fn new(field_id: FieldId, chunk_size: usize) -> Self {
        Self {
            field_id,
            chunk_size,
            indexes: RwLock::new(Vec::new()),
            max_indexed: AtomicUsize::new(0),
        }
    }

    pub fn field_id(&self) -> FieldId {
        self.field_id
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Number of leading chunks with a complete index.
    pub fn max_indexed_chunk_count(&self) -> usize {
        self.max_indexed.load(Ordering::Acquire)
    }

    /// Get the index of a chunk below `max_indexed`.
    pub fn get_index(&self, chunk_id: usize) -> Result<Arc<dyn SmallIndex>> {
        self.indexes.read().get(chunk_id).cloned().ok_or_else(|| {
            SegSearchError::index(format!(
                "field {} has no index for chunk {}",
                self.field_id, chunk_id
            ))
        })
    }

    fn publish(&self, chunk_id: usize, index: Arc<dyn SmallIndex>) -> Result<()> {
        let mut indexes = self.indexes.write();
        if chunk_id != indexes.len() {
            return Err(SegSearchError::index(format!(
                "field {} expects chunk {} to be indexed next, got {}",
                self.field_id,
                indexes.len(),
                chunk_id
            )));
        }
        if index.row_count() != self.chunk_size {
            return Err(SegSearchError::index(format!(
                "index for chunk {} covers {} rows, chunk holds {}",
                chunk_id,
                index.row_count(),
                self.chunk_size
            )));
        }
        indexes.push(index);
        self.max_indexed.store(indexes.len(), Ordering::Release);
        Ok(())
    }
}

/// Per-field chunk indexes of a segment.
#[derive(Debug)]
pub struct IndexingRecord {
    chunk_size: usize,
    entries: AHashMap<FieldId, IndexingEntry>,
}

impl IndexingRecord {
    pub fn new(schema: &Schema, chunk_size: usize) -> Self {
        let entries = schema
            .fields()
            .iter()
            .map(|field| (field.id, IndexingEntry::new(field.id, chunk_size)))
            .collect();
        Self {
            chunk_size,
            entries,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Get the indexing entry of a field.
    pub fn entry(&self, field_id: FieldId) -> Result<&IndexingEntry> {
        self.entries
            .get(&field_id)
            .ok_or_else(|| SegSearchError::schema(format!("unknown field {field_id}")))
    }

    /// Publish the index of the next chunk of a field.
    ///
    /// `sealed_chunks` is the number of chunks that are full at the time of
    /// the call; indexes for unsealed chunks are rejected.
    pub fn publish(
        &self,
        field_id: FieldId,
        chunk_id: usize,
        index: Arc<dyn SmallIndex>,
        sealed_chunks: usize,
    ) -> Result<()> {
        if chunk_id >= sealed_chunks {
            return Err(SegSearchError::index(format!(
                "chunk {chunk_id} is not sealed ({sealed_chunks} sealed chunks)"
            )));
        }
        self.entry(field_id)?.publish(chunk_id, index)
    }
}
