//! Append-only chunked column storage.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{Result, SegSearchError};

/// A column of fixed-width rows split into chunks of `chunk_size` rows.
///
/// Chunks are reference counted and copy-on-write: a reader holding a chunk
/// keeps the contents it observed, and the single append path only ever adds
/// rows at the tail. A chunk that reached `chunk_size` rows is sealed and
/// never changes again.
#[derive(Debug)]
pub struct ChunkedVector<T> {
    chunk_size: usize,
    elements_per_row: usize,
    chunks: RwLock<Vec<Arc<Vec<T>>>>,
}

impl<T: Clone + Send + Sync> ChunkedVector<T> {
    /// Create an empty column.
    pub fn new(chunk_size: usize, elements_per_row: usize) -> Self {
        Self {
            chunk_size,
            elements_per_row,
            chunks: RwLock::new(Vec::new()),
        }
    }

    /// Rows per chunk.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Elements (floats, bytes, timestamps) stored per row.
    pub fn elements_per_row(&self) -> usize {
        self.elements_per_row
    }

    /// Number of allocated chunks, including a partially filled tail.
    pub fn num_chunks(&self) -> usize {
        self.chunks.read().len()
    }

    /// Get a chunk by id.
    pub fn get_chunk(&self, chunk_id: usize) -> Option<Arc<Vec<T>>> {
        self.chunks.read().get(chunk_id).cloned()
    }

    /// Clone the handles of every chunk currently allocated.
    pub fn snapshot(&self) -> Vec<Arc<Vec<T>>> {
        self.chunks.read().clone()
    }

    /// Append whole rows at the tail.
    ///
    /// Callers must serialize appends; concurrent readers are fine.
    pub(crate) fn append(&self, data: &[T]) -> Result<()> {
        if data.len() % self.elements_per_row != 0 {
            return Err(SegSearchError::storage(format!(
                "append of {} elements is not a multiple of row width {}",
                data.len(),
                self.elements_per_row
            )));
        }

        let chunk_elements = self.chunk_size * self.elements_per_row;
        let mut chunks = self.chunks.write();
        let mut remaining = data;

        while !remaining.is_empty() {
            let needs_new_chunk = chunks
                .last()
                .map(|chunk| chunk.len() >= chunk_elements)
                .unwrap_or(true);
            if needs_new_chunk {
                chunks.push(Arc::new(Vec::with_capacity(chunk_elements)));
            }

            let Some(tail) = chunks.last_mut() else {
                return Err(SegSearchError::storage("chunk list is empty after push"));
            };
            let tail = Arc::make_mut(tail);
            let take = (chunk_elements - tail.len()).min(remaining.len());
            tail.extend_from_slice(&remaining[..take]);
            remaining = &remaining[take..];
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_splits_into_chunks() {
        let column = ChunkedVector::<u32>::new(3, 2);
        column.append(&[0, 0, 1, 1]).unwrap();
        column.append(&[2, 2, 3, 3, 4, 4, 5, 5, 6, 6]).unwrap();

        assert_eq!(column.num_chunks(), 3);
        assert_eq!(*column.get_chunk(0).unwrap(), vec![0, 0, 1, 1, 2, 2]);
        assert_eq!(*column.get_chunk(1).unwrap(), vec![3, 3, 4, 4, 5, 5]);
        assert_eq!(*column.get_chunk(2).unwrap(), vec![6, 6]);
        assert!(column.get_chunk(3).is_none());
    }

    #[test]
    fn test_reader_snapshot_is_stable() {
        let column = ChunkedVector::<u8>::new(4, 1);
        column.append(&[1, 2]).unwrap();

        let held = column.get_chunk(0).unwrap();
        column.append(&[3]).unwrap();

        assert_eq!(*held, vec![1, 2]);
        assert_eq!(*column.get_chunk(0).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_rejects_partial_rows() {
        let column = ChunkedVector::<f32>::new(4, 4);
        assert!(column.append(&[1.0, 2.0, 3.0]).is_err());
        assert_eq!(column.num_chunks(), 0);
    }
}
