//! Deletion bitmaps and the alive masks derived from them.

use bit_vec::BitVec;

use crate::error::{Result, SegSearchError};

/// Per-chunk deletion bitsets supplied by the caller; a set bit marks a
/// deleted row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeletionBitmaps {
    chunk_size: usize,
    chunks: Vec<BitVec>,
}

impl DeletionBitmaps {
    /// Create an empty set for a segment with the given chunk size.
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            chunks: Vec::new(),
        }
    }

    /// Wrap bitsets produced elsewhere, one per chunk.
    pub fn from_chunks(chunk_size: usize, chunks: Vec<BitVec>) -> Self {
        Self { chunk_size, chunks }
    }

    /// Create a set covering `row_count` rows with nothing deleted.
    pub fn for_rows(chunk_size: usize, row_count: usize) -> Self {
        let mut bitmaps = Self::new(chunk_size);
        bitmaps.ensure_chunks(row_count.div_ceil(chunk_size.max(1)));
        bitmaps
    }

    fn ensure_chunks(&mut self, count: usize) {
        while self.chunks.len() < count {
            self.chunks.push(BitVec::from_elem(self.chunk_size, false));
        }
    }

    /// Mark the row at a segment offset as deleted.
    pub fn mark_deleted(&mut self, offset: usize) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(SegSearchError::invalid_argument(
                "deletion bitmaps need a positive chunk size",
            ));
        }
        let chunk_id = offset / self.chunk_size;
        self.ensure_chunks(chunk_id + 1);
        self.chunks[chunk_id].set(offset % self.chunk_size, true);
        Ok(())
    }

    /// Whether the row at a segment offset is marked deleted.
    pub fn is_deleted(&self, offset: usize) -> bool {
        if self.chunk_size == 0 {
            return false;
        }
        self.chunks
            .get(offset / self.chunk_size)
            .and_then(|bits| bits.get(offset % self.chunk_size))
            .unwrap_or(false)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Deletion bitset of one chunk.
    pub fn chunk(&self, chunk_id: usize) -> Option<&BitVec> {
        self.chunks.get(chunk_id)
    }

    pub fn num_chunks(&self) -> usize {
        self.chunks.len()
    }
}

/// Rows of a chunk that may appear in search results.
#[derive(Debug, Clone, PartialEq)]
pub enum AliveMask {
    /// No filtering: every row is alive.
    All,
    /// Row `r` is alive iff bit `r` is set. Rows past the end are alive.
    Filtered(BitVec),
}

impl AliveMask {
    pub fn is_alive(&self, row: usize) -> bool {
        match self {
            AliveMask::All => true,
            AliveMask::Filtered(bits) => bits.get(row).unwrap_or(true),
        }
    }

    pub fn is_filtered(&self) -> bool {
        matches!(self, AliveMask::Filtered(_))
    }

    /// Number of alive rows among the first `rows` rows.
    pub fn alive_count(&self, rows: usize) -> usize {
        (0..rows).filter(|&row| self.is_alive(row)).count()
    }
}

/// Derive the alive mask of a chunk.
///
/// Without a bitmap set every row is alive. With one, the chunk's deletion
/// bitset is complemented afresh on every call.
pub fn alive_mask(bitmaps: Option<&DeletionBitmaps>, chunk_id: usize) -> Result<AliveMask> {
    let Some(bitmaps) = bitmaps else {
        return Ok(AliveMask::All);
    };
    let deleted = bitmaps.chunk(chunk_id).ok_or_else(|| {
        SegSearchError::invalid_argument(format!(
            "deletion bitmaps cover {} chunks, chunk {} requested",
            bitmaps.num_chunks(),
            chunk_id
        ))
    })?;

    let mut alive = deleted.clone();
    alive.negate();
    Ok(AliveMask::Filtered(alive))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_bitmaps_mean_no_filter() {
        let mask = alive_mask(None, 42).unwrap();
        assert_eq!(mask, AliveMask::All);
        assert!(mask.is_alive(1_000_000));
    }

    #[test]
    fn test_mask_is_complement() {
        let mut bitmaps = DeletionBitmaps::for_rows(4, 8);
        bitmaps.mark_deleted(1).unwrap();
        bitmaps.mark_deleted(6).unwrap();

        let first = alive_mask(Some(&bitmaps), 0).unwrap();
        assert!(first.is_filtered());
        assert!(first.is_alive(0));
        assert!(!first.is_alive(1));
        assert_eq!(first.alive_count(4), 3);

        let second = alive_mask(Some(&bitmaps), 1).unwrap();
        assert!(!second.is_alive(2));
        assert!(second.is_alive(3));
        assert!(bitmaps.is_deleted(6));
        assert!(!bitmaps.is_deleted(7));
    }

    #[test]
    fn test_empty_bitset_keeps_rows_alive() {
        let bitmaps = DeletionBitmaps::from_chunks(4, vec![BitVec::new()]);
        let mask = alive_mask(Some(&bitmaps), 0).unwrap();
        assert_eq!(mask.alive_count(4), 4);
    }

    #[test]
    fn test_missing_chunk_is_an_error() {
        let bitmaps = DeletionBitmaps::for_rows(4, 4);
        assert!(alive_mask(Some(&bitmaps), 1).is_err());
    }

    #[test]
    fn test_mark_deleted_grows_chunks() {
        let mut bitmaps = DeletionBitmaps::new(10);
        bitmaps.mark_deleted(25).unwrap();
        assert_eq!(bitmaps.num_chunks(), 3);
        assert!(bitmaps.is_deleted(25));
    }
}
