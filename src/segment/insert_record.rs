//! Raw row storage of a growing segment.

use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use ahash::AHashMap;
use parking_lot::Mutex;

use crate::error::{Result, SegSearchError};
use crate::schema::{DataType, FieldId, FieldMeta, Schema};
use crate::segment::Timestamp;
use crate::segment::chunked::ChunkedVector;

/// Row data for one field of an [`InsertBatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Float(Vec<f32>),
    Binary(Vec<u8>),
}

impl ColumnData {
    fn data_type(&self) -> DataType {
        match self {
            ColumnData::Float(_) => DataType::FloatVector,
            ColumnData::Binary(_) => DataType::BinaryVector,
        }
    }

    fn len(&self) -> usize {
        match self {
            ColumnData::Float(data) => data.len(),
            ColumnData::Binary(data) => data.len(),
        }
    }
}

/// A batch of rows to append: one timestamp per row plus a column for every
/// field of the schema.
#[derive(Debug, Clone, Default)]
pub struct InsertBatch {
    timestamps: Vec<Timestamp>,
    columns: AHashMap<FieldId, ColumnData>,
}

impl InsertBatch {
    pub fn new(timestamps: Vec<Timestamp>) -> Self {
        Self {
            timestamps,
            columns: AHashMap::new(),
        }
    }

    /// Attach row-major float vectors for a field.
    pub fn with_float(mut self, field: FieldId, data: Vec<f32>) -> Self {
        self.columns.insert(field, ColumnData::Float(data));
        self
    }

    /// Attach row-major packed binary vectors for a field.
    pub fn with_binary(mut self, field: FieldId, data: Vec<u8>) -> Self {
        self.columns.insert(field, ColumnData::Binary(data));
        self
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// Stored rows of a single field.
#[derive(Debug)]
pub enum FieldColumn {
    Float(ChunkedVector<f32>),
    Binary(ChunkedVector<u8>),
}

impl FieldColumn {
    fn for_field(field: &FieldMeta, chunk_size: usize) -> Self {
        match field.data_type {
            DataType::FloatVector => {
                FieldColumn::Float(ChunkedVector::new(chunk_size, field.elements_per_row()))
            }
            DataType::BinaryVector => {
                FieldColumn::Binary(ChunkedVector::new(chunk_size, field.elements_per_row()))
            }
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            FieldColumn::Float(_) => DataType::FloatVector,
            FieldColumn::Binary(_) => DataType::BinaryVector,
        }
    }

    pub fn chunk_size(&self) -> usize {
        match self {
            FieldColumn::Float(column) => column.chunk_size(),
            FieldColumn::Binary(column) => column.chunk_size(),
        }
    }

    /// Get the raw contents of a chunk.
    pub fn get_chunk(&self, chunk_id: usize) -> Option<ChunkData> {
        match self {
            FieldColumn::Float(column) => column.get_chunk(chunk_id).map(ChunkData::Float),
            FieldColumn::Binary(column) => column.get_chunk(chunk_id).map(ChunkData::Binary),
        }
    }

    fn append(&self, data: &ColumnData) -> Result<()> {
        match (self, data) {
            (FieldColumn::Float(column), ColumnData::Float(rows)) => column.append(rows),
            (FieldColumn::Binary(column), ColumnData::Binary(rows)) => column.append(rows),
            _ => Err(SegSearchError::storage("column type does not match row data")),
        }
    }
}

/// Shared handle to the raw contents of one chunk.
#[derive(Debug, Clone)]
pub enum ChunkData {
    Float(Arc<Vec<f32>>),
    Binary(Arc<Vec<u8>>),
}

impl ChunkData {
    pub fn data_type(&self) -> DataType {
        match self {
            ChunkData::Float(_) => DataType::FloatVector,
            ChunkData::Binary(_) => DataType::BinaryVector,
        }
    }
}

/// Per-row timestamps and field columns of a segment.
///
/// `row_count` is published with release ordering after every column of a
/// batch has been appended, so any reader that observes it with acquire
/// ordering can read all rows below it.
#[derive(Debug)]
pub struct InsertRecord {
    chunk_size: usize,
    timestamps: ChunkedVector<Timestamp>,
    columns: Vec<FieldColumn>,
    row_count: AtomicUsize,
    /// Serializes appends and remembers the last timestamp written.
    append_state: Mutex<Option<Timestamp>>,
}

impl InsertRecord {
    pub fn new(schema: &Schema, chunk_size: usize) -> Self {
        Self {
            chunk_size,
            timestamps: ChunkedVector::new(chunk_size, 1),
            columns: schema
                .fields()
                .iter()
                .map(|field| FieldColumn::for_field(field, chunk_size))
                .collect(),
            row_count: AtomicUsize::new(0),
            append_state: Mutex::new(None),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Number of published rows.
    pub fn row_count(&self) -> usize {
        self.row_count.load(Ordering::Acquire)
    }

    pub fn timestamps(&self) -> &ChunkedVector<Timestamp> {
        &self.timestamps
    }

    /// Column at a schema offset.
    pub fn column(&self, offset: usize) -> Option<&FieldColumn> {
        self.columns.get(offset)
    }

    /// Validate and append a batch, returning the segment offsets it occupies.
    pub fn insert(&self, schema: &Schema, batch: &InsertBatch) -> Result<Range<usize>> {
        let rows = batch.len();
        let mut last_timestamp = self.append_state.lock();

        if batch.columns.len() != schema.len() {
            return Err(SegSearchError::invalid_argument(format!(
                "insert carries {} columns, schema has {} fields",
                batch.columns.len(),
                schema.len()
            )));
        }

        let mut previous = *last_timestamp;
        for &timestamp in &batch.timestamps {
            if let Some(prev) = previous
                && timestamp < prev
            {
                return Err(SegSearchError::invalid_argument(format!(
                    "insert timestamp {timestamp} precedes {prev}"
                )));
            }
            previous = Some(timestamp);
        }

        for field in schema.fields() {
            let data = batch.columns.get(&field.id).ok_or_else(|| {
                SegSearchError::invalid_argument(format!("insert is missing field {}", field.id))
            })?;
            if data.data_type() != field.data_type {
                return Err(SegSearchError::schema(format!(
                    "field {} expects {}, insert carries {}",
                    field.id,
                    field.data_type.name(),
                    data.data_type().name()
                )));
            }
            if data.len() != rows * field.elements_per_row() {
                return Err(SegSearchError::invalid_argument(format!(
                    "field {} expects {} elements for {} rows, got {}",
                    field.id,
                    rows * field.elements_per_row(),
                    rows,
                    data.len()
                )));
            }
        }

        if rows == 0 {
            let start = self.row_count();
            return Ok(start..start);
        }

        for (offset, field) in schema.fields().iter().enumerate() {
            if let Some(data) = batch.columns.get(&field.id) {
                self.columns[offset].append(data)?;
            }
        }
        self.timestamps.append(&batch.timestamps)?;

        *last_timestamp = previous;
        let start = self.row_count.fetch_add(rows, Ordering::Release);
        Ok(start..start + rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::new()
            .with_field(FieldMeta::float_vector(FieldId(1), "vec", 2))
            .unwrap()
    }

    #[test]
    fn test_insert_publishes_rows() {
        let schema = schema();
        let record = InsertRecord::new(&schema, 2);

        let range = record
            .insert(
                &schema,
                &InsertBatch::new(vec![1, 2, 2]).with_float(FieldId(1), vec![0.0; 6]),
            )
            .unwrap();
        assert_eq!(range, 0..3);
        assert_eq!(record.row_count(), 3);
        assert_eq!(record.timestamps().num_chunks(), 2);

        let range = record
            .insert(
                &schema,
                &InsertBatch::new(vec![5]).with_float(FieldId(1), vec![1.0, 1.0]),
            )
            .unwrap();
        assert_eq!(range, 3..4);
    }

    #[test]
    fn test_rejects_decreasing_timestamps() {
        let schema = schema();
        let record = InsertRecord::new(&schema, 4);
        record
            .insert(
                &schema,
                &InsertBatch::new(vec![10]).with_float(FieldId(1), vec![0.0; 2]),
            )
            .unwrap();

        let result = record.insert(
            &schema,
            &InsertBatch::new(vec![9]).with_float(FieldId(1), vec![0.0; 2]),
        );
        assert!(result.is_err());
        assert_eq!(record.row_count(), 1);
    }

    #[test]
    fn test_rejects_mismatched_columns() {
        let schema = schema();
        let record = InsertRecord::new(&schema, 4);

        let wrong_type = InsertBatch::new(vec![1]).with_binary(FieldId(1), vec![0; 2]);
        assert!(matches!(
            record.insert(&schema, &wrong_type),
            Err(SegSearchError::Schema(_))
        ));

        let wrong_len = InsertBatch::new(vec![1]).with_float(FieldId(1), vec![0.0; 3]);
        assert!(record.insert(&schema, &wrong_len).is_err());

        let missing = InsertBatch::new(vec![1]);
        assert!(record.insert(&schema, &missing).is_err());
        assert_eq!(record.row_count(), 0);
    }
}
