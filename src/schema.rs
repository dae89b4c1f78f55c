//! Field schema for a segment.
//!
//! A schema is an ordered list of vector fields. Each field has a caller
//! assigned [`FieldId`], a [`DataType`] and a dimension. Binary vector
//! dimensions count bits and must be a multiple of 8.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SegSearchError};

/// Caller-assigned field identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldId(pub i64);

impl std::fmt::Display for FieldId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Storage type of a vector field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    /// `dim` `f32` values per row.
    FloatVector,
    /// `dim` bits per row packed into `dim / 8` bytes.
    BinaryVector,
}

impl DataType {
    /// Get the name of this data type.
    pub fn name(&self) -> &'static str {
        match self {
            DataType::FloatVector => "float_vector",
            DataType::BinaryVector => "binary_vector",
        }
    }
}

/// Metadata for a single vector field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMeta {
    pub id: FieldId,
    pub name: String,
    pub data_type: DataType,
    pub dim: usize,
}

impl FieldMeta {
    /// Create a float vector field.
    pub fn float_vector(id: FieldId, name: impl Into<String>, dim: usize) -> Self {
        Self {
            id,
            name: name.into(),
            data_type: DataType::FloatVector,
            dim,
        }
    }

    /// Create a binary vector field. `dim` is in bits.
    pub fn binary_vector(id: FieldId, name: impl Into<String>, dim: usize) -> Self {
        Self {
            id,
            name: name.into(),
            data_type: DataType::BinaryVector,
            dim,
        }
    }

    /// Number of storage elements (floats or bytes) per row.
    pub fn elements_per_row(&self) -> usize {
        match self.data_type {
            DataType::FloatVector => self.dim,
            DataType::BinaryVector => self.dim / 8,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.dim == 0 {
            return Err(SegSearchError::schema(format!(
                "field {} ({}) has zero dimension",
                self.id, self.name
            )));
        }
        if self.data_type == DataType::BinaryVector && self.dim % 8 != 0 {
            return Err(SegSearchError::schema(format!(
                "binary field {} ({}) dimension {} is not a multiple of 8",
                self.id, self.name, self.dim
            )));
        }
        Ok(())
    }
}

/// Ordered collection of vector fields.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<FieldMeta>,
    offsets: AHashMap<FieldId, usize>,
}

impl Schema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field, rejecting duplicates and malformed dimensions.
    pub fn add_field(&mut self, field: FieldMeta) -> Result<()> {
        field.validate()?;
        if self.offsets.contains_key(&field.id) {
            return Err(SegSearchError::schema(format!(
                "field {} is already registered",
                field.id
            )));
        }
        self.offsets.insert(field.id, self.fields.len());
        self.fields.push(field);
        Ok(())
    }

    /// Builder-style [`Schema::add_field`].
    pub fn with_field(mut self, field: FieldMeta) -> Result<Self> {
        self.add_field(field)?;
        Ok(self)
    }

    /// Position of a field in the schema.
    pub fn offset(&self, id: FieldId) -> Option<usize> {
        self.offsets.get(&id).copied()
    }

    /// Look up a field by id.
    pub fn field(&self, id: FieldId) -> Result<&FieldMeta> {
        self.offset(id)
            .map(|offset| &self.fields[offset])
            .ok_or_else(|| SegSearchError::schema(format!("unknown field {id}")))
    }

    pub fn fields(&self) -> &[FieldMeta] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_lookup() {
        let schema = Schema::new()
            .with_field(FieldMeta::float_vector(FieldId(100), "embedding", 4))
            .unwrap()
            .with_field(FieldMeta::binary_vector(FieldId(101), "fingerprint", 64))
            .unwrap();

        assert_eq!(schema.len(), 2);
        assert_eq!(schema.offset(FieldId(101)), Some(1));
        assert_eq!(schema.field(FieldId(100)).unwrap().elements_per_row(), 4);
        assert_eq!(schema.field(FieldId(101)).unwrap().elements_per_row(), 8);
        assert!(matches!(
            schema.field(FieldId(7)),
            Err(SegSearchError::Schema(_))
        ));
    }

    #[test]
    fn test_rejects_malformed_fields() {
        let mut schema = Schema::new();
        assert!(
            schema
                .add_field(FieldMeta::binary_vector(FieldId(1), "bits", 12))
                .is_err()
        );
        assert!(
            schema
                .add_field(FieldMeta::float_vector(FieldId(2), "empty", 0))
                .is_err()
        );
        schema
            .add_field(FieldMeta::float_vector(FieldId(3), "v", 8))
            .unwrap();
        assert!(
            schema
                .add_field(FieldMeta::float_vector(FieldId(3), "dup", 8))
                .is_err()
        );
    }
}
