//! Distance metrics for exact vector comparison.
//!
//! Every metric here is a distance: smaller means closer. Float vectors use
//! squared Euclidean distance; packed binary vectors use Hamming, Jaccard or
//! Tanimoto distance over `dim / 8` bytes.

use serde::{Deserialize, Serialize};
use wide::f32x8;

use crate::error::{Result, SegSearchError};
use crate::schema::DataType;

/// Distance metric selected by a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MetricType {
    /// Squared Euclidean (L2) distance
    #[default]
    L2,
    /// Number of differing bits
    Hamming,
    /// 1 - |a & b| / |a | b|
    Jaccard,
    /// -log2(|a & b| / |a | b|)
    Tanimoto,
}

impl MetricType {
    /// Get the name of this metric.
    pub fn name(&self) -> &'static str {
        match self {
            MetricType::L2 => "L2",
            MetricType::Hamming => "HAMMING",
            MetricType::Jaccard => "JACCARD",
            MetricType::Tanimoto => "TANIMOTO",
        }
    }

    /// Parse a metric from a string.
    pub fn parse_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "L2" | "EUCLIDEAN" => Ok(MetricType::L2),
            "HAMMING" => Ok(MetricType::Hamming),
            "JACCARD" => Ok(MetricType::Jaccard),
            "TANIMOTO" => Ok(MetricType::Tanimoto),
            _ => Err(SegSearchError::query(format!("Unknown metric type: {s}"))),
        }
    }

    /// Whether this metric can rank vectors of the given type.
    pub fn supports(&self, data_type: DataType) -> bool {
        match self {
            MetricType::L2 => data_type == DataType::FloatVector,
            MetricType::Hamming | MetricType::Jaccard | MetricType::Tanimoto => {
                data_type == DataType::BinaryVector
            }
        }
    }

    /// Fail unless this metric can rank vectors of the given type.
    pub fn check_supports(&self, data_type: DataType) -> Result<()> {
        if self.supports(data_type) {
            Ok(())
        } else {
            Err(SegSearchError::query(format!(
                "metric {} cannot be used with {} fields",
                self.name(),
                data_type.name()
            )))
        }
    }

    /// Distance between two packed binary vectors of equal length.
    pub fn binary_distance(&self, a: &[u8], b: &[u8]) -> f32 {
        match self {
            MetricType::Hamming => hamming(a, b),
            MetricType::Jaccard => jaccard(a, b),
            MetricType::Tanimoto => tanimoto(a, b),
            MetricType::L2 => f32::MAX,
        }
    }
}

/// Squared Euclidean distance between two float vectors of equal length.
pub fn l2_squared(a: &[f32], b: &[f32]) -> f32 {
    let lanes_a = a.chunks_exact(8);
    let lanes_b = b.chunks_exact(8);
    let tail: f32 = lanes_a
        .remainder()
        .iter()
        .zip(lanes_b.remainder())
        .map(|(x, y)| (x - y) * (x - y))
        .sum();

    let mut acc = f32x8::splat(0.0);
    for (x, y) in lanes_a.zip(lanes_b) {
        let x = f32x8::new([x[0], x[1], x[2], x[3], x[4], x[5], x[6], x[7]]);
        let y = f32x8::new([y[0], y[1], y[2], y[3], y[4], y[5], y[6], y[7]]);
        let diff = x - y;
        acc = acc + diff * diff;
    }

    acc.reduce_add() + tail
}

/// Population counts of `a & b` and `a | b`, plus the differing bit count.
fn bit_counts(a: &[u8], b: &[u8]) -> (u32, u32, u32) {
    let mut and = 0;
    let mut or = 0;
    let mut xor = 0;

    let words_a = a.chunks_exact(8);
    let words_b = b.chunks_exact(8);
    for (x, y) in words_a.remainder().iter().zip(words_b.remainder()) {
        and += (x & y).count_ones();
        or += (x | y).count_ones();
        xor += (x ^ y).count_ones();
    }
    for (x, y) in words_a.zip(words_b) {
        let x = u64::from_le_bytes([x[0], x[1], x[2], x[3], x[4], x[5], x[6], x[7]]);
        let y = u64::from_le_bytes([y[0], y[1], y[2], y[3], y[4], y[5], y[6], y[7]]);
        and += (x & y).count_ones();
        or += (x | y).count_ones();
        xor += (x ^ y).count_ones();
    }

    (and, or, xor)
}

/// Number of differing bits.
pub fn hamming(a: &[u8], b: &[u8]) -> f32 {
    bit_counts(a, b).2 as f32
}

/// Jaccard distance. Two all-zero vectors are at distance 0.
pub fn jaccard(a: &[u8], b: &[u8]) -> f32 {
    let (and, or, _) = bit_counts(a, b);
    if or == 0 {
        return 0.0;
    }
    1.0 - and as f32 / or as f32
}

/// Tanimoto distance. Disjoint vectors are at distance `f32::MAX`.
pub fn tanimoto(a: &[u8], b: &[u8]) -> f32 {
    let (and, or, _) = bit_counts(a, b);
    if or == 0 {
        return 0.0;
    }
    if and == 0 {
        return f32::MAX;
    }
    if and == or {
        return 0.0;
    }
    -(and as f32 / or as f32).log2()
}
