//! Configuration for segments and segment searches.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SegSearchError};

/// Default number of rows per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 32 * 1024;

/// Configuration applied when a segment is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentConfig {
    /// Rows per chunk. Shared by raw column storage and the indexing record.
    pub chunk_size: usize,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl SegmentConfig {
    /// Create a config with the given chunk size.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self { chunk_size }
    }

    /// Check the config for values the segment cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(SegSearchError::invalid_config("chunk_size must be positive"));
        }
        Ok(())
    }
}

/// Configuration for segment search execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Search chunks in parallel and reduce partial results with a merge tree.
    pub parallel: bool,

    /// Below this many chunks the search runs sequentially.
    pub min_parallel_chunks: usize,

    /// Thread pool size for parallel execution.
    /// If None, uses the global rayon pool.
    pub thread_pool_size: Option<usize>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            min_parallel_chunks: 4,
            thread_pool_size: None,
        }
    }
}

impl SearchConfig {
    /// A config that always searches chunk by chunk on the calling thread.
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            ..Default::default()
        }
    }

    /// Parse a config from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SearchConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    /// Check the config for contradictory values.
    pub fn validate(&self) -> Result<()> {
        if self.thread_pool_size == Some(0) {
            return Err(SegSearchError::invalid_config(
                "thread_pool_size must be positive when set",
            ));
        }
        Ok(())
    }

    /// Number of worker threads a parallel search can use.
    pub fn effective_parallelism(&self) -> usize {
        if !self.parallel {
            return 1;
        }
        self.thread_pool_size.unwrap_or_else(num_cpus::get).max(1)
    }

    /// Whether a search over `chunk_count` chunks should go parallel.
    pub fn should_parallelize(&self, chunk_count: usize) -> bool {
        self.parallel && chunk_count >= self.min_parallel_chunks.max(2)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = SearchConfig::default();
        assert!(config.parallel);
        assert!(config.validate().is_ok());
        assert!(config.effective_parallelism() >= 1);
        assert!(!config.should_parallelize(1));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = SearchConfig::from_json(r#"{"parallel": false}"#).unwrap();
        assert!(!config.parallel);
        assert_eq!(config.min_parallel_chunks, 4);
        assert_eq!(config.effective_parallelism(), 1);
        assert!(!config.should_parallelize(100));
    }

    #[test]
    fn test_invalid_thread_pool_size() {
        let result = SearchConfig::from_json(r#"{"thread_pool_size": 0}"#);
        assert!(matches!(result, Err(SegSearchError::InvalidArgument(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"min_parallel_chunks": 8, "thread_pool_size": 2}}"#).unwrap();

        let config = SearchConfig::load(file.path()).unwrap();
        assert_eq!(config.min_parallel_chunks, 8);
        assert_eq!(config.effective_parallelism(), 2);
        assert!(config.should_parallelize(8));
        assert!(!config.should_parallelize(7));
    }

    #[test]
    fn test_segment_config_validation() {
        assert!(SegmentConfig::default().validate().is_ok());
        assert!(SegmentConfig::with_chunk_size(0).validate().is_err());
    }
}
