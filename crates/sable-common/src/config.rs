//! Engine configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::{DATA_DIR, DEFAULT_BTREE_DEGREE, DEFAULT_CACHE_CAPACITY, WAL_FILE};
use crate::error::{SableError, SableResult};

/// Configuration for a SableDB engine instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory holding table files, the WAL, and the control file.
    pub data_dir: PathBuf,
    /// Maximum number of pages the buffer cache may hold.
    pub cache_capacity: usize,
    /// B+tree fan-out used by secondary indexes.
    pub btree_degree: usize,
    /// WAL file name inside the data directory.
    pub wal_file: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DATA_DIR),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            btree_degree: DEFAULT_BTREE_DEGREE,
            wal_file: WAL_FILE.to_string(),
        }
    }
}

impl EngineConfig {
    /// Creates a configuration rooted at `data_dir` with defaults
    /// otherwise.
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Sets the buffer cache capacity.
    #[must_use]
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Sets the B+tree fan-out.
    #[must_use]
    pub fn with_btree_degree(mut self, degree: usize) -> Self {
        self.btree_degree = degree;
        self
    }

    /// Returns the WAL file path.
    #[must_use]
    pub fn wal_path(&self) -> PathBuf {
        self.data_dir.join(&self.wal_file)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SableResult<()> {
        if self.cache_capacity == 0 {
            return Err(SableError::Semantic(
                "cache capacity must be at least 1".into(),
            ));
        }
        if self.btree_degree < 3 {
            return Err(SableError::Semantic(
                "btree degree must be at least 3".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.wal_path(), PathBuf::from("data/wal.log"));
    }

    #[test]
    fn test_builders() {
        let config = EngineConfig::new("/tmp/db")
            .with_cache_capacity(8)
            .with_btree_degree(5);
        assert_eq!(config.cache_capacity, 8);
        assert_eq!(config.btree_degree, 5);
    }

    #[test]
    fn test_validation() {
        assert!(EngineConfig::default()
            .with_cache_capacity(0)
            .validate()
            .is_err());
        assert!(EngineConfig::default()
            .with_btree_degree(2)
            .validate()
            .is_err());
    }
}
