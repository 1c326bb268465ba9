//! Engine configuration

use crate::compression::Algo;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Snapshot format version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatVersion {
    pub major: u16,
    pub minor: u16,
}

impl FormatVersion {
    pub const CURRENT: Self = Self { major: 1, minor: 0 };

    pub fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }

    pub fn is_compatible(&self, other: &Self) -> bool {
        self.major == other.major
    }
}

impl Default for FormatVersion {
    fn default() -> Self {
        Self::CURRENT
    }
}

/// Settings of a [`MemoryEngine`](crate::memory::MemoryEngine)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Rows reported by `optimal_row_chunk_size`
    pub row_chunk_size: usize,

    /// Reject every modification
    pub read_only: bool,

    /// Compression of arrays created before any `set_compression`
    pub compression: Algo,

    /// Gzip level of snapshots (0-9)
    pub snapshot_level: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            row_chunk_size: 100,
            read_only: false,
            compression: Algo::NoCompression,
            snapshot_level: 6,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_row_chunk_size(mut self, rows: usize) -> Self {
        self.row_chunk_size = rows;
        self
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn with_compression(mut self, algo: Algo) -> Self {
        self.compression = algo;
        self
    }

    /// Set the snapshot gzip level, clamped to 9
    pub fn with_snapshot_level(mut self, level: u32) -> Self {
        self.snapshot_level = level.min(9);
        self
    }

    /// Parse from JSON; missing fields take their default value
    pub fn from_json(json: &str) -> Result<Self> {
        let mut config: Self = serde_json::from_str(json)?;
        config.snapshot_level = config.snapshot_level.min(9);
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
