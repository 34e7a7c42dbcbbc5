//! Reader security limits.
//!
//! Hostile archives (zip bombs, forged size metadata, absurd entry counts)
//! are rejected before any XML parsing happens. Every limit can be disabled
//! individually by setting it to 0.

/// Limits enforced while reading a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// Maximum per-entry compressed-to-uncompressed expansion ratio.
    pub max_compression_ratio: u64,
    /// Maximum total uncompressed size across all entries, in bytes.
    pub max_uncompressed_size: u64,
    /// Maximum number of ZIP entries.
    pub max_entry_count: u64,
    /// Maximum total number of cells across all sheets.
    pub max_cell_count: u64,
    /// Maximum length of a single shared or inline string, in bytes.
    pub max_string_length: u64,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            max_compression_ratio: 100,
            max_uncompressed_size: 100 * 1024 * 1024,
            max_entry_count: 10_000,
            max_cell_count: 10_000_000,
            max_string_length: 32 * 1024,
        }
    }
}

impl ReadOptions {
    /// All checks disabled.
    pub fn unlimited() -> Self {
        Self {
            max_compression_ratio: 0,
            max_uncompressed_size: 0,
            max_entry_count: 0,
            max_cell_count: 0,
            max_string_length: 0,
        }
    }
}

/// Whether `value` breaches `limit` (0 disables the check).
pub(crate) fn exceeds(value: u64, limit: u64) -> bool {
    limit != 0 && value > limit
}
