//! Format versioning constants for persisted scenario state.

/// Current format version for save envelopes.
/// Increment when `ScenarioSnapshot` serialization changes.
pub const SAVE_FORMAT_VERSION: u16 = 1;

/// Magic bytes for binary save envelopes.
pub const SAVE_BINARY_MAGIC: [u8; 4] = *b"CSVS";
