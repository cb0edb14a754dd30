//! Checksummed save envelopes for scenario snapshots.
//!
//! Layout: magic (4) | format version u16 LE | CRC32 u32 LE | length u32 LE |
//! JSON snapshot bytes.

use std::fs;
use std::path::Path;

use crate::state::ScenarioSnapshot;
use crate::version::{SAVE_BINARY_MAGIC, SAVE_FORMAT_VERSION};

const HEADER_LEN: usize = 14;

/// A snapshot ready to be written to disk.
#[derive(Clone, Debug, PartialEq)]
pub struct SaveData {
    pub snapshot: ScenarioSnapshot,
}

impl SaveData {
    pub fn new(snapshot: ScenarioSnapshot) -> Self {
        Self { snapshot }
    }

    /// Serializes the snapshot with magic bytes, version and checksum.
    pub fn to_binary(&self) -> Result<Vec<u8>, SaveError> {
        let payload =
            serde_json::to_vec(&self.snapshot).map_err(|e| SaveError::Serialization(e.to_string()))?;
        let checksum = crc32fast::hash(&payload);
        let payload_len = u32::try_from(payload.len()).map_err(|_| SaveError::TooLarge)?;

        let mut output = Vec::with_capacity(HEADER_LEN + payload.len());
        output.extend_from_slice(&SAVE_BINARY_MAGIC);
        output.extend_from_slice(&SAVE_FORMAT_VERSION.to_le_bytes());
        output.extend_from_slice(&checksum.to_le_bytes());
        output.extend_from_slice(&payload_len.to_le_bytes());
        output.extend_from_slice(&payload);
        Ok(output)
    }

    /// Parses a save envelope, validating magic, version, length and checksum.
    pub fn from_binary(input: &[u8]) -> Result<Self, SaveError> {
        if input.len() < HEADER_LEN {
            return Err(SaveError::TooSmall);
        }
        if input[0..4] != SAVE_BINARY_MAGIC {
            return Err(SaveError::InvalidMagic);
        }
        let version = u16::from_le_bytes([input[4], input[5]]);
        if version != SAVE_FORMAT_VERSION {
            return Err(SaveError::IncompatibleVersion {
                found: version,
                expected: SAVE_FORMAT_VERSION,
            });
        }
        let checksum = u32::from_le_bytes([input[6], input[7], input[8], input[9]]);
        let payload_len = u32::from_le_bytes([input[10], input[11], input[12], input[13]]) as usize;
        let payload = input.get(HEADER_LEN..).ok_or(SaveError::MissingPayload)?;
        if payload.len() != payload_len {
            return Err(SaveError::LengthMismatch);
        }
        if crc32fast::hash(payload) != checksum {
            return Err(SaveError::ChecksumMismatch);
        }
        let snapshot =
            serde_json::from_slice(payload).map_err(|e| SaveError::Serialization(e.to_string()))?;
        Ok(Self { snapshot })
    }

    pub fn write_to(&self, path: &Path) -> Result<(), SaveError> {
        let bytes = self.to_binary()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| SaveError::Io(e.to_string()))?;
        }
        fs::write(path, bytes).map_err(|e| SaveError::Io(e.to_string()))
    }

    pub fn read_from(path: &Path) -> Result<Self, SaveError> {
        let bytes = fs::read(path).map_err(|e| SaveError::Io(e.to_string()))?;
        Self::from_binary(&bytes)
    }
}

/// Errors that can occur during save/load operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveError {
    TooSmall,
    TooLarge,
    InvalidMagic,
    IncompatibleVersion { found: u16, expected: u16 },
    ChecksumMismatch,
    LengthMismatch,
    MissingPayload,
    Serialization(String),
    Io(String),
}

impl std::fmt::Display for SaveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooSmall => write!(f, "save data too small"),
            Self::TooLarge => write!(f, "save data too large"),
            Self::InvalidMagic => write!(f, "invalid save file magic bytes"),
            Self::IncompatibleVersion { found, expected } => {
                write!(
                    f,
                    "incompatible save version: found {found}, expected {expected}"
                )
            }
            Self::ChecksumMismatch => write!(f, "save file checksum mismatch"),
            Self::LengthMismatch => write!(f, "save file length mismatch"),
            Self::MissingPayload => write!(f, "save file missing payload"),
            Self::Serialization(msg) => write!(f, "serialization error: {msg}"),
            Self::Io(msg) => write!(f, "save file io error: {msg}"),
        }
    }
}

impl std::error::Error for SaveError {}

#[cfg(test)]
#[path = "tests/storage_tests.rs"]
mod tests;
