// src/utils/serialization.rs
//! Serialization utilities for the cold chain ledger.
//!
//! Provides:
//! - JSON encoding and decoding of ledger records
//! - Snapshot persistence to and from disk

use crate::contracts::ledger::Snapshot;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Serializes a value to a JSON string.
///
/// # Arguments
/// * `data` - The value to serialize (must implement `Serialize`)
pub fn serialize<T: Serialize>(data: &T) -> Result<String> {
    Ok(serde_json::to_string(data)?)
}

/// Deserializes a value from a JSON string.
///
/// # Note
/// The lifetime parameter lets the result borrow from the input string.
pub fn deserialize<'a, T: Deserialize<'a>>(data: &'a str) -> Result<T> {
    Ok(serde_json::from_str(data)?)
}

/// Writes a ledger snapshot as pretty-printed JSON.
///
/// The file is written next to its destination first and then renamed, so
/// an interrupted write never leaves a truncated snapshot behind.
pub fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let staging = path.with_extension("json.tmp");
    fs::write(&staging, serde_json::to_vec_pretty(snapshot)?)?;
    fs::rename(&staging, path)?;
    Ok(())
}

/// Reads a snapshot written by [`write_snapshot`].
///
/// The snapshot is only decoded here; `ColdChain::restore` validates it.
pub fn read_snapshot(path: &Path) -> Result<Snapshot> {
    let contents = fs::read_to_string(path)?;
    deserialize(&contents)
}
