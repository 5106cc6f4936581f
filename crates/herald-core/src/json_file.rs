// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Helpers for the JSON-array files used by the working store and history log.
//!
//! Every file holds a single pretty-printed JSON array. Writes go to a sibling
//! temp file first and are renamed into place, so readers never observe a
//! half-written array.

use std::io::ErrorKind;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::HeraldError;

/// Reads a file, returning `None` when it does not exist.
pub async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, HeraldError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(HeraldError::persistence(
            format!("read {}", path.display()),
            e,
        )),
    }
}

/// Parses a JSON array. Empty or whitespace-only input is an empty array.
pub fn parse_array<T: DeserializeOwned>(bytes: &[u8]) -> Result<Vec<T>, serde_json::Error> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    serde_json::from_slice(bytes)
}

/// Writes `items` as a pretty-printed JSON array via temp file and rename.
pub async fn write_array<T: Serialize>(path: &Path, items: &[T]) -> Result<(), HeraldError> {
    let json = serde_json::to_vec_pretty(items)
        .map_err(|e| HeraldError::persistence(format!("encode {}", path.display()), e))?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            HeraldError::persistence(format!("create directory {}", parent.display()), e)
        })?;
    }

    let temp_path = path.with_extension("json.tmp");
    tokio::fs::write(&temp_path, &json)
        .await
        .map_err(|e| HeraldError::persistence(format!("write {}", temp_path.display()), e))?;
    tokio::fs::rename(&temp_path, path)
        .await
        .map_err(|e| HeraldError::persistence(format!("rename into {}", path.display()), e))?;
    Ok(())
}

/// Removes a file, treating an already-missing file as success.
pub async fn remove_if_exists(path: &Path) -> Result<(), HeraldError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(HeraldError::persistence(
            format!("remove {}", path.display()),
            e,
        )),
    }
}
