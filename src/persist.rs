use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_binary::binary_stream::Endian;

use crate::error::{Error, Result};

/// Write a serializable model to disk as a binary blob.
pub fn save<T: Serialize>(model: &T, path: impl AsRef<Path>) -> Result<()> {
    let blob = serde_binary::to_vec(model, Endian::Big).map_err(|e| Error::Encode(e.to_string()))?;
    fs::write(path, &blob)?;
    Ok(())
}

/// Read a model back. Scratch state is rebuilt lazily on first use.
pub fn load<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let blob = fs::read(path)?;
    serde_binary::from_vec(blob, Endian::Big).map_err(|e| Error::Encode(e.to_string()))
}
