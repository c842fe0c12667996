//! Content hashing for staged files.
//!
//! This module provides:
//! - `ContentHash`: A full 64-character SHA-256 digest
//! - `hash_file()`: Streaming single file hashing
//! - `hash_bytes()`: Arbitrary byte hashing

use std::fs;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A full 64-character SHA-256 digest, lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl std::fmt::Display for ContentHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Error while hashing a file.
#[derive(Debug, thiserror::Error)]
#[error("failed to read file {path}: {source}")]
pub struct HashError {
  pub path: String,
  #[source]
  pub source: std::io::Error,
}

/// Hash a file's contents without loading it into memory.
pub fn hash_file(path: &Path) -> Result<ContentHash, HashError> {
  let to_err = |source| HashError {
    path: path.display().to_string(),
    source,
  };

  let mut file = fs::File::open(path).map_err(to_err)?;
  let mut hasher = Sha256::new();
  let mut buffer = [0u8; 8192];

  loop {
    let bytes_read = file.read(&mut buffer).map_err(to_err)?;
    if bytes_read == 0 {
      break;
    }
    hasher.update(&buffer[..bytes_read]);
  }

  Ok(ContentHash(hex::encode(hasher.finalize())))
}

/// Hash arbitrary bytes.
pub fn hash_bytes(data: &[u8]) -> ContentHash {
  let mut hasher = Sha256::new();
  hasher.update(data);
  ContentHash(hex::encode(hasher.finalize()))
}
