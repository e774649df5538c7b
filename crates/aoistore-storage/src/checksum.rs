//! SHA-256 content hashing.

use std::path::Path;

use futures::StreamExt;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio_util::io::ReaderStream;

use aoistore_core::error::AppError;
use aoistore_core::result::AppResult;

/// Lowercase hex SHA-256 of an in-memory buffer.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Lowercase hex SHA-256 of a file on local disk, read as a stream.
pub async fn sha256_file(path: &Path) -> AppResult<String> {
    let file = fs::File::open(path)
        .await
        .map_err(|e| AppError::io(format!("Failed to open {}", path.display()), e))?;

    let mut hasher = Sha256::new();
    let mut stream = ReaderStream::new(file);
    while let Some(chunk) = stream.next().await {
        let chunk =
            chunk.map_err(|e| AppError::io(format!("Failed to read {}", path.display()), e))?;
        hasher.update(&chunk);
    }
    Ok(hex::encode(hasher.finalize()))
}
