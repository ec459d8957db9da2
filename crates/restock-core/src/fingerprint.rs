//! Content fingerprints for tracked files.
//!
//! Two fingerprints are in play: a collision-resistant SHA-256 checksum used
//! by everything written today, and a short truncated-BLAKE3 hash kept for
//! compatibility with databases written by the legacy line format. Both are
//! lowercase hex. The lenient `*_or_empty` variants map any failure to the
//! empty string, which the engine reads as "cannot verify".

use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

const BUF_SIZE: usize = 64 * 1024;
const QUICK_HASH_BYTES: usize = 8;

/// SHA-256 of the file's content, streamed in `BUF_SIZE` chunks.
pub fn checksum_file(path: &Path) -> Result<String> {
    let file = std::fs::File::open(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = std::io::BufReader::with_capacity(BUF_SIZE, file);
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; BUF_SIZE];

    loop {
        let n = reader.read(&mut buf).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Legacy fast fingerprint: BLAKE3 truncated to `QUICK_HASH_BYTES` bytes.
pub fn quick_hash_file(path: &Path) -> Result<String> {
    let file = std::fs::File::open(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = std::io::BufReader::with_capacity(BUF_SIZE, file);
    let mut hasher = blake3::Hasher::new();
    let mut buf = vec![0u8; BUF_SIZE];

    loop {
        let n = reader.read(&mut buf).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(&hasher.finalize().as_bytes()[..QUICK_HASH_BYTES]))
}

/// `checksum_file`, with missing/unreadable collapsing to `""`.
#[must_use]
pub fn checksum_or_empty(path: &Path) -> String {
    checksum_file(path).unwrap_or_default()
}

/// `quick_hash_file`, with missing/unreadable collapsing to `""`.
#[must_use]
pub fn quick_hash_or_empty(path: &Path) -> String {
    quick_hash_file(path).unwrap_or_default()
}
