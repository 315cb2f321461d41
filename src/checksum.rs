//! SHA-256 verification of downloaded artifacts

use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{PackageError, PackageResult};

const CHUNK_SIZE: usize = 64 * 1024;

/// Stream `path` through SHA-256 and return the lowercase hex digest
pub fn sha256_file(path: &Path) -> PackageResult<String> {
    let mut file = File::open(path)
        .map_err(|e| PackageError::io(format!("Failed to open {}", path.display()), e))?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];

    loop {
        let n = file
            .read(&mut buf)
            .map_err(|e| PackageError::io(format!("Failed to read {}", path.display()), e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Compare the digest of `path` against `expected_hex`, ignoring case and surrounding whitespace
pub fn verify(path: &Path, expected_hex: &str) -> PackageResult<bool> {
    let actual = sha256_file(path)?;
    Ok(actual.eq_ignore_ascii_case(expected_hex.trim()))
}
