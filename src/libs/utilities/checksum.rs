// SHA-256 verification of downloaded archives.

use crate::errors::VerifyError;
use crate::{log_debug, log_info};
use colored::Colorize;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

const BUF_SIZE: usize = 64 * 1024;

/// SHA-256 of a file as lowercase hex. Reads in chunks so memory use stays bounded.
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = match file.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Checks that the file at `path` hashes to `expected_hex`.
///
/// The expected digest is trimmed and lowercased before the exact comparison,
/// so digests copied from upper-case listings still match.
///
/// # Arguments
/// * `path`: The downloaded archive.
/// * `expected_hex`: The published or pinned SHA-256, as hex.
///
/// # Returns
/// * `Ok(())` when the digests are equal.
/// * `Err(VerifyError::ChecksumMismatch)` carrying both digests, or
///   `Err(VerifyError::Io)` if the file cannot be read.
pub fn verify(path: &Path, expected_hex: &str) -> Result<(), VerifyError> {
    let expected = expected_hex.trim().to_ascii_lowercase();
    let actual = sha256_file(path).map_err(|source| VerifyError::Io { path: path.to_path_buf(), source })?;

    log_debug!("[Verify] {} expected={} actual={}", path.display(), expected.dimmed(), actual.dimmed());
    if actual != expected {
        return Err(VerifyError::ChecksumMismatch { expected, actual });
    }
    log_info!("[Verify] Checksum OK ({})", actual.green());
    Ok(())
}
