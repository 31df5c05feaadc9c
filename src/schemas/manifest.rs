// Checksum manifest published alongside a release, in `sha256sum` format:
//
//   <64 hex digits>  <file name>
//
// A `*` in front of the file name (binary mode marker) is accepted.

use crate::errors::ManifestError;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseManifest {
    digests: HashMap<String, String>,
}

impl ReleaseManifest {
    /// Parses manifest text in `sha256sum` format (`<hex>  <file name>` per line).
    ///
    /// Blank lines and `#` comments are skipped.
    ///
    /// # Arguments
    /// * `text`: The manifest body.
    ///
    /// # Returns
    /// * `Ok(ReleaseManifest)` mapping file names to lowercase digests.
    /// * `Err(ManifestError::Malformed(line))` with a 1-based line number for the
    ///   first line that is not a digest and a file name.
    pub fn parse(text: &str) -> Result<Self, ManifestError> {
        let mut digests = HashMap::new();
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (digest, name) = line
                .split_once(char::is_whitespace)
                .ok_or(ManifestError::Malformed(idx + 1))?;
            let name = name.trim_start();
            let name = name.strip_prefix('*').unwrap_or(name);
            if !is_sha256_hex(digest) || name.is_empty() {
                return Err(ManifestError::Malformed(idx + 1));
            }
            digests.insert(name.to_string(), digest.to_ascii_lowercase());
        }
        Ok(ReleaseManifest { digests })
    }

    /// Lowercase hex digest published for `file_name`.
    pub fn digest_for(&self, file_name: &str) -> Result<&str, ManifestError> {
        self.digests
            .get(file_name)
            .map(String::as_str)
            .ok_or_else(|| ManifestError::MissingEntry(file_name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.digests.len()
    }
}

/// True for exactly 64 hex digits (either case).
pub fn is_sha256_hex(value: &str) -> bool {
    value.len() == 64 && value.bytes().all(|b| b.is_ascii_hexdigit())
}
