// Error types for every stage of the install pipeline.
//
// Each stage owns a small `thiserror` enum. The orchestrator wraps them in
// `InstallError`, which also knows whether a failure may be recovered from by
// switching to the fallback binary.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures raised while downloading a file over HTTP(S).
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("refusing to download over plain HTTP: {0}")]
    InsecureUrl(String),

    #[error("network error while requesting {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: Box<ureq::Transport>,
    },

    #[error("server answered HTTP {0}")]
    BadStatus(u16),

    #[error("redirect (HTTP {0}) without a Location header")]
    MissingLocation(u16),

    #[error("gave up after following {0} redirects")]
    TooManyRedirects(usize),

    #[error("response body exceeds {0} bytes")]
    TooLarge(u64),

    #[error("download cancelled")]
    Cancelled,

    #[error("error reading response body from {url}: {source}")]
    Stream {
        url: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failures raised by the SHA-256 verifier.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("checksum mismatch (expected {expected}, got {actual})")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("failed to read {path} for hashing: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failures raised while obtaining the published digest for a release archive.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("malformed checksum manifest at line {0}")]
    Malformed(usize),

    #[error("no checksum published for '{0}'")]
    MissingEntry(String),

    #[error("pinned digest '{0}' is not a 64-character hex SHA-256")]
    InvalidDigest(String),

    #[error("checksum manifest is not valid UTF-8")]
    NotUtf8,

    #[error("could not download checksum manifest: {0}")]
    Fetch(#[from] FetchError),
}

/// Failures raised by the external `tar` invocation.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("could not run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("'{program}' exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("archive did not contain '{0}'")]
    MissingBinary(String),

    #[error("could not move {path} into place: {source}")]
    Place {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failures raised while deriving the release descriptor from the host.
#[derive(Debug, Error)]
pub enum ReleaseError {
    #[error("unsupported platform '{0}' (only macOS is supported)")]
    UnsupportedPlatform(String),

    #[error("unsupported architecture '{0}'")]
    UnsupportedArchitecture(String),

    #[error("invalid release version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },

    #[error("invalid repository identifier '{0}' (expected owner/name)")]
    InvalidRepository(String),
}

/// Top-level error of an install run.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("environment unsupported: {0}")]
    EnvironmentUnsupported(#[from] ReleaseError),

    #[error("could not prepare install directory {path}: {source}")]
    Prepare {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("download failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("checksum unavailable: {0}")]
    Manifest(#[from] ManifestError),

    #[error("verification failed: {0}")]
    Verify(#[from] VerifyError),

    #[error("extraction failed: {0}")]
    Extract(#[from] ExtractError),

    #[error("could not finalize {path}: {source}")]
    Finalize {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{primary}; no fallback binary available")]
    FallbackUnavailable { primary: String },

    #[error("{primary}; copying fallback binary {path} failed: {source}")]
    FallbackCopy {
        primary: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl InstallError {
    /// Whether the orchestrator may recover from this error through the fallback binary.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            InstallError::EnvironmentUnsupported(_)
                | InstallError::Prepare { .. }
                | InstallError::FallbackUnavailable { .. }
                | InstallError::FallbackCopy { .. }
        )
    }

    /// Process exit status reported for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            InstallError::EnvironmentUnsupported(_) => 2,
            _ => 1,
        }
    }
}
