// Data model of an install run: which release to fetch, where to put it,
// and what ended up on disk.

use crate::errors::ReleaseError;
use crate::libs::utilities::platform::{HostEnvironment, normalize_architecture, normalize_platform};
use std::fmt;
use std::path::PathBuf;

/// Name of the executable shipped at the top level of every release archive.
pub const BINARY_NAME: &str = "kandi";

/// Permission bits applied to the installed executable (rwxr-xr-x).
pub const EXECUTABLE_MODE: u32 = 0o755;

/// Platform tag baked into release archive names. Releases ship a single
/// universal macOS archive that covers both architectures.
const PLATFORM_TAG: &str = "macos-universal";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Architecture {
    X86_64,
    Arm64,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::MacOs => f.write_str("macos"),
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Architecture::X86_64 => f.write_str("x86_64"),
            Architecture::Arm64 => f.write_str("arm64"),
        }
    }
}

/// Identifies the release archive to fetch for this host.
///
/// Built once per run by [`ReleaseDescriptor::resolve`] and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseDescriptor {
    version: semver::Version,
    repository: String,
    host: String,
    platform: Platform,
    architecture: Architecture,
}

impl ReleaseDescriptor {
    /// Derives the descriptor from the host environment.
    ///
    /// Fails before any network activity if the platform or architecture is
    /// not one of the supported values, or if the version/repository are malformed.
    /// A leading `v` on the version is accepted and dropped.
    ///
    /// # Arguments
    /// * `env`: The host's OS and architecture strings.
    /// * `version`: Release version, e.g. `1.0.2` or `v1.0.2`.
    /// * `repository`: `owner/name` of the repository publishing the release.
    /// * `host`: Base URL of the release host. A trailing slash is dropped.
    ///
    /// # Returns
    /// * `Ok(ReleaseDescriptor)` for a supported host and well-formed release.
    /// * `Err(ReleaseError)` naming the first unsupported or malformed value.
    pub fn resolve(
        env: &HostEnvironment,
        version: &str,
        repository: &str,
        host: &str,
    ) -> Result<Self, ReleaseError> {
        let architecture = normalize_architecture(&env.arch)
            .ok_or_else(|| ReleaseError::UnsupportedArchitecture(env.arch.clone()))?;
        let platform =
            normalize_platform(&env.os).ok_or_else(|| ReleaseError::UnsupportedPlatform(env.os.clone()))?;

        let trimmed = version.trim();
        let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
        let version = semver::Version::parse(trimmed).map_err(|e| ReleaseError::InvalidVersion {
            version: version.to_string(),
            reason: e.to_string(),
        })?;

        let repository = repository.trim().trim_matches('/');
        let mut parts = repository.split('/');
        let well_formed = matches!(
            (parts.next(), parts.next(), parts.next()),
            (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty()
        );
        if !well_formed {
            return Err(ReleaseError::InvalidRepository(repository.to_string()));
        }

        Ok(ReleaseDescriptor {
            version,
            repository: repository.to_string(),
            host: host.trim_end_matches('/').to_string(),
            platform,
            architecture,
        })
    }

    pub fn version(&self) -> &semver::Version {
        &self.version
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn architecture(&self) -> Architecture {
        self.architecture
    }

    /// e.g. `kandi-cli-v1.0.2-macos-universal.tar.gz`
    pub fn archive_file_name(&self) -> String {
        format!("kandi-cli-v{}-{}.tar.gz", self.version, PLATFORM_TAG)
    }

    fn release_dir_url(&self) -> String {
        format!("{}/{}/releases/download/v{}", self.host, self.repository, self.version)
    }

    /// URL of the release archive, e.g.
    /// `https://github.com/<owner>/<name>/releases/download/v1.0.2/kandi-cli-v1.0.2-macos-universal.tar.gz`.
    pub fn download_url(&self) -> String {
        format!("{}/{}", self.release_dir_url(), self.archive_file_name())
    }

    /// URL of a checksum manifest published next to the archive.
    pub fn manifest_url(&self, manifest_name: &str) -> String {
        format!("{}/{}", self.release_dir_url(), manifest_name)
    }
}

/// One file transfer: created per install attempt and consumed by the fetcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub source_url: String,
    pub destination: PathBuf,
}

/// Where the installed binary came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactSource {
    Release,
    Fallback,
}

/// The executable left on disk by a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledArtifact {
    pub binary_path: PathBuf,
    pub permission_mode: u32,
    pub source: ArtifactSource,
}
