// Settings that drive an install run.
//
// Every field has a default, so an empty (or absent) `installer.yaml` is valid.
// Values are layered by `libs::config_loading`: defaults, then the YAML file,
// then environment variables and command line flags.

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_VERSION: &str = "1.0.2";
pub const DEFAULT_REPOSITORY: &str = "KandiForge/kandi-cli-osx";
pub const DEFAULT_HOST: &str = "https://github.com";
pub const DEFAULT_MANIFEST_NAME: &str = "SHA256SUMS";
pub const DEFAULT_MAX_REDIRECTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstallerConfig {
    /// Release version to install, with or without a leading `v`.
    pub version: String,
    /// `owner/name` of the repository publishing the releases.
    pub repository: String,
    /// Scheme and host serving release downloads.
    pub host: String,
    /// Install directory. Defaults to `bin/` next to the installer's own directory.
    pub bin_dir: Option<String>,
    /// Locally built binary to copy when the remote install fails. No fallback when unset.
    pub fallback_binary: Option<String>,
    /// Pinned SHA-256 of the archive. Takes precedence over the published manifest.
    pub expected_sha256: Option<String>,
    /// File name of the checksum manifest published next to the archive.
    pub manifest_name: String,
    pub max_redirects: usize,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// Permit `http://` URLs (local mirrors). HTTPS is required otherwise.
    pub allow_insecure_http: bool,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        InstallerConfig {
            version: DEFAULT_VERSION.to_string(),
            repository: DEFAULT_REPOSITORY.to_string(),
            host: DEFAULT_HOST.to_string(),
            bin_dir: None,
            fallback_binary: None,
            expected_sha256: None,
            manifest_name: DEFAULT_MANIFEST_NAME.to_string(),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            connect_timeout_secs: 15,
            request_timeout_secs: 300,
            allow_insecure_http: false,
        }
    }
}

impl InstallerConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let cfg: InstallerConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(cfg, InstallerConfig::default());
        assert_eq!(cfg.max_redirects, 5);
        assert!(cfg.fallback_binary.is_none());
        assert!(!cfg.allow_insecure_http);
    }

    #[test]
    fn partial_document_overrides_only_named_fields() {
        let yaml = "version: 1.1.0\nfallback_binary: ~/src/kandi/target/release/kandi\nrequest_timeout_secs: 30\n";
        let cfg: InstallerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.version, "1.1.0");
        assert_eq!(cfg.fallback_binary.as_deref(), Some("~/src/kandi/target/release/kandi"));
        assert_eq!(cfg.request_timeout(), Duration::from_secs(30));
        assert_eq!(cfg.repository, DEFAULT_REPOSITORY);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(serde_yaml::from_str::<InstallerConfig>("verison: 1.0.0\n").is_err());
    }
}
