// Builds the effective installer settings.
//
// Layers, lowest precedence first: built-in defaults, the YAML settings file,
// then overrides collected from environment variables and command line flags.

use crate::libs::utilities::path_helpers::{default_bin_dir, default_config_path, expand_path};
use crate::schemas::installer_config::InstallerConfig;
use crate::schemas::manifest::is_sha256_hex;
use crate::{log_debug, log_info};
use anyhow::{Context, Result, bail};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

/// Values supplied on the command line or through the environment. `None` keeps the lower layer.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub version: Option<String>,
    pub bin_dir: Option<String>,
    pub fallback_binary: Option<String>,
    pub expected_sha256: Option<String>,
    pub allow_insecure_http: bool,
}

/// Loads the settings file and applies `overrides`.
///
/// An explicitly requested file must exist. Without one, `~/.kandi/installer.yaml`
/// is read when present and silently skipped otherwise.
///
/// # Arguments
/// * `explicit`: Settings file given with `--config`, if any.
/// * `overrides`: Values from flags and environment variables. These win over the file.
///
/// # Returns
/// * `Ok(InstallerConfig)` once the merged settings pass validation.
/// * `Err` if the file cannot be read or parsed, or a value is invalid
///   (non-hex pinned digest, zero timeout, `/` in the manifest name).
pub fn load_installer_config(explicit: Option<&Path>, overrides: &ConfigOverrides) -> Result<InstallerConfig> {
    let mut cfg = match explicit {
        Some(path) => read_config_file(path)?,
        None => match default_config_path() {
            Some(path) if path.is_file() => read_config_file(&path)?,
            _ => {
                log_debug!("[Config] No settings file found, using defaults");
                InstallerConfig::default()
            }
        },
    };

    apply_overrides(&mut cfg, overrides);
    validate(&cfg)?;
    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<InstallerConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("failed to read settings file {}", path.display()))?;
    let cfg: InstallerConfig = serde_yaml::from_str(&contents)
        .with_context(|| format!("failed to parse settings file {}", path.display()))?;
    log_info!("[Config] Using settings file: {}", path.display().to_string().cyan());
    Ok(cfg)
}

fn apply_overrides(cfg: &mut InstallerConfig, overrides: &ConfigOverrides) {
    if let Some(version) = &overrides.version {
        cfg.version = version.clone();
    }
    if let Some(dir) = &overrides.bin_dir {
        cfg.bin_dir = Some(dir.clone());
    }
    if let Some(fallback) = &overrides.fallback_binary {
        cfg.fallback_binary = Some(fallback.clone()).filter(|f| !f.trim().is_empty());
    }
    if let Some(sha) = &overrides.expected_sha256 {
        cfg.expected_sha256 = Some(sha.clone());
    }
    if overrides.allow_insecure_http {
        cfg.allow_insecure_http = true;
    }
}

fn validate(cfg: &InstallerConfig) -> Result<()> {
    if let Some(sha) = &cfg.expected_sha256 {
        if !is_sha256_hex(sha.trim()) {
            bail!("expected_sha256 '{}' is not a 64-character hex SHA-256 digest", sha);
        }
    }
    if cfg.manifest_name.trim().is_empty() || cfg.manifest_name.contains('/') {
        bail!("manifest_name '{}' must be a plain file name", cfg.manifest_name);
    }
    if cfg.request_timeout_secs == 0 || cfg.connect_timeout_secs == 0 {
        bail!("timeouts must be at least one second");
    }
    Ok(())
}

/// Install directory from the settings, or `bin/` beside the installer.
///
/// # Arguments
/// * `cfg`: The loaded settings. `bin_dir` may use `~` and `$VARS`.
///
/// # Returns
/// * `Ok(PathBuf)` with the expanded directory. It is not created here.
/// * `Err` if expansion fails or the installer's own location is unknown.
pub fn resolve_bin_dir(cfg: &InstallerConfig) -> Result<PathBuf> {
    match &cfg.bin_dir {
        Some(dir) => expand_path(dir).with_context(|| format!("cannot expand bin_dir '{dir}'")),
        None => default_bin_dir().context("cannot locate the installer executable to derive bin/"),
    }
}

/// Fallback binary path from the settings, if one is configured.
pub fn resolve_fallback(cfg: &InstallerConfig) -> Result<Option<PathBuf>> {
    cfg.fallback_binary
        .as_deref()
        .map(|raw| expand_path(raw).with_context(|| format!("cannot expand fallback_binary '{raw}'")))
        .transpose()
}
