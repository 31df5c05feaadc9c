// The `version` command: reports the installer's own version and the release
// it is configured to install, and optionally compares that release with the
// newest one published on GitHub.

use crate::libs::config_loading::{ConfigOverrides, load_installer_config};
use crate::libs::utilities::assets::{CancelToken, FetchOptions, Fetcher};
use crate::schemas::installer_config::InstallerConfig;
use crate::{log_error, log_info, log_warn};
use anyhow::{Context, Result};
use colored::Colorize;
use serde::Deserialize;
use std::path::PathBuf;

const RELEASE_API_HOST: &str = "https://api.github.com";

/// Subset of the GitHub "latest release" API response.
#[derive(Deserialize)]
struct GitHubRelease {
    tag_name: String,
}

pub fn run(check: bool, config: Option<PathBuf>) -> i32 {
    log_info!("kandi-install {}", env!("CARGO_PKG_VERSION").bold());

    let cfg = match load_installer_config(config.as_deref(), &ConfigOverrides::default()) {
        Ok(cfg) => cfg,
        Err(e) => {
            log_error!("Invalid installer configuration: {:#}", e);
            return 2;
        }
    };
    log_info!("Configured release: {} v{}", cfg.repository.cyan(), cfg.version.trim_start_matches('v'));

    if !check {
        return 0;
    }

    log_info!("Checking for latest release...");
    match latest_release_tag(&cfg, RELEASE_API_HOST) {
        Ok(latest) => {
            match is_newer(&latest, &cfg.version) {
                Some(true) => log_warn!("A newer release is available: {}", latest.yellow()),
                Some(false) => log_info!("The configured release is the latest ({}).", latest.green()),
                None => log_warn!("Cannot compare release tags '{}' and '{}'", latest, cfg.version),
            }
            0
        }
        Err(e) => {
            log_error!("Failed to fetch the latest release: {:#}", e);
            1
        }
    }
}

fn latest_release_tag(cfg: &InstallerConfig, api_host: &str) -> Result<String> {
    let url = format!("{}/repos/{}/releases/latest", api_host.trim_end_matches('/'), cfg.repository);
    let fetcher = Fetcher::new(FetchOptions::from(cfg), CancelToken::new());
    let body = fetcher
        .fetch_bytes(&url, 1024 * 1024)
        .with_context(|| format!("request to {url} failed"))?;
    let release: GitHubRelease = serde_json::from_slice(&body).context("unexpected release API response")?;
    Ok(release.tag_name)
}

/// `Some(true)` when `latest` is a higher semver than `current`; `None` if either does not parse.
fn is_newer(latest: &str, current: &str) -> Option<bool> {
    let parse = |raw: &str| semver::Version::parse(raw.trim().trim_start_matches('v')).ok();
    Some(parse(latest)? > parse(current)?)
}
