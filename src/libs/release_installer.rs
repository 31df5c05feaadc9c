// Orchestrates one install run.
//
// Stages run strictly in order:
//   resolve environment -> prepare destination -> download -> verify
//   -> extract -> finalize
// Any recoverable failure in download/verify/extract/finalize switches to the
// fallback binary, when one is configured. Environment resolution failures are
// reported immediately, before anything touches the network.

use crate::errors::{InstallError, ManifestError};
use crate::libs::utilities::assets::{CancelToken, FetchOptions, Fetcher};
use crate::libs::utilities::binary::{copy_into_place, set_mode};
use crate::libs::utilities::checksum;
use crate::libs::utilities::compression::unpack_release;
use crate::libs::utilities::platform::HostEnvironment;
use crate::schemas::installer_config::InstallerConfig;
use crate::schemas::manifest::{ReleaseManifest, is_sha256_hex};
use crate::schemas::release::{
    ArtifactSource, BINARY_NAME, DownloadTask, EXECUTABLE_MODE, InstalledArtifact, ReleaseDescriptor,
};
use crate::{log_debug, log_info, log_success, log_warn};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

/// Checksum manifests are a few lines of text; anything bigger is not one.
const MANIFEST_SIZE_LIMIT: u64 = 256 * 1024;

/// Everything an install run needs, fully resolved.
#[derive(Debug, Clone)]
pub struct InstallPlan {
    pub config: InstallerConfig,
    pub host: HostEnvironment,
    pub bin_dir: PathBuf,
    pub fallback_binary: Option<PathBuf>,
}

/// Runs the install pipeline described by `plan`.
///
/// The release archive is downloaded, verified and extracted into `plan.bin_dir`.
/// If any of those stages fails, the configured fallback binary is copied into
/// place instead. Unsupported hosts and an uncreatable `bin/` fail immediately.
///
/// # Arguments
/// * `plan`: The resolved settings, host and destination for this run.
/// * `cancel`: Token checked by the fetcher; once set, the run stops without
///   trying the fallback.
///
/// # Returns
/// * `Ok(InstalledArtifact)` describing the binary now at `<bin_dir>/kandi` and
///   whether it came from the release or the fallback.
/// * `Err(InstallError)` if neither path produced a binary.
pub fn install(plan: &InstallPlan, cancel: &CancelToken) -> Result<InstalledArtifact, InstallError> {
    let cfg = &plan.config;
    log_debug!("[Install] Plan: {:?}", plan);

    let release = ReleaseDescriptor::resolve(&plan.host, &cfg.version, &cfg.repository, &cfg.host)?;
    log_info!(
        "[Install] Installing Kandi CLI v{} from {} for {} {}...",
        release.version().to_string().bold(),
        release.repository(),
        release.platform(),
        release.architecture()
    );

    fs::create_dir_all(&plan.bin_dir).map_err(|source| InstallError::Prepare {
        path: plan.bin_dir.clone(),
        source,
    })?;

    let fetcher = Fetcher::new(FetchOptions::from(cfg), cancel.clone());
    match install_release(plan, &release, &fetcher) {
        Ok(artifact) => Ok(artifact),
        Err(err) if cancel.is_cancelled() => {
            log_warn!("[Install] Install interrupted, not switching to the fallback binary");
            Err(err)
        }
        Err(err) if err.is_recoverable() => {
            log_warn!("[Install] Release install failed ({}), switching to fallback", err);
            install_fallback(plan, err)
        }
        Err(err) => Err(err),
    }
}

fn install_release(
    plan: &InstallPlan,
    release: &ReleaseDescriptor,
    fetcher: &Fetcher,
) -> Result<InstalledArtifact, InstallError> {
    let task = DownloadTask {
        source_url: release.download_url(),
        destination: plan.bin_dir.join(release.archive_file_name()),
    };

    if let Err(err) = download_verify_extract(plan, release, fetcher, &task) {
        discard_archive(&task.destination);
        return Err(err);
    }

    log_debug!("[Install] Finalizing");
    if let Err(e) = fs::remove_file(&task.destination) {
        log_warn!("[Install] Could not remove {}: {}", task.destination.display(), e);
    }

    let binary_path = plan.bin_dir.join(BINARY_NAME);
    set_mode(&binary_path, EXECUTABLE_MODE).map_err(|source| InstallError::Finalize {
        path: binary_path.clone(),
        source,
    })?;

    log_success!("Kandi CLI installed successfully!");
    Ok(InstalledArtifact {
        binary_path,
        permission_mode: EXECUTABLE_MODE,
        source: ArtifactSource::Release,
    })
}

fn download_verify_extract(
    plan: &InstallPlan,
    release: &ReleaseDescriptor,
    fetcher: &Fetcher,
    task: &DownloadTask,
) -> Result<(), InstallError> {
    let bytes = fetcher.fetch(task)?;
    log_info!("[Install] Downloaded {} ({} bytes)", release.archive_file_name().cyan(), bytes);

    let digest = expected_digest(&plan.config, release, fetcher)?;
    checksum::verify(&task.destination, &digest)?;

    unpack_release(&task.destination, &plan.bin_dir, BINARY_NAME)?;
    Ok(())
}

/// Digest the archive must hash to: the pinned value when configured,
/// otherwise the entry in the manifest published with the release.
fn expected_digest(
    cfg: &InstallerConfig,
    release: &ReleaseDescriptor,
    fetcher: &Fetcher,
) -> Result<String, ManifestError> {
    if let Some(pinned) = &cfg.expected_sha256 {
        let pinned = pinned.trim();
        if !is_sha256_hex(pinned) {
            return Err(ManifestError::InvalidDigest(pinned.to_string()));
        }
        log_debug!("[Verify] Using pinned digest {}", pinned);
        return Ok(pinned.to_ascii_lowercase());
    }

    let url = release.manifest_url(&cfg.manifest_name);
    log_info!("[Verify] Fetching checksums from {}", url.blue());
    let body = fetcher.fetch_bytes(&url, MANIFEST_SIZE_LIMIT)?;
    let text = String::from_utf8(body).map_err(|_| ManifestError::NotUtf8)?;
    let manifest = ReleaseManifest::parse(&text)?;
    log_debug!("[Verify] Manifest lists {} file(s)", manifest.len());
    Ok(manifest.digest_for(&release.archive_file_name())?.to_string())
}

fn install_fallback(plan: &InstallPlan, primary: InstallError) -> Result<InstalledArtifact, InstallError> {
    let primary = primary.to_string();

    let source = match &plan.fallback_binary {
        Some(path) if path.is_file() => path,
        Some(path) => {
            log_warn!("[Fallback] Configured fallback binary {} does not exist", path.display());
            return Err(InstallError::FallbackUnavailable { primary });
        }
        None => {
            log_debug!("[Fallback] No fallback binary configured");
            return Err(InstallError::FallbackUnavailable { primary });
        }
    };

    log_info!("[Fallback] Using local development binary {} as fallback...", source.display().to_string().yellow());
    let binary_path = plan.bin_dir.join(BINARY_NAME);
    copy_into_place(source, &binary_path)
        .and_then(|_| set_mode(&binary_path, EXECUTABLE_MODE))
        .map_err(|e| InstallError::FallbackCopy {
            primary,
            path: source.clone(),
            source: e,
        })?;

    log_success!("Installed local development binary");
    Ok(InstalledArtifact {
        binary_path,
        permission_mode: EXECUTABLE_MODE,
        source: ArtifactSource::Fallback,
    })
}

fn discard_archive(path: &Path) {
    if path.exists() {
        match fs::remove_file(path) {
            Ok(()) => log_debug!("[Install] Removed rejected archive {}", path.display()),
            Err(e) => log_warn!("[Install] Could not remove {}: {}", path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{FetchError, VerifyError};
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use sha2::{Digest, Sha256};
    #[cfg(unix)]
    use std::os::unix::fs::PermissionsExt;

    const REPO: &str = "KandiForge/kandi-cli-osx";
    const ARCHIVE_PATH: &str = "/KandiForge/kandi-cli-osx/releases/download/v1.0.2/kandi-cli-v1.0.2-macos-universal.tar.gz";
    const MANIFEST_PATH: &str = "/KandiForge/kandi-cli-osx/releases/download/v1.0.2/SHA256SUMS";
    const RELEASE_BINARY: &[u8] = b"#!/bin/sh\necho 'kandi 1.0.2'\n";
    const FALLBACK_BINARY: &[u8] = b"#!/bin/sh\necho 'kandi dev build'\n";

    fn release_archive() -> Vec<u8> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        let mut header = tar::Header::new_gnu();
        header.set_size(RELEASE_BINARY.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, BINARY_NAME, RELEASE_BINARY).unwrap();
        builder.into_inner().unwrap().finish().unwrap()
    }

    fn sha256_hex(data: &[u8]) -> String {
        format!("{:x}", Sha256::digest(data))
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        plan: InstallPlan,
    }

    fn fixture(server_url: &str, fallback: Option<&[u8]>) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let fallback_binary = fallback.map(|bytes| {
            let path = dir.path().join("target").join("release").join(BINARY_NAME);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, bytes).unwrap();
            path
        });
        let plan = InstallPlan {
            config: InstallerConfig {
                host: server_url.to_string(),
                repository: REPO.to_string(),
                version: "1.0.2".to_string(),
                allow_insecure_http: true,
                request_timeout_secs: 10,
                connect_timeout_secs: 5,
                ..InstallerConfig::default()
            },
            host: HostEnvironment::new("macos", "aarch64"),
            bin_dir: dir.path().join("pkg").join("bin"),
            fallback_binary,
        };
        Fixture { _dir: dir, plan }
    }

    fn serve_release(server: &mut mockito::ServerGuard, manifest_digest: &str) -> Vec<mockito::Mock> {
        let archive = release_archive();
        let cdn = format!("{}/cdn/archive", server.url());
        vec![
            server.mock("GET", ARCHIVE_PATH).with_status(302).with_header("location", &cdn).create(),
            server.mock("GET", "/cdn/archive").with_status(200).with_body(archive).create(),
            server
                .mock("GET", MANIFEST_PATH)
                .with_status(200)
                .with_body(format!("{manifest_digest}  kandi-cli-v1.0.2-macos-universal.tar.gz\n"))
                .create(),
        ]
    }

    #[cfg(unix)]
    fn mode_of(path: &Path) -> u32 {
        fs::metadata(path).unwrap().permissions().mode() & 0o777
    }

    #[test]
    fn verified_release_is_installed_and_archive_removed() {
        let mut server = mockito::Server::new();
        let digest = sha256_hex(&release_archive());
        let mocks = serve_release(&mut server, &digest);
        let fx = fixture(&server.url(), None);

        let artifact = install(&fx.plan, &CancelToken::new()).unwrap();

        assert_eq!(artifact.source, ArtifactSource::Release);
        assert_eq!(artifact.binary_path, fx.plan.bin_dir.join("kandi"));
        assert_eq!(fs::read(&artifact.binary_path).unwrap(), RELEASE_BINARY);
        #[cfg(unix)]
        assert_eq!(mode_of(&artifact.binary_path), 0o755);
        assert!(!fx.plan.bin_dir.join("kandi-cli-v1.0.2-macos-universal.tar.gz").exists());
        for mock in mocks {
            mock.assert();
        }
    }

    #[test]
    fn fetch_failure_without_fallback_is_terminal() {
        let mut server = mockito::Server::new();
        let _m = server.mock("GET", ARCHIVE_PATH).with_status(404).create();
        let fx = fixture(&server.url(), None);

        let err = install(&fx.plan, &CancelToken::new()).unwrap_err();
        match &err {
            InstallError::FallbackUnavailable { primary } => assert!(primary.contains("HTTP 404"), "{primary}"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(err.exit_code(), 1);
        assert!(!fx.plan.bin_dir.join("kandi").exists());
        assert_eq!(fs::read_dir(&fx.plan.bin_dir).unwrap().count(), 0);
    }

    #[test]
    fn fetch_failure_with_fallback_installs_local_build() {
        let mut server = mockito::Server::new();
        let _m = server.mock("GET", ARCHIVE_PATH).with_status(500).create();
        let fx = fixture(&server.url(), Some(FALLBACK_BINARY));

        let artifact = install(&fx.plan, &CancelToken::new()).unwrap();

        assert_eq!(artifact.source, ArtifactSource::Fallback);
        assert_eq!(fs::read(&artifact.binary_path).unwrap(), FALLBACK_BINARY);
        #[cfg(unix)]
        assert_eq!(mode_of(&artifact.binary_path), 0o755);
    }

    #[test]
    fn checksum_mismatch_falls_back_and_discards_archive() {
        let mut server = mockito::Server::new();
        let wrong = sha256_hex(b"some other archive");
        let _mocks = serve_release(&mut server, &wrong);
        let fx = fixture(&server.url(), Some(FALLBACK_BINARY));

        let artifact = install(&fx.plan, &CancelToken::new()).unwrap();

        assert_eq!(artifact.source, ArtifactSource::Fallback);
        assert_eq!(fs::read(&artifact.binary_path).unwrap(), FALLBACK_BINARY);
        assert!(!fx.plan.bin_dir.join("kandi-cli-v1.0.2-macos-universal.tar.gz").exists());
    }

    #[test]
    fn checksum_mismatch_without_fallback_reports_both_digests() {
        let mut server = mockito::Server::new();
        let wrong = sha256_hex(b"some other archive");
        let _mocks = serve_release(&mut server, &wrong);
        let fx = fixture(&server.url(), None);

        match install(&fx.plan, &CancelToken::new()) {
            Err(InstallError::FallbackUnavailable { primary }) => {
                assert!(primary.contains(&wrong));
                assert!(primary.contains(&sha256_hex(&release_archive())));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn pinned_digest_skips_manifest() {
        let mut server = mockito::Server::new();
        let archive = release_archive();
        let _archive = server.mock("GET", ARCHIVE_PATH).with_status(200).with_body(&archive).create();
        let manifest = server.mock("GET", MANIFEST_PATH).expect(0).create();
        let mut fx = fixture(&server.url(), None);
        fx.plan.config.expected_sha256 = Some(sha256_hex(&archive).to_uppercase());

        let artifact = install(&fx.plan, &CancelToken::new()).unwrap();
        assert_eq!(artifact.source, ArtifactSource::Release);
        manifest.assert();
    }

    #[test]
    fn missing_manifest_is_treated_as_a_failed_install() {
        let mut server = mockito::Server::new();
        let _archive = server.mock("GET", ARCHIVE_PATH).with_status(200).with_body(release_archive()).create();
        let _manifest = server.mock("GET", MANIFEST_PATH).with_status(404).create();
        let fx = fixture(&server.url(), None);

        match install(&fx.plan, &CancelToken::new()) {
            Err(InstallError::FallbackUnavailable { primary }) => assert!(primary.contains("checksum")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn archive_without_binary_falls_back() {
        let mut server = mockito::Server::new();
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        let mut header = tar::Header::new_gnu();
        header.set_size(4);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, "NOTES", &b"none"[..]).unwrap();
        let archive = builder.into_inner().unwrap().finish().unwrap();

        let _archive = server.mock("GET", ARCHIVE_PATH).with_status(200).with_body(&archive).create();
        let mut fx = fixture(&server.url(), Some(FALLBACK_BINARY));
        fx.plan.config.expected_sha256 = Some(sha256_hex(&archive));

        let artifact = install(&fx.plan, &CancelToken::new()).unwrap();
        assert_eq!(artifact.source, ArtifactSource::Fallback);
    }

    #[test]
    fn unsupported_environment_fails_before_any_request() {
        let mut server = mockito::Server::new();
        let archive = server.mock("GET", mockito::Matcher::Any).expect(0).create();
        let mut fx = fixture(&server.url(), Some(FALLBACK_BINARY));
        fx.plan.host = HostEnvironment::new("linux", "x86_64");

        let err = install(&fx.plan, &CancelToken::new()).unwrap_err();
        assert!(matches!(err, InstallError::EnvironmentUnsupported(_)));
        assert_eq!(err.exit_code(), 2);
        assert!(!fx.plan.bin_dir.exists());
        archive.assert();
    }

    #[test]
    fn missing_fallback_path_is_unavailable() {
        let mut server = mockito::Server::new();
        let _m = server.mock("GET", ARCHIVE_PATH).with_status(404).create();
        let mut fx = fixture(&server.url(), None);
        fx.plan.fallback_binary = Some(fx.plan.bin_dir.join("does-not-exist"));

        assert!(matches!(
            install(&fx.plan, &CancelToken::new()),
            Err(InstallError::FallbackUnavailable { .. })
        ));
    }

    #[test]
    fn repeated_installs_produce_identical_binaries() {
        let mut server = mockito::Server::new();
        let digest = sha256_hex(&release_archive());
        let archive = release_archive();
        let _redirect = server
            .mock("GET", ARCHIVE_PATH)
            .with_status(302)
            .with_header("location", &format!("{}/cdn/archive", server.url()))
            .expect(2)
            .create();
        let _body = server.mock("GET", "/cdn/archive").with_status(200).with_body(&archive).expect(2).create();
        let mut fx = fixture(&server.url(), None);
        fx.plan.config.expected_sha256 = Some(digest);

        let first = install(&fx.plan, &CancelToken::new()).unwrap();
        let first_bytes = fs::read(&first.binary_path).unwrap();
        let second = install(&fx.plan, &CancelToken::new()).unwrap();
        let second_bytes = fs::read(&second.binary_path).unwrap();

        assert_eq!(first, second);
        assert_eq!(first_bytes, second_bytes);
        assert_eq!(first_bytes, RELEASE_BINARY);
    }

    #[test]
    fn cancelled_run_skips_fallback() {
        let server = mockito::Server::new();
        let fx = fixture(&server.url(), Some(FALLBACK_BINARY));
        let token = CancelToken::new();
        token.cancel();

        let err = install(&fx.plan, &token).unwrap_err();
        assert!(matches!(err, InstallError::Fetch(FetchError::Cancelled)), "{err:?}");
        assert!(!fx.plan.bin_dir.join(BINARY_NAME).exists());
        assert!(!fx.plan.bin_dir.join("kandi-cli-v1.0.2-macos-universal.tar.gz").exists());
    }

    #[test]
    fn recoverable_errors_map_to_fallback_messages() {
        let err = InstallError::Verify(VerifyError::ChecksumMismatch { expected: "e".into(), actual: "a".into() });
        let fx = fixture("http://127.0.0.1:1", None);
        match install_fallback(&fx.plan, err) {
            Err(InstallError::FallbackUnavailable { primary }) => assert!(primary.starts_with("verification failed")),
            other => panic!("unexpected {other:?}"),
        }

        let fetch = InstallError::Fetch(FetchError::Cancelled);
        assert!(fetch.is_recoverable());
    }
}
