// Host platform detection and alias normalization.
//
// Release assets and runtimes spell the same CPU or OS in several ways
// ("aarch64" vs "arm64", "darwin" vs "macos"). These helpers fold the
// known aliases into the enums used by the release descriptor.

use crate::log_debug;
use crate::schemas::release::{Architecture, Platform};
use colored::Colorize;

/// The operating system and architecture strings of the running process,
/// as reported by the Rust standard library (e.g. `("macos", "aarch64")`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEnvironment {
    pub os: String,
    pub arch: String,
}

impl HostEnvironment {
    pub fn current() -> Self {
        let host = HostEnvironment::new(std::env::consts::OS, std::env::consts::ARCH);
        log_debug!("[Platform] Detected host {}-{}", host.os.cyan(), host.arch.cyan());
        host
    }

    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        HostEnvironment { os: os.into(), arch: arch.into() }
    }
}

/// Maps an OS name (any known alias, case-insensitive) to a supported platform.
pub fn normalize_platform(os: &str) -> Option<Platform> {
    let os_lower = os.trim().to_lowercase();
    if os_aliases(Platform::MacOs).contains(&os_lower.as_str()) {
        return Some(Platform::MacOs);
    }
    log_debug!("[Platform] '{}' is not a supported platform", os.dimmed());
    None
}

/// Maps an architecture name (any known alias, case-insensitive) to a supported architecture.
pub fn normalize_architecture(arch: &str) -> Option<Architecture> {
    let arch_lower = arch.trim().to_lowercase();
    [Architecture::X86_64, Architecture::Arm64]
        .into_iter()
        .find(|candidate| arch_aliases(*candidate).contains(&arch_lower.as_str()))
}

fn arch_aliases(arch: Architecture) -> &'static [&'static str] {
    match arch {
        Architecture::X86_64 => &["x86_64", "amd64", "x64"],
        Architecture::Arm64 => &["arm64", "aarch64"],
    }
}

fn os_aliases(platform: Platform) -> &'static [&'static str] {
    match platform {
        Platform::MacOs => &["macos", "darwin", "osx", "macosx"],
    }
}
