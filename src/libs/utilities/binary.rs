// Placing executables on disk: permission bits and copy-into-place.

use crate::log_debug;
use colored::Colorize;
use std::fs;
use std::io;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

/// Sets `mode` (e.g. `0o755`) on the file at `path`.
#[cfg(unix)]
pub fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    log_debug!("[Binary] chmod {:o} {}", mode, path.display().to_string().yellow());
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(mode);
    fs::set_permissions(path, perms)
}

// Windows has no mode bits; executability comes from the file extension.
#[cfg(not(unix))]
pub fn set_mode(path: &Path, _mode: u32) -> io::Result<()> {
    log_debug!("[Binary] Skipping chmod on {} (non-Unix platform)", path.display());
    Ok(())
}

/// Copies `from` over `to`.
///
/// The bytes land in a temporary file in the destination directory first and are
/// renamed over `to`, so an interrupted copy never leaves a truncated binary behind.
///
/// # Arguments
/// * `from`: The source file, e.g. a locally built `target/release/kandi`.
/// * `to`: The final path. Its parent directory is created if missing.
///
/// # Returns
/// * `io::Result<()>`: any failure to read, write or rename.
pub fn copy_into_place(from: &Path, to: &Path) -> io::Result<()> {
    let parent = to.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    fs::create_dir_all(parent)?;

    let mut staged = tempfile::NamedTempFile::new_in(parent)?;
    let mut source = fs::File::open(from)?;
    io::copy(&mut source, staged.as_file_mut())?;
    staged.as_file().sync_all()?;
    staged.persist(to).map_err(|e| e.error)?;

    log_debug!(
        "[Binary] Copied {} -> {}",
        from.display().to_string().yellow(),
        to.display().to_string().green()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn set_mode_applies_exact_bits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kandi");
        fs::write(&path, b"bin").unwrap();

        set_mode(&path, 0o755).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().permissions().mode() & 0o777, 0o755);
    }

    #[test]
    fn copy_into_place_overwrites_existing_target() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("source");
        let to = dir.path().join("bin").join("kandi");
        fs::write(&from, b"new build").unwrap();
        fs::create_dir_all(to.parent().unwrap()).unwrap();
        fs::write(&to, b"old build with more bytes").unwrap();

        copy_into_place(&from, &to).unwrap();
        assert_eq!(fs::read(&to).unwrap(), b"new build");
        assert_eq!(fs::read_dir(to.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn copy_from_missing_source_fails_without_touching_target() {
        let dir = tempfile::tempdir().unwrap();
        let to = dir.path().join("kandi");
        fs::write(&to, b"keep me").unwrap();

        assert!(copy_into_place(&dir.path().join("absent"), &to).is_err());
        assert_eq!(fs::read(&to).unwrap(), b"keep me");
    }
}
