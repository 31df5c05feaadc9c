// Archive extraction through the system `tar` utility.
//
// The archive format itself is not interpreted here; `tar -xzf` does the work
// and only its exit status and stderr are inspected.

use crate::errors::ExtractError;
use crate::{log_debug, log_info};
use colored::Colorize;
use std::fs;
use std::path::Path;
use std::process::Command;

const TAR: &str = "tar";

/// Unpacks the gzip-compressed tarball `archive` into `dest`.
pub fn extract_tar_gz(archive: &Path, dest: &Path) -> Result<(), ExtractError> {
    log_info!("[Extract] Extracting {} ...", archive.display().to_string().cyan());
    log_debug!("[Extract] {} -xzf {} -C {}", TAR, archive.display(), dest.display());

    let output = Command::new(TAR)
        .arg("-xzf")
        .arg(archive)
        .arg("-C")
        .arg(dest)
        .output()
        .map_err(|source| ExtractError::Spawn { program: TAR.to_string(), source })?;

    if !output.status.success() {
        return Err(ExtractError::Failed {
            program: TAR.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}

/// Ensures extraction produced `<dest>/<binary_name>` as a regular file.
pub fn expect_binary(dest: &Path, binary_name: &str) -> Result<(), ExtractError> {
    let candidate = dest.join(binary_name);
    if candidate.is_file() {
        Ok(())
    } else {
        Err(ExtractError::MissingBinary(binary_name.to_string()))
    }
}

/// Extracts `archive` into `dest`, requiring `binary_name` at the archive's top level.
///
/// Entries are unpacked into a scratch directory inside `dest` and only moved
/// over the existing contents once the binary is confirmed present, so a
/// broken archive leaves a previous install untouched.
///
/// # Arguments
/// * `archive`: Path to the verified `.tar.gz`.
/// * `dest`: The install directory. It must already exist.
/// * `binary_name`: File that must appear at the top of the archive (`kandi`).
///
/// # Returns
/// * `Ok(())` once every entry has been moved into `dest`.
/// * `Err(ExtractError)` if `tar` fails, the binary is missing, or an entry
///   cannot be moved.
pub fn unpack_release(archive: &Path, dest: &Path, binary_name: &str) -> Result<(), ExtractError> {
    let staging = tempfile::Builder::new()
        .prefix(".kandi-extract-")
        .tempdir_in(dest)
        .map_err(|source| ExtractError::Place { path: dest.to_path_buf(), source })?;

    extract_tar_gz(archive, staging.path())?;
    expect_binary(staging.path(), binary_name)?;

    let entries = fs::read_dir(staging.path())
        .map_err(|source| ExtractError::Place { path: staging.path().to_path_buf(), source })?;
    for entry in entries {
        let entry = entry.map_err(|source| ExtractError::Place { path: staging.path().to_path_buf(), source })?;
        let target = dest.join(entry.file_name());
        promote(&entry.path(), &target).map_err(|source| ExtractError::Place { path: target.clone(), source })?;
        log_debug!("[Extract] Placed {}", target.display().to_string().green());
    }
    Ok(())
}

// Renames `from` over `to`; an existing directory at `to` is replaced wholesale.
fn promote(from: &Path, to: &Path) -> std::io::Result<()> {
    if to.is_dir() && !to.is_symlink() {
        fs::remove_dir_all(to)?;
    }
    fs::rename(from, to)
}
