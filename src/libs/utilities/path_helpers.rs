// Path expansion and default locations.

use crate::log_debug;
use std::io;
use std::path::PathBuf;

/// Expands `~` and `$VAR` / `${VAR}` references in a user-supplied path.
pub fn expand_path(path: &str) -> Result<PathBuf, shellexpand::LookupError<std::env::VarError>> {
    let expanded = shellexpand::full(path)?;
    Ok(PathBuf::from(expanded.as_ref()))
}

/// Default location of the optional installer settings file (`~/.kandi/installer.yaml`).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".kandi").join("installer.yaml"))
}

/// Default install directory: `bin/` beside the directory holding the running executable,
/// i.e. `<prefix>/bin` for an installer living in `<prefix>/scripts/`.
pub fn default_bin_dir() -> io::Result<PathBuf> {
    let exe = std::env::current_exe()?;
    let exe_dir = exe
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "executable has no parent directory"))?;
    let prefix = exe_dir.parent().unwrap_or(exe_dir);
    let bin = prefix.join("bin");
    log_debug!("[Paths] Default install directory: {}", bin.display());
    Ok(bin)
}
