use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line interface of the Kandi CLI installer.
#[derive(Parser)]
#[command(name = "kandi-install", version)]
#[command(about = "Download, verify and install the Kandi CLI release binary")]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Enables detailed debug output for troubleshooting.
    #[arg(short, long, global = true)]
    pub(crate) debug: bool,

    /// Runs `install` when omitted.
    #[command(subcommand)]
    pub(crate) command: Option<Commands>,

    /// Install options accepted without the `install` subcommand.
    #[command(flatten)]
    pub(crate) install: InstallArgs,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch, verify and install the release binary, falling back to a local build on failure.
    Install(InstallArgs),
    /// Show the installer version and the release it installs.
    Version {
        /// Also ask the release host for the newest published version.
        #[arg(long)]
        check: bool,
        /// Optional path to an installer settings file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

/// Options of the `install` command. Most can also be set through the environment.
#[derive(Args, Debug, Default, Clone)]
pub struct InstallArgs {
    /// Installer settings file (defaults to ~/.kandi/installer.yaml when present).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory receiving the `kandi` binary (defaults to bin/ beside the installer).
    #[arg(long, env = "KANDI_INSTALL_DIR")]
    pub bin_dir: Option<String>,

    /// Locally built binary copied into place if the remote install fails.
    #[arg(long, env = "KANDI_FALLBACK_BINARY")]
    pub fallback_binary: Option<String>,

    /// Release version to install (`--version` is the installer's own version).
    #[arg(long, env = "KANDI_RELEASE_VERSION")]
    pub release: Option<String>,

    /// Expected SHA-256 of the release archive; skips the published checksum manifest.
    #[arg(long)]
    pub sha256: Option<String>,

    /// Allow plain http:// downloads (local mirrors only).
    #[arg(long)]
    pub allow_http: bool,
}
