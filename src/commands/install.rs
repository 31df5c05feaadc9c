// Entry point of the `install` command: builds the install plan from the
// layered configuration, runs the pipeline and turns the outcome into an exit code.

use crate::cli::cmd_enums::InstallArgs;
use crate::errors::InstallError;
use crate::libs::config_loading::{ConfigOverrides, load_installer_config, resolve_bin_dir, resolve_fallback};
use crate::libs::release_installer::{InstallPlan, install};
use crate::libs::utilities::assets::CancelToken;
use crate::libs::utilities::platform::HostEnvironment;
use crate::schemas::release::{ArtifactSource, InstalledArtifact};
use crate::{log_debug, log_error, log_info, log_warn};
use anyhow::Result;
use colored::Colorize;
use std::io::{self, Write};

/// Exit status for configuration problems detected before the pipeline starts.
const EXIT_CONFIG: i32 = 2;

/// Runs the install command and returns the process exit code.
pub fn run(args: InstallArgs) -> i32 {
    log_debug!("Entered install::run() with {:?}", args);

    let plan = match build_plan(&args) {
        Ok(plan) => plan,
        Err(e) => {
            log_error!("Invalid installer configuration: {:#}", e);
            return EXIT_CONFIG;
        }
    };

    let outcome = install(&plan, &cancel_on_interrupt());
    report(&outcome);
    exit_code(&outcome)
}

fn build_plan(args: &InstallArgs) -> Result<InstallPlan> {
    let overrides = ConfigOverrides {
        version: args.release.clone(),
        bin_dir: args.bin_dir.clone(),
        fallback_binary: args.fallback_binary.clone(),
        expected_sha256: args.sha256.clone(),
        allow_insecure_http: args.allow_http,
    };
    let config = load_installer_config(args.config.as_deref(), &overrides)?;
    let bin_dir = resolve_bin_dir(&config)?;
    let fallback_binary = resolve_fallback(&config)?;

    Ok(InstallPlan {
        config,
        host: HostEnvironment::current(),
        bin_dir,
        fallback_binary,
    })
}

/// Returns a token that is cancelled when the user presses Ctrl-C.
///
/// Without a handler, Ctrl-C kills the process outright and leaves the partial
/// archive in `bin/`; with it the fetcher stops at the next chunk and cleans up.
fn cancel_on_interrupt() -> CancelToken {
    let token = CancelToken::new();
    let handler_token = token.clone();
    let installed = ctrlc::set_handler(move || {
        log_warn!("Interrupt received, stopping the install...");
        handler_token.cancel();
    });
    if let Err(e) = installed {
        log_warn!("Could not install the Ctrl-C handler: {}", e);
    }
    token
}

fn report(outcome: &Result<InstalledArtifact, InstallError>) {
    match outcome {
        Ok(artifact) => {
            if let Err(e) = write_location(&mut io::stdout().lock(), artifact) {
                log_debug!("Could not write binary location to stdout: {}", e);
            }
            log_info!(
                "Binary location: {} (mode {:o})",
                artifact.binary_path.display().to_string().green(),
                artifact.permission_mode
            );
            if artifact.source == ArtifactSource::Release {
                log_info!("To get started, run: {}", "kandi --help".bold());
            }
        }
        Err(err) => log_error!("Installation failed: {}", err),
    }
}

/// Prints the installed binary's path on its own line for scripts wrapping the installer.
fn write_location(out: &mut impl Write, artifact: &InstalledArtifact) -> io::Result<()> {
    writeln!(out, "{}", artifact.binary_path.display())
}

pub fn exit_code(outcome: &Result<InstalledArtifact, InstallError>) -> i32 {
    match outcome {
        Ok(_) => 0,
        Err(err) => err.exit_code(),
    }
}
