// Register application subcommands.
// Each module corresponds to a specific `kandi-install` command-line action.

// Downloads, verifies and installs the release binary.
pub mod install;
// Displays the installer version and the configured release.
pub mod version;
