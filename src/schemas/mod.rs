// Data types shared across the installer: settings, release identity, checksum manifests.

pub mod installer_config;
pub mod manifest;
pub mod release;
