// Low-level helpers used by the install pipeline.

pub mod assets;
pub mod binary;
pub mod checksum;
pub mod compression;
pub mod path_helpers;
pub mod platform;
