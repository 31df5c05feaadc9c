// Configuration layering and the install pipeline.

pub mod config_loading;
pub mod release_installer;
pub mod utilities;
