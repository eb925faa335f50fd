//! Configuration file parsing for devtools-bridge
//!
//! Supports `.dtb/config.toml` in the working directory. Command-line flags
//! override anything set there.

pub mod settings;
pub mod types;

pub use settings::{init_config_dir, load_settings};
pub use types::*;
