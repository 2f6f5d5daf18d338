//! Process-wide compositor configuration (spec §6 "Configuration"):
//! every option the core engine consumes, parsed from a TOML file with
//! serde defaults, plus derived values that depend on runtime-reported
//! capabilities.

pub mod config;
pub mod error;
pub mod file;
pub mod types;

pub use config::{discover, load_from, Config};
pub use error::{ConfigError, ConfigResult};
pub use file::{ConfigFile, CursorConfig, ModeConfig, WarnConfig};
pub use types::{AlignmentConfig, WindowSurfacePolicy};
