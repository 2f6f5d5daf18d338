//! The on-disk configuration schema (spec §6 "Configuration (process-wide,
//! initialized once)"), parsed with `serde` + `toml` the way the teacher's
//! own config crate parses its TOML file: a typed struct with
//! `#[serde(default)]` fields so unknown or omitted keys never fail to
//! parse.

use serde::Deserialize;

use crate::types::{AlignmentConfig, WindowSurfacePolicy};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ModeConfig {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CursorConfig {
    #[serde(default)]
    pub no_cursor: bool,
    #[serde(default)]
    pub videoonly: bool,
    pub resource_id: Option<u32>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct WarnConfig {
    /// Logs an allocation whose requested size exceeds this many bytes
    /// (spec §6 "warn thresholds (e.g., allocate-buffer size for
    /// warning)").
    pub allocate_buffer_bytes: Option<usize>,
    /// Logs every stretch-blit (spec §6 "software-warn").
    #[serde(default)]
    pub software: bool,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub alignment: AlignmentConfig,
    #[serde(default = "ConfigFile::default_shm_pool_size")]
    pub shm_pool_size: usize,
    #[serde(default)]
    pub debug_shm: bool,
    #[serde(default)]
    pub window_surface_policy: WindowSurfacePolicy,
    #[serde(default)]
    pub single_window: bool,
    #[serde(default)]
    pub cursor: CursorConfig,
    #[serde(default)]
    pub mode: ModeConfig,
    #[serde(default)]
    pub mirror_outputs: bool,
    #[serde(default)]
    pub multihead_outputs: bool,
    #[serde(default)]
    pub no_banner: bool,
    #[serde(default)]
    pub quiet: bool,
    #[serde(default)]
    pub trace: bool,
    #[serde(default)]
    pub nm_for_trace: bool,
    #[serde(default)]
    pub warn: WarnConfig,
    #[serde(default)]
    pub discard_repeat_events: bool,
}

impl ConfigFile {
    pub(crate) const fn default_shm_pool_size() -> usize {
        4 * 1024 * 1024
    }
}
