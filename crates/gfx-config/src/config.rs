//! Loading and derived-value resolution, mirroring the teacher's
//! `Config`/`ConfigContext` split: `ConfigFile` is the raw parsed data,
//! `Config` wraps it and resolves values that depend on runtime-reported
//! capabilities (blit support, supported display modes).

use std::{fs, path::PathBuf};

use anyhow::Result;
use gfx_surface::BufferPolicy;
use tracing::{info, warn};

use crate::error::ConfigResult;
use crate::file::ConfigFile;

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub file: ConfigFile,
}

/// Prefers a local `compositor.toml` in the working directory; the
/// compositor is the only consumer of this config, so there is no
/// platform-wide discovery path to model (spec §6 names no location).
pub fn discover() -> PathBuf {
    PathBuf::from("compositor.toml")
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let file = match fs::read_to_string(&path) {
        Ok(content) => match toml::from_str::<ConfigFile>(&content) {
            Ok(file) => file,
            Err(err) => {
                warn!(target: "config", path = %path.display(), error = %err, "failed to parse config file, using defaults");
                ConfigFile::default()
            }
        },
        Err(_) => ConfigFile::default(),
    };
    info!(target: "config", path = %path.display(), "configuration loaded");
    Ok(Config { file })
}

impl Config {
    /// Validated `(base, pitch)` alignment, or `None` for "no alignment"
    /// (spec §6 "surface alignment").
    pub fn alignment(&self) -> ConfigResult<Option<(u32, u32)>> {
        self.file.alignment.validate()
    }

    /// Resolves `window surface policy` against reported blit capability
    /// (spec §6 "with an auto fallback based on blit capability").
    pub fn window_surface_policy(&self, gpu_blit_capable: bool) -> BufferPolicy {
        self.file.window_surface_policy.resolve(gpu_blit_capable)
    }

    /// Prefers the configured `mode` width/height when it appears among the
    /// caller-reported supported modes, else `None` (spec §6 "mode width/
    /// height preferring that resolution when present among supported
    /// modes").
    pub fn preferred_mode(&self, supported: &[(u32, u32)]) -> Option<(u32, u32)> {
        let (width, height) = (self.file.mode.width?, self.file.mode.height?);
        supported.iter().copied().find(|mode| *mode == (width, height))
    }

    /// `true` when an allocation of `size` bytes should log a warning
    /// (spec §6 "warn thresholds").
    pub fn should_warn_on_allocation(&self, size: usize) -> bool {
        self.file.warn.allocate_buffer_bytes.is_some_and(|threshold| size > threshold)
    }

    pub fn cursor_enabled(&self) -> bool {
        !self.file.cursor.no_cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = load_from(Some(PathBuf::from("__nonexistent_compositor_config__.toml"))).unwrap();
        assert_eq!(cfg.file.shm_pool_size, ConfigFile::default_shm_pool_size());
        assert!(!cfg.file.single_window);
    }

    #[test]
    fn parses_every_named_option() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            tmp.path(),
            r#"
shm_pool_size = 1048576
debug_shm = true
window_surface_policy = "video-high"
single_window = true
mirror_outputs = true
multihead_outputs = true
no_banner = true
quiet = true
trace = true
nm_for_trace = true
discard_repeat_events = true

[alignment]
base = 16
pitch = 32

[cursor]
no_cursor = true
videoonly = true
resource_id = 7

[mode]
width = 1920
height = 1080

[warn]
allocate_buffer_bytes = 4096
software = true
"#,
        )
        .unwrap();

        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.file.shm_pool_size, 1_048_576);
        assert!(cfg.file.debug_shm);
        assert_eq!(cfg.alignment().unwrap(), Some((16, 32)));
        assert!(!cfg.cursor_enabled());
        assert_eq!(cfg.file.cursor.resource_id, Some(7));
        assert_eq!(cfg.preferred_mode(&[(1920, 1080), (1280, 720)]), Some((1920, 1080)));
        assert!(cfg.should_warn_on_allocation(5000));
        assert!(!cfg.should_warn_on_allocation(100));
        assert!(cfg.file.warn.software);
        assert!(cfg.file.discard_repeat_events);
    }

    #[test]
    fn invalid_alignment_is_rejected() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "[alignment]\nbase = 3\npitch = 3\n").unwrap();
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert!(cfg.alignment().is_err());
    }

    #[test]
    fn window_surface_policy_auto_follows_blit_capability() {
        let cfg = Config::default();
        assert_eq!(cfg.window_surface_policy(true), BufferPolicy::VideoOnly);
        assert_eq!(cfg.window_surface_policy(false), BufferPolicy::SystemOnly);
    }

    #[test]
    fn preferred_mode_is_none_when_not_among_supported() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "[mode]\nwidth = 3840\nheight = 2160\n").unwrap();
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.preferred_mode(&[(1920, 1080)]), None);
    }
}
