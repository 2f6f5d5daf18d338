//! Configuration value types (spec §6 "Options consumed by the core engine").

use serde::Deserialize;

use crate::error::{ConfigError, ConfigResult};

/// `(base, pitch)` surface alignment; both must be powers of two ≥ 2, or
/// both zero meaning "no alignment" (spec §6 "surface alignment").
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct AlignmentConfig {
    #[serde(default)]
    pub base: u32,
    #[serde(default)]
    pub pitch: u32,
}

fn is_pow2_at_least_2(value: u32) -> bool {
    value >= 2 && value.is_power_of_two()
}

impl AlignmentConfig {
    /// `None` means "no alignment" (spec §6: "both powers of two ≥ 2 or
    /// both zero ⇒ no alignment").
    pub fn validate(&self) -> ConfigResult<Option<(u32, u32)>> {
        match (self.base, self.pitch) {
            (0, 0) => Ok(None),
            (base, pitch) if is_pow2_at_least_2(base) && is_pow2_at_least_2(pitch) => Ok(Some((base, pitch))),
            _ => Err(ConfigError::InvArg("alignment base/pitch must both be zero or both a power of two >= 2")),
        }
    }
}

/// Window surface buffer policy preference (spec §6 "window surface
/// policy (system-only | video-high | auto)").
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum WindowSurfacePolicy {
    SystemOnly,
    VideoHigh,
    #[default]
    Auto,
}

impl WindowSurfacePolicy {
    /// Resolves `auto` against reported blit capability (spec §6: "with an
    /// auto fallback based on blit capability").
    pub fn resolve(self, gpu_blit_capable: bool) -> gfx_surface::BufferPolicy {
        match self {
            WindowSurfacePolicy::SystemOnly => gfx_surface::BufferPolicy::SystemOnly,
            WindowSurfacePolicy::VideoHigh => gfx_surface::BufferPolicy::VideoOnly,
            WindowSurfacePolicy::Auto => {
                if gpu_blit_capable {
                    gfx_surface::BufferPolicy::VideoOnly
                } else {
                    gfx_surface::BufferPolicy::SystemOnly
                }
            }
        }
    }
}
