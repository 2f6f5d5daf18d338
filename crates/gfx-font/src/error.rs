//! Error taxonomy for the font/glyph-cache component (spec §4.7, §7).

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FontError {
    #[error("invalid argument: {0}")]
    InvArg(&'static str),
    #[error("glyph layer index out of range")]
    InvalidLayer,
    #[error("glyph source failed to render the requested index")]
    RenderFailed,
    #[error("row cache exhausted and no row could be evicted to make room")]
    RowCacheExhausted,
    #[error("surface pool error")]
    Pool,
}

impl From<gfx_surface::PoolError> for FontError {
    fn from(_: gfx_surface::PoolError) -> Self {
        FontError::Pool
    }
}

pub type FontResult<T> = Result<T, FontError>;
