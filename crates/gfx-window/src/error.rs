//! Error taxonomy for the window façade (spec §4.6, §7).

#[derive(Debug, thiserror::Error)]
pub enum WindowError {
    #[error("invalid argument: {0}")]
    InvArg(&'static str),
    #[error("window stack is destroyed")]
    Destroyed,
    #[error(transparent)]
    Stack(#[from] gfx_windowstack::StackError),
    #[error(transparent)]
    Pool(#[from] gfx_surface::PoolError),
}

pub type WindowResult<T> = Result<T, WindowError>;
