//! Error taxonomy for the window stack and cursor (spec §4.4, §4.6, §7).

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StackError {
    #[error("invalid argument: {0}")]
    InvArg(&'static str),
    #[error("operation not supported by the attached window manager")]
    Unsupported,
    #[error("stack has been destroyed")]
    Destroyed,
    #[error("lookup miss: id not found")]
    IdNotFound,
    #[error("device already attached to this stack")]
    AlreadyAttached,
    #[error("surface pool error")]
    Pool,
}

impl From<gfx_surface::PoolError> for StackError {
    fn from(_: gfx_surface::PoolError) -> Self {
        StackError::Pool
    }
}

pub type StackResult<T> = Result<T, StackError>;
