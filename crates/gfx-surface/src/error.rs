//! Error taxonomy for the surface pool engine (spec §7), restricted to the
//! subset this crate can raise itself. IPC-fabric failures are converted
//! from `gfx_ipc::IpcError` at the boundary where they occur.

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    #[error("invalid argument: {0}")]
    InvArg(&'static str),
    #[error("requested capability not provided by any pool")]
    Unsupported,
    #[error("shared allocation refused: out of memory")]
    NoMemory,
    #[error("pool-level allocation refused: out of video memory")]
    NoVideoMemory,
    #[error("pool count exceeds the configured maximum")]
    LimitExceeded,
    #[error("surface lock contended past the retry budget")]
    Locked,
    #[error("handle or peer object no longer exists")]
    Destroyed,
    #[error("lookup miss: id not found")]
    IdNotFound,
    #[error("rectangle/region argument has empty intersection with target area")]
    InvArea,
    #[error("joining process attempted to join pool id {attempted} out of order, expected {expected}")]
    OutOfOrderJoin { attempted: u32, expected: u32 },
    #[error("cross-process operation failed")]
    Ipc,
}

impl From<gfx_ipc::IpcError> for PoolError {
    fn from(err: gfx_ipc::IpcError) -> Self {
        match err {
            gfx_ipc::IpcError::InvArg(msg) => PoolError::InvArg(msg),
            gfx_ipc::IpcError::NoMemory => PoolError::NoMemory,
            gfx_ipc::IpcError::Ipc => PoolError::Ipc,
        }
    }
}

pub type PoolResult<T> = Result<T, PoolError>;
