//! Error taxonomy for the event buffer (spec §4.5, §7).

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EventBufferError {
    #[error("invalid argument: {0}")]
    InvArg(&'static str),
    #[error("operation unsupported in pipe mode")]
    Unsupported,
    #[error("event queue has no record")]
    BufferEmpty,
    #[error("wait deadline expired without a queued event")]
    Timeout,
    #[error("wait interrupted by WakeUp before a deadline or event")]
    Interrupted,
    #[error("cross-process operation failed")]
    Ipc,
}

pub type EventBufferResult<T> = Result<T, EventBufferError>;
