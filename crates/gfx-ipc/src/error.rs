//! The subset of the spec's error taxonomy (§7) owned by the IPC layer.
//! Higher layers (`gfx-surface`, `gfx-eventbuffer`, ...) define their own
//! richer error enums and convert from this one where the fabric is the
//! proximate cause.

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum IpcError {
    #[error("invalid argument: {0}")]
    InvArg(&'static str),
    #[error("shared allocation refused: out of memory")]
    NoMemory,
    #[error("cross-process operation failed")]
    Ipc,
}
