//! Error taxonomy for configuration validation (spec §6, §7).

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid argument: {0}")]
    InvArg(&'static str),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
