use derive_more::From;
use orion_error::{ErrorCode, StructError, UvsReason};

#[derive(Debug, Clone, PartialEq, thiserror::Error, From)]
pub enum CoreReason {
    /// Self-contradictory windowing settings. Never transient.
    #[error("invalid windowing configuration")]
    InvalidConfiguration,
    /// A checkpoint could not be persisted; the previous one is untouched.
    #[error("checkpoint write error")]
    CheckpointWrite,
    #[error("invalid window split")]
    InvalidSplit,
    #[error("{0}")]
    Uvs(UvsReason),
}

impl ErrorCode for CoreReason {
    fn error_code(&self) -> i32 {
        match self {
            Self::InvalidConfiguration => 1101,
            Self::CheckpointWrite => 1102,
            Self::InvalidSplit => 1103,
            Self::Uvs(u) => u.error_code(),
        }
    }
}

pub type CoreError = StructError<CoreReason>;
pub type CoreResult<T> = Result<T, CoreError>;
