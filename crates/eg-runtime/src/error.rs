use derive_more::From;
use eg_core::error::{CoreError, CoreReason};
use orion_error::{ErrorCode, StructError, UvsReason};

#[derive(Debug, Clone, PartialEq, thiserror::Error, From)]
pub enum RuntimeReason {
    #[error("bootstrap error")]
    Bootstrap,
    #[error("input error")]
    Input,
    #[error("window processing error")]
    Process,
    #[error("{0}")]
    Core(CoreReason),
    #[error("{0}")]
    Uvs(UvsReason),
}

impl ErrorCode for RuntimeReason {
    fn error_code(&self) -> i32 {
        match self {
            Self::Bootstrap => 2101,
            Self::Input => 2102,
            Self::Process => 2103,
            Self::Core(c) => c.error_code(),
            Self::Uvs(u) => u.error_code(),
        }
    }
}

pub type RuntimeError = StructError<RuntimeReason>;
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Lift a core error, keeping its reason so callers can still match on
/// e.g. `CheckpointWrite`.
pub(crate) fn from_core(err: CoreError) -> RuntimeError {
    StructError::from(RuntimeReason::Core(err.reason().clone())).with_detail(err.to_string())
}
