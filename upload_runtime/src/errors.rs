use thiserror::Error;
use tracing::error;

/// Errors raised while starting the upload runtime or joining work spawned on it.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum UploadRuntimeError {
    #[error("Error Initializing Runtime: {0:?}")]
    RuntimeInitializationError(#[from] std::io::Error),

    #[error("Task Panic: {0:?}.")]
    TaskPanic(String),

    #[error("Task cancelled; possible runtime shutdown in progress ({0}).")]
    TaskCanceled(String),

    #[error("Async Task Join Error: {0}")]
    OtherJoinError(tokio::task::JoinError),

    #[error("Runtime is shut down")]
    RuntimeShutdown,

    #[error("Upload runtime error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, UploadRuntimeError>;

pub fn map_join_error(e: tokio::task::JoinError) -> UploadRuntimeError {
    if e.is_panic() {
        error!("Panic reported on upload worker task: {e:?}");
        UploadRuntimeError::TaskPanic(format!("{e:?}"))
    } else if e.is_cancelled() {
        UploadRuntimeError::TaskCanceled(format!("{e}"))
    } else {
        UploadRuntimeError::OtherJoinError(e)
    }
}

impl From<tokio::task::JoinError> for UploadRuntimeError {
    fn from(e: tokio::task::JoinError) -> Self {
        map_join_error(e)
    }
}
