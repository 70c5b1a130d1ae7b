//! Error types for batch uploads

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use ulid::Ulid;
use upload_runtime::UploadRuntimeError;
use vault_client::UploaderError;

/// Why a single file in a batch did not upload.
///
/// The inner errors are reference counted so a failure can live both on the task record and in
/// the batch's [`ResultReport`](crate::ResultReport).
#[derive(Clone, Debug, Error)]
pub enum TaskFailure {
    /// The file could not be opened or inspected.  The uploader was never called.
    #[error("could not read {}: {source}", .path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("{0}")]
    Remote(Arc<UploaderError>),

    /// The task ended without recording an outcome, e.g. it panicked or the runtime was shut
    /// down underneath it.
    #[error("upload aborted: {0}")]
    Aborted(String),
}

impl TaskFailure {
    pub(crate) fn local_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TaskFailure::LocalIo {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    /// True if the failure happened before anything was sent.
    pub fn is_local(&self) -> bool {
        matches!(self, TaskFailure::LocalIo { .. })
    }
}

impl From<UploaderError> for TaskFailure {
    fn from(e: UploaderError) -> Self {
        TaskFailure::Remote(Arc::new(e))
    }
}

/// Errors from submitting or settling a batch.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Invalid file descriptor at position {index}: {reason}")]
    InvalidDescriptor { index: usize, reason: String },

    #[error("File descriptor id {0} appears more than once in the batch")]
    DuplicateDescriptorId(Ulid),

    #[error("Session already ended")]
    SessionEnded,

    #[error("Runtime error: {0}")]
    Runtime(#[from] UploadRuntimeError),

    #[error("Uploader error: {0}")]
    Uploader(#[from] UploaderError),

    #[error("Batch settlement could not be observed; the batch driver exited early")]
    SettlementLost,

    #[error("Blocking wait called from inside an async runtime; await `settled()` instead")]
    BlockingInRuntime,
}
