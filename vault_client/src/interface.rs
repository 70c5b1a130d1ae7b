use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs::File;

use crate::error::Result;

/// An opened local file handed to an [`Uploader`].
///
/// The uploader takes ownership of the handle; it is closed when the source is dropped,
/// whichever way the upload ends.
#[derive(Debug)]
pub struct UploadSource {
    pub file: File,

    /// Name the file is stored under remotely.
    pub file_name: String,

    /// Length of the file at the time it was opened.
    pub size_bytes: u64,
}

/// Where an uploaded file can be retrieved, and the token that manages it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub url: String,
    pub token: String,
}

/// Performs one upload of one opened file.
///
/// Implementations do not retry and impose no timeout; a call may run for as long as the
/// transfer takes.  Dropping the returned future abandons the upload.
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, source: UploadSource) -> Result<UploadReceipt>;
}
