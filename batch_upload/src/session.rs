//! UploadSession - owns the runtime, configuration and uploader

use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::info;
use ulid::Ulid;
use upload_config::UploadConfig;
use upload_runtime::UploadRuntime;
use vault_client::{Uploader, VaultClient};

use crate::coordinator::{BatchCoordinator, BatchHandle};
use crate::descriptor::FileDescriptor;
use crate::errors::BatchError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SessionState {
    Alive,
    Aborted,
}

/// All shared state for a session.
/// Lives behind `Arc<UploadSessionInner>`; do not use this type directly.
#[doc(hidden)]
pub struct UploadSessionInner {
    pub runtime: Arc<UploadRuntime>,
    pub(crate) config: UploadConfig,
    coordinator: BatchCoordinator,

    // Parent of every batch's cancellation token.
    cancel: CancellationToken,

    state: Mutex<SessionState>,
    pub(crate) id: Ulid,
}

/// Entry point for uploading batches of files.
///
/// A session owns a tokio runtime (or wraps an existing one), the configuration, and the
/// uploader shared by every batch submitted through it.
///
/// # Cloning
///
/// Cloning is cheap; all clones share the same runtime and uploader.
///
/// # Lifecycle
///
/// 1. Create a session with [`UploadSession::new`] or one of its variants.
/// 2. [`submit`](Self::submit) any number of batches and settle them through their
///    [`BatchHandle`]s.
/// 3. Drop the session when done.  To stop everything at once, e.g. on Ctrl-C, call
///    [`abort`](Self::abort): live batches are cancelled and new submissions are refused.
#[derive(Clone)]
pub struct UploadSession {
    inner: Arc<UploadSessionInner>,
}

impl std::ops::Deref for UploadSession {
    type Target = UploadSessionInner;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl UploadSession {
    /// Create a session with its own runtime, uploading through a [`VaultClient`] built from
    /// the `client` config group.
    pub fn new(config: UploadConfig) -> Result<Self, BatchError> {
        let client = VaultClient::new(&config.client.endpoint, &config.client.user_agent)?;
        Self::with_uploader(config, Arc::new(client))
    }

    /// Create a session with its own runtime and the given uploader.
    pub fn with_uploader(config: UploadConfig, uploader: Arc<dyn Uploader>) -> Result<Self, BatchError> {
        let runtime = UploadRuntime::new(&config)?;
        Ok(Self::with_runtime(config, uploader, runtime))
    }

    /// Create a session on an existing runtime, e.g. [`UploadRuntime::current`] from async code.
    pub fn with_runtime(config: UploadConfig, uploader: Arc<dyn Uploader>, runtime: Arc<UploadRuntime>) -> Self {
        let coordinator = BatchCoordinator::new(runtime.clone(), uploader, config.upload_concurrency_limit());
        let id = Ulid::new();

        info!(session_id = %id, max_concurrent = ?coordinator.max_concurrent(), "upload session created");

        Self {
            inner: Arc::new(UploadSessionInner {
                runtime,
                config,
                coordinator,
                cancel: CancellationToken::new(),
                state: Mutex::new(SessionState::Alive),
                id,
            }),
        }
    }

    pub fn id(&self) -> Ulid {
        self.id
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Start uploading `descriptors` as one batch.
    ///
    /// Fails only for a submission that cannot run at all: a descriptor missing a field, a
    /// repeated descriptor id, or an aborted session.  Per-file failures are reported in the
    /// batch's [`ResultReport`](crate::ResultReport).
    pub fn submit(&self, descriptors: Vec<FileDescriptor>) -> Result<BatchHandle, BatchError> {
        // Held across submission so abort cannot miss a batch that is being created.
        let state = self.state.lock();
        if *state == SessionState::Aborted {
            return Err(BatchError::SessionEnded);
        }
        self.coordinator
            .submit_with_cancellation(descriptors, self.cancel.child_token())
    }

    /// Cancel every live batch and refuse further submissions.
    pub fn abort(&self) {
        let mut state = self.state.lock();
        if *state == SessionState::Aborted {
            return;
        }
        *state = SessionState::Aborted;
        info!(session_id = %self.id, "upload session aborted");
        self.cancel.cancel();
    }

    pub fn is_aborted(&self) -> bool {
        *self.state.lock() == SessionState::Aborted
    }
}
