//! One file's upload: its record, its state machine, and the future that drives it.

use std::sync::Arc;

use error_printer::ErrorPrinter;
use parking_lot::Mutex;
use progress_tracking::{BatchCounters, ProgressObservable};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use ulid::Ulid;
use utils::CallbackGuard;
use vault_client::{UploadReceipt, UploadSource, Uploader};

use crate::descriptor::FileDescriptor;
use crate::errors::TaskFailure;

/// Lifecycle state of a single upload task.
///
/// `Pending -> Uploading -> {Succeeded, Failed, Cancelled}`, and `Pending -> Cancelled` for a
/// task cancelled before it started.  Terminal states are never left.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Uploading,
    Succeeded,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Succeeded | TaskStatus::Failed | TaskStatus::Cancelled)
    }

    fn can_transition_to(self, next: TaskStatus) -> bool {
        match (self, next) {
            (TaskStatus::Pending, TaskStatus::Uploading) => true,
            // A task may fail or be cancelled before it gets as far as uploading.
            (TaskStatus::Pending, TaskStatus::Failed | TaskStatus::Cancelled) => true,
            (TaskStatus::Uploading, next) => next.is_terminal(),
            _ => false,
        }
    }
}

/// The record for one file of a batch.
///
/// Once terminal, exactly one of [`receipt`](Self::receipt) and [`failure`](Self::failure) is
/// set for `Succeeded` and `Failed`; neither is set for `Cancelled`.
#[derive(Clone, Debug)]
pub struct UploadTask {
    descriptor: FileDescriptor,
    status: TaskStatus,
    receipt: Option<UploadReceipt>,
    failure: Option<TaskFailure>,
}

impl UploadTask {
    pub(crate) fn new(descriptor: FileDescriptor) -> Self {
        Self {
            descriptor,
            status: TaskStatus::Pending,
            receipt: None,
            failure: None,
        }
    }

    pub fn descriptor(&self) -> &FileDescriptor {
        &self.descriptor
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn receipt(&self) -> Option<&UploadReceipt> {
        self.receipt.as_ref()
    }

    pub fn failure(&self) -> Option<&TaskFailure> {
        self.failure.as_ref()
    }

    fn transition(&mut self, next: TaskStatus) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        self.status = next;
        true
    }

    fn start(&mut self) -> bool {
        self.transition(TaskStatus::Uploading)
    }

    fn succeed(&mut self, receipt: UploadReceipt) -> bool {
        let moved = self.transition(TaskStatus::Succeeded);
        if moved {
            self.receipt = Some(receipt);
        }
        moved
    }

    fn fail(&mut self, failure: TaskFailure) -> bool {
        let moved = self.transition(TaskStatus::Failed);
        if moved {
            self.failure = Some(failure);
        }
        moved
    }

    fn cancel(&mut self) -> bool {
        self.transition(TaskStatus::Cancelled)
    }
}

/// A point-in-time view of one task, for polling callers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TaskSnapshot {
    pub id: Ulid,
    pub display_name: String,
    pub size_bytes: u64,
    pub status: TaskStatus,
}

/// The only handle a running task has onto batch state: its own record.
#[derive(Debug)]
pub(crate) struct TaskSlot {
    record: Mutex<UploadTask>,
}

impl TaskSlot {
    pub(crate) fn new(descriptor: FileDescriptor) -> Arc<Self> {
        Arc::new(Self {
            record: Mutex::new(UploadTask::new(descriptor)),
        })
    }

    pub(crate) fn record(&self) -> UploadTask {
        self.record.lock().clone()
    }

    pub(crate) fn snapshot(&self) -> TaskSnapshot {
        let record = self.record.lock();
        TaskSnapshot {
            id: record.descriptor.id(),
            display_name: record.descriptor.display_name().to_owned(),
            size_bytes: record.descriptor.size_bytes(),
            status: record.status,
        }
    }

    fn descriptor(&self) -> FileDescriptor {
        self.record.lock().descriptor.clone()
    }
}

/// Outcome of one attempt, before it is written to the record.
enum Settlement {
    Succeeded(UploadReceipt),
    Failed(TaskFailure),
    Cancelled,
}

/// Everything one spawned task needs.  Counters and the observable are shared across the batch;
/// the slot is this task's alone.
pub(crate) struct TaskContext {
    pub(crate) batch_id: Ulid,
    pub(crate) index: usize,
    pub(crate) slot: Arc<TaskSlot>,
    pub(crate) uploader: Arc<dyn Uploader>,
    pub(crate) counters: Arc<BatchCounters>,
    pub(crate) progress: Arc<ProgressObservable>,
    pub(crate) cancel: CancellationToken,
}

impl TaskContext {
    /// Drive this task to a terminal state.  Never returns an error: every outcome is written
    /// to the record and counted exactly once.
    pub(crate) async fn run(self) {
        // If the future is dropped or unwinds before settling, count it as failed so the batch
        // still settles.
        let guard = {
            let slot = self.slot.clone();
            let counters = self.counters.clone();
            let progress = self.progress.clone();
            let (batch_id, index) = (self.batch_id, self.index);
            CallbackGuard::new(move || {
                let failure = TaskFailure::Aborted("task ended before recording an outcome".to_owned());
                if slot.record.lock().fail(failure) {
                    warn!(%batch_id, index, "upload task aborted");
                    progress.record(&counters, BatchCounters::record_failed);
                }
            })
        };

        let descriptor = self.slot.descriptor();

        let settlement = if self.cancel.is_cancelled() {
            Settlement::Cancelled
        } else {
            self.slot.record.lock().start();
            debug!(batch_id = %self.batch_id, index = self.index, file = %descriptor.display_name(), "upload started");

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Settlement::Cancelled,
                result = upload_one(self.uploader.as_ref(), &descriptor) => match result {
                    Ok(receipt) => Settlement::Succeeded(receipt),
                    Err(failure) => Settlement::Failed(failure),
                },
            }
        };

        self.settle(&descriptor, settlement);
        guard.disarm();
    }

    fn settle(&self, descriptor: &FileDescriptor, settlement: Settlement) {
        let (batch_id, index, file) = (self.batch_id, self.index, descriptor.display_name());

        match settlement {
            Settlement::Succeeded(receipt) => {
                info!(%batch_id, index, file, url = %receipt.url, "upload succeeded");
                if self.slot.record.lock().succeed(receipt) {
                    self.progress.record(&self.counters, BatchCounters::record_completed);
                }
            },
            Settlement::Failed(failure) => {
                warn!(%batch_id, index, file, local = failure.is_local(), error = %failure, "upload failed");
                if self.slot.record.lock().fail(failure) {
                    self.progress.record(&self.counters, BatchCounters::record_failed);
                }
            },
            Settlement::Cancelled => {
                info!(%batch_id, index, file, "upload cancelled");
                if self.slot.record.lock().cancel() {
                    self.progress.record(&self.counters, BatchCounters::record_cancelled);
                }
            },
        }
    }
}

/// Open the file and hand it to the uploader.  The handle is dropped on every path out of here.
async fn upload_one(uploader: &dyn Uploader, descriptor: &FileDescriptor) -> Result<UploadReceipt, TaskFailure> {
    let path = descriptor.source();
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|e| TaskFailure::local_io(path, e))?;

    let metadata = file.metadata().await.map_err(|e| TaskFailure::local_io(path, e))?;
    if !metadata.is_file() {
        return Err(TaskFailure::local_io(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
        ));
    }

    let source = UploadSource {
        file,
        file_name: descriptor.display_name().to_owned(),
        size_bytes: metadata.len(),
    };

    let receipt = uploader.upload(source).await.debug_error("uploader returned an error")?;
    Ok(receipt)
}
