//! Fan-out of one upload task per file, aggregation of their outcomes, and the handle callers
//! use to watch and settle a batch.

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::Arc;

use error_printer::ErrorPrinter;
use parking_lot::Mutex;
use progress_tracking::{BatchCounters, CountSnapshot, ProgressListener, ProgressObservable, ProgressSubscription, ProgressUpdate};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, Instrument};
use ulid::Ulid;
use upload_runtime::errors::map_join_error;
use upload_runtime::UploadRuntime;
use utils::LimitedJoinSet;
use vault_client::Uploader;

use crate::descriptor::FileDescriptor;
use crate::errors::BatchError;
use crate::report::{FileOutcome, ResultReport};
use crate::task::{TaskContext, TaskSlot, TaskSnapshot};

/// Runs batches of uploads on a runtime through one uploader.
///
/// Every file of a batch runs as its own task.  With a concurrency limit, at most that many
/// uploads are in flight at once and the rest wait their turn; without one, all start together.
#[derive(Clone)]
pub struct BatchCoordinator {
    runtime: Arc<UploadRuntime>,
    uploader: Arc<dyn Uploader>,
    max_concurrent: Option<NonZeroUsize>,
}

impl BatchCoordinator {
    pub fn new(runtime: Arc<UploadRuntime>, uploader: Arc<dyn Uploader>, max_concurrent: Option<NonZeroUsize>) -> Self {
        Self {
            runtime,
            uploader,
            max_concurrent,
        }
    }

    pub fn max_concurrent(&self) -> Option<NonZeroUsize> {
        self.max_concurrent
    }

    /// Start uploading `descriptors`.  Returns as soon as the tasks are queued.
    pub fn submit(&self, descriptors: Vec<FileDescriptor>) -> Result<BatchHandle, BatchError> {
        self.submit_with_cancellation(descriptors, CancellationToken::new())
    }

    /// Like [`submit`](Self::submit), with the batch cancelled when `cancel` is.
    pub fn submit_with_cancellation(
        &self,
        descriptors: Vec<FileDescriptor>,
        cancel: CancellationToken,
    ) -> Result<BatchHandle, BatchError> {
        validate_descriptors(&descriptors)?;

        if self.runtime.is_shutdown() {
            return Err(BatchError::Runtime(upload_runtime::UploadRuntimeError::RuntimeShutdown));
        }

        let batch_id = Ulid::new();
        let total = descriptors.len() as u64;
        let slots: Arc<[Arc<TaskSlot>]> = descriptors.into_iter().map(TaskSlot::new).collect();
        let counters = Arc::new(BatchCounters::new(total));
        let progress = Arc::new(ProgressObservable::new(total));
        let (report_tx, report_rx) = oneshot::channel();

        info!(%batch_id, total, max_concurrent = ?self.max_concurrent, "batch submitted");

        let state = Arc::new(BatchState {
            batch_id,
            slots,
            counters,
            progress,
            cancel,
        });

        if total == 0 {
            // Nothing to run: settled at creation.
            state.progress.close();
            let _ = report_tx.send(ResultReport::default());
            info!(%batch_id, "empty batch settled");
        } else {
            let driver = BatchDriver {
                state: state.clone(),
                uploader: self.uploader.clone(),
                max_concurrent: self.max_concurrent,
            };
            self.runtime
                .spawn(driver.run(report_tx).instrument(info_span!("upload_batch", %batch_id, total)));
        }

        Ok(BatchHandle {
            state,
            report_rx: Mutex::new(Some(report_rx)),
            runtime: self.runtime.clone(),
        })
    }
}

fn validate_descriptors(descriptors: &[FileDescriptor]) -> Result<(), BatchError> {
    let mut seen = HashSet::with_capacity(descriptors.len());
    for (index, descriptor) in descriptors.iter().enumerate() {
        descriptor
            .validate()
            .map_err(|reason| BatchError::InvalidDescriptor { index, reason })?;
        if !seen.insert(descriptor.id()) {
            return Err(BatchError::DuplicateDescriptorId(descriptor.id()));
        }
    }
    Ok(())
}

/// Shared between the handle, the driver, and (through their slots) the tasks.
struct BatchState {
    batch_id: Ulid,
    slots: Arc<[Arc<TaskSlot>]>,
    counters: Arc<BatchCounters>,
    progress: Arc<ProgressObservable>,
    cancel: CancellationToken,
}

impl BatchState {
    fn report(&self) -> ResultReport {
        ResultReport::new(self.slots.iter().map(|slot| FileOutcome::from_record(slot.record())).collect())
    }
}

struct BatchDriver {
    state: Arc<BatchState>,
    uploader: Arc<dyn Uploader>,
    max_concurrent: Option<NonZeroUsize>,
}

impl BatchDriver {
    async fn run(self, report_tx: oneshot::Sender<ResultReport>) {
        let state = self.state;
        let mut tasks = LimitedJoinSet::new(self.max_concurrent);

        for (index, slot) in state.slots.iter().enumerate() {
            let ctx = TaskContext {
                batch_id: state.batch_id,
                index,
                slot: slot.clone(),
                uploader: self.uploader.clone(),
                counters: state.counters.clone(),
                progress: state.progress.clone(),
                cancel: state.cancel.clone(),
            };
            tasks.spawn(ctx.run().instrument(info_span!("upload_file", index)));
        }

        while let Some(result) = tasks.join_next().await {
            // The task's own guard has already recorded the failure; only log here.
            result
                .map_err(map_join_error)
                .log_error("upload task did not complete normally")
                .ok();
        }

        // Every task has been joined, so every record write happens-before this read.
        let report = state.report();
        let counts = state.counters.snapshot();
        state.progress.close();

        info!(
            batch_id = %state.batch_id,
            total = counts.total,
            completed = counts.completed,
            failed = counts.failed,
            cancelled = counts.cancelled,
            "batch settled"
        );

        if report_tx.send(report).is_err() {
            debug!(batch_id = %state.batch_id, "batch handle dropped before settlement");
        }
    }
}

/// A submitted batch.
///
/// Progress can be read at any time; the [`ResultReport`] is available once every task has
/// reached a terminal state, through [`await_settlement`](Self::await_settlement) (blocking) or
/// [`settled`](Self::settled) (async).
///
/// The handle keeps the runtime the batch runs on alive, so the batch completes even if the
/// session that submitted it is dropped first.  Dropping the handle does not stop the batch
/// while its session is alive; use [`cancel`](Self::cancel) for that.
pub struct BatchHandle {
    state: Arc<BatchState>,
    report_rx: Mutex<Option<oneshot::Receiver<ResultReport>>>,

    // Held here and not in `BatchState`: the driver task owns a `BatchState` and must never be
    // the one to drop the runtime it runs on.
    runtime: Arc<UploadRuntime>,
}

impl BatchHandle {
    pub fn id(&self) -> Ulid {
        self.state.batch_id
    }

    pub fn total(&self) -> u64 {
        self.state.counters.total()
    }

    pub fn counts(&self) -> CountSnapshot {
        self.state.counters.snapshot()
    }

    pub fn is_settled(&self) -> bool {
        self.state.counters.is_settled()
    }

    /// The most recently published progress value.
    pub fn progress(&self) -> ProgressUpdate {
        self.state.progress.current()
    }

    /// Status of every task, in submission order.
    pub fn task_snapshots(&self) -> Vec<TaskSnapshot> {
        self.state.slots.iter().map(|slot| slot.snapshot()).collect()
    }

    /// A stream of progress values, starting with the current one and ending at settlement.
    pub fn updates(&self) -> ProgressSubscription {
        self.state.progress.subscribe()
    }

    /// Deliver every progress value to `listener`, one at a time, from a dedicated task.
    ///
    /// The returned handle completes after the final value has been delivered.
    pub fn subscribe(&self, listener: Arc<dyn ProgressListener>) -> JoinHandle<()> {
        self.state.progress.spawn_listener(listener, self.runtime.handle())
    }

    /// Stop the batch.  Finished uploads keep their results; in-flight and queued uploads end
    /// as cancelled.
    pub fn cancel(&self) {
        if !self.state.cancel.is_cancelled() {
            info!(batch_id = %self.state.batch_id, "batch cancellation requested");
        }
        self.state.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancel.is_cancelled()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.state.cancel.clone()
    }

    /// Wait for every task to settle and return the report.
    pub async fn settled(self) -> Result<ResultReport, BatchError> {
        let rx = self.take_receiver()?;
        rx.await.map_err(|_| BatchError::SettlementLost)
    }

    /// Block the calling thread until every task settles.  Must not be called from inside an
    /// async runtime.
    pub fn await_settlement(self) -> Result<ResultReport, BatchError> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(BatchError::BlockingInRuntime);
        }
        let rx = self.take_receiver()?;
        rx.blocking_recv().map_err(|_| BatchError::SettlementLost)
    }

    fn take_receiver(&self) -> Result<oneshot::Receiver<ResultReport>, BatchError> {
        self.report_rx.lock().take().ok_or(BatchError::SettlementLost)
    }
}

impl std::fmt::Debug for BatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchHandle")
            .field("batch_id", &self.state.batch_id)
            .field("counts", &self.state.counters.snapshot())
            .finish()
    }
}
