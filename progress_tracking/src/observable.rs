use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

use crate::counters::BatchCounters;
use crate::progress_update::ProgressUpdate;
use crate::update_interfaces::ProgressListener;

/// Thread-safe holder of the latest [`ProgressUpdate`] for one batch, with any number of
/// subscribers.
///
/// Every outcome is counted through [`record`](Self::record), which bumps the counters and
/// snapshots them under the observable's lock.  Each subscriber therefore receives one value
/// per settled task, in the order the outcomes were counted, no matter how the recording
/// threads interleave.
#[derive(Debug)]
pub struct ProgressObservable {
    state: Mutex<ObservableState>,
}

#[derive(Debug)]
struct ObservableState {
    current: ProgressUpdate,
    subscribers: Vec<mpsc::UnboundedSender<ProgressUpdate>>,
    closed: bool,
}

impl ProgressObservable {
    pub fn new(total: u64) -> Self {
        Self {
            state: Mutex::new(ObservableState {
                current: ProgressUpdate::initial(total),
                subscribers: Vec::new(),
                closed: false,
            }),
        }
    }

    /// The most recently published value.
    pub fn current(&self) -> ProgressUpdate {
        self.state.lock().current.clone()
    }

    /// Subscribe to updates.  The current value is delivered first; the stream ends once the
    /// observable is closed.
    pub fn subscribe(&self) -> ProgressSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.lock();

        // The receiver is alive, so this send cannot fail.
        let _ = tx.send(state.current.clone());
        if !state.closed {
            state.subscribers.push(tx);
        }

        ProgressSubscription { rx }
    }

    /// Attach a listener driven by a dedicated consumer task on `handle`.  The task exits once
    /// the observable is closed and every pending update has been delivered.
    pub fn spawn_listener(&self, listener: Arc<dyn ProgressListener>, handle: &Handle) -> JoinHandle<()> {
        let mut subscription = self.subscribe();
        handle.spawn(async move {
            while let Some(update) = subscription.next().await {
                listener.on_progress(update).await;
            }
        })
    }

    /// Count one outcome with `record` and publish the resulting value.  The counter update and
    /// the snapshot happen under the same lock, so no two calls publish the same value.  Returns
    /// the published value, or `None` once the observable is closed.
    pub fn record(
        &self,
        counters: &BatchCounters,
        record: impl FnOnce(&BatchCounters) -> u64,
    ) -> Option<ProgressUpdate> {
        let mut state = self.state.lock();
        record(counters);
        if state.closed {
            return None;
        }

        let counts = counters.snapshot();
        let update = ProgressUpdate::from(counts);
        trace!(settled = counts.settled(), total = counts.total, "publishing progress");

        state.current = update.clone();
        state.subscribers.retain(|tx| tx.send(update.clone()).is_ok());

        Some(update)
    }

    /// Stop delivering updates.  Subscribers drain what was already sent and then see the end
    /// of their stream.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        state.subscribers.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.lock().subscribers.len()
    }
}

/// A stream of [`ProgressUpdate`]s from a [`ProgressObservable`].
#[derive(Debug)]
pub struct ProgressSubscription {
    rx: mpsc::UnboundedReceiver<ProgressUpdate>,
}

impl ProgressSubscription {
    pub async fn next(&mut self) -> Option<ProgressUpdate> {
        self.rx.recv().await
    }

    /// Blocking variant of [`next`](Self::next) for threads outside the runtime.
    pub fn blocking_next(&mut self) -> Option<ProgressUpdate> {
        self.rx.blocking_recv()
    }

    /// Return an already delivered update without waiting.
    pub fn try_next(&mut self) -> Option<ProgressUpdate> {
        self.rx.try_recv().ok()
    }
}
