use async_trait::async_trait;

use crate::progress_update::ProgressUpdate;

/// A consumer of batch progress.
///
/// A listener attached with [`ProgressObservable::spawn_listener`](crate::ProgressObservable::spawn_listener)
/// is driven from one dedicated task, so calls never overlap and arrive in publish order.
#[async_trait]
pub trait ProgressListener: Send + Sync {
    async fn on_progress(&self, update: ProgressUpdate);
}

/// Plain closures work as listeners.
#[async_trait]
impl<F> ProgressListener for F
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    async fn on_progress(&self, update: ProgressUpdate) {
        self(update)
    }
}
