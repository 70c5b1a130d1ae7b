use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio::task::{AbortHandle, JoinError, JoinSet as TokioJoinSet};

/// A tokio JoinSet that optionally caps how many of its tasks run at once.
///
/// Every spawned task is scheduled immediately, but with a limit set it first waits for a
/// permit, so at most `max_concurrent` task bodies are in flight.  Without a limit this is a
/// plain JoinSet: one concurrently running task per spawn.
pub struct LimitedJoinSet<T> {
    inner: TokioJoinSet<T>,
    semaphore: Option<Arc<Semaphore>>,
    max_concurrent: Option<NonZeroUsize>,
}

impl<T: Send + 'static> LimitedJoinSet<T> {
    pub fn new(max_concurrent: Option<NonZeroUsize>) -> Self {
        Self {
            inner: TokioJoinSet::new(),
            semaphore: max_concurrent.map(|n| Arc::new(Semaphore::new(n.get()))),
            max_concurrent,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }

    pub fn max_concurrent(&self) -> Option<NonZeroUsize> {
        self.max_concurrent
    }

    pub fn spawn<F>(&mut self, task: F) -> AbortHandle
    where
        F: Future<Output = T> + Send + 'static,
    {
        let task = Self::limited(self.semaphore.clone(), task);
        self.inner.spawn(task)
    }

    /// Spawn on a specific runtime rather than the ambient one.
    pub fn spawn_on<F>(&mut self, task: F, handle: &Handle) -> AbortHandle
    where
        F: Future<Output = T> + Send + 'static,
    {
        let task = Self::limited(self.semaphore.clone(), task);
        self.inner.spawn_on(task, handle)
    }

    async fn limited<F>(semaphore: Option<Arc<Semaphore>>, task: F) -> T
    where
        F: Future<Output = T> + Send + 'static,
    {
        match semaphore {
            Some(semaphore) => {
                // The semaphore is never closed, so acquisition only fails if it were.
                let _permit = semaphore.acquire_owned().await;
                task.await
            },
            None => task.await,
        }
    }

    pub fn try_join_next(&mut self) -> Option<Result<T, JoinError>> {
        self.inner.try_join_next()
    }

    pub async fn join_next(&mut self) -> Option<Result<T, JoinError>> {
        self.inner.join_next().await
    }

    /// Wait for every task, returning the results in completion order.
    pub async fn join_all(&mut self) -> Vec<Result<T, JoinError>> {
        let mut results = Vec::with_capacity(self.len());
        while let Some(r) = self.join_next().await {
            results.push(r);
        }
        results
    }

    pub fn abort_all(&mut self) {
        self.inner.abort_all();
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
