use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::runtime::{Builder as TokioRuntimeBuilder, Handle as TokioRuntimeHandle, Runtime as TokioRuntime};
use tokio::task::JoinHandle;
use tracing::debug;
use upload_config::UploadConfig;

use crate::errors::{Result, UploadRuntimeError};

const RUNTIME_THREAD_ID_PREFIX: &str = "vault-upload"; // thread names will be vault-upload-0, vault-upload-1, etc.
const RUNTIME_STACK_SIZE: usize = 8_000_000; // 8MB stack size
const RUNTIME_MAX_BLOCKING_THREADS: usize = 100;

/// A thin wrapper around a tokio multi-thread runtime that the upload session owns.
///
/// Every upload task runs as its own tokio task on this runtime, so tasks execute in parallel
/// across the worker threads.  The runtime can also wrap the handle of a runtime owned by
/// someone else (see [`UploadRuntime::from_external`]), in which case it never shuts it down.
///
/// # Example
///
/// ```rust
/// use upload_config::UploadConfig;
/// use upload_runtime::UploadRuntime;
///
/// let rt = UploadRuntime::new(&UploadConfig::default()).expect("Error initializing runtime.");
///
/// let result = rt.external_run_async_task(async { 42 }).expect("Task Error.");
///
/// assert_eq!(result, 42);
/// ```
#[derive(Debug)]
pub struct UploadRuntime {
    // Present only when this struct owns the runtime.
    runtime: Mutex<Option<TokioRuntime>>,

    // Spawning goes through the handle so it does not contend on the lock above.
    handle: TokioRuntimeHandle,

    shutdown: AtomicBool,
}

impl UploadRuntime {
    pub fn new(config: &UploadConfig) -> Result<Arc<Self>> {
        if TokioRuntimeHandle::try_current().is_ok() {
            return Err(UploadRuntimeError::Other(
                "Tokio runtime already started; use from_external instead.".to_owned(),
            ));
        }

        let thread_id = AtomicUsize::new(0);
        let get_thread_name = move || {
            let id = thread_id.fetch_add(1, Ordering::Relaxed);
            format!("{RUNTIME_THREAD_ID_PREFIX}-{id}")
        };

        let mut builder = TokioRuntimeBuilder::new_multi_thread();
        builder
            .thread_name_fn(get_thread_name)
            .thread_stack_size(RUNTIME_STACK_SIZE)
            .max_blocking_threads(RUNTIME_MAX_BLOCKING_THREADS)
            .enable_all();

        if let Some(n) = config.upload.worker_threads.filter(|n| *n > 0) {
            builder.worker_threads(n);
        }

        let runtime = builder.build()?;
        let handle = runtime.handle().clone();

        debug!(worker_threads = ?config.upload.worker_threads, "upload runtime started");

        Ok(Arc::new(Self {
            runtime: Mutex::new(Some(runtime)),
            handle,
            shutdown: AtomicBool::new(false),
        }))
    }

    /// Wrap an already running tokio runtime.
    pub fn from_external(handle: TokioRuntimeHandle) -> Arc<Self> {
        Arc::new(Self {
            runtime: Mutex::new(None),
            handle,
            shutdown: AtomicBool::new(false),
        })
    }

    /// Wrap the runtime the calling thread is running in.
    pub fn current() -> Result<Arc<Self>> {
        let handle = TokioRuntimeHandle::try_current()
            .map_err(|e| UploadRuntimeError::Other(format!("no tokio runtime is active: {e}")))?;
        Ok(Self::from_external(handle))
    }

    pub fn handle(&self) -> &TokioRuntimeHandle {
        &self.handle
    }

    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle.spawn(future)
    }

    /// Run a future to completion from a thread outside of any tokio runtime.
    pub fn external_run_async_task<F>(&self, future: F) -> Result<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        if self.is_shutdown() {
            return Err(UploadRuntimeError::RuntimeShutdown);
        }
        if TokioRuntimeHandle::try_current().is_ok() {
            return Err(UploadRuntimeError::Other(
                "external_run_async_task called from within a tokio runtime".to_owned(),
            ));
        }
        Ok(self.handle.block_on(future))
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Stop the owned runtime without waiting on in-flight tasks.  A wrapped external runtime
    /// is left running.
    pub fn perform_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        let runtime = match self.runtime.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(runtime) = runtime {
            runtime.shutdown_background();
        }
    }
}

impl Drop for UploadRuntime {
    fn drop(&mut self) {
        // Dropping a tokio runtime from inside an async context panics; shutdown_background does not.
        self.perform_shutdown();
    }
}
