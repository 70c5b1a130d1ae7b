//! In-process [`Uploader`]s for exercising upload coordination without a server.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;
use tokio::io::AsyncReadExt;
use tokio::sync::Notify;

use crate::error::{Result, UploaderError};
use crate::interface::{UploadReceipt, UploadSource, Uploader};

/// What a [`ScriptedUploader`] does for a given file name.
#[derive(Clone, Debug)]
pub enum ScriptedOutcome {
    Succeed(UploadReceipt),
    Fail { status: u16, message: String },
    Panic,
}

/// An uploader whose outcome is scripted per file name.
///
/// Unscripted files succeed with the receipt from [`ScriptedUploader::default_receipt`].  Every
/// call reads the whole file through the handle it was given, optionally sleeps for a random
/// time to shuffle completion order, and records the call.
#[derive(Debug, Default)]
pub struct ScriptedUploader {
    outcomes: HashMap<String, ScriptedOutcome>,
    max_delay: Option<Duration>,
    calls: Mutex<Vec<(String, Vec<u8>)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedUploader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_receipt(file_name: &str) -> UploadReceipt {
        UploadReceipt {
            url: format!("https://vault.test/f/{file_name}"),
            token: format!("token-{file_name}"),
        }
    }

    pub fn with_receipt(mut self, file_name: &str, url: &str, token: &str) -> Self {
        self.outcomes.insert(
            file_name.to_owned(),
            ScriptedOutcome::Succeed(UploadReceipt {
                url: url.to_owned(),
                token: token.to_owned(),
            }),
        );
        self
    }

    pub fn with_failure(mut self, file_name: &str, message: &str) -> Self {
        self.outcomes.insert(
            file_name.to_owned(),
            ScriptedOutcome::Fail {
                status: 500,
                message: message.to_owned(),
            },
        );
        self
    }

    pub fn with_panic(mut self, file_name: &str) -> Self {
        self.outcomes.insert(file_name.to_owned(), ScriptedOutcome::Panic);
        self
    }

    /// Sleep a uniformly random time up to `max_delay` inside every call.
    pub fn with_random_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    /// File names of every call, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// The bytes read through the handle passed for `file_name`.
    pub fn uploaded_contents(&self, file_name: &str) -> Option<Vec<u8>> {
        self.calls
            .lock()
            .iter()
            .find(|(name, _)| name == file_name)
            .map(|(_, data)| data.clone())
    }

    /// The largest number of calls that were running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Uploader for ScriptedUploader {
    async fn upload(&self, mut source: UploadSource) -> Result<UploadReceipt> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _in_flight = InFlight(&self.in_flight);
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let mut data = Vec::with_capacity(source.size_bytes as usize);
        source.file.read_to_end(&mut data).await?;
        self.calls.lock().push((source.file_name.clone(), data));

        if let Some(max_delay) = self.max_delay {
            let max_ms = max_delay.as_millis() as u64;
            let delay_ms = rand::rng().random_range(0..=max_ms);
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }

        match self.outcomes.get(&source.file_name) {
            None => Ok(Self::default_receipt(&source.file_name)),
            Some(ScriptedOutcome::Succeed(receipt)) => Ok(receipt.clone()),
            Some(ScriptedOutcome::Fail { status, message }) => Err(UploaderError::ServerRejected {
                status: *status,
                message: message.clone(),
            }),
            Some(ScriptedOutcome::Panic) => panic!("scripted uploader panic for {}", source.file_name),
        }
    }
}

/// An uploader that never finishes on its own; used to hold uploads in flight until they are
/// cancelled.
#[derive(Debug, Default)]
pub struct BlockingUploader {
    started: AtomicUsize,
    notify: Notify,
}

impl BlockingUploader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// Wait until at least `n` uploads have started.
    pub async fn wait_for_started(&self, n: usize) {
        loop {
            let notified = self.notify.notified();
            if self.started() >= n {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl Uploader for BlockingUploader {
    async fn upload(&self, _source: UploadSource) -> Result<UploadReceipt> {
        self.started.fetch_add(1, Ordering::SeqCst);
        self.notify.notify_waiters();
        std::future::pending().await
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    async fn source(dir: &TempDir, name: &str, contents: &[u8]) -> UploadSource {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        UploadSource {
            file: tokio::fs::File::open(&path).await.unwrap(),
            file_name: name.to_owned(),
            size_bytes: contents.len() as u64,
        }
    }

    #[tokio::test]
    async fn test_scripted_outcomes() {
        let dir = TempDir::new().unwrap();
        let uploader = ScriptedUploader::new()
            .with_receipt("a.txt", "https://x/a", "ta")
            .with_failure("b.txt", "nope");

        let a = uploader.upload(source(&dir, "a.txt", b"AAA").await).await.unwrap();
        assert_eq!(a.url, "https://x/a");
        assert_eq!(a.token, "ta");

        let b = uploader.upload(source(&dir, "b.txt", b"B").await).await.unwrap_err();
        assert!(matches!(b, UploaderError::ServerRejected { status: 500, .. }));

        let c = uploader.upload(source(&dir, "c.txt", b"C").await).await.unwrap();
        assert_eq!(c, ScriptedUploader::default_receipt("c.txt"));

        assert_eq!(uploader.calls(), vec!["a.txt", "b.txt", "c.txt"]);
        assert_eq!(uploader.uploaded_contents("a.txt").unwrap(), b"AAA");
        assert_eq!(uploader.max_in_flight(), 1);
    }

    #[tokio::test]
    async fn test_blocking_uploader_counts_starts() {
        let dir = TempDir::new().unwrap();
        let uploader = std::sync::Arc::new(BlockingUploader::new());
        let src = source(&dir, "a.txt", b"A").await;

        let u = uploader.clone();
        let task = tokio::spawn(async move { u.upload(src).await });
        uploader.wait_for_started(1).await;
        assert_eq!(uploader.started(), 1);
        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());
    }
}
