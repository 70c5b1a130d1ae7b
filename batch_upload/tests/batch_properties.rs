use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use batch_upload::{
    BatchError, BatchOutcome, FileDescriptor, FileOutcome, ProgressUpdate, TaskFailure, UploadSession, Uploader,
};
use more_asserts::{assert_ge, assert_gt, assert_le};
use rand::Rng;
use upload_config::UploadConfig;
use upload_runtime::UploadRuntime;
use vault_client::testing::ScriptedUploader;

fn name(i: usize) -> String {
    format!("file_{i:02}.txt")
}

fn write_files(dir: &Path, n: usize) -> Vec<FileDescriptor> {
    (0..n)
        .map(|i| {
            let path = dir.join(name(i));
            let contents = format!("contents of file {i}");
            std::fs::write(&path, &contents).unwrap();
            FileDescriptor::new(path, name(i), contents.len() as u64)
        })
        .collect()
}

fn session(uploader: Arc<dyn Uploader>, max_concurrent: Option<usize>) -> UploadSession {
    let config = UploadConfig::default().with_max_concurrent_uploads(max_concurrent);
    UploadSession::with_runtime(config, uploader, UploadRuntime::current().unwrap())
}

fn assert_consistent(updates: &[ProgressUpdate], total: u64) {
    let mut last = 0;
    for u in updates {
        assert_eq!(u.total, total);
        assert_le!(u.completed + u.failed + u.cancelled, u.total);
        assert_ge!(u.settled_count(), last);
        last = u.settled_count();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_failures_are_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let descriptors = write_files(dir.path(), 5);

    let uploader = Arc::new(
        ScriptedUploader::new()
            .with_failure(&name(1), "server exploded")
            .with_failure(&name(3), "quota exceeded")
            .with_random_delay(Duration::from_millis(20)),
    );
    let session = session(uploader.clone(), None);

    let report = session.submit(descriptors.clone()).unwrap().settled().await.unwrap();

    assert_eq!(report.len(), 5);
    assert_eq!(
        report.outcome(),
        BatchOutcome::Partial {
            succeeded: 3,
            failed: 2,
            cancelled: 0
        }
    );
    assert_eq!(report.summary_message(), "Upload complete: 3 succeeded, 2 failed");
    assert_eq!(uploader.call_count(), 5);

    for (i, (entry, descriptor)) in report.entries.iter().zip(&descriptors).enumerate() {
        assert_eq!(entry.id(), descriptor.id());
        match entry {
            FileOutcome::Succeeded { url, token, .. } => {
                assert!(![1, 3].contains(&i));
                let expected = ScriptedUploader::default_receipt(&name(i));
                assert_eq!(url, &expected.url);
                assert_eq!(token, &expected.token);
            },
            FileOutcome::Failed { reason, .. } => {
                assert!([1, 3].contains(&i));
                assert!(matches!(reason, TaskFailure::Remote(_)));
            },
            FileOutcome::Cancelled { .. } => panic!("nothing was cancelled"),
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_unopenable_file_never_reaches_uploader() {
    let dir = tempfile::tempdir().unwrap();
    let mut descriptors = write_files(dir.path(), 2);
    descriptors.insert(1, FileDescriptor::new(dir.path().join("vanished.bin"), "vanished.bin", 42));

    let uploader = Arc::new(ScriptedUploader::new());
    let session = session(uploader.clone(), None);

    let report = session.submit(descriptors).unwrap().settled().await.unwrap();

    let mut calls = uploader.calls();
    calls.sort();
    assert_eq!(calls, vec![name(0), name(1)]);

    match &report.entries[1] {
        FileOutcome::Failed { reason, display_name, .. } => {
            assert_eq!(display_name, "vanished.bin");
            assert!(reason.is_local());
            assert!(reason.to_string().contains("vanished.bin"));
        },
        other => panic!("expected a local failure, got {other:?}"),
    }
    assert!(report.entries[0].is_success());
    assert!(report.entries[2].is_success());
}

#[tokio::test]
async fn test_empty_batch() {
    let session = session(Arc::new(ScriptedUploader::new()), None);
    let handle = session.submit(Vec::new()).unwrap();

    assert!(handle.is_settled());
    let counts = handle.counts();
    assert_eq!((counts.total, counts.completed, counts.failed), (0, 0, 0));
    assert_eq!(handle.progress().fraction, 0.0);

    let report = handle.settled().await.unwrap();
    assert!(report.is_empty());
    assert_eq!(report.outcome(), BatchOutcome::Empty);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_fifty_files_never_cross_records() {
    let dir = tempfile::tempdir().unwrap();
    let descriptors = write_files(dir.path(), 50);

    for _ in 0..10 {
        let mut uploader = ScriptedUploader::new().with_random_delay(Duration::from_millis(rand::rng().random_range(1..15)));
        for i in 0..50 {
            uploader = uploader.with_receipt(&name(i), &format!("https://vault.test/u/{i}"), &format!("tok_{i}"));
        }
        let uploader = Arc::new(uploader);
        let session = session(uploader.clone(), None);

        // Fresh ids each run; the files themselves are reused.
        let batch: Vec<_> = descriptors
            .iter()
            .map(|d| FileDescriptor::new(d.source(), d.display_name(), d.size_bytes()))
            .collect();

        let report = session.submit(batch.clone()).unwrap().settled().await.unwrap();
        assert_eq!(report.outcome(), BatchOutcome::AllSucceeded);

        for (i, (entry, descriptor)) in report.entries.iter().zip(&batch).enumerate() {
            assert_eq!(entry.id(), descriptor.id());
            match entry {
                FileOutcome::Succeeded {
                    display_name, url, token, ..
                } => {
                    assert_eq!(display_name, &name(i));
                    assert_eq!(url, &format!("https://vault.test/u/{i}"));
                    assert_eq!(token, &format!("tok_{i}"));
                },
                other => panic!("file {i} did not succeed: {other:?}"),
            }
            let uploaded = uploader.uploaded_contents(&name(i)).unwrap();
            assert_eq!(uploaded, format!("contents of file {i}").into_bytes());
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_progress_is_monotonic_and_ends_at_one() {
    let dir = tempfile::tempdir().unwrap();
    let descriptors = write_files(dir.path(), 30);

    let uploader = Arc::new(
        ScriptedUploader::new()
            .with_failure(&name(7), "nope")
            .with_failure(&name(19), "nope")
            .with_random_delay(Duration::from_millis(10)),
    );
    let session = session(uploader, None);
    let handle = session.submit(descriptors).unwrap();

    let mut updates = handle.updates();
    let report = handle.settled().await.unwrap();

    let mut seen = Vec::new();
    while let Some(u) = updates.next().await {
        seen.push(u);
    }

    assert_consistent(&seen, 30);
    // Even with every upload racing, no settled file is folded into another's update.
    assert!(seen.windows(2).all(|w| w[1].settled_count() == w[0].settled_count() + 1));
    assert_eq!(seen.len() as u64, 30 - seen[0].settled_count() + 1);
    let last = seen.last().unwrap();
    assert!(last.is_settled());
    assert_eq!(last.fraction, 1.0);
    assert_eq!((last.completed, last.failed), (28, 2));
    assert_eq!(last.status_text, "Upload complete: 28 succeeded, 2 failed");
    assert_eq!(report.failures().count(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_listener_sees_every_step_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let descriptors = write_files(dir.path(), 12);

    let session = session(Arc::new(ScriptedUploader::new().with_random_delay(Duration::from_millis(5))), Some(1));
    let handle = session.submit(descriptors).unwrap();

    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let recorder = seen.clone();
    let listener = handle.subscribe(Arc::new(move |u: ProgressUpdate| recorder.lock().push(u)));

    handle.settled().await.unwrap();
    listener.await.unwrap();

    let seen = std::mem::take(&mut *seen.lock());
    assert_consistent(&seen, 12);
    // One upload at a time, so after the first value every file settling is its own step.
    assert!(seen.windows(2).all(|w| w[1].completed == w[0].completed + 1));
    assert_eq!(seen.last().unwrap().completed, 12);
    assert_eq!(seen.last().unwrap().status_text, "Successfully uploaded all 12 file(s)!");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrency_limit_is_respected() {
    let dir = tempfile::tempdir().unwrap();
    let descriptors = write_files(dir.path(), 24);

    let uploader = Arc::new(ScriptedUploader::new().with_random_delay(Duration::from_millis(10)));
    let session = session(uploader.clone(), Some(3));

    let report = session.submit(descriptors).unwrap().settled().await.unwrap();

    assert_eq!(report.outcome(), BatchOutcome::AllSucceeded);
    assert_eq!(uploader.call_count(), 24);
    assert_le!(uploader.max_in_flight(), 3);
    assert_gt!(uploader.max_in_flight(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_panicking_upload_fails_only_its_file() {
    let dir = tempfile::tempdir().unwrap();
    let descriptors = write_files(dir.path(), 4);

    let uploader = Arc::new(ScriptedUploader::new().with_panic(&name(2)));
    let session = session(uploader, None);

    let report = session.submit(descriptors).unwrap().settled().await.unwrap();

    assert_eq!(
        report.outcome(),
        BatchOutcome::Partial {
            succeeded: 3,
            failed: 1,
            cancelled: 0
        }
    );
    assert!(matches!(
        &report.entries[2],
        FileOutcome::Failed {
            reason: TaskFailure::Aborted(_),
            ..
        }
    ));
}

#[test]
fn test_blocking_caller_outside_runtime() {
    let dir = tempfile::tempdir().unwrap();
    let descriptors = write_files(dir.path(), 10);

    let uploader = Arc::new(ScriptedUploader::new().with_failure(&name(4), "rejected"));
    let session = UploadSession::with_uploader(UploadConfig::default(), uploader).unwrap();
    let handle = session.submit(descriptors).unwrap();

    let mut updates = handle.updates();
    let watcher = std::thread::spawn(move || {
        let mut seen = Vec::new();
        while let Some(u) = updates.blocking_next() {
            seen.push(u);
        }
        seen
    });

    let report = handle.await_settlement().unwrap();
    let seen = watcher.join().unwrap();

    assert_consistent(&seen, 10);
    assert_eq!(seen.last().unwrap().fraction, 1.0);
    assert_eq!(report.successes().count(), 9);
    assert_eq!(report.failures().map(|(n, _)| n.to_owned()).collect::<Vec<_>>(), vec![name(4)]);
}

#[tokio::test]
async fn test_invalid_submission_fails_synchronously() {
    let session = session(Arc::new(ScriptedUploader::new()), None);
    let err = session.submit(vec![FileDescriptor::new("", "x", 0)]).unwrap_err();
    assert!(matches!(err, BatchError::InvalidDescriptor { index: 0, .. }));
}
