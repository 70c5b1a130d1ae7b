use progress_tracking::{status_text, CountSnapshot};
use serde::{Serialize, Serializer};
use ulid::Ulid;
use vault_client::UploadReceipt;

use crate::errors::TaskFailure;
use crate::task::{TaskStatus, UploadTask};

/// The settled result of one file, in the shape callers present it.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Succeeded {
        id: Ulid,
        display_name: String,
        url: String,
        token: String,
    },
    Failed {
        id: Ulid,
        display_name: String,
        #[serde(serialize_with = "serialize_display")]
        reason: TaskFailure,
    },
    Cancelled {
        id: Ulid,
        display_name: String,
    },
}

fn serialize_display<S: Serializer>(reason: &TaskFailure, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(reason)
}

impl FileOutcome {
    pub(crate) fn from_record(record: UploadTask) -> Self {
        let id = record.descriptor().id();
        let display_name = record.descriptor().display_name().to_owned();

        match (record.status(), record.receipt(), record.failure()) {
            (TaskStatus::Succeeded, Some(receipt), _) => FileOutcome::Succeeded {
                id,
                display_name,
                url: receipt.url.clone(),
                token: receipt.token.clone(),
            },
            (TaskStatus::Failed, _, Some(failure)) => FileOutcome::Failed {
                id,
                display_name,
                reason: failure.clone(),
            },
            (TaskStatus::Cancelled, _, _) => FileOutcome::Cancelled { id, display_name },
            (status, _, _) => FileOutcome::Failed {
                id,
                display_name,
                reason: TaskFailure::Aborted(format!("task left in state {status:?}")),
            },
        }
    }

    pub fn id(&self) -> Ulid {
        match self {
            FileOutcome::Succeeded { id, .. } | FileOutcome::Failed { id, .. } | FileOutcome::Cancelled { id, .. } => {
                *id
            },
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            FileOutcome::Succeeded { display_name, .. }
            | FileOutcome::Failed { display_name, .. }
            | FileOutcome::Cancelled { display_name, .. } => display_name,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FileOutcome::Succeeded { .. })
    }
}

/// The aggregate result, computed from the final counts only.
///
/// `Partial` always has at least one success.  A batch with no successes is `AllCancelled` if
/// nothing failed and `AllFailed` otherwise, whatever share of it was cancelled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchOutcome {
    Empty,
    AllSucceeded,
    Partial { succeeded: u64, failed: u64, cancelled: u64 },
    AllFailed { failed: u64, cancelled: u64 },
    AllCancelled,
}

/// Per-file outcomes of a settled batch, in submission order.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ResultReport {
    pub entries: Vec<FileOutcome>,
}

impl ResultReport {
    pub fn new(entries: Vec<FileOutcome>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn counts(&self) -> CountSnapshot {
        let mut counts = CountSnapshot {
            total: self.entries.len() as u64,
            ..Default::default()
        };
        for entry in &self.entries {
            match entry {
                FileOutcome::Succeeded { .. } => counts.completed += 1,
                FileOutcome::Failed { .. } => counts.failed += 1,
                FileOutcome::Cancelled { .. } => counts.cancelled += 1,
            }
        }
        counts
    }

    pub fn outcome(&self) -> BatchOutcome {
        let counts = self.counts();
        if counts.total == 0 {
            BatchOutcome::Empty
        } else if counts.completed == counts.total {
            BatchOutcome::AllSucceeded
        } else if counts.completed == 0 && counts.failed == 0 {
            BatchOutcome::AllCancelled
        } else if counts.completed == 0 {
            BatchOutcome::AllFailed {
                failed: counts.failed,
                cancelled: counts.cancelled,
            }
        } else {
            BatchOutcome::Partial {
                succeeded: counts.completed,
                failed: counts.failed,
                cancelled: counts.cancelled,
            }
        }
    }

    /// Successful uploads as `(display_name, receipt)`, in submission order.
    pub fn successes(&self) -> impl Iterator<Item = (&str, UploadReceipt)> + '_ {
        self.entries.iter().filter_map(|e| match e {
            FileOutcome::Succeeded {
                display_name, url, token, ..
            } => Some((
                display_name.as_str(),
                UploadReceipt {
                    url: url.clone(),
                    token: token.clone(),
                },
            )),
            _ => None,
        })
    }

    /// Failed uploads as `(display_name, reason)`, in submission order.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &TaskFailure)> + '_ {
        self.entries.iter().filter_map(|e| match e {
            FileOutcome::Failed {
                display_name, reason, ..
            } => Some((display_name.as_str(), reason)),
            _ => None,
        })
    }

    pub fn summary_message(&self) -> String {
        match self.outcome() {
            BatchOutcome::Empty => "No files selected".to_owned(),
            _ => status_text(&self.counts()),
        }
    }
}

#[cfg(test)]
mod tests {
    use vault_client::UploaderError;

    use super::*;

    fn succeeded(name: &str) -> FileOutcome {
        FileOutcome::Succeeded {
            id: Ulid::new(),
            display_name: name.to_owned(),
            url: format!("https://h/{name}"),
            token: format!("t-{name}"),
        }
    }

    fn failed(name: &str) -> FileOutcome {
        FileOutcome::Failed {
            id: Ulid::new(),
            display_name: name.to_owned(),
            reason: UploaderError::ServerRejected {
                status: 500,
                message: "boom".to_owned(),
            }
            .into(),
        }
    }

    fn cancelled(name: &str) -> FileOutcome {
        FileOutcome::Cancelled {
            id: Ulid::new(),
            display_name: name.to_owned(),
        }
    }

    #[test]
    fn test_outcomes() {
        assert_eq!(ResultReport::default().outcome(), BatchOutcome::Empty);
        assert_eq!(ResultReport::default().summary_message(), "No files selected");

        let all = ResultReport::new(vec![succeeded("a"), succeeded("b")]);
        assert_eq!(all.outcome(), BatchOutcome::AllSucceeded);
        assert_eq!(all.summary_message(), "Successfully uploaded all 2 file(s)!");

        let none = ResultReport::new(vec![failed("a"), failed("b")]);
        assert_eq!(none.outcome(), BatchOutcome::AllFailed { failed: 2, cancelled: 0 });

        let partial = ResultReport::new(vec![succeeded("a"), failed("b"), cancelled("c")]);
        assert_eq!(
            partial.outcome(),
            BatchOutcome::Partial {
                succeeded: 1,
                failed: 1,
                cancelled: 1
            }
        );
        assert_eq!(partial.summary_message(), "Upload complete: 1 succeeded, 1 failed, 1 cancelled");
    }

    #[test]
    fn test_outcomes_without_successes() {
        let stopped = ResultReport::new(vec![cancelled("a"), cancelled("b")]);
        assert_eq!(stopped.outcome(), BatchOutcome::AllCancelled);
        assert_eq!(stopped.summary_message(), "Upload complete: 0 succeeded, 0 failed, 2 cancelled");

        let mixed = ResultReport::new(vec![failed("a"), cancelled("b"), cancelled("c")]);
        assert_eq!(mixed.outcome(), BatchOutcome::AllFailed { failed: 1, cancelled: 2 });
        assert_eq!(mixed.summary_message(), "Upload complete: 0 succeeded, 1 failed, 2 cancelled");
    }

    #[test]
    fn test_successes_and_failures_keep_order() {
        let report = ResultReport::new(vec![succeeded("a"), failed("b"), succeeded("c"), failed("d")]);

        let ok: Vec<_> = report.successes().map(|(n, r)| (n.to_owned(), r.token)).collect();
        assert_eq!(ok, vec![("a".to_owned(), "t-a".to_owned()), ("c".to_owned(), "t-c".to_owned())]);

        let bad: Vec<_> = report.failures().map(|(n, _)| n).collect();
        assert_eq!(bad, vec!["b", "d"]);
    }

    #[test]
    fn test_json_renders_reason_as_text() {
        let report = ResultReport::new(vec![succeeded("a"), failed("b"), cancelled("c")]);
        let json = serde_json::to_value(&report).unwrap();

        let entries = json["entries"].as_array().unwrap();
        assert_eq!(entries[0]["status"], "succeeded");
        assert_eq!(entries[0]["url"], "https://h/a");
        assert_eq!(entries[1]["status"], "failed");
        assert!(entries[1]["reason"].as_str().unwrap().contains("boom"));
        assert_eq!(entries[2]["status"], "cancelled");
        assert_eq!(entries[2]["display_name"], "c");
    }
}
