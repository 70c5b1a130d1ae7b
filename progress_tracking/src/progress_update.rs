use serde::{Deserialize, Serialize};

use crate::counters::CountSnapshot;

/// One published progress value: the counts it was computed from, the aggregate fraction and
/// the display text derived from them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub total: u64,

    /// `(completed + failed + cancelled) / total`, in [0, 1].
    pub fraction: f64,

    pub status_text: String,
}

impl ProgressUpdate {
    pub fn initial(total: u64) -> Self {
        CountSnapshot {
            total,
            ..Default::default()
        }
        .into()
    }

    pub fn counts(&self) -> CountSnapshot {
        CountSnapshot {
            total: self.total,
            completed: self.completed,
            failed: self.failed,
            cancelled: self.cancelled,
        }
    }

    pub fn settled_count(&self) -> u64 {
        self.counts().settled()
    }

    pub fn is_settled(&self) -> bool {
        self.counts().is_settled()
    }
}

impl From<CountSnapshot> for ProgressUpdate {
    fn from(counts: CountSnapshot) -> Self {
        Self {
            completed: counts.completed,
            failed: counts.failed,
            cancelled: counts.cancelled,
            total: counts.total,
            fraction: counts.fraction(),
            status_text: status_text(&counts),
        }
    }
}

/// The human readable status line for a set of counts.
pub fn status_text(counts: &CountSnapshot) -> String {
    if counts.total == 0 {
        return "Ready to upload".to_owned();
    }

    if !counts.is_settled() {
        let mut s = format!("Uploaded {} of {} files", counts.completed, counts.total);
        if counts.failed > 0 {
            s.push_str(&format!(", {} failed", counts.failed));
        }
        if counts.cancelled > 0 {
            s.push_str(&format!(", {} cancelled", counts.cancelled));
        }
        return s;
    }

    if counts.completed == counts.total {
        return format!("Successfully uploaded all {} file(s)!", counts.total);
    }

    let mut s = format!("Upload complete: {} succeeded, {} failed", counts.completed, counts.failed);
    if counts.cancelled > 0 {
        s.push_str(&format!(", {} cancelled", counts.cancelled));
    }
    s
}
