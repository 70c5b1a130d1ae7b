use std::sync::Arc;

use async_trait::async_trait;

use crate::progress_update::ProgressUpdate;
use crate::update_interfaces::ProgressListener;

#[derive(Debug, Default)]
pub struct NoOpProgressListener;

impl NoOpProgressListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {})
    }
}

#[async_trait]
impl ProgressListener for NoOpProgressListener {
    async fn on_progress(&self, _update: ProgressUpdate) {}
}
