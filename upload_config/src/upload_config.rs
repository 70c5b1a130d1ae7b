use std::num::NonZeroUsize;

use crate::groups;

/// All configuration groups for the uploader.
///
/// `UploadConfig::new()` reads environment overrides; `UploadConfig::default()` does not.
#[derive(Debug, Clone, Default)]
pub struct UploadConfig {
    pub upload: groups::upload::ConfigValueGroup,
    pub client: groups::client::ConfigValueGroup,
    pub log: groups::log::ConfigValueGroup,
}

impl UploadConfig {
    pub fn new() -> Self {
        let mut config = Self::default();
        config.upload.apply_env_overrides();
        config.client.apply_env_overrides();
        config.log.apply_env_overrides();
        config
    }

    pub fn with_max_concurrent_uploads(mut self, max_concurrent_uploads: Option<usize>) -> Self {
        self.upload.max_concurrent_uploads = max_concurrent_uploads;
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.client.endpoint = endpoint.into();
        self
    }

    /// The worker pool cap.  Zero is treated the same as unset.
    pub fn upload_concurrency_limit(&self) -> Option<NonZeroUsize> {
        self.upload.max_concurrent_uploads.and_then(NonZeroUsize::new)
    }
}
