crate::config_group!({

    /// The maximum number of file uploads in flight at once within one batch.
    /// Unset means one concurrent upload per submitted file.
    /// Can be overwritten by environment variable "VAULT_UPLOAD_UPLOAD_MAX_CONCURRENT_UPLOADS".
    ref max_concurrent_uploads: Option<usize> = None;

    /// Number of worker threads in the upload runtime.  Unset uses one per core.
    ref worker_threads: Option<usize> = None;

});
