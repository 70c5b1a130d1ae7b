crate::config_group!({

    /// The log destination.  Unset or empty logs to the console.
    ///
    /// If this path is an existing directory or ends with a /, a timestamped log file is
    /// created inside it; otherwise logs are written to exactly this file.
    ref dest: Option<String> = None;

    /// The format the logs are printed in.  If "json", logs are dumped as json blobs; otherwise
    /// they are text.  By default file logging uses json and console logging uses text.
    ref format: Option<String> = None;

    /// The base name for a log file when logging to a directory.
    ref prefix: String = "vault-upload".to_owned();

});
