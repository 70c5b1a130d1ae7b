crate::config_group!({

    /// The file host's upload endpoint.  Files are sent as a multipart PUT to this URL.
    ref endpoint: String = "https://waifuvault.moe/rest".to_owned();

    /// User-agent sent with every upload request.
    ref user_agent: String = concat!("vault-upload/", env!("CARGO_PKG_VERSION")).to_owned();

});
