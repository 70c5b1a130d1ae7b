use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};

use crate::error::UploaderError;

/// Builds the http client used for uploads.
///
/// No retry middleware is installed; a failed upload is reported to the caller as is.
pub fn build_http_client(user_agent: &str) -> std::result::Result<ClientWithMiddleware, UploaderError> {
    let reqwest_client = reqwest::Client::builder().user_agent(user_agent).build()?;
    Ok(ClientBuilder::new(reqwest_client).build())
}
