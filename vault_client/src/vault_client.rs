use async_trait::async_trait;
use error_printer::{ErrorPrinter, OptionPrinter};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Url};
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use crate::error::{Result, UploaderError};
use crate::http_client::build_http_client;
use crate::interface::{UploadReceipt, UploadSource, Uploader};

/// Uploads files to a vault-style file host: one multipart PUT per file, answered with the
/// file's public URL and a management token.
#[derive(Debug, Clone)]
pub struct VaultClient {
    client: ClientWithMiddleware,
    endpoint: Url,
}

/// The fields of a successful upload response that we use; anything else is ignored.
#[derive(Debug, Deserialize)]
struct VaultUploadResponse {
    url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct VaultErrorResponse {
    message: Option<String>,
}

impl VaultClient {
    pub fn new(endpoint: &str, user_agent: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint)?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(UploaderError::ConfigurationError(format!(
                "upload endpoint must be http or https, got {endpoint}"
            )));
        }

        Ok(Self {
            client: build_http_client(user_agent)?,
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl Uploader for VaultClient {
    async fn upload(&self, source: UploadSource) -> Result<UploadReceipt> {
        let UploadSource {
            file,
            file_name,
            size_bytes,
        } = source;

        debug!(file_name = %file_name, size_bytes, endpoint = %self.endpoint, "starting upload");

        let body = Body::wrap_stream(ReaderStream::new(file));
        let part = Part::stream_with_length(body, size_bytes).file_name(file_name.clone());
        let form = Form::new().part("file", part);

        let response = self.client.put(self.endpoint.clone()).multipart(form).send().await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<VaultErrorResponse>(&body)
                .debug_error("upload error response is not json")
                .ok()
                .and_then(|r| r.message)
                .debug_none("upload error response has no message")
                .unwrap_or_else(|| String::from_utf8_lossy(&body).trim().to_owned());

            return Err(UploaderError::ServerRejected {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: VaultUploadResponse =
            serde_json::from_slice(&body).map_err(|e| UploaderError::InvalidResponse(e.to_string()))?;

        if parsed.url.is_empty() || parsed.token.is_empty() {
            return Err(UploaderError::InvalidResponse("response is missing url or token".to_owned()));
        }

        info!(file_name = %file_name, url = %parsed.url, "upload accepted");

        Ok(UploadReceipt {
            url: parsed.url,
            token: parsed.token,
        })
    }
}
