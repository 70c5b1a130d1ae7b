use thiserror::Error;

/// Failures of a single remote upload.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum UploaderError {
    #[error("IO Error: {0}")]
    IOError(#[from] std::io::Error),

    #[error("Configuration Error: {0}")]
    ConfigurationError(String),

    #[error("Parse Error: {0}")]
    ParseError(#[from] url::ParseError),

    #[error("ReqwestMiddleware Error: {0}")]
    ReqwestMiddlewareError(#[from] reqwest_middleware::Error),

    #[error("Reqwest Error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("Server rejected upload ({status}): {message}")]
    ServerRejected { status: u16, message: String },

    #[error("Invalid server response: {0}")]
    InvalidResponse(String),

    #[error("Error : {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, UploaderError>;

impl PartialEq for UploaderError {
    fn eq(&self, other: &UploaderError) -> bool {
        match (self, other) {
            (
                UploaderError::ServerRejected { status: a, message: m1 },
                UploaderError::ServerRejected { status: b, message: m2 },
            ) => a == b && m1 == m2,
            (e1, e2) => std::mem::discriminant(e1) == std::mem::discriminant(e2),
        }
    }
}
