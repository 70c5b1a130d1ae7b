pub mod errors;
pub mod logging;
pub mod runtime;

pub use errors::UploadRuntimeError;
pub use runtime::UploadRuntime;
