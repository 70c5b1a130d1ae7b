#![cfg_attr(feature = "strict", deny(warnings))]

pub use crate::error::{Result, UploaderError};
pub use interface::{UploadReceipt, UploadSource, Uploader};
pub use vault_client::VaultClient;

mod error;
mod http_client;
mod interface;
pub mod testing;
mod vault_client;
