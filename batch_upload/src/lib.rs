#![cfg_attr(feature = "strict", deny(warnings))]
//! # batch-upload
//!
//! Concurrent multi-file upload to a vault-style file host.
//!
//! - [`FileSelection`] - the ordered list of local files picked for upload
//! - [`UploadSession`] - owns the runtime, configuration and uploader
//! - [`BatchHandle`] - one submitted batch: live progress, cancellation, and the final
//!   [`ResultReport`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use batch_upload::{FileSelection, UploadSession};
//! use upload_config::UploadConfig;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut selection = FileSelection::new();
//!     selection.add_path("notes.txt")?;
//!     selection.add_path("photo.png")?;
//!
//!     let session = UploadSession::new(UploadConfig::new())?;
//!     let batch = session.submit(selection.into_descriptors())?;
//!     let mut updates = batch.updates();
//!     std::thread::spawn(move || {
//!         while let Some(update) = updates.blocking_next() {
//!             eprintln!("{}", update.status_text);
//!         }
//!     });
//!
//!     let report = batch.await_settlement()?;
//!     for (name, receipt) in report.successes() {
//!         println!("{name}: {} ({})", receipt.url, receipt.token);
//!     }
//!     Ok(())
//! }
//! ```

mod coordinator;
mod descriptor;
mod errors;
mod report;
mod selection;
mod session;
mod task;

pub use coordinator::{BatchCoordinator, BatchHandle};
pub use descriptor::FileDescriptor;
pub use errors::{BatchError, TaskFailure};
pub use progress_tracking::{CountSnapshot, ProgressListener, ProgressSubscription, ProgressUpdate};
pub use report::{BatchOutcome, FileOutcome, ResultReport};
pub use selection::{format_file_size, FileSelection, SelectionError};
pub use session::UploadSession;
pub use task::{TaskSnapshot, TaskStatus, UploadTask};
pub use tokio_util::sync::CancellationToken;
pub use vault_client::{UploadReceipt, Uploader};
