use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// One local file to upload.  Immutable once created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    id: Ulid,
    source: PathBuf,
    display_name: String,
    size_bytes: u64,
}

impl FileDescriptor {
    pub fn new(source: impl Into<PathBuf>, display_name: impl Into<String>, size_bytes: u64) -> Self {
        Self::with_id(Ulid::new(), source, display_name, size_bytes)
    }

    pub fn with_id(id: Ulid, source: impl Into<PathBuf>, display_name: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            id,
            source: source.into(),
            display_name: display_name.into(),
            size_bytes,
        }
    }

    /// Describe the file at `path`, named after its last path component.
    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }
        Ok(Self::new(path, display_name_for(path), metadata.len()))
    }

    pub fn id(&self) -> Ulid {
        self.id
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Reasons a descriptor cannot be submitted at all.
    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.source.as_os_str().is_empty() {
            return Err("source path is empty".to_owned());
        }
        if self.display_name.trim().is_empty() {
            return Err("display name is empty".to_owned());
        }
        Ok(())
    }
}

pub(crate) fn display_name_for(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
