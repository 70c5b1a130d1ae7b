//! The ordered list of files a user has picked, before it becomes a batch.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use ulid::Ulid;

use crate::descriptor::FileDescriptor;

#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("Could not read file information for {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File already in list: {}", .path.display())]
    AlreadySelected { path: PathBuf },
}

/// Files selected for upload, in the order they were added.
///
/// A path can appear at most once.  Descriptors are created when a path is added, so the size
/// recorded is the size at selection time.
#[derive(Debug, Default, Clone)]
pub struct FileSelection {
    files: Vec<FileDescriptor>,
}

impl FileSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_path(&mut self, path: impl AsRef<Path>) -> Result<&FileDescriptor, SelectionError> {
        let path = path.as_ref();

        if self.files.iter().any(|f| f.source() == path) {
            return Err(SelectionError::AlreadySelected { path: path.to_owned() });
        }

        let descriptor = FileDescriptor::from_path(path).map_err(|source| SelectionError::Unreadable {
            path: path.to_owned(),
            source,
        })?;

        debug!(path = %path.display(), size = descriptor.size_bytes(), "file selected");
        self.files.push(descriptor);
        Ok(&self.files[self.files.len() - 1])
    }

    /// Remove the file with the given id.  Returns the removed descriptor, if any.
    pub fn remove(&mut self, id: Ulid) -> Option<FileDescriptor> {
        let pos = self.files.iter().position(|f| f.id() == id)?;
        Some(self.files.remove(pos))
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size_bytes()).sum()
    }

    pub fn descriptors(&self) -> &[FileDescriptor] {
        &self.files
    }

    pub fn into_descriptors(self) -> Vec<FileDescriptor> {
        self.files
    }

    pub fn summary(&self) -> String {
        if self.files.is_empty() {
            "Ready to upload".to_owned()
        } else {
            format!("{} file(s) ready to upload", self.files.len())
        }
    }
}

/// Render a byte count with binary units, e.g. `1.5 KB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    if bytes < UNIT {
        return format!("{bytes} B");
    }
    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }
    let suffix = ['K', 'M', 'G', 'T', 'P', 'E'][exp];
    format!("{:.1} {suffix}B", bytes as f64 / div as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_file(dir: &Path, name: &str, len: usize) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, vec![b'x'; len]).unwrap();
        path
    }

    #[test]
    fn test_add_keeps_order_and_rejects_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_file(dir.path(), "a.txt", 3);
        let b = write_file(dir.path(), "b.txt", 5);

        let mut selection = FileSelection::new();
        assert_eq!(selection.summary(), "Ready to upload");

        selection.add_path(&a).unwrap();
        selection.add_path(&b).unwrap();
        assert!(matches!(selection.add_path(&a), Err(SelectionError::AlreadySelected { .. })));

        assert_eq!(selection.len(), 2);
        assert_eq!(selection.total_bytes(), 8);
        assert_eq!(selection.summary(), "2 file(s) ready to upload");

        let names: Vec<_> = selection.descriptors().iter().map(|d| d.display_name().to_owned()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn test_unreadable_path_leaves_selection_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let mut selection = FileSelection::new();

        let err = selection.add_path(dir.path().join("missing.bin")).unwrap_err();
        assert!(matches!(err, SelectionError::Unreadable { .. }));
        assert!(err.to_string().contains("missing.bin"));
        assert!(selection.is_empty());
    }

    #[test]
    fn test_remove_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let mut selection = FileSelection::new();
        let a_id = selection.add_path(write_file(dir.path(), "a", 1)).unwrap().id();
        selection.add_path(write_file(dir.path(), "b", 1)).unwrap();

        assert_eq!(selection.remove(a_id).map(|d| d.display_name().to_owned()).as_deref(), Some("a"));
        assert!(selection.remove(a_id).is_none());
        assert_eq!(selection.summary(), "1 file(s) ready to upload");

        selection.clear();
        assert!(selection.is_empty());
        assert_eq!(selection.summary(), "Ready to upload");
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(1023), "1023 B");
        assert_eq!(format_file_size(1024), "1.0 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_file_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }
}
