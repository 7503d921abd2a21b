//! Disk-backed storage for generated checklists.
//!
//! Finished PDFs and their audit records are written to a temporary
//! directory instead of being held in memory.
//!
//! ## Design: Separating Metadata from I/O
//!
//! Path lookups are plain string work and are safe inside the state lock.
//! Reads and writes happen outside the lock with `tokio::fs`.
//!
//! The directory is removed when the store is dropped.

use std::io;
use std::path::PathBuf;
use tempfile::TempDir;
use tracing::debug;
use uuid::Uuid;

pub struct DocumentStore {
    /// Temp directory - auto-cleaned on drop
    dir: TempDir,
}

impl DocumentStore {
    /// Create a new store with a fresh temp directory.
    pub fn new() -> io::Result<Self> {
        let dir = TempDir::new()?;
        debug!("Created document store at {}", dir.path().display());
        Ok(Self { dir })
    }

    // =========================================================================
    // Metadata operations (fast, safe inside locks)
    // =========================================================================

    pub fn pdf_path(&self, id: Uuid) -> PathBuf {
        self.dir.path().join(format!("{id}.pdf"))
    }

    pub fn audit_path(&self, id: Uuid) -> PathBuf {
        self.dir.path().join(format!("{id}.audit.json"))
    }

    /// Delete both files of a document (sync, best effort).
    pub fn remove(&self, id: Uuid) {
        for path in [self.pdf_path(id), self.audit_path(id)] {
            if let Err(e) = std::fs::remove_file(&path)
                && e.kind() != io::ErrorKind::NotFound
            {
                debug!("Failed to remove {}: {}", path.display(), e);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_distinct() {
        let store = DocumentStore::new().unwrap();
        let id = Uuid::new_v4();
        assert_ne!(store.pdf_path(id), store.audit_path(id));
        assert!(store.pdf_path(id).to_string_lossy().ends_with(".pdf"));
        assert_ne!(store.pdf_path(id), store.pdf_path(Uuid::new_v4()));
    }

    #[test]
    fn test_remove() {
        let store = DocumentStore::new().unwrap();
        let id = Uuid::new_v4();
        std::fs::write(store.pdf_path(id), b"%PDF").unwrap();
        std::fs::write(store.audit_path(id), b"{}").unwrap();

        store.remove(id);
        assert!(!store.pdf_path(id).exists());
        assert!(!store.audit_path(id).exists());

        // missing files are not an error
        store.remove(id);
    }
}
