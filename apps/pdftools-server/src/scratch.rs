//! Scratch files for disk-backed requests
//!
//! [`ScratchSpace`] owns the directory; each request takes a
//! [`RequestFiles`] guard from it. Every path created through or registered
//! with the guard is deleted when the guard is dropped, whichever way the
//! request ends.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

/// Root directory for per-request scratch files.
#[derive(Clone, Debug)]
pub struct ScratchSpace {
    root: Arc<PathBuf>,
}

impl ScratchSpace {
    /// Use `root`, creating it if needed.
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root: Arc::new(root),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Start tracking files for one request.
    pub fn request(&self) -> RequestFiles {
        RequestFiles {
            root: Arc::clone(&self.root),
            paths: Vec::new(),
        }
    }
}

/// The files one request has put on disk.
#[derive(Debug)]
pub struct RequestFiles {
    root: Arc<PathBuf>,
    paths: Vec<PathBuf>,
}

impl RequestFiles {
    /// Record `path` for deletion.
    pub fn register(&mut self, path: PathBuf) {
        self.paths.push(path);
    }

    /// A fresh, registered path `<prefix>-<uuid>.<extension>` in the scratch root.
    pub fn output_path(&mut self, prefix: &str, extension: &str) -> PathBuf {
        let path = self
            .root
            .join(format!("{}-{}.{}", prefix, Uuid::new_v4(), extension));
        self.register(path.clone());
        path
    }

    /// Write an upload to a fresh registered path.
    ///
    /// The path is registered before writing so a partial write is cleaned
    /// up as well.
    pub async fn spool(&mut self, prefix: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        let path = self.output_path(prefix, "upload");
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Delete every registered path and forget it. Returns how many files
    /// were removed.
    ///
    /// Failures are logged and do not stop the remaining deletions. A path
    /// that was registered but never written is not an error. Blocks the
    /// calling thread; prefer [`RequestFiles::cleanup`] on async paths.
    pub fn cleanup_all(&mut self) -> usize {
        let mut removed = 0;
        for path in self.paths.drain(..) {
            if report_removal(&path, std::fs::remove_file(&path)) {
                removed += 1;
            }
        }
        log_removed(removed);
        removed
    }

    /// [`RequestFiles::cleanup_all`] on tokio's blocking pool.
    pub async fn cleanup(&mut self) -> usize {
        let mut removed = 0;
        for path in std::mem::take(&mut self.paths) {
            if report_removal(&path, tokio::fs::remove_file(&path).await) {
                removed += 1;
            }
        }
        log_removed(removed);
        removed
    }
}

fn report_removal(path: &Path, result: io::Result<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => {
            warn!("Failed to delete {}: {}", path.display(), e);
            false
        }
    }
}

fn log_removed(removed: usize) {
    if removed > 0 {
        debug!("Removed {} scratch files", removed);
    }
}

impl Drop for RequestFiles {
    fn drop(&mut self) {
        self.cleanup_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn test_drop_removes_spooled_files() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = ScratchSpace::new(dir.path()).unwrap();

        let mut files = scratch.request();
        let a = files.spool("pdf", b"one").await.unwrap();
        let b = files.spool("pdf", b"two").await.unwrap();
        assert_ne!(a, b);
        assert_eq!(entries(dir.path()), 2);

        drop(files);
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_async_cleanup_removes_and_drains() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = ScratchSpace::new(dir.path()).unwrap();

        let mut files = scratch.request();
        files.spool("image", b"one").await.unwrap();
        let _never_written = files.output_path("converted", "pdf");

        assert_eq!(files.cleanup().await, 1);
        assert!(files.is_empty());
        assert_eq!(entries(dir.path()), 0);
        assert_eq!(files.cleanup().await, 0);
    }

    #[test]
    fn test_cleanup_all_runs_once() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = ScratchSpace::new(dir.path()).unwrap();

        let mut files = scratch.request();
        let out = files.output_path("split", "pdf");
        std::fs::write(&out, b"%PDF").unwrap();

        assert_eq!(files.cleanup_all(), 1);
        assert!(files.is_empty());
        assert_eq!(files.cleanup_all(), 0);
    }

    #[test]
    fn test_missing_file_does_not_block_others() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = ScratchSpace::new(dir.path()).unwrap();

        let mut files = scratch.request();
        let never_written = files.output_path("merged", "pdf");
        let written = files.output_path("merged", "pdf");
        std::fs::write(&written, b"%PDF").unwrap();

        assert_eq!(files.len(), 2);
        assert_eq!(files.cleanup_all(), 1);
        assert!(!never_written.exists());
        assert!(!written.exists());
    }

    #[test]
    fn test_requests_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = ScratchSpace::new(dir.path()).unwrap();

        let mut first = scratch.request();
        let mut second = scratch.request();
        let a = first.output_path("converted", "pdf");
        let b = second.output_path("converted", "pdf");
        std::fs::write(&a, b"a").unwrap();
        std::fs::write(&b, b"b").unwrap();

        drop(first);
        assert!(!a.exists());
        assert!(b.exists());
    }

    #[test]
    fn test_new_creates_root() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let scratch = ScratchSpace::new(&nested).unwrap();
        assert!(scratch.root().is_dir());
    }
}
