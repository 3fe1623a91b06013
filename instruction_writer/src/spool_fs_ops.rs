//! File system operations used by the durable spool writer.
//!
//! The writer only needs three primitives: create one directory, create a file
//! exclusively, and rename. Keeping them behind a trait lets batch processing
//! be tested against injected failures without touching a real disk.

use std::io;
use std::path::Path;

use async_std::fs::{self, OpenOptions};
use async_std::io::WriteExt;

/// Trait for the file system operations the spool writer depends on.
#[async_trait::async_trait]
pub trait SpoolFileSystemOps: Send + Sync {
    /// Create a single directory. Parents are not created. Returns an error of
    /// kind `AlreadyExists` when the directory is already there.
    async fn create_dir(&self, path: &Path) -> io::Result<()>;

    /// Create `path` exclusively and write `data` to it. Fails with
    /// `AlreadyExists` if anything is present at `path`.
    async fn write_new_file(&self, path: &Path, data: &[u8]) -> io::Result<()>;

    /// Atomically rename `from` to `to`.
    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
}

/// Production implementation on top of `async_std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdSpoolFileSystemOps;

#[async_trait::async_trait]
impl SpoolFileSystemOps for StdSpoolFileSystemOps {
    async fn create_dir(&self, path: &Path) -> io::Result<()> {
        fs::create_dir(path).await
    }

    async fn write_new_file(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await?;
        file.write_all(data).await?;
        file.sync_all().await
    }

    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to).await
    }
}

#[cfg(any(test, feature = "test-util"))]
pub mod mock {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    /// In-memory implementation for tests.
    ///
    /// Directories and files live in shared state so that clones handed to the
    /// writer and kept by the test observe the same view.
    #[derive(Clone, Default)]
    pub struct MockSpoolFileSystemOps {
        dirs: Arc<Mutex<HashSet<PathBuf>>>,
        files: Arc<Mutex<HashMap<PathBuf, Vec<u8>>>>,
        renames: Arc<Mutex<Vec<(PathBuf, PathBuf)>>>,
        fail_create_dir: Arc<Mutex<Option<io::ErrorKind>>>,
        fail_write: Arc<Mutex<Option<io::ErrorKind>>>,
        fail_rename: Arc<Mutex<Option<io::ErrorKind>>>,
    }

    impl MockSpoolFileSystemOps {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn add_dir(&self, path: impl Into<PathBuf>) {
            self.dirs.lock().unwrap().insert(path.into());
        }

        pub fn add_file(&self, path: impl Into<PathBuf>, data: impl Into<Vec<u8>>) {
            self.files.lock().unwrap().insert(path.into(), data.into());
        }

        /// Make directory creation fail with the given kind.
        pub fn fail_create_dir_with(&self, kind: io::ErrorKind) {
            *self.fail_create_dir.lock().unwrap() = Some(kind);
        }

        pub fn fail_write_with(&self, kind: io::ErrorKind) {
            *self.fail_write.lock().unwrap() = Some(kind);
        }

        pub fn fail_rename_with(&self, kind: io::ErrorKind) {
            *self.fail_rename.lock().unwrap() = Some(kind);
        }

        pub fn has_dir(&self, path: &Path) -> bool {
            self.dirs.lock().unwrap().contains(path)
        }

        pub fn file_contents(&self, path: &Path) -> Option<String> {
            self.files
                .lock()
                .unwrap()
                .get(path)
                .map(|data| String::from_utf8_lossy(data).to_string())
        }

        /// Paths of all files currently present, sorted.
        pub fn file_paths(&self) -> Vec<PathBuf> {
            let mut paths: Vec<PathBuf> = self.files.lock().unwrap().keys().cloned().collect();
            paths.sort();
            paths
        }

        pub fn renames(&self) -> Vec<(PathBuf, PathBuf)> {
            self.renames.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl SpoolFileSystemOps for MockSpoolFileSystemOps {
        async fn create_dir(&self, path: &Path) -> io::Result<()> {
            if let Some(kind) = *self.fail_create_dir.lock().unwrap() {
                return Err(io::Error::new(kind, format!("mock mkdir {}", path.display())));
            }
            if !self.dirs.lock().unwrap().insert(path.to_path_buf()) {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("directory exists: {}", path.display()),
                ));
            }
            Ok(())
        }

        async fn write_new_file(&self, path: &Path, data: &[u8]) -> io::Result<()> {
            if let Some(kind) = *self.fail_write.lock().unwrap() {
                return Err(io::Error::new(kind, format!("mock write {}", path.display())));
            }
            let mut files = self.files.lock().unwrap();
            if files.contains_key(path) {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("file exists: {}", path.display()),
                ));
            }
            files.insert(path.to_path_buf(), data.to_vec());
            Ok(())
        }

        async fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
            if let Some(kind) = *self.fail_rename.lock().unwrap() {
                return Err(io::Error::new(kind, format!("mock rename {}", from.display())));
            }
            let mut files = self.files.lock().unwrap();
            let data = files.remove(from).ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("source does not exist: {}", from.display()),
                )
            })?;
            files.insert(to.to_path_buf(), data);
            self.renames
                .lock()
                .unwrap()
                .push((from.to_path_buf(), to.to_path_buf()));
            Ok(())
        }
    }
}
