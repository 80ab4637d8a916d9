//! File system access
//!
//! Everything that touches configuration files or sysfs goes through
//! [`FileSystem`] so convergence can run against a temporary root or a mock.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Entries of a directory as full paths, sorted
    async fn list_dir(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;

    async fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Raw file contents, for byte comparisons
    async fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    async fn exists(&self, path: &Path) -> bool;

    /// Replace the contents of `path`, creating parent directories as needed
    ///
    /// A symlink at `path` is written through, and an existing file keeps its
    /// permissions.
    async fn write_file(&self, path: &Path, content: &[u8]) -> io::Result<()>;
}

/// The host file system
#[derive(Debug, Clone, Default)]
pub struct OsFileSystem;

impl OsFileSystem {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileSystem for OsFileSystem {
    async fn list_dir(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut entries = fs::read_dir(dir).await?;
        let mut paths = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            paths.push(entry.path());
        }

        paths.sort();
        Ok(paths)
    }

    async fn read_to_string(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path).await
    }

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path).await
    }

    async fn exists(&self, path: &Path) -> bool {
        fs::try_exists(path).await.unwrap_or(false)
    }

    async fn write_file(&self, path: &Path, content: &[u8]) -> io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        // Replace the file a symlink points at, not the link itself
        let (target, permissions) = match fs::canonicalize(path).await {
            Ok(target) => {
                let permissions = fs::metadata(&target).await?.permissions();
                (target, Some(permissions))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => (path.to_path_buf(), None),
            Err(e) => return Err(e),
        };

        // Write next to the target and rename so readers never see a partial file
        let tmp = tmp_path(&target);
        if let Err(e) = fs::write(&tmp, content).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e);
        }
        if let Some(permissions) = permissions {
            if let Err(e) = fs::set_permissions(&tmp, permissions).await {
                let _ = fs::remove_file(&tmp).await;
                return Err(e);
            }
        }
        if let Err(e) = fs::rename(&tmp, &target).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e);
        }

        debug!("Wrote {} bytes to {}", content.len(), target.display());
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.netconverge-tmp", name))
}
