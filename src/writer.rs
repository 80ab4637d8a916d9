//! Convergent file writes

use crate::error::{NetconvergeError, NetconvergeResult};
use crate::fs::FileSystem;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

pub struct ConvergenceWriter {
    fs: Arc<dyn FileSystem>,
}

impl ConvergenceWriter {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Write `content` to `path` only if it differs from what is there
    ///
    /// A missing file counts as empty. Returns whether a write happened.
    pub async fn converge(&self, path: &Path, content: &str) -> NetconvergeResult<bool> {
        let current = match self.fs.read(path).await {
            Ok(current) => current,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(source) => {
                return Err(NetconvergeError::FileWrite {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        if current == content.as_bytes() {
            debug!("{} already up to date", path.display());
            return Ok(false);
        }

        self.write_always(path, content).await?;
        info!("Updated {}", path.display());
        Ok(true)
    }

    /// Write `content` to `path` regardless of its current contents
    pub async fn write_always(&self, path: &Path, content: &str) -> NetconvergeResult<()> {
        self.fs.write_file(path, content.as_bytes()).await
            .map_err(|source| NetconvergeError::FileWrite {
                path: path.to_path_buf(),
                source,
            })
    }
}
