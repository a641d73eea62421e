use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::info;

use crate::error::{LectureVideoError, Result};

/// Where finished videos are published. Returns a URL the caller can hand
/// out.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn store(&self, name: &str, bytes: &[u8], folder: &str) -> Result<String>;
}

/// Stores blobs as plain files under a root directory.
#[derive(Clone, Debug)]
pub struct LocalDirStore {
    root: PathBuf,
}

impl LocalDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Accepts only plain relative names, so a blob can never land outside the
/// store root.
fn relative_part(value: &str, what: &str) -> Result<PathBuf> {
    let path = Path::new(value);
    if path
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Err(LectureVideoError::InvalidInput {
            reason: format!("{what} {value:?} must be a plain relative path"),
        });
    }
    Ok(path.to_path_buf())
}

#[async_trait]
impl BlobStore for LocalDirStore {
    async fn store(&self, name: &str, bytes: &[u8], folder: &str) -> Result<String> {
        if name.is_empty() {
            return Err(LectureVideoError::InvalidInput {
                reason: "blob name is empty".to_string(),
            });
        }
        let dir = self.root.join(relative_part(folder, "folder")?);
        let path = dir.join(relative_part(name, "name")?);

        fs::create_dir_all(&dir).await?;
        fs::write(&path, bytes).await?;

        let absolute = fs::canonicalize(&path).await?;
        info!(path = %absolute.display(), bytes = bytes.len(), "blob stored");
        Ok(format!("file://{}", absolute.display()))
    }
}
