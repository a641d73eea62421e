use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::Result;

pub fn get_root_work_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("lecturecast")
        .join("jobs")
}

/// File layout inside one job's scratch directory. Every intermediate file
/// is keyed by slide index, so concurrent slide tasks never share a path.
#[derive(Clone, Debug)]
pub struct JobLayout {
    root: PathBuf,
}

impl JobLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the path for a slide's page image
    pub fn image_path(&self, index: usize) -> PathBuf {
        self.root.join(format!("slide-{index}.png"))
    }

    /// Get the path for a slide's narration audio
    pub fn audio_path(&self, index: usize, extension: &str) -> PathBuf {
        self.root.join(format!("audio-{index}.{extension}"))
    }

    /// Get the path for a slide's silent fallback clip
    pub fn silence_path(&self, index: usize) -> PathBuf {
        self.root.join(format!("silence-{index}.wav"))
    }

    /// Get the path for a slide's rendered segment
    pub fn segment_path(&self, index: usize) -> PathBuf {
        self.root.join(format!("segment-{index}.mp4"))
    }

    pub fn concat_list_path(&self) -> PathBuf {
        self.root.join("segments.txt")
    }

    pub fn output_path(&self, label: &str) -> PathBuf {
        self.root.join(format!("lecture-{}.mp4", sanitize_label(label)))
    }
}

/// Scratch directory owned by one job.
///
/// Removed by [`WorkDir::release`], or by `Drop` if the job unwinds or is
/// cancelled before reaching it.
#[derive(Debug)]
pub struct WorkDir {
    job_id: Uuid,
    layout: JobLayout,
    released: bool,
}

impl WorkDir {
    pub async fn create(root: &Path) -> Result<Self> {
        let job_id = Uuid::new_v4();
        let path = root.join(format!("job-{job_id}"));
        fs::create_dir_all(&path).await?;
        // ffmpeg resolves relative concat-list entries against the list file,
        // so every path handed out from here on must be absolute.
        let path = fs::canonicalize(&path).await?;
        debug!(%job_id, path = %path.display(), "work dir created");
        Ok(Self {
            job_id,
            layout: JobLayout::new(path),
            released: false,
        })
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    pub fn path(&self) -> &Path {
        self.layout.root()
    }

    pub fn layout(&self) -> &JobLayout {
        &self.layout
    }

    /// Removes the directory and everything in it. Failures are logged, never
    /// returned: a leftover scratch dir cannot affect the produced video.
    pub async fn release(mut self) {
        self.released = true;
        match fs::remove_dir_all(self.layout.root()).await {
            Ok(()) => debug!(job_id = %self.job_id, "work dir released"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                job_id = %self.job_id,
                path = %self.path().display(),
                error = %e,
                "failed to clean up work dir"
            ),
        }
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match std::fs::remove_dir_all(self.layout.root()) {
            Ok(()) => debug!(job_id = %self.job_id, "work dir released on drop"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                job_id = %self.job_id,
                path = %self.path().display(),
                error = %e,
                "failed to clean up work dir"
            ),
        }
    }
}

/// Keeps a caller-supplied label safe to use inside a file name.
pub fn sanitize_label(label: &str) -> String {
    let cleaned: String = label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(64)
        .collect();

    if cleaned.is_empty() {
        "video".to_string()
    } else {
        cleaned
    }
}
