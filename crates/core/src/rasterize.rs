use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::{
    config::PipelineConfig,
    error::{LectureVideoError, Result},
    process::{command, run_tool},
    types::SlideImage,
};

/// Turns a PDF into one image per page, in page order.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    async fn rasterize(&self, pdf: &[u8]) -> Result<Vec<SlideImage>>;
}

/// Rasterizes through poppler's `pdftoppm`.
pub struct PdftoppmRasterizer {
    program: PathBuf,
    dpi: u32,
    scratch_root: PathBuf,
    deadline: Duration,
}

impl PdftoppmRasterizer {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            program: config.pdftoppm_path.clone(),
            dpi: config.raster_dpi,
            scratch_root: config.work_root.clone(),
            deadline: config.timeouts.rasterize,
        }
    }

    async fn render_pages(&self, pdf: &[u8], dir: &Path) -> Result<Vec<SlideImage>> {
        let pdf_path = dir.join("deck.pdf");
        fs::write(&pdf_path, pdf).await?;

        let prefix = dir.join("page");
        let mut cmd = command(&self.program);
        cmd.arg("-png")
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg(&pdf_path)
            .arg(&prefix);

        run_tool(&mut cmd, self.deadline).await.map_err(|e| {
            e.into_error("rasterize", None, |reason| {
                LectureVideoError::RasterizationFailed { reason }
            })
        })?;

        let mut pages: Vec<(usize, PathBuf)> = Vec::new();
        let mut entries = fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if let Some(number) = page_number(&path) {
                pages.push((number, path));
            }
        }
        pages.sort_by_key(|(number, _)| *number);

        let mut images = Vec::with_capacity(pages.len());
        for (_, path) in pages {
            images.push(SlideImage::new(fs::read(&path).await?));
        }
        Ok(images)
    }
}

#[async_trait]
impl Rasterizer for PdftoppmRasterizer {
    async fn rasterize(&self, pdf: &[u8]) -> Result<Vec<SlideImage>> {
        if pdf.is_empty() {
            return Err(LectureVideoError::RasterizationFailed {
                reason: "document is empty".to_string(),
            });
        }

        fs::create_dir_all(&self.scratch_root).await?;
        let dir = tempfile::Builder::new()
            .prefix("raster-")
            .tempdir_in(&self.scratch_root)?;

        let result = self.render_pages(pdf, dir.path()).await;

        if let Err(e) = dir.close() {
            warn!(error = %e, "failed to clean up raster scratch dir");
        }

        let images = result?;
        if images.is_empty() {
            return Err(LectureVideoError::RasterizationFailed {
                reason: "document produced zero pages".to_string(),
            });
        }

        info!(pages = images.len(), "rasterized deck");
        Ok(images)
    }
}

/// `pdftoppm` names pages `page-1.png` or `page-01.png` depending on the page
/// count, so order by the parsed number rather than the file name.
fn page_number(path: &Path) -> Option<usize> {
    if path.extension()? != "png" {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let number = stem.strip_prefix("page-")?.parse().ok();
    if number.is_none() {
        debug!(file = stem, "skipping unexpected raster output");
    }
    number
}
