use std::{
    fmt,
    path::{Path, PathBuf},
    time::Duration,
};

use tokio::fs;
use tracing::{info, warn};

use crate::{
    config::PipelineConfig,
    error::{LectureVideoError, Result},
    process::{command, run_tool},
};

/// Deck formats accepted on input. Everything but PDF goes through an
/// office suite first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeckFormat {
    Pdf,
    Pptx,
    Ppt,
    Odp,
    Docx,
    Doc,
    Odt,
}

impl DeckFormat {
    pub fn from_extension(extension: &str) -> Option<Self> {
        let format = match extension.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "pdf" => DeckFormat::Pdf,
            "pptx" => DeckFormat::Pptx,
            "ppt" => DeckFormat::Ppt,
            "odp" => DeckFormat::Odp,
            "docx" => DeckFormat::Docx,
            "doc" => DeckFormat::Doc,
            "odt" => DeckFormat::Odt,
            _ => return None,
        };
        Some(format)
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            DeckFormat::Pdf => "pdf",
            DeckFormat::Pptx => "pptx",
            DeckFormat::Ppt => "ppt",
            DeckFormat::Odp => "odp",
            DeckFormat::Docx => "docx",
            DeckFormat::Doc => "doc",
            DeckFormat::Odt => "odt",
        }
    }

    pub fn needs_conversion(&self) -> bool {
        *self != DeckFormat::Pdf
    }
}

impl fmt::Display for DeckFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Converts office documents to PDF with a headless LibreOffice.
pub struct OfficeConverter {
    program: PathBuf,
    scratch_root: PathBuf,
    deadline: Duration,
}

impl OfficeConverter {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            program: config.soffice_path.clone(),
            scratch_root: config.work_root.clone(),
            deadline: config.timeouts.convert,
        }
    }

    pub async fn to_pdf(&self, bytes: &[u8], format: DeckFormat) -> Result<Vec<u8>> {
        if !format.needs_conversion() {
            return Ok(bytes.to_vec());
        }
        if bytes.is_empty() {
            return Err(LectureVideoError::ConversionFailed {
                format: format.to_string(),
                reason: "document is empty".to_string(),
            });
        }

        fs::create_dir_all(&self.scratch_root).await?;
        let dir = tempfile::Builder::new()
            .prefix("convert-")
            .tempdir_in(&self.scratch_root)?;

        let result = match fs::canonicalize(dir.path()).await {
            Ok(path) => self.convert_in(&path, bytes, format).await,
            Err(e) => Err(e.into()),
        };

        if let Err(e) = dir.close() {
            warn!(error = %e, "failed to clean up conversion scratch dir");
        }

        let pdf = result?;
        info!(%format, bytes = pdf.len(), "deck converted to pdf");
        Ok(pdf)
    }

    async fn convert_in(&self, dir: &Path, bytes: &[u8], format: DeckFormat) -> Result<Vec<u8>> {
        let failed = |reason: String| LectureVideoError::ConversionFailed {
            format: format.to_string(),
            reason,
        };

        let input = dir.join(format!("deck.{}", format.extension()));
        fs::write(&input, bytes).await?;

        // soffice refuses to run twice against one profile, so each call gets
        // its own under the scratch dir. The profile URL must be absolute.
        let profile = format!("-env:UserInstallation=file://{}", dir.join("profile").display());

        let mut cmd = command(&self.program);
        cmd.arg(profile)
            .arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(dir)
            .arg(&input);

        run_tool(&mut cmd, self.deadline)
            .await
            .map_err(|e| e.into_error("convert", None, failed))?;

        let output = dir.join("deck.pdf");
        match fs::read(&output).await {
            Ok(pdf) if !pdf.is_empty() => Ok(pdf),
            Ok(_) => Err(failed("converter wrote an empty pdf".to_string())),
            Err(_) => Err(failed("converter produced no pdf".to_string())),
        }
    }
}
