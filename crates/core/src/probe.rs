use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    config::PipelineConfig,
    error::{LectureVideoError, Result},
    process::{command, run_tool},
};

/// Reads the playable length of a media file.
#[async_trait]
pub trait MediaProbe: Send + Sync {
    async fn duration_secs(&self, path: &Path) -> Result<f64>;
}

/// Probes with `ffprobe`; works for any container ffmpeg understands.
pub struct FfprobeProbe {
    program: PathBuf,
    deadline: Duration,
}

impl FfprobeProbe {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            program: config.ffprobe_path.clone(),
            deadline: config.timeouts.probe,
        }
    }
}

#[async_trait]
impl MediaProbe for FfprobeProbe {
    async fn duration_secs(&self, path: &Path) -> Result<f64> {
        let mut cmd = command(&self.program);
        cmd.arg("-v")
            .arg("error")
            .arg("-show_entries")
            .arg("format=duration")
            .arg("-of")
            .arg("default=noprint_wrappers=1:nokey=1")
            .arg(path);

        let output = run_tool(&mut cmd, self.deadline).await.map_err(|e| {
            e.into_error("probe", None, |reason| LectureVideoError::ProbeFailed {
                path: path.to_path_buf(),
                reason,
            })
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_duration(stdout.trim()).ok_or_else(|| LectureVideoError::ProbeFailed {
            path: path.to_path_buf(),
            reason: format!("unexpected ffprobe output {:?}", stdout.trim()),
        })
    }
}

/// Probes WAV files from their header, without any external tool.
pub struct WavProbe;

impl WavProbe {
    pub fn read_duration(path: &Path) -> std::result::Result<f64, hound::Error> {
        let reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        Ok(reader.duration() as f64 / spec.sample_rate as f64)
    }
}

#[async_trait]
impl MediaProbe for WavProbe {
    async fn duration_secs(&self, path: &Path) -> Result<f64> {
        let owned = path.to_path_buf();
        let duration = tokio::task::spawn_blocking(move || Self::read_duration(&owned))
            .await?
            .map_err(|e| LectureVideoError::ProbeFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        if duration > 0.0 {
            Ok(duration)
        } else {
            Err(LectureVideoError::ProbeFailed {
                path: path.to_path_buf(),
                reason: "audio has zero length".to_string(),
            })
        }
    }
}

fn parse_duration(raw: &str) -> Option<f64> {
    raw.parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d > 0.0)
}
