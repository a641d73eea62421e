use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info};

use crate::{
    config::{PipelineConfig, RenderSettings},
    error::{LectureVideoError, Result},
    process::{command, run_tool},
};

/// Joins segments into one video in exactly the order given.
#[async_trait]
pub trait Concatenator: Send + Sync {
    async fn concatenate(&self, segments: &[PathBuf], list_path: &Path, output: &Path)
    -> Result<()>;
}

/// Fails on the first segment that is not on disk. A missing segment cannot
/// be skipped without shifting every later slide.
pub async fn ensure_segments_exist(segments: &[PathBuf]) -> Result<()> {
    if segments.is_empty() {
        return Err(LectureVideoError::ConcatenationFailed {
            reason: "no segments to join".to_string(),
        });
    }
    for path in segments {
        if !fs::try_exists(path).await.unwrap_or(false) {
            return Err(LectureVideoError::MissingSegment { path: path.clone() });
        }
    }
    Ok(())
}

/// Body of an ffmpeg concat-demuxer list file.
pub fn concat_list(segments: &[PathBuf]) -> String {
    segments
        .iter()
        .map(|path| {
            let quoted = path.to_string_lossy().replace('\'', r"'\''");
            format!("file '{quoted}'\n")
        })
        .collect()
}

pub struct FfmpegConcatenator {
    program: PathBuf,
    reencode: bool,
    settings: RenderSettings,
    deadline: Duration,
}

impl FfmpegConcatenator {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            program: config.ffmpeg_path.clone(),
            reencode: config.reencode_on_concat,
            settings: config.render.clone(),
            deadline: config.timeouts.concatenate,
        }
    }

    fn args(&self, list_path: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "-y", "-loglevel", "error", "-f", "concat", "-safe", "0", "-i",
        ]
        .map(OsString::from)
        .into();
        args.push(list_path.into());

        if self.reencode {
            let s = &self.settings;
            args.extend(
                [
                    "-c:v".to_string(),
                    "libx264".to_string(),
                    "-preset".to_string(),
                    s.preset.clone(),
                    "-crf".to_string(),
                    s.crf.to_string(),
                    "-r".to_string(),
                    s.fps.to_string(),
                    "-g".to_string(),
                    s.gop.to_string(),
                    "-c:a".to_string(),
                    "aac".to_string(),
                    "-b:a".to_string(),
                    s.audio_bitrate.clone(),
                ]
                .map(OsString::from),
            );
        } else {
            args.extend(["-c", "copy"].map(OsString::from));
        }

        args.extend(["-movflags", "+faststart"].map(OsString::from));
        args.push(output.into());
        args
    }
}

#[async_trait]
impl Concatenator for FfmpegConcatenator {
    async fn concatenate(
        &self,
        segments: &[PathBuf],
        list_path: &Path,
        output: &Path,
    ) -> Result<()> {
        ensure_segments_exist(segments).await?;
        fs::write(list_path, concat_list(segments)).await?;

        let mut cmd = command(&self.program);
        cmd.args(self.args(list_path, output));

        debug!(segments = segments.len(), reencode = self.reencode, "joining segments");
        run_tool(&mut cmd, self.deadline).await.map_err(|e| {
            e.into_error("concatenate", None, |reason| {
                LectureVideoError::ConcatenationFailed { reason }
            })
        })?;

        info!(segments = segments.len(), output = %output.display(), "segments joined");
        Ok(())
    }
}
