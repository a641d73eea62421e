use std::{
    ffi::{OsStr, OsString},
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use crate::{
    config::{PipelineConfig, RenderSettings},
    error::{LectureVideoError, Result},
    process::{command, run_tool},
    types::{AudioSegment, VideoSegment},
};

/// Muxes one still image with one narration track into a video segment that
/// lasts exactly as long as the audio.
#[async_trait]
pub trait SegmentRenderer: Send + Sync {
    async fn render(
        &self,
        index: usize,
        image: &Path,
        audio: &AudioSegment,
        output: &Path,
    ) -> Result<VideoSegment>;
}

pub struct FfmpegRenderer {
    program: PathBuf,
    settings: RenderSettings,
    deadline: Duration,
}

impl FfmpegRenderer {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            program: config.ffmpeg_path.clone(),
            settings: config.render.clone(),
            deadline: config.timeouts.render,
        }
    }

    fn args(&self, image: &Path, audio: &AudioSegment, output: &Path) -> Vec<OsString> {
        let s = &self.settings;
        let fps = s.fps.to_string();
        let filter = self.video_filter();
        let crf = s.crf.to_string();
        let gop = s.gop.to_string();
        let sample_rate = s.audio_sample_rate.to_string();
        let duration = format!("{:.3}", audio.duration_secs);

        [
            OsStr::new("-y"),
            OsStr::new("-loglevel"),
            OsStr::new("error"),
            OsStr::new("-loop"),
            OsStr::new("1"),
            OsStr::new("-framerate"),
            OsStr::new(&fps),
            OsStr::new("-i"),
            image.as_os_str(),
            OsStr::new("-i"),
            audio.path.as_os_str(),
            OsStr::new("-vf"),
            OsStr::new(&filter),
            OsStr::new("-c:v"),
            OsStr::new("libx264"),
            OsStr::new("-preset"),
            OsStr::new(&s.preset),
            OsStr::new("-tune"),
            OsStr::new("stillimage"),
            OsStr::new("-crf"),
            OsStr::new(&crf),
            OsStr::new("-r"),
            OsStr::new(&fps),
            OsStr::new("-g"),
            OsStr::new(&gop),
            OsStr::new("-c:a"),
            OsStr::new("aac"),
            OsStr::new("-b:a"),
            OsStr::new(&s.audio_bitrate),
            OsStr::new("-ar"),
            OsStr::new(&sample_rate),
            OsStr::new("-ac"),
            OsStr::new("2"),
            OsStr::new("-t"),
            OsStr::new(&duration),
            OsStr::new("-shortest"),
            output.as_os_str(),
        ]
        .into_iter()
        .map(OsStr::to_os_string)
        .collect()
    }

    fn video_filter(&self) -> String {
        let RenderSettings { width, height, .. } = self.settings;
        format!(
            "scale={width}:{height}:force_original_aspect_ratio=decrease,\
             pad={width}:{height}:(ow-iw)/2:(oh-ih)/2:color=white,setsar=1,format=yuv420p"
        )
    }
}

#[async_trait]
impl SegmentRenderer for FfmpegRenderer {
    async fn render(
        &self,
        index: usize,
        image: &Path,
        audio: &AudioSegment,
        output: &Path,
    ) -> Result<VideoSegment> {
        let failed = |reason: String| LectureVideoError::RenderFailed { index, reason };

        for input in [image, audio.path.as_path()] {
            if fs::metadata(input).await.is_err() {
                return Err(failed(format!("input {} is missing", input.display())));
            }
        }

        let mut cmd = command(&self.program);
        cmd.args(self.args(image, audio, output));

        run_tool(&mut cmd, self.deadline)
            .await
            .map_err(|e| e.into_error("render", Some(index), failed))?;

        if fs::metadata(output).await.is_err() {
            return Err(failed("encoder produced no output".to_string()));
        }

        debug!(slide = index, duration_secs = audio.duration_secs, "segment rendered");
        Ok(VideoSegment {
            index,
            path: output.to_path_buf(),
            duration_secs: audio.duration_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_image_is_a_render_failure() {
        let dir = tempfile::tempdir().unwrap();
        let audio_path = dir.path().join("audio-0.wav");
        std::fs::write(&audio_path, b"x").unwrap();
        let audio = AudioSegment {
            index: 4,
            path: audio_path,
            duration_secs: 1.0,
            degraded: false,
        };

        let renderer = FfmpegRenderer::new(&PipelineConfig::default());
        let err = renderer
            .render(4, &dir.path().join("nope.png"), &audio, &dir.path().join("out.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, LectureVideoError::RenderFailed { index: 4, .. }));
    }

    #[test]
    fn segment_lasts_exactly_as_long_as_its_audio() {
        let renderer = FfmpegRenderer::new(&PipelineConfig::default());
        let audio = AudioSegment {
            index: 0,
            path: PathBuf::from("/w/audio-0.mp3"),
            duration_secs: 2.5,
            degraded: false,
        };
        let args: Vec<String> = renderer
            .args(Path::new("/w/slide-0.png"), &audio, Path::new("/w/segment-0.mp4"))
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        let after = |flag: &str| {
            let at = args.iter().position(|a| a == flag).unwrap();
            args[at + 1].clone()
        };
        assert_eq!(after("-t"), "2.500");
        assert_eq!(after("-loop"), "1");
        assert_eq!(after("-c:v"), "libx264");
        assert_eq!(after("-c:a"), "aac");
        assert_eq!(after("-r"), "25");
        assert_eq!(after("-g"), "30");
        assert!(args.contains(&"-shortest".to_string()));
        let inputs: Vec<&String> = args
            .iter()
            .enumerate()
            .filter(|(i, _)| *i > 0 && args[i - 1] == "-i")
            .map(|(_, a)| a)
            .collect();
        assert_eq!(inputs, ["/w/slide-0.png", "/w/audio-0.mp3"]);
        assert_eq!(args.last().unwrap(), "/w/segment-0.mp4");
    }

    #[test]
    fn frames_are_letterboxed_to_configured_size() {
        let renderer = FfmpegRenderer::new(&PipelineConfig::default());
        let filter = renderer.video_filter();
        assert!(filter.starts_with("scale=1920:1080"));
        assert!(filter.contains("pad=1920:1080"));
    }
}
