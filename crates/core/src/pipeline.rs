use std::{future::Future, path::PathBuf, sync::Arc, time::Duration};

use tokio::fs;
use tracing::{Instrument, debug, info, info_span};

use crate::{
    concat::{Concatenator, FfmpegConcatenator, ensure_segments_exist},
    config::PipelineConfig,
    error::{LectureVideoError, Result},
    probe::{FfprobeProbe, MediaProbe},
    rasterize::{PdftoppmRasterizer, Rasterizer},
    reconcile::reconcile,
    render::{FfmpegRenderer, SegmentRenderer},
    scheduler::{default_batch_size, run_batched},
    speech::{
        GoogleSpeechClient, GoogleVoiceDirectory, Narrator, SpeechSynthesizer, VoiceDirectory,
        VoiceParams,
    },
    timeline,
    types::{AudioSegment, LectureRequest, LectureVideo, SlideImage, SlideScript, VideoSegment},
    workdir::{JobLayout, WorkDir},
};

/// Assembles a [`LecturePipeline`]. Collaborators left unset fall back to the
/// local-tool stack (pdftoppm, ffprobe, ffmpeg) and Google Cloud TTS.
pub struct PipelineBuilder {
    config: PipelineConfig,
    rasterizer: Option<Arc<dyn Rasterizer>>,
    voices: Option<Arc<dyn VoiceDirectory>>,
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    probe: Option<Arc<dyn MediaProbe>>,
    renderer: Option<Arc<dyn SegmentRenderer>>,
    concatenator: Option<Arc<dyn Concatenator>>,
}

impl PipelineBuilder {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            rasterizer: None,
            voices: None,
            synthesizer: None,
            probe: None,
            renderer: None,
            concatenator: None,
        }
    }

    pub fn rasterizer(mut self, rasterizer: Arc<dyn Rasterizer>) -> Self {
        self.rasterizer = Some(rasterizer);
        self
    }

    pub fn voices(mut self, voices: Arc<dyn VoiceDirectory>) -> Self {
        self.voices = Some(voices);
        self
    }

    pub fn synthesizer(mut self, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    pub fn probe(mut self, probe: Arc<dyn MediaProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn SegmentRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn concatenator(mut self, concatenator: Arc<dyn Concatenator>) -> Self {
        self.concatenator = Some(concatenator);
        self
    }

    /// Fails on an invalid config, or when a Google default is needed and
    /// `GOOGLE_TTS_API_KEY` is not set.
    pub fn build(self) -> Result<LecturePipeline> {
        self.config
            .validate()
            .map_err(|reason| LectureVideoError::InvalidInput { reason })?;

        let config = self.config;
        let synthesizer = match self.synthesizer {
            Some(s) => s,
            None => Arc::new(GoogleSpeechClient::from_env(config.audio_encoding)?),
        };
        let voices = match self.voices {
            Some(v) => v,
            None => Arc::new(GoogleVoiceDirectory::from_env()?),
        };

        Ok(LecturePipeline {
            rasterizer: self
                .rasterizer
                .unwrap_or_else(|| Arc::new(PdftoppmRasterizer::new(&config))),
            probe: self
                .probe
                .unwrap_or_else(|| Arc::new(FfprobeProbe::new(&config))),
            renderer: self
                .renderer
                .unwrap_or_else(|| Arc::new(FfmpegRenderer::new(&config))),
            concatenator: self
                .concatenator
                .unwrap_or_else(|| Arc::new(FfmpegConcatenator::new(&config))),
            voices,
            synthesizer,
            config,
        })
    }
}

/// Turns a PDF deck plus per-slide scripts into one narrated video and the
/// end time of every slide.
pub struct LecturePipeline {
    config: PipelineConfig,
    rasterizer: Arc<dyn Rasterizer>,
    voices: Arc<dyn VoiceDirectory>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    probe: Arc<dyn MediaProbe>,
    renderer: Arc<dyn SegmentRenderer>,
    concatenator: Arc<dyn Concatenator>,
}

struct SlideOutcome {
    audio: AudioSegment,
    video: VideoSegment,
}

impl LecturePipeline {
    pub fn builder(config: PipelineConfig) -> PipelineBuilder {
        PipelineBuilder::new(config)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs one job end to end. Everything the job writes lives in its own
    /// work directory, which is gone by the time this returns, whatever the
    /// outcome.
    pub async fn create_lecture_video(&self, request: LectureRequest) -> Result<LectureVideo> {
        let workdir = WorkDir::create(&self.config.work_root).await?;
        let span = info_span!(
            "lecture",
            job_id = %workdir.job_id(),
            label = %request.output_label,
        );

        let result = self.run(workdir.layout(), request).instrument(span.clone()).await;
        workdir.release().instrument(span).await;
        result
    }

    async fn run(&self, layout: &JobLayout, request: LectureRequest) -> Result<LectureVideo> {
        let LectureRequest {
            pdf,
            slides,
            output_label,
            language_code,
            voice_gender,
            speed,
        } = request;

        if language_code.trim().is_empty() {
            return Err(LectureVideoError::InvalidInput {
                reason: "language code is empty".to_string(),
            });
        }

        let timeouts = &self.config.timeouts;
        let images = within(
            "rasterize",
            None,
            timeouts.rasterize,
            self.rasterizer.rasterize(&pdf),
        )
        .await?;
        let page_count = images.len();
        let script_count = slides.len();
        let (scripts, images) = reconcile(slides, images)?;
        if page_count != script_count {
            info!(
                pages = page_count,
                scripts = script_count,
                slides = scripts.len(),
                "reconciled scripts with pages"
            );
        }

        let voice_name = within(
            "voice_lookup",
            None,
            timeouts.voice_lookup,
            self.voices.resolve_voice(&language_code, voice_gender),
        )
        .await?;
        let voice = Arc::new(VoiceParams {
            language_code,
            voice_name,
            speaking_rate: speed.speaking_rate(),
        });

        let narrator = Arc::new(Narrator::new(
            Arc::clone(&self.synthesizer),
            Arc::clone(&self.probe),
            self.config.silence_duration_secs,
            timeouts.synthesis,
        ));
        let render_deadline = timeouts.render;
        let batch_size = self
            .config
            .max_batch_size
            .unwrap_or_else(default_batch_size);

        let jobs: Vec<(SlideScript, SlideImage)> = scripts.into_iter().zip(images).collect();
        info!(
            slides = jobs.len(),
            batch_size,
            voice = %voice.voice_name,
            "processing slides"
        );

        let outcomes = run_batched(jobs, batch_size, |index, (script, image)| {
            let narrator = Arc::clone(&narrator);
            let renderer = Arc::clone(&self.renderer);
            let voice = Arc::clone(&voice);
            let layout = layout.clone();
            async move {
                process_slide(
                    index,
                    &script,
                    &image,
                    &narrator,
                    renderer.as_ref(),
                    &voice,
                    &layout,
                    render_deadline,
                )
                .await
            }
            .in_current_span()
        })
        .await?;

        let degraded = outcomes.iter().filter(|o| o.audio.degraded).count();
        let durations: Vec<f64> = outcomes.iter().map(|o| o.audio.duration_secs).collect();
        let quiz_timestamps = timeline::accumulate(&durations)?;

        let segments: Vec<PathBuf> = outcomes.into_iter().map(|o| o.video.path).collect();
        ensure_segments_exist(&segments).await?;

        let output = layout.output_path(&output_label);
        within(
            "concatenate",
            None,
            timeouts.concatenate,
            self.concatenator
                .concatenate(&segments, &layout.concat_list_path(), &output),
        )
        .await?;

        let video_bytes =
            fs::read(&output)
                .await
                .map_err(|e| LectureVideoError::ConcatenationFailed {
                    reason: format!("joined video is unreadable: {e}"),
                })?;

        info!(
            slides = quiz_timestamps.len(),
            degraded,
            total_secs = quiz_timestamps.last().copied().unwrap_or_default(),
            bytes = video_bytes.len(),
            "lecture video assembled"
        );

        Ok(LectureVideo {
            video_bytes,
            quiz_timestamps,
        })
    }
}

#[allow(clippy::too_many_arguments)]
async fn process_slide(
    index: usize,
    script: &SlideScript,
    image: &SlideImage,
    narrator: &Narrator,
    renderer: &dyn SegmentRenderer,
    voice: &VoiceParams,
    layout: &JobLayout,
    render_deadline: Duration,
) -> Result<SlideOutcome> {
    let image_path = layout.image_path(index);
    fs::write(&image_path, image.bytes()).await?;

    let audio = narrator.narrate(index, script, voice, layout).await?;

    let segment_path = layout.segment_path(index);
    let video = within(
        "render",
        Some(index),
        render_deadline,
        renderer.render(index, &image_path, &audio, &segment_path),
    )
    .await?;

    debug!(
        slide = index,
        duration_secs = audio.duration_secs,
        degraded = audio.degraded,
        "slide done"
    );
    Ok(SlideOutcome { audio, video })
}

/// Bounds a collaborator call so a hung provider or tool cannot stall the job.
async fn within<T>(
    stage: &'static str,
    index: Option<usize>,
    after: Duration,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(after, fut)
        .await
        .map_err(|_| LectureVideoError::Timeout {
            stage,
            index,
            after,
        })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::FixedVoice;

    #[test]
    fn invalid_config_is_rejected_at_build() {
        let config = PipelineConfig {
            silence_duration_secs: 0.0,
            ..PipelineConfig::default()
        };
        let err = LecturePipeline::builder(config)
            .voices(Arc::new(FixedVoice("en-US-Standard-A".to_string())))
            .build()
            .err();
        assert!(matches!(err, Some(LectureVideoError::InvalidInput { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_maps_to_timeout_with_stage() {
        let err = within::<()>("render", Some(2), Duration::from_secs(1), async {
            std::future::pending().await
        })
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            LectureVideoError::Timeout {
                stage: "render",
                index: Some(2),
                ..
            }
        ));
    }
}
