#![allow(dead_code)]

use std::{
    collections::HashMap,
    io::Cursor,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use lecturecast_core::{
    AudioSegment, Concatenator, FixedVoice, LecturePipeline, LectureRequest, LectureSpeed,
    LectureVideoError, PipelineConfig, Rasterizer, Result, SegmentRenderer, SlideImage,
    SlideScript, SpeechRequest, SpeechSynthesizer, SynthesisError, VideoSegment, VoiceDirectory,
    VoiceGender, WavProbe,
};
use tempfile::TempDir;

pub const SILENCE_SECS: f64 = 1.5;
const SAMPLE_RATE: u32 = 8_000;

/// In-memory WAV of `secs` seconds.
pub fn wav_bytes(secs: f64) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for _ in 0..(secs * SAMPLE_RATE as f64).round() as u32 {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

pub fn test_config(root: &TempDir) -> PipelineConfig {
    PipelineConfig {
        work_root: root.path().join("jobs"),
        silence_duration_secs: SILENCE_SECS,
        max_batch_size: Some(2),
        ..PipelineConfig::default()
    }
}

/// Jobs left behind under the work root.
pub fn leftover_jobs(config: &PipelineConfig) -> usize {
    match std::fs::read_dir(&config.work_root) {
        Ok(entries) => entries.count(),
        Err(_) => 0,
    }
}

pub fn request(scripts: &[&str]) -> LectureRequest {
    LectureRequest {
        pdf: b"%PDF-1.4 deck".to_vec(),
        slides: scripts.iter().map(|s| SlideScript::new(*s)).collect(),
        output_label: "Week 1: Intro".to_string(),
        language_code: "en-US".to_string(),
        voice_gender: VoiceGender::Female,
        speed: LectureSpeed::Normal,
    }
}

/// Returns `pages` images; page `i` is the single byte `i`.
pub struct Pages(pub u8);

#[async_trait]
impl Rasterizer for Pages {
    async fn rasterize(&self, _pdf: &[u8]) -> Result<Vec<SlideImage>> {
        Ok((0..self.0).map(|i| SlideImage::new(vec![i])).collect())
    }
}

pub struct BrokenDeck;

#[async_trait]
impl Rasterizer for BrokenDeck {
    async fn rasterize(&self, _pdf: &[u8]) -> Result<Vec<SlideImage>> {
        Err(LectureVideoError::RasterizationFailed {
            reason: "not a pdf".to_string(),
        })
    }
}

pub struct NoVoice;

#[async_trait]
impl VoiceDirectory for NoVoice {
    async fn resolve_voice(&self, language_code: &str, gender: VoiceGender) -> Result<String> {
        Err(LectureVideoError::VoiceUnavailable {
            language_code: language_code.to_string(),
            gender: gender.to_string(),
            reason: "none listed".to_string(),
        })
    }
}

/// Speaks known lines as WAVs of a fixed length, optionally after a delay.
/// Unknown text fails.
#[derive(Default)]
pub struct ScriptedSpeech {
    lines: HashMap<String, (f64, Duration)>,
    pub requests: Mutex<Vec<SpeechRequest>>,
}

impl ScriptedSpeech {
    pub fn line(mut self, text: &str, secs: f64) -> Self {
        self.lines.insert(text.to_string(), (secs, Duration::ZERO));
        self
    }

    pub fn slow_line(mut self, text: &str, secs: f64, delay: Duration) -> Self {
        self.lines.insert(text.to_string(), (secs, delay));
        self
    }
}

#[async_trait]
impl SpeechSynthesizer for ScriptedSpeech {
    async fn synthesize(
        &self,
        request: &SpeechRequest,
    ) -> std::result::Result<Vec<u8>, SynthesisError> {
        self.requests.lock().unwrap().push(request.clone());
        let Some(&(secs, delay)) = self.lines.get(&request.text) else {
            return Err(SynthesisError::InvalidApiResponse(format!(
                "no line for {:?}",
                request.text
            )));
        };
        tokio::time::sleep(delay).await;
        Ok(wav_bytes(secs))
    }

    fn audio_extension(&self) -> &'static str {
        "wav"
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderFault {
    Fail,
    SkipOutput,
    Hang,
}

/// Writes a one-line marker instead of a real segment:
/// `<index> <first image byte> <duration>`.
#[derive(Default)]
pub struct MarkerRenderer {
    faults: HashMap<usize, RenderFault>,
    pub calls: AtomicUsize,
}

impl MarkerRenderer {
    pub fn fault(mut self, index: usize, fault: RenderFault) -> Self {
        self.faults.insert(index, fault);
        self
    }
}

#[async_trait]
impl SegmentRenderer for MarkerRenderer {
    async fn render(
        &self,
        index: usize,
        image: &Path,
        audio: &AudioSegment,
        output: &Path,
    ) -> Result<VideoSegment> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.faults.get(&index) {
            Some(RenderFault::Fail) => {
                return Err(LectureVideoError::RenderFailed {
                    index,
                    reason: "encoder crashed".to_string(),
                });
            }
            Some(RenderFault::Hang) => std::future::pending::<()>().await,
            _ => {}
        }

        let page = tokio::fs::read(image).await?;
        if self.faults.get(&index) != Some(&RenderFault::SkipOutput) {
            let marker = format!("{index} {} {:.3}\n", page[0], audio.duration_secs);
            tokio::fs::write(output, marker).await?;
        }
        Ok(VideoSegment {
            index,
            path: output.to_path_buf(),
            duration_secs: audio.duration_secs,
        })
    }
}

/// Appends the segments in the order given.
#[derive(Default)]
pub struct MarkerJoiner {
    pub fail: bool,
}

#[async_trait]
impl Concatenator for MarkerJoiner {
    async fn concatenate(
        &self,
        segments: &[PathBuf],
        _list_path: &Path,
        output: &Path,
    ) -> Result<()> {
        if self.fail {
            return Err(LectureVideoError::ConcatenationFailed {
                reason: "muxer refused".to_string(),
            });
        }
        let mut joined = Vec::new();
        for segment in segments {
            joined.extend(tokio::fs::read(segment).await?);
        }
        tokio::fs::write(output, joined).await?;
        Ok(())
    }
}

pub fn pipeline(
    config: PipelineConfig,
    rasterizer: Arc<dyn Rasterizer>,
    speech: Arc<dyn SpeechSynthesizer>,
    renderer: Arc<dyn SegmentRenderer>,
    joiner: Arc<dyn Concatenator>,
) -> LecturePipeline {
    LecturePipeline::builder(config)
        .rasterizer(rasterizer)
        .voices(Arc::new(FixedVoice("en-US-Wavenet-F".to_string())))
        .synthesizer(speech)
        .probe(Arc::new(WavProbe))
        .renderer(renderer)
        .concatenator(joiner)
        .build()
        .unwrap()
}

/// Parses the marker lines back into `(index, page byte, duration)`.
pub fn markers(video: &[u8]) -> Vec<(usize, u8, f64)> {
    String::from_utf8_lossy(video)
        .lines()
        .map(|line| {
            let mut parts = line.split(' ');
            let index = parts.next().unwrap().parse().unwrap();
            let page = parts.next().unwrap().parse().unwrap();
            let secs = parts.next().unwrap().parse().unwrap();
            (index, page, secs)
        })
        .collect()
}
