use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{provider::AudioEncoding, workdir::get_root_work_dir};

/// Encoder knobs for per-slide segments. Slides are still frames, so the
/// defaults trade quality for speed.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Output frame size; pages are letterboxed into it so every segment
    /// shares one resolution.
    pub width: u32,
    pub height: u32,
    pub preset: String,
    pub crf: u8,
    pub fps: u32,
    pub gop: u32,
    pub audio_bitrate: String,
    pub audio_sample_rate: u32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            preset: "veryfast".to_string(),
            crf: 23,
            fps: 25,
            gop: 30,
            audio_bitrate: "128k".to_string(),
            audio_sample_rate: 44100,
        }
    }
}

/// Per-stage deadlines for external calls.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    #[serde(with = "secs")]
    pub rasterize: Duration,
    #[serde(with = "secs")]
    pub voice_lookup: Duration,
    #[serde(with = "secs")]
    pub synthesis: Duration,
    #[serde(with = "secs")]
    pub probe: Duration,
    #[serde(with = "secs")]
    pub render: Duration,
    #[serde(with = "secs")]
    pub concatenate: Duration,
    #[serde(with = "secs")]
    pub convert: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            rasterize: Duration::from_secs(120),
            voice_lookup: Duration::from_secs(15),
            synthesis: Duration::from_secs(30),
            probe: Duration::from_secs(15),
            render: Duration::from_secs(300),
            concatenate: Duration::from_secs(600),
            convert: Duration::from_secs(180),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Parent of the per-job working directories.
    pub work_root: PathBuf,
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
    pub pdftoppm_path: PathBuf,
    pub soffice_path: PathBuf,
    pub raster_dpi: u32,
    /// Length of the clip used when a slide has no usable narration.
    pub silence_duration_secs: f64,
    pub audio_encoding: AudioEncoding,
    /// Overrides the CPU-derived batch size when set.
    pub max_batch_size: Option<usize>,
    pub reencode_on_concat: bool,
    pub render: RenderSettings,
    pub timeouts: Timeouts,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            work_root: get_root_work_dir(),
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            pdftoppm_path: PathBuf::from("pdftoppm"),
            soffice_path: PathBuf::from("soffice"),
            raster_dpi: 150,
            silence_duration_secs: 1.0,
            audio_encoding: AudioEncoding::Mp3,
            max_batch_size: None,
            reencode_on_concat: false,
            render: RenderSettings::default(),
            timeouts: Timeouts::default(),
        }
    }
}

impl PipelineConfig {
    /// Defaults with `LECTURECAST_*` environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Applies overrides from `lookup`; values that fail to parse are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("LECTURECAST_WORK_ROOT") {
            self.work_root = PathBuf::from(v);
        }
        if let Some(v) = lookup("LECTURECAST_FFMPEG") {
            self.ffmpeg_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("LECTURECAST_FFPROBE") {
            self.ffprobe_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("LECTURECAST_PDFTOPPM") {
            self.pdftoppm_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("LECTURECAST_SOFFICE") {
            self.soffice_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("LECTURECAST_RASTER_DPI").and_then(|v| v.parse().ok()) {
            self.raster_dpi = v;
        }
        if let Some(v) = lookup("LECTURECAST_SILENCE_SECS")
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite() && *v > 0.0)
        {
            self.silence_duration_secs = v;
        }
        if let Some(v) = lookup("LECTURECAST_MAX_BATCH")
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|v| *v > 0)
        {
            self.max_batch_size = Some(v);
        }
        if let Some(v) = lookup("LECTURECAST_SYNTHESIS_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.timeouts.synthesis = Duration::from_secs(v);
        }
        if let Some(v) = lookup("LECTURECAST_RENDER_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.timeouts.render = Duration::from_secs(v);
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(self.silence_duration_secs.is_finite() && self.silence_duration_secs > 0.0) {
            return Err(format!(
                "silence_duration_secs must be positive, got {}",
                self.silence_duration_secs
            ));
        }
        if self.raster_dpi == 0 {
            return Err("raster_dpi must be > 0".to_string());
        }
        if self.render.fps == 0 {
            return Err("render.fps must be > 0".to_string());
        }
        if self.render.width % 2 != 0 || self.render.height % 2 != 0 {
            return Err("render width and height must be even".to_string());
        }
        if self.max_batch_size == Some(0) {
            return Err("max_batch_size must be > 0".to_string());
        }
        if let Some(stage) = self.timeouts.zero_stage() {
            return Err(format!("timeouts.{stage} must be > 0"));
        }
        Ok(())
    }
}

impl Timeouts {
    fn zero_stage(&self) -> Option<&'static str> {
        [
            ("rasterize", self.rasterize),
            ("voice_lookup", self.voice_lookup),
            ("synthesis", self.synthesis),
            ("probe", self.probe),
            ("render", self.render),
            ("concatenate", self.concatenate),
            ("convert", self.convert),
        ]
        .into_iter()
        .find(|(_, after)| after.is_zero())
        .map(|(stage, _)| stage)
    }
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn overrides_apply_and_bad_values_are_ignored() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("LECTURECAST_WORK_ROOT", "/var/tmp/lc"),
            ("LECTURECAST_SILENCE_SECS", "-2"),
            ("LECTURECAST_MAX_BATCH", "2"),
            ("LECTURECAST_RASTER_DPI", "abc"),
        ]);
        let mut config = PipelineConfig::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.work_root, PathBuf::from("/var/tmp/lc"));
        assert_eq!(config.silence_duration_secs, 1.0);
        assert_eq!(config.max_batch_size, Some(2));
        assert_eq!(config.raster_dpi, 150);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"raster_dpi": 96, "timeouts": {"render": 12.5}}"#).unwrap();
        assert_eq!(config.raster_dpi, 96);
        assert_eq!(config.timeouts.render, Duration::from_millis(12_500));
        assert_eq!(config.timeouts.synthesis, Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_stage_timeout_is_rejected() {
        let mut config = PipelineConfig::default();
        config.apply_overrides(|k| {
            (k == "LECTURECAST_SYNTHESIS_TIMEOUT_SECS").then(|| "0".to_string())
        });
        assert_eq!(config.timeouts.synthesis, Duration::ZERO);
        assert_eq!(config.validate().unwrap_err(), "timeouts.synthesis must be > 0");

        let config: PipelineConfig =
            serde_json::from_str(r#"{"timeouts": {"render": 0}}"#).unwrap();
        assert!(config.validate().unwrap_err().contains("render"));
    }
}
