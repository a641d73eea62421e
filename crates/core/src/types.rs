use std::{fmt, path::PathBuf, sync::Arc};

use serde::{Deserialize, Serialize};

/// Narration for one slide. Accepts `{"text": ..}`, the older `{"script": ..}`
/// shape, or a bare string.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SlideScriptRepr")]
pub struct SlideScript {
    pub text: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SlideScriptRepr {
    Plain(String),
    Object {
        #[serde(alias = "script", default)]
        text: String,
    },
}

impl From<SlideScriptRepr> for SlideScript {
    fn from(repr: SlideScriptRepr) -> Self {
        match repr {
            SlideScriptRepr::Plain(text) | SlideScriptRepr::Object { text } => Self { text },
        }
    }
}

impl SlideScript {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// One rasterized page. Clones share the underlying buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct SlideImage {
    bytes: Arc<[u8]>,
}

impl SlideImage {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for SlideImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlideImage")
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct AudioSegment {
    pub index: usize,
    pub path: PathBuf,
    pub duration_secs: f64,
    /// Set when the narration fell back to the silent clip.
    pub degraded: bool,
}

#[derive(Clone, Debug)]
pub struct VideoSegment {
    pub index: usize,
    pub path: PathBuf,
    pub duration_secs: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VoiceGender {
    Male,
    #[default]
    Female,
}

impl VoiceGender {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoiceGender::Male => "MALE",
            VoiceGender::Female => "FEMALE",
        }
    }
}

impl fmt::Display for VoiceGender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LectureSpeed {
    Slow,
    #[default]
    Normal,
    Fast,
}

impl LectureSpeed {
    pub fn speaking_rate(&self) -> f64 {
        match self {
            LectureSpeed::Slow => 0.8,
            LectureSpeed::Normal => 1.0,
            LectureSpeed::Fast => 1.2,
        }
    }
}

/// Everything one `create_lecture_video` call needs.
#[derive(Clone, Debug)]
pub struct LectureRequest {
    pub pdf: Vec<u8>,
    pub slides: Vec<SlideScript>,
    pub output_label: String,
    pub language_code: String,
    pub voice_gender: VoiceGender,
    pub speed: LectureSpeed,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LectureVideo {
    #[serde(skip)]
    pub video_bytes: Vec<u8>,
    /// End of each slide in final-video seconds, one entry per slide.
    pub quiz_timestamps: Vec<f64>,
}

impl fmt::Debug for LectureVideo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LectureVideo")
            .field("video_len", &self.video_bytes.len())
            .field("quiz_timestamps", &self.quiz_timestamps)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slide_scripts_accept_all_shapes() {
        let scripts: Vec<SlideScript> =
            serde_json::from_str(r#"[{"text": "a"}, {"script": "b"}, "c", {}]"#).unwrap();
        assert_eq!(
            scripts,
            vec![
                SlideScript::new("a"),
                SlideScript::new("b"),
                SlideScript::new("c"),
                SlideScript::new(""),
            ]
        );
    }

    #[test]
    fn wire_names_match_callers() {
        assert_eq!(serde_json::to_string(&VoiceGender::Male).unwrap(), "\"MALE\"");
        let speed: LectureSpeed = serde_json::from_str("\"fast\"").unwrap();
        assert_eq!(speed.speaking_rate(), 1.2);
    }
}
