use std::{path::PathBuf, time::Duration};

use thiserror::Error;

use crate::provider::ProviderError;

#[derive(Error, Debug)]
pub enum LectureVideoError {
    #[error("Rasterization failed: {reason}")]
    RasterizationFailed { reason: String },

    #[error("Deck conversion from {format} failed: {reason}")]
    ConversionFailed { format: String, reason: String },

    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("No voice available for {language_code} ({gender}): {reason}")]
    VoiceUnavailable {
        language_code: String,
        gender: String,
        reason: String,
    },

    #[error("Render failed for slide {index}: {reason}")]
    RenderFailed { index: usize, reason: String },

    #[error("Could not read duration of {path}: {reason}")]
    ProbeFailed { path: PathBuf, reason: String },

    #[error("Segment file is missing: {path}")]
    MissingSegment { path: PathBuf },

    #[error("Concatenation failed: {reason}")]
    ConcatenationFailed { reason: String },

    #[error("{stage} timed out after {:?}{}", .after, .index.map(|i| format!(" on slide {i}")).unwrap_or_default())]
    Timeout {
        stage: &'static str,
        index: Option<usize>,
        after: Duration,
    },

    #[error("Invalid duration {value} for slide {index}")]
    InvalidDuration { index: usize, value: f64 },

    #[error("Slide task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Provider error: {0}")]
    ProviderError(#[from] ProviderError),
}

impl LectureVideoError {
    /// True when the job failed because of what the caller sent rather
    /// than because processing broke.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            LectureVideoError::RasterizationFailed { .. }
                | LectureVideoError::ConversionFailed { .. }
                | LectureVideoError::InvalidInput { .. }
                | LectureVideoError::VoiceUnavailable { .. }
        )
    }
}

/// Why a narration could not be synthesized. Never leaves the narrator:
/// the slide falls back to silence instead.
#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error("narration text is empty")]
    EmptyText,

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid API response: {0}")]
    InvalidApiResponse(String),

    #[error("Audio decode failed: {0}")]
    DecodeError(#[from] base64::DecodeError),

    #[error("Provider error: {0}")]
    ProviderError(#[from] ProviderError),

    #[error("synthesis timed out after {0:?}")]
    Timeout(Duration),

    #[error("probe failed: {0}")]
    ProbeFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LectureVideoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_names_slide_when_known() {
        let err = LectureVideoError::Timeout {
            stage: "render",
            index: Some(3),
            after: Duration::from_secs(5),
        };
        assert_eq!(err.to_string(), "render timed out after 5s on slide 3");

        let err = LectureVideoError::Timeout {
            stage: "concatenate",
            index: None,
            after: Duration::from_secs(5),
        };
        assert_eq!(err.to_string(), "concatenate timed out after 5s");
    }

    #[test]
    fn input_errors_are_separated_from_processing_errors() {
        assert!(
            LectureVideoError::RasterizationFailed {
                reason: "zero pages".into()
            }
            .is_input_error()
        );
        assert!(
            !LectureVideoError::RenderFailed {
                index: 0,
                reason: "codec".into()
            }
            .is_input_error()
        );
    }
}
