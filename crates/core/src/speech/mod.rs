//! Narration: voice lookup, speech synthesis and the silent fallback policy.

pub mod google;
pub mod narrator;
pub mod silence;

use async_trait::async_trait;

pub use google::{GoogleSpeechClient, GoogleVoiceDirectory, VoiceInfo, pick_voice};
pub use narrator::{Narrator, VoiceParams};

use crate::{
    error::{Result, SynthesisError},
    types::VoiceGender,
};

#[derive(Clone, Debug, PartialEq)]
pub struct SpeechRequest {
    pub text: String,
    pub language_code: String,
    pub voice_name: String,
    pub speaking_rate: f64,
}

/// Text-to-speech provider.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Encoded audio for `request`.
    async fn synthesize(
        &self,
        request: &SpeechRequest,
    ) -> std::result::Result<Vec<u8>, SynthesisError>;

    /// File extension matching the bytes returned by `synthesize`.
    fn audio_extension(&self) -> &'static str;
}

/// Maps a language and gender to a concrete voice name. Resolved once per job.
#[async_trait]
pub trait VoiceDirectory: Send + Sync {
    async fn resolve_voice(&self, language_code: &str, gender: VoiceGender) -> Result<String>;
}

/// Always answers with the same voice.
pub struct FixedVoice(pub String);

#[async_trait]
impl VoiceDirectory for FixedVoice {
    async fn resolve_voice(&self, _language_code: &str, _gender: VoiceGender) -> Result<String> {
        Ok(self.0.clone())
    }
}
