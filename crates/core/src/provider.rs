use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Missing API key for {provider_name}: {env_var} environment variable is not set")]
    MissingApiKey {
        provider_name: String,
        env_var: String,
    },
}

/// Audio container the speech provider is asked to return.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioEncoding {
    #[default]
    Mp3,
    /// 16-bit PCM wrapped in a WAV header.
    Linear16,
}

impl AudioEncoding {
    pub fn api_name(&self) -> &'static str {
        match self {
            AudioEncoding::Mp3 => "MP3",
            AudioEncoding::Linear16 => "LINEAR16",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            AudioEncoding::Mp3 => "mp3",
            AudioEncoding::Linear16 => "wav",
        }
    }
}

#[derive(Clone, Debug, Default)]
pub enum SpeechProvider {
    #[default]
    GoogleCloud,
}

pub struct ProviderConfig {
    pub synthesize_url: &'static str,
    pub voices_url: &'static str,
    pub env_var: &'static str,
}

impl SpeechProvider {
    pub fn config(&self) -> ProviderConfig {
        match self {
            SpeechProvider::GoogleCloud => ProviderConfig {
                synthesize_url: "https://texttospeech.googleapis.com/v1/text:synthesize",
                voices_url: "https://texttospeech.googleapis.com/v1/voices",
                env_var: "GOOGLE_TTS_API_KEY",
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SpeechProvider::GoogleCloud => "Google Cloud Text-to-Speech",
        }
    }

    /// Validate that the API key is set for this provider
    pub fn validate_api_key(&self) -> Result<String, ProviderError> {
        let config = self.config();
        std::env::var(config.env_var)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ProviderError::MissingApiKey {
                provider_name: self.name().to_string(),
                env_var: config.env_var.to_string(),
            })
    }
}
