use std::{collections::HashMap, sync::Mutex};

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use tracing::{debug, info};

use crate::{
    error::{LectureVideoError, Result, SynthesisError},
    provider::{AudioEncoding, SpeechProvider},
    speech::{SpeechRequest, SpeechSynthesizer, VoiceDirectory},
    types::VoiceGender,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceInfo {
    #[serde(default)]
    pub language_codes: Vec<String>,
    pub name: String,
    #[serde(default)]
    pub ssml_gender: String,
}

#[derive(Deserialize)]
struct VoicesResponse {
    #[serde(default)]
    voices: Vec<VoiceInfo>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: Option<String>,
}

/// Picks a voice for the language and gender: Wavenet voices first, then
/// Standard ones; other families are never chosen.
pub fn pick_voice(
    voices: &[VoiceInfo],
    language_code: &str,
    gender: VoiceGender,
) -> Option<String> {
    let rank = |name: &str| {
        if name.contains("Wavenet") {
            Some(0)
        } else if name.contains("Standard") {
            Some(1)
        } else {
            None
        }
    };

    voices
        .iter()
        .filter(|v| v.language_codes.iter().any(|c| c == language_code))
        .filter(|v| v.ssml_gender == gender.as_str())
        .filter_map(|v| rank(&v.name).map(|r| (r, v)))
        .min_by(|(ra, a), (rb, b)| ra.cmp(rb).then_with(|| a.name.cmp(&b.name)))
        .map(|(_, v)| v.name.clone())
}

/// Google Cloud Text-to-Speech over REST.
pub struct GoogleSpeechClient {
    http: reqwest::Client,
    provider: SpeechProvider,
    api_key: String,
    encoding: AudioEncoding,
}

impl GoogleSpeechClient {
    pub fn new(http: reqwest::Client, api_key: String, encoding: AudioEncoding) -> Self {
        Self {
            http,
            provider: SpeechProvider::GoogleCloud,
            api_key,
            encoding,
        }
    }

    /// Client keyed from the provider's environment variable.
    pub fn from_env(encoding: AudioEncoding) -> Result<Self> {
        let provider = SpeechProvider::GoogleCloud;
        let api_key = provider.validate_api_key()?;
        Ok(Self::new(reqwest::Client::new(), api_key, encoding))
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleSpeechClient {
    async fn synthesize(
        &self,
        request: &SpeechRequest,
    ) -> std::result::Result<Vec<u8>, SynthesisError> {
        if request.text.trim().is_empty() {
            return Err(SynthesisError::EmptyText);
        }

        let config = self.provider.config();
        let response = self
            .http
            .post(config.synthesize_url)
            .query(&[("key", self.api_key.as_str())])
            .json(&serde_json::json!({
                "input": { "text": request.text },
                "voice": {
                    "languageCode": request.language_code,
                    "name": request.voice_name,
                },
                "audioConfig": {
                    "audioEncoding": self.encoding.api_name(),
                    "speakingRate": request.speaking_rate,
                },
            }))
            .send()
            .await?
            .error_for_status()?
            .json::<SynthesizeResponse>()
            .await?;

        let content = response.audio_content.ok_or_else(|| {
            SynthesisError::InvalidApiResponse("response has no audioContent".to_string())
        })?;
        let audio = base64::engine::general_purpose::STANDARD.decode(content)?;

        debug!(bytes = audio.len(), voice = %request.voice_name, "speech synthesized");
        Ok(audio)
    }

    fn audio_extension(&self) -> &'static str {
        self.encoding.extension()
    }
}

/// Voice lookup against the provider's voice list, cached per language and
/// gender for the life of the directory.
pub struct GoogleVoiceDirectory {
    http: reqwest::Client,
    provider: SpeechProvider,
    api_key: String,
    cache: Mutex<HashMap<(String, VoiceGender), String>>,
}

impl GoogleVoiceDirectory {
    pub fn new(http: reqwest::Client, api_key: String) -> Self {
        Self {
            http,
            provider: SpeechProvider::GoogleCloud,
            api_key,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_env() -> Result<Self> {
        let api_key = SpeechProvider::GoogleCloud.validate_api_key()?;
        Ok(Self::new(reqwest::Client::new(), api_key))
    }

    async fn list_voices(
        &self,
        language_code: &str,
    ) -> std::result::Result<Vec<VoiceInfo>, reqwest::Error> {
        let config = self.provider.config();
        let response = self
            .http
            .get(config.voices_url)
            .query(&[("languageCode", language_code), ("key", self.api_key.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json::<VoicesResponse>()
            .await?;
        Ok(response.voices)
    }

    fn cached(&self, key: &(String, VoiceGender)) -> Option<String> {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(key)
            .cloned()
    }
}

#[async_trait]
impl VoiceDirectory for GoogleVoiceDirectory {
    async fn resolve_voice(&self, language_code: &str, gender: VoiceGender) -> Result<String> {
        let key = (language_code.to_string(), gender);
        if let Some(name) = self.cached(&key) {
            return Ok(name);
        }

        let unavailable = |reason: String| LectureVideoError::VoiceUnavailable {
            language_code: language_code.to_string(),
            gender: gender.to_string(),
            reason,
        };

        let voices = self
            .list_voices(language_code)
            .await
            .map_err(|e| unavailable(e.to_string()))?;
        let name = pick_voice(&voices, language_code, gender)
            .ok_or_else(|| unavailable("no Wavenet or Standard voice matches".to_string()))?;

        info!(%language_code, %gender, voice = %name, "voice resolved");
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key, name.clone());
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice(name: &str, lang: &str, gender: &str) -> VoiceInfo {
        VoiceInfo {
            language_codes: vec![lang.to_string()],
            name: name.to_string(),
            ssml_gender: gender.to_string(),
        }
    }

    #[test]
    fn wavenet_is_preferred_over_standard() {
        let voices = vec![
            voice("en-US-Standard-C", "en-US", "FEMALE"),
            voice("en-US-Neural2-F", "en-US", "FEMALE"),
            voice("en-US-Wavenet-F", "en-US", "FEMALE"),
            voice("en-US-Wavenet-B", "en-US", "MALE"),
        ];
        assert_eq!(
            pick_voice(&voices, "en-US", VoiceGender::Female).as_deref(),
            Some("en-US-Wavenet-F")
        );
    }

    #[test]
    fn other_families_and_languages_are_ignored() {
        let voices = vec![
            voice("vi-VN-Neural2-A", "vi-VN", "FEMALE"),
            voice("en-US-Standard-C", "en-US", "FEMALE"),
        ];
        assert_eq!(pick_voice(&voices, "vi-VN", VoiceGender::Female), None);
    }

    #[test]
    fn voice_list_parses_provider_shape() {
        let body = r#"{"voices":[{"languageCodes":["en-US"],"name":"en-US-Wavenet-A","ssmlGender":"MALE","naturalSampleRateHertz":24000}]}"#;
        let parsed: VoicesResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.voices[0].ssml_gender, "MALE");
    }

    #[tokio::test]
    async fn blank_text_is_rejected_before_any_request() {
        let client = GoogleSpeechClient::new(
            reqwest::Client::new(),
            "unused".to_string(),
            AudioEncoding::Mp3,
        );
        let request = SpeechRequest {
            text: "   ".to_string(),
            language_code: "en-US".to_string(),
            voice_name: "en-US-Wavenet-A".to_string(),
            speaking_rate: 1.0,
        };
        assert!(matches!(
            client.synthesize(&request).await,
            Err(SynthesisError::EmptyText)
        ));
    }
}
