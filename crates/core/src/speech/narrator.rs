use std::{sync::Arc, time::Duration};

use tokio::fs;
use tracing::{debug, info, warn};

use crate::{
    error::{Result, SynthesisError},
    probe::MediaProbe,
    speech::{SpeechRequest, SpeechSynthesizer, silence::write_silence},
    types::{AudioSegment, SlideScript},
    workdir::JobLayout,
};

/// Voice parameters shared by every slide of a job.
#[derive(Clone, Debug)]
pub struct VoiceParams {
    pub language_code: String,
    pub voice_name: String,
    pub speaking_rate: f64,
}

/// Produces one audio track per slide. A slide whose narration cannot be
/// synthesized gets the silent clip instead, so one bad script never aborts
/// the whole video.
pub struct Narrator {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    probe: Arc<dyn MediaProbe>,
    silence_duration_secs: f64,
    deadline: Duration,
}

impl Narrator {
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        probe: Arc<dyn MediaProbe>,
        silence_duration_secs: f64,
        deadline: Duration,
    ) -> Self {
        Self {
            synthesizer,
            probe,
            silence_duration_secs,
            deadline,
        }
    }

    /// Only I/O failures while writing the silent clip are returned; every
    /// synthesis problem degrades to silence.
    pub async fn narrate(
        &self,
        index: usize,
        script: &SlideScript,
        voice: &VoiceParams,
        layout: &JobLayout,
    ) -> Result<AudioSegment> {
        if script.is_blank() {
            info!(slide = index, "slide has no narration, using silence");
            return self.silence(index, layout).await;
        }

        match self.synthesize(index, script, voice, layout).await {
            Ok(segment) => Ok(segment),
            Err(e) => {
                warn!(slide = index, error = %e, "narration degraded to silence");
                self.silence(index, layout).await
            }
        }
    }

    async fn synthesize(
        &self,
        index: usize,
        script: &SlideScript,
        voice: &VoiceParams,
        layout: &JobLayout,
    ) -> std::result::Result<AudioSegment, SynthesisError> {
        let request = SpeechRequest {
            text: script.text.clone(),
            language_code: voice.language_code.clone(),
            voice_name: voice.voice_name.clone(),
            speaking_rate: voice.speaking_rate,
        };

        let audio = tokio::time::timeout(self.deadline, self.synthesizer.synthesize(&request))
            .await
            .map_err(|_| SynthesisError::Timeout(self.deadline))??;

        if audio.is_empty() {
            return Err(SynthesisError::InvalidApiResponse(
                "provider returned no audio".to_string(),
            ));
        }

        let path = layout.audio_path(index, self.synthesizer.audio_extension());
        fs::write(&path, &audio).await?;

        let duration_secs = self
            .probe
            .duration_secs(&path)
            .await
            .map_err(|e| SynthesisError::ProbeFailed(e.to_string()))?;

        debug!(slide = index, duration_secs, "narration ready");
        Ok(AudioSegment {
            index,
            path,
            duration_secs,
            degraded: false,
        })
    }

    async fn silence(&self, index: usize, layout: &JobLayout) -> Result<AudioSegment> {
        let path = layout.silence_path(index);
        let duration_secs = write_silence(&path, self.silence_duration_secs).await?;
        Ok(AudioSegment {
            index,
            path,
            duration_secs,
            degraded: true,
        })
    }
}
