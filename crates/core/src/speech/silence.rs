use std::path::Path;

use crate::{
    error::{LectureVideoError, Result},
    probe::WavProbe,
};

const SAMPLE_RATE: u32 = 24_000;

/// Writes a mono 16-bit WAV of silence and returns its length as read back
/// from the file header.
pub async fn write_silence(path: &Path, duration_secs: f64) -> Result<f64> {
    if !(duration_secs.is_finite() && duration_secs > 0.0) {
        return Err(LectureVideoError::InvalidInput {
            reason: format!("silence duration must be positive, got {duration_secs}"),
        });
    }

    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || -> std::result::Result<f64, hound::Error> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let samples = (duration_secs * SAMPLE_RATE as f64).round().max(1.0) as u32;

        let mut writer = hound::WavWriter::create(&owned, spec)?;
        for _ in 0..samples {
            writer.write_sample(0i16)?;
        }
        writer.finalize()?;

        WavProbe::read_duration(&owned)
    })
    .await?
    .map_err(|e| LectureVideoError::IoError(std::io::Error::other(e.to_string())))
}
