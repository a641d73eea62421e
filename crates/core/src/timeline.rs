use crate::error::{LectureVideoError, Result};

/// Cumulative end time of every slide: `t[i] = d[0] + .. + d[i]`.
///
/// These values tell the quiz player where to pause, so a duration that is
/// negative or not finite is rejected rather than clamped.
pub fn accumulate(durations: &[f64]) -> Result<Vec<f64>> {
    let mut elapsed = 0.0;
    durations
        .iter()
        .enumerate()
        .map(|(index, &value)| {
            if !value.is_finite() || value < 0.0 {
                return Err(LectureVideoError::InvalidDuration { index, value });
            }
            elapsed += value;
            Ok(elapsed)
        })
        .collect()
}
