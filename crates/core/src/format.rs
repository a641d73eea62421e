/// Format seconds as MM:SS timestamp
pub fn format_timestamp(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let mins = (seconds / 60.0) as u32;
    let secs = (seconds % 60.0) as u32;
    format!("{:02}:{:02}", mins, secs)
}

/// One line per slide with the time its quiz pause fires.
pub fn format_quiz_timestamps(timestamps: &[f64]) -> String {
    timestamps
        .iter()
        .enumerate()
        .map(|(i, &t)| format!("[{}] slide {} ends ({:.2}s)", format_timestamp(t), i + 1, t))
        .collect::<Vec<_>>()
        .join("\n")
}
