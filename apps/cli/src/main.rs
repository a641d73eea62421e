use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use lecturecast_core::{
    BlobStore, DeckFormat, FixedVoice, LecturePipeline, LectureRequest, LectureSpeed,
    LocalDirStore, OfficeConverter, PipelineConfig, SlideScript, VoiceGender,
    format_quiz_timestamps, workdir::sanitize_label,
};
use serde::Serialize;
use tokio::fs;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const OUTPUT_FOLDER: &str = "lectures";

fn format_duration(d: Duration) -> String {
    let total = d.as_secs_f64();
    if total < 60.0 {
        format!("{:.1}s", total)
    } else {
        // Round once so the seconds part never reaches 60.
        let secs = total.round() as u64;
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

/// CLI wrapper for VoiceGender (needed for clap ValueEnum)
#[derive(Clone, Default, ValueEnum)]
enum CliGender {
    Male,
    #[default]
    Female,
}

impl From<CliGender> for VoiceGender {
    fn from(cli: CliGender) -> Self {
        match cli {
            CliGender::Male => VoiceGender::Male,
            CliGender::Female => VoiceGender::Female,
        }
    }
}

#[derive(Clone, Default, ValueEnum)]
enum CliSpeed {
    Slow,
    #[default]
    Normal,
    Fast,
}

impl From<CliSpeed> for LectureSpeed {
    fn from(cli: CliSpeed) -> Self {
        match cli {
            CliSpeed::Slow => LectureSpeed::Slow,
            CliSpeed::Normal => LectureSpeed::Normal,
            CliSpeed::Fast => LectureSpeed::Fast,
        }
    }
}

#[derive(Parser)]
#[command(name = "lecturecast")]
#[command(about = "Turn a slide deck and per-slide scripts into a narrated lecture video")]
struct Cli {
    /// Slide deck (pdf, pptx, ppt, odp, docx, doc, odt)
    deck: PathBuf,

    /// JSON array of slide scripts: strings or {"text": ...} objects
    #[arg(short, long)]
    scripts: Option<PathBuf>,

    /// Narration language (BCP-47, e.g. "en-US", "uk-UA")
    #[arg(short, long, default_value = "en-US")]
    lang: String,

    /// Narrator voice gender
    #[arg(short, long, default_value = "female")]
    gender: CliGender,

    /// Narration speed
    #[arg(long, default_value = "normal")]
    speed: CliSpeed,

    /// Use this voice instead of looking one up
    #[arg(long)]
    voice: Option<String>,

    /// Output label; defaults to the deck file name
    #[arg(long)]
    label: Option<String>,

    /// Directory the video and timestamps are written under
    #[arg(short, long, default_value = ".")]
    out: PathBuf,

    /// Pipeline config as JSON; LECTURECAST_* variables still apply on top
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Serialize)]
struct TimestampsFile<'a> {
    label: &'a str,
    video_url: &'a str,
    quiz_timestamps: &'a [f64],
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "lecturecast=warn,lecturecast_core=warn".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let mut config = match path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .await
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => PipelineConfig::default(),
    };
    config.apply_overrides(|key| std::env::var(key).ok());
    Ok(config)
}

async fn load_scripts(path: Option<&Path>) -> Result<Vec<SlideScript>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("reading scripts {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing scripts {}", path.display()))
}

fn default_label(deck: &Path) -> String {
    deck.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "lecture".to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref()).await?;
    debug!(work_root = %config.work_root.display(), "config loaded");
    let format = DeckFormat::from_path(&cli.deck)
        .with_context(|| format!("unsupported deck type: {}", cli.deck.display()))?;
    let scripts = load_scripts(cli.scripts.as_deref()).await?;
    let label = cli.label.clone().unwrap_or_else(|| default_label(&cli.deck));

    let mut builder = LecturePipeline::builder(config.clone());
    if let Some(voice) = cli.voice.clone() {
        builder = builder.voices(Arc::new(FixedVoice(voice)));
    }
    let pipeline = match builder.build() {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            std::process::exit(1);
        }
    };

    println!(
        "\n{}  {}\n",
        style("lecturecast").cyan().bold(),
        style("Lecture Video Builder").dim()
    );
    println!("{}", style("─".repeat(60)).dim());

    let total_start = Instant::now();

    // Step 1: Load the deck, converting office formats to PDF
    let step_start = Instant::now();
    let deck = fs::read(&cli.deck)
        .await
        .with_context(|| format!("reading deck {}", cli.deck.display()))?;
    let pdf = if format.needs_conversion() {
        let spinner = create_spinner(&format!("Converting {format} to PDF..."));
        let pdf = OfficeConverter::new(&config).to_pdf(&deck, format).await?;
        spinner.finish_with_message(format!(
            "{} Converted {} {}",
            style("✓").green().bold(),
            style(format).yellow(),
            style(format!("[{}]", format_duration(step_start.elapsed()))).dim()
        ));
        pdf
    } else {
        println!("{} Loaded PDF", style("✓").green().bold());
        deck
    };

    // Step 2: Build the video
    let step_start = Instant::now();
    let spinner = create_spinner(&format!(
        "Narrating and rendering {} scripts ({})...",
        scripts.len(),
        cli.lang
    ));
    let request = LectureRequest {
        pdf,
        slides: scripts,
        output_label: label.clone(),
        language_code: cli.lang.clone(),
        voice_gender: cli.gender.into(),
        speed: cli.speed.into(),
    };
    let video = match pipeline.create_lecture_video(request).await {
        Ok(video) => video,
        Err(e) => {
            spinner.finish_and_clear();
            let kind = if e.is_input_error() {
                "Invalid input:"
            } else {
                "Error:"
            };
            eprintln!("{} {}", style(kind).red().bold(), e);
            std::process::exit(1);
        }
    };
    spinner.finish_with_message(format!(
        "{} Assembled {} slides {}",
        style("✓").green().bold(),
        video.quiz_timestamps.len(),
        style(format!("[{}]", format_duration(step_start.elapsed()))).dim()
    ));

    // Step 3: Store the video and its timestamps
    let store = LocalDirStore::new(cli.out.clone());
    let file_stem = sanitize_label(&label);
    let video_url = store
        .store(&format!("{file_stem}.mp4"), &video.video_bytes, OUTPUT_FOLDER)
        .await?;
    let timestamps = serde_json::to_vec_pretty(&TimestampsFile {
        label: &label,
        video_url: &video_url,
        quiz_timestamps: &video.quiz_timestamps,
    })?;
    let timestamps_url = store
        .store(&format!("{file_stem}.timestamps.json"), &timestamps, OUTPUT_FOLDER)
        .await?;

    println!(
        "\n{} {}\n",
        style("Total time:").dim(),
        style(format_duration(total_start.elapsed())).cyan().bold()
    );
    println!("{} {}", style("Video:").dim(), style(&video_url).cyan());
    println!(
        "{} {}\n",
        style("Timestamps:").dim(),
        style(&timestamps_url).cyan()
    );
    println!("{}", style("─".repeat(60)).dim());
    println!("{}", format_quiz_timestamps(&video.quiz_timestamps));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minutes_roll_over_instead_of_showing_sixty_seconds() {
        assert_eq!(format_duration(Duration::from_secs_f64(119.6)), "2m 0s");
        assert_eq!(format_duration(Duration::from_secs_f64(59.4)), "59.4s");
        assert_eq!(format_duration(Duration::from_secs(61)), "1m 1s");
        assert_eq!(format_duration(Duration::from_secs(12)), "12.0s");
        assert_eq!(format_duration(Duration::from_secs(3600)), "60m 0s");
    }
}
