// Command-line surface: argument parsing and the clip/search commands.
use clap::Parser;
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

use crate::backend::{search_gifs, CheckpointStore, DATABASE_FILE_NAME};
use crate::error::{ClipperError, Result};
use crate::pipeline::{process_source, SourceRequest, StreamOutcome, StreamSummary};
use crate::tooling::{
    canonicalize_existing_path, load_settings, normalize_settings, resolve_cutter_binary,
    resolve_ffmpeg_binary, resolve_ffprobe_binary, settings_file_path, ClipperSettings,
    CutterRenderer, FfmpegSubtitleSource,
};

#[derive(Parser, Debug)]
#[command(
    name = "caption-clipper",
    about = "Cut one short clip per subtitle group of a video, resuming interrupted runs"
)]
pub struct ClipArgs {
    /// Video file with embedded subtitle streams.
    pub source: PathBuf,
    /// Directory holding the checkpoint store, task files and produced clips.
    pub workdir: PathBuf,
    /// Minimum group duration in seconds.
    #[arg(long)]
    pub min_len: Option<f64>,
    /// Maximum group duration in seconds.
    #[arg(long)]
    pub max_len: Option<f64>,
    /// Renderer batches to try per subtitle stream.
    #[arg(long)]
    pub attempts: Option<u32>,
    /// Settings file, defaults to `clipper-settings.json` in the working directory.
    #[arg(long)]
    pub settings: Option<PathBuf>,
}

#[derive(Parser, Debug)]
#[command(name = "clip-search", about = "Fuzzy search produced clips by caption text")]
pub struct SearchArgs {
    /// Working directory containing the checkpoint store.
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,
    /// Maximum number of hits, 0 for all.
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
    /// Print hits as JSON.
    #[arg(long)]
    pub json: bool,
    pub query: String,
}

fn effective_settings(args: &ClipArgs, workdir: &Path) -> Result<ClipperSettings> {
    let path = args
        .settings
        .clone()
        .unwrap_or_else(|| settings_file_path(workdir));
    if args.settings.is_some() && !path.exists() {
        return Err(ClipperError::Settings(format!(
            "Settings file {} does not exist",
            path.display()
        )));
    }
    let mut settings = load_settings(&path)?;
    if let Some(min_len) = args.min_len {
        settings.min_group_seconds = min_len;
    }
    if let Some(max_len) = args.max_len {
        settings.max_group_seconds = max_len;
    }
    if let Some(attempts) = args.attempts {
        settings.max_attempts = attempts;
    }
    normalize_settings(settings)
}

fn log_summary(summary: &StreamSummary) {
    let stream = &summary.stream;
    match &summary.outcome {
        StreamOutcome::Completed { attempts } => info!(
            "Stream {} done: {} groups, {attempts} attempt(s)",
            stream.number, summary.group_count
        ),
        StreamOutcome::Exhausted { attempts } => warn!(
            "Stream {} incomplete after {attempts} attempt(s); run again to continue",
            stream.number
        ),
        StreamOutcome::Skipped { reason } => {
            warn!("Stream {} skipped: {reason}", stream.number)
        }
    }
}

pub fn clip_command(args: &ClipArgs) -> Result<()> {
    fs::create_dir_all(&args.workdir)?;
    let workdir = canonicalize_existing_path(&args.workdir)?;
    let source_path = canonicalize_existing_path(&args.source)?;
    let settings = effective_settings(args, &workdir)?;

    let subtitles = FfmpegSubtitleSource::new(
        resolve_ffmpeg_binary(&settings)?,
        resolve_ffprobe_binary(&settings)?,
    );
    let renderer = CutterRenderer::new(resolve_cutter_binary(&settings)?, settings.render.clone());
    let store = CheckpointStore::open(&workdir.join(DATABASE_FILE_NAME))?;

    let summaries = process_source(
        &store,
        &subtitles,
        &renderer,
        &SourceRequest {
            source_path: &source_path,
            workdir: &workdir,
            limits: settings.group_limits(),
            max_attempts: settings.max_attempts,
        },
    )?;
    if summaries.is_empty() {
        warn!("{} has no subtitle streams", source_path.display());
    }
    summaries.iter().for_each(log_summary);
    Ok(())
}

/// Caption text on one line, for tab-separated output.
fn flatten_text(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" / ")
}

pub fn search_command(args: &SearchArgs) -> Result<()> {
    let database_path = args.dir.join(DATABASE_FILE_NAME);
    if !database_path.exists() {
        return Err(ClipperError::Settings(format!(
            "No checkpoint store at {}",
            database_path.display()
        )));
    }
    let store = CheckpointStore::open_read_only(&database_path)?;
    let hits = search_gifs(&store, &args.query, args.limit)?;

    if args.json {
        let rendered = serde_json::to_string_pretty(&hits).map_err(|error| {
            ClipperError::Tool(format!("Failed to serialize search hits: {error}"))
        })?;
        println!("{rendered}");
        return Ok(());
    }
    for hit in &hits {
        println!(
            "{}\t{}\t{}",
            hit.gif.id,
            hit.gif.name,
            flatten_text(&hit.gif.text)
        );
    }
    Ok(())
}
