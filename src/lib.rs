mod backend;
mod commands;
mod error;
mod pipeline;
mod tooling;

use clap::Parser;
use std::process::ExitCode;

pub use backend::{
    clip_file_name, plan_resume, search_gifs, CheckpointStore, GifRecord, MovieRecord,
    ResumePoint, SearchHit, DATABASE_FILE_NAME,
};
pub use error::{ClipperError, Result};
pub use pipeline::{
    build_groups, format_srt_time, manifest_lines, parse_report_ids, pending_groups,
    process_source, reconcile_report, run_stream_with_retries, submit_batch, BatchReport,
    BatchRequest, Cue, CueParser, Group, GroupLimits, SourceRequest, StreamJob, StreamOutcome,
    StreamSummary, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_GROUP_SECONDS, DEFAULT_MIN_GROUP_SECONDS,
    MANIFEST_FILE_NAME, REPORT_FILE_NAME,
};
pub use tooling::{
    build_filter_spec, load_settings, sha256_of_file, ClipRenderer, ClipperSettings,
    CutterRenderer, FfmpegSubtitleSource, RenderJob, RenderProfile, SubtitleSource,
    SubtitleStream, SETTINGS_FILE_NAME,
};

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();
}

fn exit_code_for(result: Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if err.is_consistency_violation() => {
            log::error!("Checkpoint store is inconsistent, refusing to continue: {err}");
            ExitCode::from(3)
        }
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

pub fn run() -> ExitCode {
    init_logging();
    let args = commands::ClipArgs::parse();
    exit_code_for(commands::clip_command(&args))
}

pub fn run_search() -> ExitCode {
    init_logging();
    let args = commands::SearchArgs::parse();
    exit_code_for(commands::search_command(&args))
}
