use log::{debug, info, warn};
use regex::Regex;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::LazyLock;

use crate::backend::{clip_file_name, CheckpointStore, ResumePoint};
use crate::error::{ClipperError, Result};
use crate::tooling::{sha256_of_file, ClipRenderer, RenderJob, SubtitleSource, SubtitleStream};

mod cues;
mod groups;
mod retry;
mod submit;

pub use cues::{format_srt_time, Cue, CueParser};
pub use groups::{
    build_groups, Group, GroupLimits, DEFAULT_MAX_GROUP_SECONDS, DEFAULT_MIN_GROUP_SECONDS,
};
pub use retry::{
    pending_groups, process_source, run_stream_with_retries, SourceRequest, StreamJob,
    StreamOutcome, StreamSummary, DEFAULT_MAX_ATTEMPTS,
};
pub use submit::{
    manifest_lines, parse_report_ids, reconcile_report, submit_batch, BatchReport, BatchRequest,
    MANIFEST_FILE_NAME, REPORT_FILE_NAME,
};
