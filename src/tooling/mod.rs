use log::{debug, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::ffi::OsStr;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use which::which;

use crate::error::{ClipperError, Result};
use crate::pipeline::{
    GroupLimits, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_GROUP_SECONDS, DEFAULT_MIN_GROUP_SECONDS,
};

mod media_io;
mod renderer;
mod runtime;

use runtime::*;

pub use media_io::{FfmpegSubtitleSource, SubtitleSource, SubtitleStream};
pub use renderer::{build_filter_spec, ClipRenderer, CutterRenderer, RenderJob};
pub use runtime::{
    canonicalize_existing_path, load_settings, normalize_settings, resolve_cutter_binary,
    resolve_ffmpeg_binary, resolve_ffprobe_binary, settings_file_path, sha256_of_file,
    ClipperSettings, RenderProfile, SETTINGS_FILE_NAME,
};
