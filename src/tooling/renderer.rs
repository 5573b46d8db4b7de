// External clip renderer: filter spec construction and the `cutter` batch process.
use super::*;

/// Everything the renderer needs for one batch. Clip files named in the
/// manifest are written relative to `workdir`.
#[derive(Debug, Clone, Copy)]
pub struct RenderJob<'a> {
    pub source_path: &'a Path,
    pub stream_number: u32,
    pub manifest_path: &'a Path,
    pub report_path: &'a Path,
    pub workdir: &'a Path,
}

/// Renders every manifest line it can and appends one report line per
/// produced id. A renderer that dies half-way is not an error: the report
/// simply comes up short.
pub trait ClipRenderer {
    fn render(&self, job: &RenderJob<'_>) -> Result<()>;
}

pub(super) fn escape_ffmpeg_filter_path(path: &Path) -> String {
    let normalized = path.to_string_lossy().replace('\\', "/");
    let mut escaped = String::with_capacity(normalized.len() + 12);
    for ch in normalized.chars() {
        match ch {
            ':' => escaped.push_str("\\:"),
            '\'' => escaped.push_str("\\'"),
            ',' => escaped.push_str("\\,"),
            ';' => escaped.push_str("\\;"),
            '[' => escaped.push_str("\\["),
            ']' => escaped.push_str("\\]"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

pub fn build_filter_spec(source_path: &Path, stream_number: u32, profile: &RenderProfile) -> String {
    format!(
        "scale={width}x{height},subtitles='{source}':si={stream_number}:force_style='FontSize={font_size}',framerate=fps={fps},format=pix_fmts={pixel_format}",
        width = profile.width,
        height = profile.height,
        source = escape_ffmpeg_filter_path(source_path),
        font_size = profile.font_size,
        fps = profile.fps,
        pixel_format = profile.pixel_format,
    )
}

/// Runs the `cutter` binary: `cutter <source> <filter> <manifest> <report>`.
pub struct CutterRenderer {
    binary: PathBuf,
    profile: RenderProfile,
}

impl CutterRenderer {
    pub fn new(binary: PathBuf, profile: RenderProfile) -> Self {
        Self { binary, profile }
    }
}

impl ClipRenderer for CutterRenderer {
    fn render(&self, job: &RenderJob<'_>) -> Result<()> {
        let filter = build_filter_spec(job.source_path, job.stream_number, &self.profile);
        debug!("Cutter filter: {filter}");
        let status = hidden_command(&self.binary)
            .arg(job.source_path)
            .arg(&filter)
            .arg(job.manifest_path)
            .arg(job.report_path)
            .current_dir(job.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .status()
            .map_err(|error| ClipperError::Tool(format!("Failed to start cutter: {error}")))?;
        if !status.success() {
            warn!("Cutter exited with {status}; reconciling whatever it reported.");
        }
        Ok(())
    }
}
