// ffprobe subtitle stream enumeration and ffmpeg SRT extraction.
use super::*;

/// A subtitle stream of the source container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtitleStream {
    /// Container-level stream index, used to map the stream for extraction.
    pub index: u32,
    /// Position among the subtitle streams only. Keys checkpoint records and
    /// selects the stream in the renderer's subtitles filter.
    pub number: u32,
    pub codec_name: Option<String>,
    pub language: Option<String>,
}

/// Source of subtitle tracks for a media file.
pub trait SubtitleSource {
    fn streams(&self, source_path: &Path) -> Result<Vec<SubtitleStream>>;

    /// Raw SRT text of one stream.
    fn extract_track(&self, source_path: &Path, stream: &SubtitleStream) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    index: u32,
    codec_name: Option<String>,
    #[serde(default)]
    tags: ProbeTags,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeTags {
    language: Option<String>,
}

pub(super) fn parse_subtitle_streams(raw: &str) -> Result<Vec<SubtitleStream>> {
    let parsed: ProbeOutput = serde_json::from_str(raw)
        .map_err(|error| ClipperError::Tool(format!("Failed to parse FFprobe output: {error}")))?;
    Ok(parsed
        .streams
        .into_iter()
        .enumerate()
        .map(|(number, stream)| SubtitleStream {
            index: stream.index,
            number: number as u32,
            codec_name: stream.codec_name,
            language: stream.tags.language,
        })
        .collect())
}

/// Subtitle extraction through the ffprobe/ffmpeg command-line tools.
pub struct FfmpegSubtitleSource {
    ffmpeg_binary: PathBuf,
    ffprobe_binary: PathBuf,
}

impl FfmpegSubtitleSource {
    pub fn new(ffmpeg_binary: PathBuf, ffprobe_binary: PathBuf) -> Self {
        Self {
            ffmpeg_binary,
            ffprobe_binary,
        }
    }
}

impl SubtitleSource for FfmpegSubtitleSource {
    fn streams(&self, source_path: &Path) -> Result<Vec<SubtitleStream>> {
        let output = hidden_command(&self.ffprobe_binary)
            .arg("-loglevel")
            .arg("quiet")
            .arg("-select_streams")
            .arg("s")
            .arg("-show_streams")
            .arg("-of")
            .arg("json=c=1")
            .arg(source_path)
            .stdin(Stdio::null())
            .output()
            .map_err(|error| ClipperError::Tool(format!("Failed to start FFprobe: {error}")))?;
        if !output.status.success() {
            return Err(ClipperError::Tool(stderr_tail_message(
                "FFprobe",
                &output.stderr,
            )));
        }
        let streams = parse_subtitle_streams(&String::from_utf8_lossy(&output.stdout))?;
        debug!(
            "FFprobe found {} subtitle streams in {}",
            streams.len(),
            source_path.display()
        );
        Ok(streams)
    }

    fn extract_track(&self, source_path: &Path, stream: &SubtitleStream) -> Result<String> {
        let output = hidden_command(&self.ffmpeg_binary)
            .arg("-nostdin")
            .arg("-i")
            .arg(source_path)
            .arg("-map")
            .arg(format!("0:{}", stream.index))
            .arg("-f")
            .arg("srt")
            .arg("pipe:1")
            .stdin(Stdio::null())
            .output()
            .map_err(|error| {
                ClipperError::Tool(format!("Failed to start FFmpeg for subtitles: {error}"))
            })?;
        if !output.status.success() {
            return Err(ClipperError::Tool(stderr_tail_message(
                "FFmpeg",
                &output.stderr,
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}
