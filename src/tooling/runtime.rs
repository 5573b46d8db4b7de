// Clipper settings, external binary resolution, hashing and common process primitives.
use super::*;

pub const SETTINGS_FILE_NAME: &str = "clipper-settings.json";
pub(super) const MAX_ATTEMPTS_LIMIT: u32 = 50;
#[cfg(target_os = "windows")]
pub(super) const CREATE_NO_WINDOW: u32 = 0x0800_0000;

pub(super) fn hidden_command(program: impl AsRef<OsStr>) -> Command {
    let mut command = Command::new(program);
    #[cfg(target_os = "windows")]
    {
        use std::os::windows::process::CommandExt;
        command.creation_flags(CREATE_NO_WINDOW);
    }
    command
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderProfile {
    pub width: u32,
    pub height: u32,
    pub font_size: u32,
    pub fps: u32,
    pub pixel_format: String,
}

impl Default for RenderProfile {
    fn default() -> Self {
        Self {
            width: 348,
            height: 216,
            font_size: 32,
            fps: 25,
            pixel_format: "rgb8".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipperSettings {
    #[serde(default)]
    pub ffmpeg_custom_path: Option<String>,
    #[serde(default)]
    pub ffprobe_custom_path: Option<String>,
    #[serde(default)]
    pub cutter_custom_path: Option<String>,
    #[serde(default = "default_min_group_seconds")]
    pub min_group_seconds: f64,
    #[serde(default = "default_max_group_seconds")]
    pub max_group_seconds: f64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default)]
    pub render: RenderProfile,
}

fn default_min_group_seconds() -> f64 {
    DEFAULT_MIN_GROUP_SECONDS
}

fn default_max_group_seconds() -> f64 {
    DEFAULT_MAX_GROUP_SECONDS
}

impl Default for ClipperSettings {
    fn default() -> Self {
        Self {
            ffmpeg_custom_path: None,
            ffprobe_custom_path: None,
            cutter_custom_path: None,
            min_group_seconds: DEFAULT_MIN_GROUP_SECONDS,
            max_group_seconds: DEFAULT_MAX_GROUP_SECONDS,
            max_attempts: default_max_attempts(),
            render: RenderProfile::default(),
        }
    }
}

impl ClipperSettings {
    pub fn group_limits(&self) -> GroupLimits {
        GroupLimits {
            min_len: self.min_group_seconds,
            max_len: self.max_group_seconds,
        }
    }
}

pub fn settings_file_path(workdir: &Path) -> PathBuf {
    workdir.join(SETTINGS_FILE_NAME)
}

pub(super) fn sanitize_optional_path(value: Option<String>) -> Result<Option<String>> {
    match value {
        None => Ok(None),
        Some(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            if trimmed.len() > 512 {
                return Err(ClipperError::Settings("Path is too long.".to_string()));
            }
            if trimmed.chars().any(|ch| ch.is_control()) {
                return Err(ClipperError::Settings(
                    "Path contains invalid control characters.".to_string(),
                ));
            }
            Ok(Some(trimmed.to_string()))
        }
    }
}

pub fn normalize_settings(mut settings: ClipperSettings) -> Result<ClipperSettings> {
    settings.ffmpeg_custom_path = sanitize_optional_path(settings.ffmpeg_custom_path)?;
    settings.ffprobe_custom_path = sanitize_optional_path(settings.ffprobe_custom_path)?;
    settings.cutter_custom_path = sanitize_optional_path(settings.cutter_custom_path)?;

    let limits_valid = settings.min_group_seconds.is_finite()
        && settings.max_group_seconds.is_finite()
        && settings.min_group_seconds >= 0.0
        && settings.max_group_seconds > 0.0
        && settings.min_group_seconds <= settings.max_group_seconds;
    if !limits_valid {
        warn!(
            "Ignoring invalid group limits {}..{}, using defaults.",
            settings.min_group_seconds, settings.max_group_seconds
        );
        settings.min_group_seconds = DEFAULT_MIN_GROUP_SECONDS;
        settings.max_group_seconds = DEFAULT_MAX_GROUP_SECONDS;
    }
    settings.max_attempts = settings.max_attempts.clamp(1, MAX_ATTEMPTS_LIMIT);

    let defaults = RenderProfile::default();
    let render = &mut settings.render;
    if render.width == 0 || render.height == 0 {
        render.width = defaults.width;
        render.height = defaults.height;
    }
    if render.font_size == 0 {
        render.font_size = defaults.font_size;
    }
    if render.fps == 0 {
        render.fps = defaults.fps;
    }
    render.pixel_format = render.pixel_format.trim().to_lowercase();
    let pixel_format_valid = !render.pixel_format.is_empty()
        && render
            .pixel_format
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
    if !pixel_format_valid {
        render.pixel_format = defaults.pixel_format;
    }
    Ok(settings)
}

/// Loads settings from `path`; a missing file means defaults.
pub fn load_settings(path: &Path) -> Result<ClipperSettings> {
    if !path.exists() {
        return Ok(ClipperSettings::default());
    }

    let raw = fs::read_to_string(path).map_err(|error| {
        ClipperError::Settings(format!("Failed to read settings {}: {error}", path.display()))
    })?;
    let parsed: ClipperSettings = serde_json::from_str(&raw).map_err(|error| {
        ClipperError::Settings(format!("Failed to parse settings {}: {error}", path.display()))
    })?;
    normalize_settings(parsed)
}

pub fn sha256_of_file(path: &Path) -> Result<String> {
    let mut file = fs::File::open(path).map_err(|error| {
        ClipperError::Tool(format!("Failed to open file for checksum: {error}"))
    })?;
    let mut hasher = Sha256::new();
    let mut buffer = [0_u8; 64 * 1024];
    loop {
        let read = file.read(&mut buffer).map_err(|error| {
            ClipperError::Tool(format!("Failed to read file for checksum: {error}"))
        })?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

pub fn canonicalize_existing_path(path: &Path) -> Result<PathBuf> {
    fs::canonicalize(path).map_err(|error| {
        ClipperError::Tool(format!("Failed to resolve path {}: {error}", path.display()))
    })
}

pub(super) fn ensure_custom_binary(path: &str) -> Option<PathBuf> {
    let parsed = PathBuf::from(path);
    if !parsed.exists() {
        return None;
    }
    let canonical = canonicalize_existing_path(&parsed).ok()?;
    if canonical.is_file() {
        Some(canonical)
    } else {
        None
    }
}

/// Resolves a binary from its configured path first, then from `PATH`.
/// Returns the path together with where it came from.
pub(super) fn resolve_binary(custom_path: Option<&str>, name: &str) -> Option<(PathBuf, String)> {
    if let Some(custom) = custom_path.and_then(ensure_custom_binary) {
        return Some((custom, "custom".to_string()));
    }
    if custom_path.is_some() {
        warn!("Configured {name} path is not a file, falling back to PATH lookup.");
    }

    which(name)
        .ok()
        .map(|system| (system, "system".to_string()))
}

fn require_binary(custom_path: Option<&str>, name: &str, label: &str) -> Result<PathBuf> {
    let (path, source) = resolve_binary(custom_path, name).ok_or_else(|| {
        ClipperError::Tool(format!(
            "{label} was not found. Install it or set its path in {SETTINGS_FILE_NAME}."
        ))
    })?;
    debug!("Using {source} {label} at {}", path.display());
    Ok(path)
}

pub fn resolve_ffmpeg_binary(settings: &ClipperSettings) -> Result<PathBuf> {
    require_binary(settings.ffmpeg_custom_path.as_deref(), "ffmpeg", "FFmpeg")
}

pub fn resolve_ffprobe_binary(settings: &ClipperSettings) -> Result<PathBuf> {
    require_binary(settings.ffprobe_custom_path.as_deref(), "ffprobe", "FFprobe")
}

pub fn resolve_cutter_binary(settings: &ClipperSettings) -> Result<PathBuf> {
    require_binary(settings.cutter_custom_path.as_deref(), "cutter", "Cutter")
}

/// Joins the last few non-empty stderr lines of a failed tool into one message.
pub(super) fn stderr_tail_message(tool: &str, stderr: &[u8]) -> String {
    let stderr = String::from_utf8_lossy(stderr);
    let tail: Vec<&str> = stderr
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .rev()
        .take(4)
        .collect();
    if tail.is_empty() {
        format!("{tool} exited with an error.")
    } else {
        let mut ordered = tail;
        ordered.reverse();
        format!("{tool}: {}", ordered.join(" | "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_settings_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings(&settings_file_path(dir.path())).unwrap();
        assert_eq!(settings, ClipperSettings::default());
        assert_eq!(settings.group_limits(), GroupLimits::default());
    }

    #[test]
    fn partial_settings_are_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let path = settings_file_path(dir.path());
        fs::write(
            &path,
            r#"{
                "ffmpegCustomPath": "   ",
                "minGroupSeconds": 20,
                "maxGroupSeconds": 10,
                "maxAttempts": 0,
                "render": { "fontSize": 48, "pixelFormat": "RGB24" }
            }"#,
        )
        .unwrap();

        let settings = load_settings(&path).unwrap();
        assert_eq!(settings.ffmpeg_custom_path, None);
        assert_eq!(settings.group_limits(), GroupLimits::default());
        assert_eq!(settings.max_attempts, 1);
        assert_eq!(settings.render.font_size, 48);
        assert_eq!(settings.render.pixel_format, "rgb24");
        assert_eq!(settings.render.width, 348);
    }

    #[test]
    fn unparseable_settings_are_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = settings_file_path(dir.path());
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            load_settings(&path).unwrap_err(),
            ClipperError::Settings(_)
        ));
    }

    #[test]
    fn sha256_matches_known_digest() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"abc").unwrap();
        assert_eq!(
            sha256_of_file(file.path()).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn custom_binary_must_exist() {
        assert_eq!(ensure_custom_binary("/definitely/not/here/cutter"), None);
        let file = tempfile::NamedTempFile::new().unwrap();
        let resolved = ensure_custom_binary(file.path().to_str().unwrap());
        assert!(resolved.is_some());
    }

    #[test]
    fn stderr_tail_keeps_last_lines_in_order() {
        let message = stderr_tail_message("FFmpeg", b"one\n\ntwo\nthree\nfour\nfive\n");
        assert_eq!(message, "FFmpeg: two | three | four | five");
        assert_eq!(stderr_tail_message("FFmpeg", b"  \n"), "FFmpeg exited with an error.");
    }
}
