// Lenient SRT cue parsing driven by a three-state line machine.
use super::*;

static INDEX_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d+$").unwrap_or_else(|err| panic!("invalid INDEX_LINE regex: {err}"))
});

static TIME_RANGE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(\d{1,2}):(\d{1,2}):(\d{1,2}),(\d+)\s+-->\s+(\d{1,2}):(\d{1,2}):(\d{1,2}),(\d+)$",
    )
    .unwrap_or_else(|err| panic!("invalid TIME_RANGE_LINE regex: {err}"))
});

/// One timed caption entry, times in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct Cue {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParserState {
    /// Waiting for a bare decimal index; anything else is skipped.
    ExpectIndex,
    /// Waiting for `HH:MM:SS,f --> HH:MM:SS,f`; malformed lines are skipped.
    ExpectTimeRange,
    /// Collecting text until a blank line closes the cue.
    ExpectTextOrBlank,
}

/// Lazy cue iterator over a raw subtitle track. A trailing cue without its
/// closing blank line is never yielded.
pub struct CueParser<'a> {
    lines: std::str::Lines<'a>,
    state: ParserState,
    start: f64,
    end: f64,
    text_lines: Vec<&'a str>,
}

impl<'a> CueParser<'a> {
    pub fn new(track: &'a str) -> Self {
        Self {
            lines: track.lines(),
            state: ParserState::ExpectIndex,
            start: 0.0,
            end: 0.0,
            text_lines: Vec::new(),
        }
    }
}

impl Iterator for CueParser<'_> {
    type Item = Cue;

    fn next(&mut self) -> Option<Cue> {
        for line in self.lines.by_ref() {
            match self.state {
                ParserState::ExpectIndex => {
                    if INDEX_LINE.is_match(line) {
                        self.state = ParserState::ExpectTimeRange;
                    }
                }
                ParserState::ExpectTimeRange => {
                    if let Some((start, end)) = parse_time_range(line) {
                        self.start = start;
                        self.end = end;
                        self.state = ParserState::ExpectTextOrBlank;
                    }
                }
                ParserState::ExpectTextOrBlank => {
                    if line.is_empty() {
                        self.state = ParserState::ExpectIndex;
                        let text = self.text_lines.join("\n");
                        self.text_lines.clear();
                        return Some(Cue {
                            start: self.start,
                            end: self.end,
                            text,
                        });
                    }
                    self.text_lines.push(line);
                }
            }
        }
        None
    }
}

/// Parses a time-range line. Ranges that end before they start are treated
/// like any other malformed line.
pub(super) fn parse_time_range(line: &str) -> Option<(f64, f64)> {
    let captures = TIME_RANGE_LINE.captures(line)?;
    let field = |index: usize| captures.get(index).map(|value| value.as_str());
    let start = timestamp_seconds(field(1)?, field(2)?, field(3)?, field(4)?)?;
    let end = timestamp_seconds(field(5)?, field(6)?, field(7)?, field(8)?)?;
    (start <= end).then_some((start, end))
}

fn timestamp_seconds(hours: &str, minutes: &str, seconds: &str, fraction: &str) -> Option<f64> {
    let hours: f64 = hours.parse().ok()?;
    let minutes: f64 = minutes.parse().ok()?;
    let seconds: f64 = seconds.parse().ok()?;
    let fraction_value: f64 = fraction.parse().ok()?;
    let scale = 10_f64.powi(fraction.len() as i32);
    Some(hours * 3600.0 + minutes * 60.0 + seconds + fraction_value / scale)
}

/// Formats seconds as an SRT timestamp with millisecond precision.
pub fn format_srt_time(time: f64) -> String {
    let total_ms = (time * 1000.0).round().max(0.0) as u64;
    let (hours, rem) = (total_ms / 3_600_000, total_ms % 3_600_000);
    let (minutes, rem) = (rem / 60_000, rem % 60_000);
    let (seconds, millis) = (rem / 1000, rem % 1000);
    format!("{hours:02}:{minutes:02}:{seconds:02},{millis:03}")
}
