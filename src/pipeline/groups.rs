// Sliding multi-window merge of cues into duration-bounded render groups.
use super::*;

pub const DEFAULT_MIN_GROUP_SECONDS: f64 = 2.0;
pub const DEFAULT_MAX_GROUP_SECONDS: f64 = 15.0;

/// One or more merged cues rendered as a single clip.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl Group {
    pub fn start_ms(&self) -> i64 {
        (self.start * 1000.0) as i64
    }

    pub fn end_ms(&self) -> i64 {
        (self.end * 1000.0) as i64
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupLimits {
    /// Closed groups shorter than this are stretched to it.
    pub min_len: f64,
    /// A group closes once an incoming cue would end further than this from its start.
    pub max_len: f64,
}

impl Default for GroupLimits {
    fn default() -> Self {
        Self {
            min_len: DEFAULT_MIN_GROUP_SECONDS,
            max_len: DEFAULT_MAX_GROUP_SECONDS,
        }
    }
}

/// Merges cues into groups in closing order.
///
/// Every cue extends each still-open window (keeping the unextended window
/// open too) and then opens its own window, so group count grows with
/// overlap depth. Windows still open when the cues run out are discarded:
/// trailing captions never produce a group.
pub fn build_groups<I>(cues: I, limits: GroupLimits) -> Vec<Group>
where
    I: IntoIterator<Item = Cue>,
{
    let mut closed: Vec<Group> = Vec::new();
    let mut open: Vec<Group> = Vec::new();

    for cue in cues {
        let mut still_open: Vec<Group> = Vec::with_capacity(open.len() * 2 + 1);
        for mut group in open.drain(..) {
            if cue.end - group.start > limits.max_len {
                if group.duration() < limits.min_len {
                    group.end = group.start + limits.min_len;
                }
                closed.push(group);
            } else {
                let extended = Group {
                    start: group.start,
                    end: cue.end,
                    text: format!("{}\n{}", group.text, cue.text),
                };
                still_open.push(group);
                still_open.push(extended);
            }
        }
        still_open.push(Group {
            start: cue.start,
            end: cue.end,
            text: cue.text,
        });
        open = still_open;
    }

    if !open.is_empty() {
        debug!("Discarding {} groups still open at end of track", open.len());
    }
    closed
}
