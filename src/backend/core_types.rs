// Checkpoint records and constants shared by the store, resume planner and search.
use super::*;

pub const DATABASE_FILE_NAME: &str = "gifs.sqlite3";
pub(super) const CLIP_NAME_DIGITS: usize = 8;
pub(super) const CLIP_EXTENSION: &str = "gif";

/// Reservation of a contiguous id range for every group planned for one
/// (source hash, subtitle stream) pair. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieRecord {
    pub id: i64,
    pub hash: String,
    pub stream_index: i64,
    pub start_id: i64,
    pub end_id: i64,
}

impl MovieRecord {
    pub fn contains(&self, id: i64) -> bool {
        id >= self.start_id && id <= self.end_id
    }

    pub fn len(&self) -> usize {
        (self.end_id - self.start_id + 1).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A successfully rendered clip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GifRecord {
    pub id: i64,
    pub name: String,
    pub text: String,
    pub start_ms: i64,
    pub end_ms: i64,
    pub tg_file_id: Option<String>,
}

/// Where a (re)run of one stream should continue inside its reserved range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumePoint {
    /// First id not yet resolved by any earlier attempt.
    pub start_id: i64,
    /// Last id of the reserved range.
    pub end_id: i64,
    /// Number of leading groups that must be skipped.
    pub offset: usize,
}

impl ResumePoint {
    pub fn remaining_ids(&self) -> usize {
        (self.end_id - self.start_id + 1).max(0) as usize
    }
}

pub fn clip_file_name(id: i64) -> String {
    format!("{id:0width$}.{CLIP_EXTENSION}", width = CLIP_NAME_DIGITS)
}
