// Error taxonomy shared by the store, the pipeline and the tooling wrappers.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClipperError>;

#[derive(Debug, Error)]
pub enum ClipperError {
    #[error("Checkpoint store error: {0}")]
    Store(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Clip id {0} already has a produced clip recorded.")]
    DuplicateId(i64),
    #[error("Clip id {0} is already resolved and cannot be marked as failed.")]
    AlreadyResolved(i64),
    #[error(
        "Reserved id range [{start_id}, {end_id}] cannot hold {requested} groups starting at id {cursor}."
    )]
    RangeExhausted {
        start_id: i64,
        end_id: i64,
        cursor: i64,
        requested: usize,
    },
    #[error("Renderer reported id {id}, expected an id within [{expected_min}, {expected_max}].")]
    ReportOutOfBounds {
        id: i64,
        expected_min: i64,
        expected_max: i64,
    },
    #[error("{0}")]
    Tool(String),
    #[error("{0}")]
    Settings(String),
}

impl ClipperError {
    /// True for errors that mean the checkpoint state no longer matches what
    /// the renderer did. These abort the run instead of being retried.
    pub fn is_consistency_violation(&self) -> bool {
        matches!(
            self,
            ClipperError::DuplicateId(_)
                | ClipperError::AlreadyResolved(_)
                | ClipperError::RangeExhausted { .. }
                | ClipperError::ReportOutOfBounds { .. }
        )
    }
}
