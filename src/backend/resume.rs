// Resume planning: where to continue inside an already reserved id range.
use super::*;

/// Computes the first unresolved id of `movie` and how many leading groups
/// it corresponds to.
///
/// Successes and failures both count as attempted: the cursor moves past the
/// highest of either, so an id is never resubmitted once the renderer has
/// seen it. A failed slot is abandoned, not retried in place.
pub fn plan_resume(
    movie: &MovieRecord,
    highest_gif_id: Option<i64>,
    highest_failed_id: Option<i64>,
) -> ResumePoint {
    let mut cursor = movie.start_id;
    if let Some(gif_id) = highest_gif_id.filter(|id| movie.contains(*id)) {
        cursor = cursor.max(gif_id + 1);
    }
    if let Some(failed_id) = highest_failed_id.filter(|id| movie.contains(*id)) {
        cursor = cursor.max(failed_id + 1);
    }
    ResumePoint {
        start_id: cursor,
        end_id: movie.end_id,
        offset: (cursor - movie.start_id) as usize,
    }
}
