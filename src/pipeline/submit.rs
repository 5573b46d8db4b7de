// Batch submission: task manifest, renderer run and report reconciliation.
use super::*;

pub const MANIFEST_FILE_NAME: &str = "task.txt";
pub const REPORT_FILE_NAME: &str = "report.txt";

static REPORT_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)").unwrap_or_else(|err| panic!("invalid REPORT_ID regex: {err}"))
});

/// Per-id resolution of one submitted batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub succeeded: Vec<i64>,
    pub failed: Vec<i64>,
    /// Every planned id was reported as produced.
    pub complete: bool,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.complete
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BatchRequest<'a> {
    pub source_path: &'a Path,
    pub stream_number: u32,
    pub workdir: &'a Path,
    pub start_id: i64,
    pub groups: &'a [Group],
}

/// One `<id> <clip-name> <start-ms> <end-ms>` line per group, ids assigned
/// sequentially from `start_id`.
pub fn manifest_lines(start_id: i64, groups: &[Group]) -> String {
    let mut manifest = String::new();
    for (offset, group) in groups.iter().enumerate() {
        let id = start_id + offset as i64;
        manifest.push_str(&format!(
            "{id} {} {} {}\n",
            clip_file_name(id),
            group.start_ms(),
            group.end_ms()
        ));
    }
    manifest
}

/// Leading decimal ids of the report lines. Lines without one are skipped.
/// An id too large to represent cannot belong to `start_id..=max_id`.
pub fn parse_report_ids(report: &str, start_id: i64, max_id: i64) -> Result<Vec<i64>> {
    let mut ids = Vec::new();
    for line in report.lines() {
        let Some(digits) = REPORT_ID.captures(line).and_then(|captures| captures.get(1)) else {
            if !line.trim().is_empty() {
                warn!("Skipping report line without a clip id: {line:?}");
            }
            continue;
        };
        let id = digits
            .as_str()
            .parse::<i64>()
            .map_err(|_| ClipperError::ReportOutOfBounds {
                id: i64::MAX,
                expected_min: start_id,
                expected_max: max_id,
            })?;
        ids.push(id);
    }
    Ok(ids)
}

/// Records every planned id as succeeded or failed from the renderer's
/// report. Ids skipped by the report fail; the first unreported id after the
/// last confirmed one fails too and marks the batch incomplete.
pub fn reconcile_report(
    store: &CheckpointStore,
    start_id: i64,
    groups: &[Group],
    reported_ids: &[i64],
) -> Result<BatchReport> {
    let max_id = start_id + groups.len() as i64 - 1;
    let mut report = BatchReport::default();
    let mut next_id = start_id;

    for &id in reported_ids {
        if id < next_id || id > max_id {
            return Err(ClipperError::ReportOutOfBounds {
                id,
                expected_min: next_id,
                expected_max: max_id,
            });
        }
        while next_id < id {
            store.record_failure(next_id)?;
            debug!("Clip {next_id} missing from report, recorded as failed");
            report.failed.push(next_id);
            next_id += 1;
        }
        let group = &groups[(id - start_id) as usize];
        store.record_success(
            id,
            &clip_file_name(id),
            &group.text,
            group.start_ms(),
            group.end_ms(),
        )?;
        debug!("Clip {id} produced");
        report.succeeded.push(id);
        next_id = id + 1;
    }

    if next_id <= max_id {
        store.record_failure(next_id)?;
        report.failed.push(next_id);
    } else {
        report.complete = true;
    }
    Ok(report)
}

/// Writes the manifest, runs the renderer and reconciles its report.
pub fn submit_batch(
    store: &CheckpointStore,
    renderer: &dyn ClipRenderer,
    request: &BatchRequest<'_>,
) -> Result<BatchReport> {
    if request.groups.is_empty() {
        return Ok(BatchReport {
            complete: true,
            ..BatchReport::default()
        });
    }

    let manifest_path = request.workdir.join(MANIFEST_FILE_NAME);
    let report_path = request.workdir.join(REPORT_FILE_NAME);
    fs::write(
        &manifest_path,
        manifest_lines(request.start_id, request.groups),
    )?;
    match fs::remove_file(&report_path) {
        Ok(()) => {}
        Err(error) if error.kind() == ErrorKind::NotFound => {}
        Err(error) => return Err(error.into()),
    }

    info!(
        "Submitting {} clips (ids {}..={}) from stream {}",
        request.groups.len(),
        request.start_id,
        request.start_id + request.groups.len() as i64 - 1,
        request.stream_number
    );
    renderer.render(&RenderJob {
        source_path: request.source_path,
        stream_number: request.stream_number,
        manifest_path: &manifest_path,
        report_path: &report_path,
        workdir: request.workdir,
    })?;

    let max_id = request.start_id + request.groups.len() as i64 - 1;
    let raw_report = match fs::read(&report_path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).to_string(),
        Err(error) if error.kind() == ErrorKind::NotFound => String::new(),
        Err(error) => return Err(error.into()),
    };
    let report = reconcile_report(
        store,
        request.start_id,
        request.groups,
        &parse_report_ids(&raw_report, request.start_id, max_id)?,
    )?;
    info!(
        "Batch finished: {} produced, {} failed",
        report.succeeded.len(),
        report.failed.len()
    );
    Ok(report)
}
