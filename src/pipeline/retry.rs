// Per-stream retry loop and the whole-source driver.
use super::*;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, Copy)]
pub struct StreamJob<'a> {
    pub source_path: &'a Path,
    pub source_hash: &'a str,
    pub workdir: &'a Path,
    pub stream: &'a SubtitleStream,
    /// Full group list of the stream, built once before retrying.
    pub groups: &'a [Group],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    Completed { attempts: u32 },
    Exhausted { attempts: u32 },
    Skipped { reason: String },
}

#[derive(Debug, Clone)]
pub struct StreamSummary {
    pub stream: SubtitleStream,
    pub group_count: usize,
    pub outcome: StreamOutcome,
}

#[derive(Debug, Clone, Copy)]
pub struct SourceRequest<'a> {
    pub source_path: &'a Path,
    pub workdir: &'a Path,
    pub limits: GroupLimits,
    pub max_attempts: u32,
}

/// Groups still to submit after `point`, checked against the ids left in
/// the reserved range.
pub fn pending_groups<'g>(point: &ResumePoint, groups: &'g [Group]) -> Result<&'g [Group]> {
    let pending = groups.get(point.offset..).unwrap_or(&[]);
    if pending.len() > point.remaining_ids() {
        return Err(ClipperError::RangeExhausted {
            start_id: point.start_id - point.offset as i64,
            end_id: point.end_id,
            cursor: point.start_id,
            requested: pending.len(),
        });
    }
    Ok(pending)
}

/// Re-queries resume state and resubmits until a batch comes back complete
/// or `max_attempts` batches have been tried.
pub fn run_stream_with_retries(
    store: &CheckpointStore,
    renderer: &dyn ClipRenderer,
    job: &StreamJob<'_>,
    max_attempts: u32,
) -> Result<StreamOutcome> {
    for attempt in 1..=max_attempts {
        let point = store.reserve_range(
            job.source_hash,
            i64::from(job.stream.number),
            job.groups.len(),
        )?;
        let pending = pending_groups(&point, job.groups)?;
        if let Some(first) = pending.first() {
            info!(
                "Stream {} attempt {attempt}/{max_attempts}: {} groups pending from {}",
                job.stream.number,
                pending.len(),
                format_srt_time(first.start)
            );
        }

        let report = submit_batch(
            store,
            renderer,
            &BatchRequest {
                source_path: job.source_path,
                stream_number: job.stream.number,
                workdir: job.workdir,
                start_id: point.start_id,
                groups: pending,
            },
        )?;
        if report.is_success() {
            return Ok(StreamOutcome::Completed { attempts: attempt });
        }
        warn!(
            "Stream {} attempt {attempt}/{max_attempts} left {} ids unresolved",
            job.stream.number,
            report.failed.len()
        );
    }

    warn!(
        "Giving up on stream {} after {max_attempts} attempts",
        job.stream.number
    );
    Ok(StreamOutcome::Exhausted {
        attempts: max_attempts,
    })
}

/// Runs every subtitle stream of the source through grouping and retried
/// submission. Streams whose track cannot be extracted are skipped;
/// consistency violations and store failures abort the run.
pub fn process_source(
    store: &CheckpointStore,
    subtitles: &dyn SubtitleSource,
    renderer: &dyn ClipRenderer,
    request: &SourceRequest<'_>,
) -> Result<Vec<StreamSummary>> {
    let source_hash = sha256_of_file(request.source_path)?;
    let streams = subtitles.streams(request.source_path)?;
    info!(
        "Processing {} ({} subtitle streams, hash {source_hash})",
        request.source_path.display(),
        streams.len()
    );

    let mut summaries = Vec::with_capacity(streams.len());
    for stream in streams {
        let track = match subtitles.extract_track(request.source_path, &stream) {
            Ok(track) => track,
            Err(error) => {
                warn!(
                    "Skipping subtitle stream {} (index {}): {error}",
                    stream.number, stream.index
                );
                summaries.push(StreamSummary {
                    stream,
                    group_count: 0,
                    outcome: StreamOutcome::Skipped {
                        reason: error.to_string(),
                    },
                });
                continue;
            }
        };

        let groups = build_groups(CueParser::new(&track), request.limits);
        info!(
            "Stream {} (index {}, {}): {} groups",
            stream.number,
            stream.index,
            stream.language.as_deref().unwrap_or("und"),
            groups.len()
        );
        let outcome = run_stream_with_retries(
            store,
            renderer,
            &StreamJob {
                source_path: request.source_path,
                source_hash: &source_hash,
                workdir: request.workdir,
                stream: &stream,
                groups: &groups,
            },
            request.max_attempts,
        )?;
        summaries.push(StreamSummary {
            stream,
            group_count: groups.len(),
            outcome,
        });
    }
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn groups(count: usize) -> Vec<Group> {
        (0..count)
            .map(|index| Group {
                start: index as f64,
                end: index as f64 + 2.0,
                text: format!("g{index}"),
            })
            .collect()
    }

    fn stream() -> SubtitleStream {
        SubtitleStream {
            index: 3,
            number: 0,
            codec_name: Some("subrip".into()),
            language: None,
        }
    }

    /// Produces at most `per_run` clips per invocation, in manifest order.
    struct ThrottledRenderer {
        per_run: usize,
        runs: Cell<u32>,
    }

    impl ClipRenderer for ThrottledRenderer {
        fn render(&self, job: &RenderJob<'_>) -> Result<()> {
            self.runs.set(self.runs.get() + 1);
            let manifest = fs::read_to_string(job.manifest_path)?;
            let produced: Vec<&str> = manifest.lines().take(self.per_run).collect();
            fs::write(job.report_path, produced.join("\n"))?;
            Ok(())
        }
    }

    #[test]
    fn pending_groups_skip_resolved_prefix() {
        let all = groups(5);
        let point = ResumePoint {
            start_id: 13,
            end_id: 14,
            offset: 3,
        };
        let pending = pending_groups(&point, &all).unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].text, "g3");
    }

    #[test]
    fn pending_groups_reject_overflowing_range() {
        let all = groups(6);
        let point = ResumePoint {
            start_id: 13,
            end_id: 14,
            offset: 3,
        };
        let error = pending_groups(&point, &all).unwrap_err();
        assert!(matches!(
            error,
            ClipperError::RangeExhausted {
                start_id: 10,
                end_id: 14,
                cursor: 13,
                requested: 3,
            }
        ));
    }

    #[test]
    fn offset_past_group_list_means_nothing_pending() {
        let all = groups(2);
        let point = ResumePoint {
            start_id: 15,
            end_id: 14,
            offset: 5,
        };
        assert!(pending_groups(&point, &all).unwrap().is_empty());
    }

    #[test]
    fn retries_until_batch_completes() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::open_in_memory().unwrap();
        let all = groups(4);
        let stream = stream();
        let renderer = ThrottledRenderer {
            per_run: 2,
            runs: Cell::new(0),
        };
        let job = StreamJob {
            source_path: Path::new("movie.mkv"),
            source_hash: "cafe",
            workdir: dir.path(),
            stream: &stream,
            groups: &all,
        };

        let outcome = run_stream_with_retries(&store, &renderer, &job, 5).unwrap();
        // Run 1 produces ids 0 and 1 and fails id 2; run 2 resumes at id 3.
        assert_eq!(outcome, StreamOutcome::Completed { attempts: 2 });
        assert_eq!(renderer.runs.get(), 2);
        let produced: Vec<i64> = store
            .gifs_in_range(0, 3)
            .unwrap()
            .iter()
            .map(|gif| gif.id)
            .collect();
        assert_eq!(produced, vec![0, 1, 3]);
        assert_eq!(store.failed_ids_in_range(0, 3).unwrap(), vec![2]);
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::open_in_memory().unwrap();
        let all = groups(10);
        let stream = stream();
        let renderer = ThrottledRenderer {
            per_run: 0,
            runs: Cell::new(0),
        };
        let job = StreamJob {
            source_path: Path::new("movie.mkv"),
            source_hash: "cafe",
            workdir: dir.path(),
            stream: &stream,
            groups: &all,
        };

        let outcome = run_stream_with_retries(&store, &renderer, &job, 3).unwrap();
        assert_eq!(outcome, StreamOutcome::Exhausted { attempts: 3 });
        assert_eq!(renderer.runs.get(), 3);
        assert_eq!(store.failed_ids_in_range(0, 9).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn empty_stream_completes_without_rendering() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::open_in_memory().unwrap();
        let stream = stream();
        let renderer = ThrottledRenderer {
            per_run: 1,
            runs: Cell::new(0),
        };
        let job = StreamJob {
            source_path: Path::new("movie.mkv"),
            source_hash: "cafe",
            workdir: dir.path(),
            stream: &stream,
            groups: &[],
        };
        let outcome = run_stream_with_retries(&store, &renderer, &job, 5).unwrap();
        assert_eq!(outcome, StreamOutcome::Completed { attempts: 1 });
        assert_eq!(renderer.runs.get(), 0);
    }
}
