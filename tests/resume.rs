use std::cell::{Cell, RefCell};
use std::fs;
use std::path::Path;

use caption_clipper_lib::{
    build_groups, process_source, CheckpointStore, ClipRenderer, ClipperError, CueParser,
    GroupLimits, RenderJob, Result, SourceRequest, StreamOutcome, SubtitleSource, SubtitleStream,
    DATABASE_FILE_NAME,
};

/// Seven short cues twenty seconds apart; each one closes the previous window.
fn track() -> String {
    let mut track = String::new();
    for index in 0..7 {
        let start = index * 20;
        track.push_str(&format!(
            "{}\n00:{:02}:{:02},000 --> 00:{:02}:{:02},500\nline {index}\n\n",
            index + 1,
            start / 60,
            start % 60,
            start / 60,
            start % 60 + 1,
        ));
    }
    track
}

struct FakeSubtitles {
    track: String,
    broken_stream: bool,
}

impl SubtitleSource for FakeSubtitles {
    fn streams(&self, _source_path: &Path) -> Result<Vec<SubtitleStream>> {
        let mut streams = vec![SubtitleStream {
            index: 2,
            number: 0,
            codec_name: Some("subrip".into()),
            language: Some("eng".into()),
        }];
        if self.broken_stream {
            streams.push(SubtitleStream {
                index: 3,
                number: 1,
                codec_name: Some("hdmv_pgs_subtitle".into()),
                language: None,
            });
        }
        Ok(streams)
    }

    fn extract_track(&self, _source_path: &Path, stream: &SubtitleStream) -> Result<String> {
        if stream.number == 0 {
            Ok(self.track.clone())
        } else {
            Err(ClipperError::Tool("bitmap subtitles cannot be converted".into()))
        }
    }
}

/// Reports manifest lines in order, stopping after `crash_after` clips.
struct FlakyRenderer {
    crash_after: Option<usize>,
    calls: Cell<u32>,
    first_ids: RefCell<Vec<i64>>,
}

impl FlakyRenderer {
    fn new(crash_after: Option<usize>) -> Self {
        Self {
            crash_after,
            calls: Cell::new(0),
            first_ids: RefCell::new(Vec::new()),
        }
    }
}

impl ClipRenderer for FlakyRenderer {
    fn render(&self, job: &RenderJob<'_>) -> Result<()> {
        self.calls.set(self.calls.get() + 1);
        let manifest = fs::read_to_string(job.manifest_path)?;
        let lines: Vec<&str> = manifest.lines().collect();
        let first_id = lines[0].split(' ').next().unwrap().parse().unwrap();
        self.first_ids.borrow_mut().push(first_id);

        let produced = self.crash_after.unwrap_or(lines.len()).min(lines.len());
        let mut report = String::new();
        for line in &lines[..produced] {
            let name = line.split(' ').nth(1).unwrap();
            fs::write(job.workdir.join(name), b"GIF89a")?;
            report.push_str(line);
            report.push('\n');
        }
        fs::write(job.report_path, report)?;
        Ok(())
    }
}

#[test]
fn interrupted_run_resumes_after_last_resolved_id() {
    let workdir = tempfile::tempdir().unwrap();
    let source_path = workdir.path().join("movie.mkv");
    fs::write(&source_path, b"not really a movie").unwrap();
    let database_path = workdir.path().join(DATABASE_FILE_NAME);

    let subtitles = FakeSubtitles {
        track: track(),
        broken_stream: true,
    };
    let expected_groups = build_groups(CueParser::new(&subtitles.track), GroupLimits::default());
    assert_eq!(expected_groups.len(), 6);

    // Run 1: the renderer dies after three clips and no retries are allowed.
    {
        let store = CheckpointStore::open(&database_path).unwrap();
        let renderer = FlakyRenderer::new(Some(3));
        let request = SourceRequest {
            source_path: &source_path,
            workdir: workdir.path(),
            limits: GroupLimits::default(),
            max_attempts: 1,
        };
        let summaries = process_source(&store, &subtitles, &renderer, &request).unwrap();

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].group_count, 6);
        assert_eq!(summaries[0].outcome, StreamOutcome::Exhausted { attempts: 1 });
        assert!(matches!(
            summaries[1].outcome,
            StreamOutcome::Skipped { .. }
        ));
        assert_eq!(store.failed_ids_in_range(0, 5).unwrap(), vec![3]);
    }

    // Run 2: a fresh process picks up right after the failed id.
    {
        let store = CheckpointStore::open(&database_path).unwrap();
        let renderer = FlakyRenderer::new(None);
        let request = SourceRequest {
            source_path: &source_path,
            workdir: workdir.path(),
            limits: GroupLimits::default(),
            max_attempts: 5,
        };
        let summaries = process_source(&store, &subtitles, &renderer, &request).unwrap();

        assert_eq!(summaries[0].outcome, StreamOutcome::Completed { attempts: 1 });
        assert_eq!(*renderer.first_ids.borrow(), vec![4]);

        let produced: Vec<i64> = store
            .gifs_in_range(0, 5)
            .unwrap()
            .iter()
            .map(|gif| gif.id)
            .collect();
        assert_eq!(produced, vec![0, 1, 2, 4, 5]);
        let gif = store.gif(4).unwrap().unwrap();
        assert_eq!(gif.name, "00000004.gif");
        assert_eq!(gif.text, expected_groups[4].text);
        assert_eq!(gif.start_ms, expected_groups[4].start_ms());
        assert!(workdir.path().join("00000005.gif").exists());
    }

    // Run 3: nothing left to do, the renderer is never started.
    {
        let store = CheckpointStore::open(&database_path).unwrap();
        let renderer = FlakyRenderer::new(None);
        let request = SourceRequest {
            source_path: &source_path,
            workdir: workdir.path(),
            limits: GroupLimits::default(),
            max_attempts: 5,
        };
        let summaries = process_source(&store, &subtitles, &renderer, &request).unwrap();
        assert_eq!(summaries[0].outcome, StreamOutcome::Completed { attempts: 1 });
        assert_eq!(renderer.calls.get(), 0);
        assert_eq!(store.all_gifs().unwrap().len(), 5);
    }
}

#[test]
fn different_sources_get_disjoint_ranges() {
    let workdir = tempfile::tempdir().unwrap();
    let first = workdir.path().join("first.mkv");
    let second = workdir.path().join("second.mkv");
    fs::write(&first, b"first").unwrap();
    fs::write(&second, b"second").unwrap();

    let store = CheckpointStore::open(&workdir.path().join(DATABASE_FILE_NAME)).unwrap();
    let subtitles = FakeSubtitles {
        track: track(),
        broken_stream: false,
    };
    let renderer = FlakyRenderer::new(None);
    for source_path in [&first, &second] {
        let request = SourceRequest {
            source_path,
            workdir: workdir.path(),
            limits: GroupLimits::default(),
            max_attempts: 2,
        };
        let summaries = process_source(&store, &subtitles, &renderer, &request).unwrap();
        assert_eq!(summaries[0].outcome, StreamOutcome::Completed { attempts: 1 });
    }

    assert_eq!(*renderer.first_ids.borrow(), vec![0, 6]);
    let ids: Vec<i64> = store.all_gifs().unwrap().iter().map(|gif| gif.id).collect();
    assert_eq!(ids, (0..12).collect::<Vec<i64>>());
}
