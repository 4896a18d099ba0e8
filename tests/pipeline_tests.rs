use mediashrink::codec::{EncodePlan, Encoder};
use mediashrink::engine::progress::{DirectoryProgress, GlobalProgress, ProgressTracker, Tally};
use mediashrink::engine::{StatsAccumulator, WorkerPool, process_file};
use mediashrink::pipeline::{
    DriverState, PipelineContext, PipelineDriver, collect_all, collect_one_level,
};
use mediashrink::{
    ConvertError, FileTask, Opts, ProgressMode, RunOutcome, RunSummary, TaskResult, TaskStatus,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

// --- fake encoders ---

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    /// Output is a byte-for-byte copy.
    Copy,
    /// Output is the first half of the source.
    Truncate,
    /// Writes half a file, then exits non-zero.
    Fail,
    /// Writes half a file, then panics.
    Panic,
    /// Reports success without writing anything.
    NoOutput,
    /// Another writer publishes the final output while we encode.
    Race,
}

struct FakeEncoder {
    mode: Mode,
    /// When set, only files whose name contains this marker use `mode`; the rest are copied.
    only_for: Option<&'static str>,
    copy_plan: bool,
    max_workers: Option<usize>,
    available: bool,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeEncoder {
    fn new(mode: Mode) -> Self {
        Self {
            mode,
            only_for: None,
            copy_plan: false,
            max_workers: None,
            available: true,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    fn only_for(mut self, marker: &'static str) -> Self {
        self.only_for = Some(marker);
        self
    }

    fn sequential(mut self) -> Self {
        self.max_workers = Some(1);
        self
    }

    fn missing(mut self) -> Self {
        self.available = false;
        self
    }

    fn copy_plan(mut self) -> Self {
        self.copy_plan = true;
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn mode_for(&self, input: &Path) -> Mode {
        match self.only_for {
            Some(marker)
                if !input
                    .file_name()
                    .is_some_and(|n| n.to_string_lossy().contains(marker)) =>
            {
                Mode::Copy
            }
            _ => self.mode,
        }
    }

    fn write(&self, input: &Path, temp: &Path) -> Result<(), ConvertError> {
        let data = fs::read(input)?;
        match self.mode_for(input) {
            Mode::Copy => fs::write(temp, &data)?,
            Mode::Truncate => fs::write(temp, &data[..data.len() / 2])?,
            Mode::Fail => {
                fs::write(temp, &data[..data.len() / 2])?;
                return Err(ConvertError::ToolFailed {
                    code: Some(1),
                    stderr: "boom".to_string(),
                });
            }
            Mode::Panic => {
                fs::write(temp, &data[..data.len() / 2])?;
                panic!("encoder crashed");
            }
            Mode::NoOutput => {}
            Mode::Race => {
                fs::write(temp, &data[..data.len() / 2])?;
                let stem = input.file_stem().unwrap().to_string_lossy().into_owned();
                fs::write(temp.with_file_name(format!("{stem}.small")), b"winner")?;
            }
        }
        Ok(())
    }
}

impl Encoder for FakeEncoder {
    fn name(&self) -> &str {
        "fake"
    }

    fn extensions(&self) -> &[&str] {
        &[".jpg", ".png"]
    }

    fn output_extension(&self, _input: &Path) -> String {
        "small".to_string()
    }

    fn probe(&self) -> Result<(), ConvertError> {
        if self.available {
            Ok(())
        } else {
            Err(ConvertError::MissingDependency {
                tool: "fake".to_string(),
                hint: "install fake".to_string(),
            })
        }
    }

    fn max_workers(&self) -> Option<usize> {
        self.max_workers
    }

    fn plan(&self, _input: &Path) -> EncodePlan {
        if self.copy_plan {
            EncodePlan::Copy {
                reason: "already small".to_string(),
            }
        } else {
            EncodePlan::Encode
        }
    }

    fn encode(&self, input: &Path, temp_output: &Path) -> Result<(), ConvertError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(5));
        let result = self.write(input, temp_output);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

// --- helpers ---

fn write_file(path: &Path, size: usize) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, vec![b'x'; size]).unwrap();
}

/// `<tmp>/media` as input root so the sibling output root stays inside the temp dir.
fn media_root(tmp: &tempfile::TempDir) -> PathBuf {
    let root = tmp.path().join("media");
    fs::create_dir_all(&root).unwrap();
    root
}

fn output_root(tmp: &tempfile::TempDir) -> PathBuf {
    tmp.path().join("media_compressed")
}

fn opts() -> Opts {
    Opts {
        workers: Some(4),
        ..Opts::default()
    }
}

fn run(root: &Path, opts: Opts, encoder: Arc<FakeEncoder>) -> RunOutcome {
    PipelineDriver::new(encoder, opts).run(root).unwrap()
}

fn finished(outcome: RunOutcome) -> RunSummary {
    match outcome {
        RunOutcome::Finished(summary) => summary,
        RunOutcome::NothingToDo => panic!("expected a finished run"),
    }
}

fn task(root: &Path, out: &Path, input: PathBuf, encoder: Arc<FakeEncoder>) -> FileTask {
    FileTask {
        input_path: input,
        input_root: root.to_path_buf(),
        output_root: out.to_path_buf(),
        encoder,
    }
}

fn leftover_temps(dir: &Path) -> Vec<PathBuf> {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().contains(".tmp."))
        .map(|e| e.into_path())
        .collect()
}

/// Wraps a tracker and records every tally it reports.
struct RecordingTracker {
    inner: Box<dyn ProgressTracker>,
    seen: Arc<Mutex<Vec<String>>>,
}

impl ProgressTracker for RecordingTracker {
    fn start_directory(&self, dir: &Path, relative: &Path, file_count: usize) {
        self.inner.start_directory(dir, relative, file_count);
    }

    fn update(&self, result: &TaskResult) -> Tally {
        let tally = self.inner.update(result);
        self.seen.lock().unwrap().push(tally.to_string());
        tally
    }

    fn finish_directory(&self) {
        self.inner.finish_directory();
    }

    fn finish_all(&self) {
        self.inner.finish_all();
    }
}

fn ok_result(original: u64, processed: u64) -> TaskResult {
    TaskResult::success(
        TaskStatus::Converted,
        PathBuf::from("x.jpg"),
        original,
        processed,
        "x.jpg".to_string(),
    )
}

// --- tree collection ---

fn names(root: &Path, paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
        .collect()
}

#[test]
fn test_collectors_sorted_and_filtered() {
    let tmp = tempfile::tempdir().unwrap();
    let root = media_root(&tmp);
    write_file(&root.join("b.png"), 4);
    write_file(&root.join("a.jpg"), 4);
    write_file(&root.join("notes.txt"), 4);
    write_file(&root.join("._c.jpg"), 4);
    write_file(&root.join("@eaDir/x.jpg"), 4);
    write_file(&root.join("sub/d.jpg"), 4);

    let ctx = PipelineContext::new(&root, &opts()).unwrap();
    let exts = [".jpg", ".png"];

    let all = collect_all(&ctx, &exts).unwrap();
    assert_eq!(names(&ctx.input_root, &all), ["a.jpg", "b.png", "sub/d.jpg"]);

    let (files, subdirs) = collect_one_level(&ctx, &ctx.input_root, &exts).unwrap();
    assert_eq!(names(&ctx.input_root, &files), ["a.jpg", "b.png"]);
    assert_eq!(names(&ctx.input_root, &subdirs), ["sub"]);
}

// --- full runs ---

#[test]
fn test_run_mirrors_tree_and_reports_sizes() {
    let tmp = tempfile::tempdir().unwrap();
    let root = media_root(&tmp);
    write_file(&root.join("a.jpg"), 100);
    write_file(&root.join("trip/b.png"), 200);
    write_file(&root.join("trip/day2/c.JPG"), 50);
    write_file(&root.join("notes.txt"), 10);

    let enc = Arc::new(FakeEncoder::new(Mode::Truncate));
    let summary = finished(run(&root, opts(), Arc::clone(&enc)));

    let out = output_root(&tmp);
    assert_eq!(summary.output_root, out.canonicalize().unwrap());
    assert_eq!(fs::read(out.join("a.small")).unwrap().len(), 50);
    assert_eq!(fs::read(out.join("trip/b.small")).unwrap().len(), 100);
    assert_eq!(fs::read(out.join("trip/day2/c.small")).unwrap().len(), 25);
    assert!(!out.join("notes.small").exists());

    assert_eq!(summary.total_files, 3);
    assert_eq!(summary.results, 3);
    assert_eq!(summary.stats.processed_files, 3);
    assert_eq!(summary.stats.converted_files, 3);
    assert_eq!(summary.stats.original_size_total, 350);
    assert_eq!(summary.stats.processed_size_total, 175);
    assert!(!summary.cancelled);
    assert!(leftover_temps(&out).is_empty());
}

#[test]
fn test_second_run_is_idempotent() {
    let tmp = tempfile::tempdir().unwrap();
    let root = media_root(&tmp);
    write_file(&root.join("a.jpg"), 100);
    write_file(&root.join("sub/b.jpg"), 80);

    let enc = Arc::new(FakeEncoder::new(Mode::Truncate));
    finished(run(&root, opts(), Arc::clone(&enc)));
    let out = output_root(&tmp);
    let first = fs::read(out.join("sub/b.small")).unwrap();
    assert_eq!(enc.calls(), 2);

    let summary = finished(run(&root, opts(), Arc::clone(&enc)));
    assert_eq!(enc.calls(), 2, "encoder must not run again");
    assert_eq!(summary.stats.processed_files, 2);
    assert_eq!(summary.stats.existing_files, 2);
    assert_eq!(summary.stats.converted_files, 0);
    assert_eq!(fs::read(out.join("sub/b.small")).unwrap(), first);
}

#[test]
fn test_every_file_gets_a_result_despite_failures() {
    let tmp = tempfile::tempdir().unwrap();
    let root = media_root(&tmp);
    write_file(&root.join("good1.jpg"), 40);
    write_file(&root.join("bad.jpg"), 40);
    write_file(&root.join("d/good2.jpg"), 40);

    let enc = Arc::new(FakeEncoder::new(Mode::Fail).only_for("bad"));
    let summary = finished(run(&root, opts(), enc));

    let out = output_root(&tmp);
    assert_eq!(summary.results, summary.total_files);
    assert_eq!(summary.stats.processed_files, 2);
    assert_eq!(summary.stats.failed_files, 1);
    assert!(!out.join("bad.small").exists());
    assert!(out.join("good1.small").exists());
    assert!(out.join("d/good2.small").exists());
    assert!(leftover_temps(&out).is_empty());
}

#[test]
fn test_panicking_encoder_fails_only_its_task() {
    let tmp = tempfile::tempdir().unwrap();
    let root = media_root(&tmp);
    for name in ["a.jpg", "boom.jpg", "c.jpg", "d.jpg"] {
        write_file(&root.join(name), 30);
    }

    let enc = Arc::new(FakeEncoder::new(Mode::Panic).only_for("boom"));
    let summary = finished(run(&root, opts(), enc));

    let out = output_root(&tmp);
    assert_eq!(summary.results, 4);
    assert_eq!(summary.stats.failed_files, 1);
    assert_eq!(summary.stats.processed_files, 3);
    assert!(!out.join("boom.small").exists());
    assert!(leftover_temps(&out).is_empty());
}

#[test]
fn test_stale_temp_is_removed_on_retry() {
    let tmp = tempfile::tempdir().unwrap();
    let root = media_root(&tmp);
    write_file(&root.join("a.jpg"), 100);
    let out = output_root(&tmp);
    write_file(&out.join("a.jpg.tmp.small"), 7);

    let enc = Arc::new(FakeEncoder::new(Mode::Copy));
    finished(run(&root, opts(), enc));

    assert!(!out.join("a.jpg.tmp.small").exists());
    assert_eq!(fs::read(out.join("a.small")).unwrap().len(), 100);
}

#[test]
fn test_copy_plan_publishes_source_bytes() {
    let tmp = tempfile::tempdir().unwrap();
    let root = media_root(&tmp);
    fs::write(root.join("a.jpg"), b"small enough").unwrap();

    let enc = Arc::new(FakeEncoder::new(Mode::Truncate).copy_plan());
    let summary = finished(run(&root, opts(), Arc::clone(&enc)));

    assert_eq!(enc.calls(), 0);
    assert_eq!(summary.stats.processed_files, 1);
    assert_eq!(
        fs::read(output_root(&tmp).join("a.small")).unwrap(),
        b"small enough"
    );
}

#[test]
fn test_sequential_encoder_never_overlaps() {
    let tmp = tempfile::tempdir().unwrap();
    let root = media_root(&tmp);
    for i in 0..6 {
        write_file(&root.join(format!("f{i}.jpg")), 10);
    }

    let enc = Arc::new(FakeEncoder::new(Mode::Copy).sequential());
    let opts = Opts {
        workers: Some(8),
        ..Opts::default()
    };
    let summary = finished(run(&root, opts, Arc::clone(&enc)));

    assert_eq!(summary.stats.processed_files, 6);
    assert_eq!(enc.peak.load(Ordering::SeqCst), 1);
}

#[test]
fn test_nothing_to_do() {
    let tmp = tempfile::tempdir().unwrap();
    let root = media_root(&tmp);
    write_file(&root.join("readme.txt"), 10);

    let enc = Arc::new(FakeEncoder::new(Mode::Copy));
    let mut driver = PipelineDriver::new(enc, opts());
    let outcome = driver.run(&root).unwrap();

    assert!(matches!(outcome, RunOutcome::NothingToDo));
    assert_eq!(driver.state(), DriverState::Done);
    assert!(!output_root(&tmp).exists());
}

#[test]
fn test_missing_dependency_is_fatal_before_any_work() {
    let tmp = tempfile::tempdir().unwrap();
    let root = media_root(&tmp);
    write_file(&root.join("a.jpg"), 10);

    let enc = Arc::new(FakeEncoder::new(Mode::Copy).missing());
    let mut driver = PipelineDriver::new(enc, opts());
    let err = driver.run(&root).unwrap_err();

    assert!(format!("{err:#}").contains("fake not found"));
    assert_eq!(driver.state(), DriverState::CheckingDependencies);
    assert!(!output_root(&tmp).exists());
}

#[test]
fn test_missing_root_is_an_error() {
    let tmp = tempfile::tempdir().unwrap();
    let enc = Arc::new(FakeEncoder::new(Mode::Copy));
    assert!(
        PipelineDriver::new(enc, opts())
            .run(&tmp.path().join("nope"))
            .is_err()
    );
}

#[test]
fn test_malformed_pattern_is_a_config_error() {
    let tmp = tempfile::tempdir().unwrap();
    let root = media_root(&tmp);
    write_file(&root.join("a.jpg"), 10);

    let opts = Opts {
        skip_dir_patterns: vec!["a*b".to_string()],
        ..opts()
    };
    let enc = Arc::new(FakeEncoder::new(Mode::Copy));
    assert!(PipelineDriver::new(enc.clone(), opts).run(&root).is_err());
    assert_eq!(enc.calls(), 0);
    assert!(!output_root(&tmp).exists());
}

#[test]
fn test_default_skip_patterns_are_reported_once() {
    let tmp = tempfile::tempdir().unwrap();
    let root = media_root(&tmp);
    write_file(&root.join(".hidden/x.jpg"), 10);
    write_file(&root.join("@eaDir/y.jpg"), 10);
    write_file(&root.join("._z.jpg"), 10);
    write_file(&root.join(".DS_Store"), 10);
    write_file(&root.join("keep/a.jpg"), 10);

    let enc = Arc::new(FakeEncoder::new(Mode::Copy));
    let summary = finished(run(&root, opts(), enc));

    assert_eq!(summary.total_files, 1);
    assert_eq!(summary.skipped_dirs.len(), 2);
    let dir_names: Vec<_> = summary
        .skipped_dirs
        .iter()
        .map(|r| r.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert!(dir_names.contains(&".hidden".to_string()));
    assert!(dir_names.contains(&"@eaDir".to_string()));
    // Unsupported files are never reported, even when a pattern would match them.
    assert_eq!(summary.skipped_files.len(), 1);
    assert_eq!(summary.skipped_files[0].pattern, ".*");
    let out = output_root(&tmp);
    assert!(!out.join(".hidden").exists());
    assert!(!out.join("._z.small").exists());
}

#[test]
fn test_custom_file_pattern() {
    let tmp = tempfile::tempdir().unwrap();
    let root = media_root(&tmp);
    write_file(&root.join("a.jpg"), 10);
    write_file(&root.join("a_thumb.jpg"), 10);

    let opts = Opts {
        skip_file_patterns: vec!["*_thumb.jpg".to_string()],
        ..opts()
    };
    let summary = finished(run(&root, opts, Arc::new(FakeEncoder::new(Mode::Copy))));
    assert_eq!(summary.total_files, 1);
    assert_eq!(summary.skipped_files.len(), 1);
}

#[cfg(unix)]
#[test]
fn test_follow_links_option() {
    let tmp = tempfile::tempdir().unwrap();
    let root = media_root(&tmp);
    write_file(&root.join("real/a.jpg"), 10);
    std::os::unix::fs::symlink(root.join("real"), root.join("link")).unwrap();

    let followed = finished(run(&root, opts(), Arc::new(FakeEncoder::new(Mode::Copy))));
    assert_eq!(followed.total_files, 2);

    let tmp2 = tempfile::tempdir().unwrap();
    let root2 = media_root(&tmp2);
    write_file(&root2.join("real/a.jpg"), 10);
    std::os::unix::fs::symlink(root2.join("real"), root2.join("link")).unwrap();
    let opts = Opts {
        follow_links: false,
        ..opts()
    };
    let plain = finished(run(&root2, opts, Arc::new(FakeEncoder::new(Mode::Copy))));
    assert_eq!(plain.total_files, 1);
}

#[test]
fn test_cancel_before_start_dispatches_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let root = media_root(&tmp);
    write_file(&root.join("a.jpg"), 10);

    let enc = Arc::new(FakeEncoder::new(Mode::Copy));
    let cancel = Arc::new(AtomicBool::new(true));
    let summary = finished(
        PipelineDriver::new(enc.clone(), opts())
            .with_cancel(cancel)
            .run(&root)
            .unwrap(),
    );

    assert!(summary.cancelled);
    assert_eq!(summary.total_files, 1);
    assert_eq!(summary.results, 0);
    assert_eq!(enc.calls(), 0);
}

// --- conversion protocol ---

#[test]
fn test_process_file_existing_output_skips_encoder() {
    let tmp = tempfile::tempdir().unwrap();
    let root = media_root(&tmp);
    let out = output_root(&tmp);
    write_file(&root.join("a.jpg"), 100);
    write_file(&out.join("a.small"), 30);

    let enc = Arc::new(FakeEncoder::new(Mode::Copy));
    let result = process_file(&task(&root, &out, root.join("a.jpg"), Arc::clone(&enc)));

    assert_eq!(result.status, TaskStatus::AlreadyExists);
    assert_eq!(result.original_size, Some(100));
    assert_eq!(result.processed_size, Some(30));
    assert_eq!(enc.calls(), 0);
}

#[test]
fn test_process_file_race_keeps_other_output() {
    let tmp = tempfile::tempdir().unwrap();
    let root = media_root(&tmp);
    let out = output_root(&tmp);
    write_file(&root.join("a.jpg"), 100);

    let enc = Arc::new(FakeEncoder::new(Mode::Race));
    let result = process_file(&task(&root, &out, root.join("a.jpg"), enc));

    assert_eq!(result.status, TaskStatus::FinishedElsewhere);
    assert!(result.is_success());
    assert_eq!(fs::read(out.join("a.small")).unwrap(), b"winner");
    assert_eq!(result.processed_size, Some(6));
    assert!(!out.join("a.jpg.tmp.small").exists());
}

#[test]
fn test_process_file_failure_carries_tool_error() {
    let tmp = tempfile::tempdir().unwrap();
    let root = media_root(&tmp);
    let out = output_root(&tmp);
    write_file(&root.join("bad.jpg"), 100);

    let enc = Arc::new(FakeEncoder::new(Mode::Fail));
    let result = process_file(&task(&root, &out, root.join("bad.jpg"), enc));

    assert_eq!(result.status, TaskStatus::Failed);
    assert_eq!(result.original_size, None);
    assert!(result.message.contains("bad.jpg"));
    assert!(result.message.contains("error code 1: boom"));
    assert!(!out.join("bad.small").exists());
    assert!(!out.join("bad.jpg.tmp.small").exists());
}

#[test]
fn test_process_file_missing_temp_is_failure() {
    let tmp = tempfile::tempdir().unwrap();
    let root = media_root(&tmp);
    let out = output_root(&tmp);
    write_file(&root.join("a.jpg"), 100);

    let enc = Arc::new(FakeEncoder::new(Mode::NoOutput));
    let result = process_file(&task(&root, &out, root.join("a.jpg"), enc));

    assert_eq!(result.status, TaskStatus::Failed);
    assert!(result.message.contains("produced no output"));
    assert!(!out.join("a.small").exists());
}

#[test]
fn test_process_file_outside_root_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let root = media_root(&tmp);
    let out = output_root(&tmp);
    let stray = tmp.path().join("stray.jpg");
    write_file(&stray, 10);

    let enc = Arc::new(FakeEncoder::new(Mode::Copy));
    let result = process_file(&task(&root, &out, stray, Arc::clone(&enc)));
    assert_eq!(result.status, TaskStatus::Failed);
    assert_eq!(enc.calls(), 0);
}

// --- worker pool ---

#[test]
fn test_pool_hundred_tasks_eight_workers() {
    let enc = Arc::new(FakeEncoder::new(Mode::Copy));
    for _ in 0..5 {
        let processor: mediashrink::engine::Processor = Arc::new(|t: &FileTask| {
            thread::sleep(Duration::from_millis(1));
            TaskResult::success(
                TaskStatus::Converted,
                t.input_path.clone(),
                10,
                4,
                t.input_path.display().to_string(),
            )
        });
        let pool =
            WorkerPool::with_processor(8, Arc::new(AtomicBool::new(false)), processor).unwrap();
        let tasks: Vec<FileTask> = (0..100)
            .map(|i| {
                task(
                    Path::new("/in"),
                    Path::new("/out"),
                    PathBuf::from(format!("/in/{i}.jpg")),
                    Arc::clone(&enc),
                )
            })
            .collect();
        let stats = StatsAccumulator::new();
        let delivered = pool.run(tasks, |r| stats.record(&r));

        assert_eq!(delivered, 100);
        let snap = stats.snapshot();
        assert_eq!(snap.processed_files, 100);
        assert_eq!(snap.original_size_total, 1000);
        assert_eq!(snap.processed_size_total, 400);
    }
}

#[test]
fn test_pool_turns_panic_into_failed_result() {
    let enc = Arc::new(FakeEncoder::new(Mode::Copy));
    let processor: mediashrink::engine::Processor = Arc::new(|t: &FileTask| {
        if t.input_path.ends_with("2.jpg") {
            panic!("worker bug");
        }
        TaskResult::success(TaskStatus::Converted, t.input_path.clone(), 1, 1, String::new())
    });
    let pool = WorkerPool::with_processor(3, Arc::new(AtomicBool::new(false)), processor).unwrap();
    let tasks: Vec<FileTask> = (0..5)
        .map(|i| {
            task(
                Path::new("/in"),
                Path::new("/out"),
                PathBuf::from(format!("/in/{i}.jpg")),
                Arc::clone(&enc),
            )
        })
        .collect();

    let mut results = Vec::new();
    assert_eq!(pool.run(tasks, |r| results.push(r)), 5);
    let failed: Vec<_> = results.iter().filter(|r| !r.is_success()).collect();
    assert_eq!(failed.len(), 1);
    assert!(failed[0].message.contains("worker panicked"));
}

#[test]
fn test_pool_cancelled_tasks_still_yield_results() {
    let enc = Arc::new(FakeEncoder::new(Mode::Copy));
    let pool = WorkerPool::new(2, Arc::new(AtomicBool::new(true))).unwrap();
    let tasks: Vec<FileTask> = (0..4)
        .map(|i| {
            task(
                Path::new("/in"),
                Path::new("/out"),
                PathBuf::from(format!("/in/{i}.jpg")),
                Arc::clone(&enc),
            )
        })
        .collect();

    let mut results = Vec::new();
    assert_eq!(pool.run(tasks, |r| results.push(r)), 4);
    assert!(results.iter().all(|r| r.status == TaskStatus::Cancelled));
    assert_eq!(enc.calls(), 0);
}

#[test]
fn test_pool_is_reused_across_batches() {
    let enc = Arc::new(FakeEncoder::new(Mode::Copy));
    let processor: mediashrink::engine::Processor =
        Arc::new(|t: &FileTask| TaskResult::failed(t.input_path.clone(), "nope".to_string()));
    let pool = WorkerPool::with_processor(2, Arc::new(AtomicBool::new(false)), processor).unwrap();
    assert_eq!(pool.num_workers(), 2);
    for batch in [3, 1, 4] {
        let tasks: Vec<FileTask> = (0..batch)
            .map(|i| {
                task(
                    Path::new("/in"),
                    Path::new("/out"),
                    PathBuf::from(format!("/in/{i}.jpg")),
                    Arc::clone(&enc),
                )
            })
            .collect();
        assert_eq!(pool.run(tasks, |_| {}), batch);
    }
}

// --- progress ---

#[test]
fn test_directory_progress_resets_denominator() {
    let tracker = DirectoryProgress::new();
    let mut seen = Vec::new();
    tracker.start_directory(Path::new("/r/A"), Path::new("A"), 3);
    for _ in 0..3 {
        seen.push(tracker.update(&ok_result(1, 1)).to_string());
    }
    tracker.finish_directory();
    tracker.start_directory(Path::new("/r/B"), Path::new("B"), 2);
    for _ in 0..2 {
        seen.push(tracker.update(&ok_result(1, 1)).to_string());
    }
    tracker.finish_directory();
    assert_eq!(seen, ["1/3", "2/3", "3/3", "1/2", "2/2"]);
}

#[test]
fn test_global_progress_fixed_denominator() {
    let tracker = GlobalProgress::new(5);
    let mut seen = Vec::new();
    tracker.start_directory(Path::new("/r/A"), Path::new("A"), 3);
    for _ in 0..3 {
        seen.push(tracker.update(&ok_result(1, 1)).to_string());
    }
    tracker.start_directory(Path::new("/r/B"), Path::new("B"), 2);
    seen.push(tracker.update(&TaskResult::failed(PathBuf::from("b"), "b".to_string())).to_string());
    seen.push(tracker.update(&ok_result(1, 1)).to_string());
    tracker.finish_all();
    assert_eq!(seen, ["1/5", "2/5", "3/5", "4/5", "5/5"]);
}

#[test]
fn test_tally_percent() {
    let t = Tally { done: 1, total: 4 };
    assert_eq!(t.percent(), 25.0);
    assert_eq!(Tally { done: 0, total: 0 }.percent(), 0.0);
}

fn progress_sequence(mode: ProgressMode) -> Vec<String> {
    let tmp = tempfile::tempdir().unwrap();
    let root = media_root(&tmp);
    for name in ["A/1.jpg", "A/2.jpg", "A/3.jpg", "B/1.jpg", "B/2.jpg"] {
        write_file(&root.join(name), 10);
    }
    let seen = Arc::new(Mutex::new(Vec::new()));
    let opts = Opts {
        progress: mode,
        ..opts()
    };
    let inner: Box<dyn ProgressTracker> = match mode {
        ProgressMode::PerDirectory => Box::new(DirectoryProgress::new()),
        ProgressMode::Global => Box::new(GlobalProgress::new(5)),
    };
    let tracker = RecordingTracker {
        inner,
        seen: Arc::clone(&seen),
    };
    finished(
        PipelineDriver::new(Arc::new(FakeEncoder::new(Mode::Copy)), opts)
            .with_tracker(Box::new(tracker))
            .run(&root)
            .unwrap(),
    );
    let recorded = seen.lock().unwrap().clone();
    recorded
}

#[test]
fn test_pipeline_per_directory_denominators() {
    assert_eq!(
        progress_sequence(ProgressMode::PerDirectory),
        ["1/3", "2/3", "3/3", "1/2", "2/2"]
    );
}

#[test]
fn test_pipeline_global_denominators() {
    assert_eq!(
        progress_sequence(ProgressMode::Global),
        ["1/5", "2/5", "3/5", "4/5", "5/5"]
    );
}

// --- stats ---

#[test]
fn test_stats_accumulate_successes() {
    let stats = StatsAccumulator::new();
    for (orig, proc) in [(100, 60), (200, 150), (50, 50)] {
        stats.record(&ok_result(orig, proc));
    }
    let snap = stats.snapshot();
    assert_eq!(snap.processed_files, 3);
    assert_eq!(snap.original_size_total, 350);
    assert_eq!(snap.processed_size_total, 260);
}

#[test]
fn test_stats_failures_only_count() {
    let stats = StatsAccumulator::new();
    stats.record(&ok_result(10, 5));
    stats.record(&TaskResult::failed(PathBuf::from("a"), "a".to_string()));
    stats.record(&TaskResult::cancelled(PathBuf::from("b")));
    let snap = stats.snapshot();
    assert_eq!(snap.processed_files, 1);
    assert_eq!(snap.failed_files, 2);
    assert_eq!(snap.original_size_total, 10);
}
