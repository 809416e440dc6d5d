use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{Context, Result};
use crossbeam::channel::{unbounded, Receiver, Sender};
use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use crate::collectors::provider::FileSourceProvider;
use crate::models::{FileProcessResult, FileRecord, TimeWindow};

/// Knobs shared by every directory of one collection.
#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    /// Upper bound on per-directory workers. `None` means one per CPU.
    pub max_workers: Option<usize>,
    pub cancel: CancellationToken,
}

impl WalkOptions {
    pub fn with_max_workers(mut self, max_workers: Option<usize>) -> Self {
        self.max_workers = max_workers;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Workers used for `files` files: one per file, capped by the limit, at least one.
pub fn worker_count(files: usize, max_workers: Option<usize>) -> usize {
    let limit = max_workers
        .filter(|limit| *limit > 0)
        .unwrap_or_else(num_cpus::get);
    files.min(limit).max(1)
}

/// Discover, select and process the files directly inside `dir`.
///
/// # Arguments
///
/// * `provider` - Category of files to handle
/// * `dir` - Directory to scan (not recursed into)
/// * `out_dir` - Existing directory receiving the outputs
/// * `window` - Time window to extract
/// * `options` - Worker limit and cancellation
///
/// # Returns
///
/// One result per selected file, in completion order. A file that fails
/// carries its error on its result. Classification failures fail the whole
/// directory.
pub fn process_dir<P: FileSourceProvider + ?Sized>(
    provider: &P,
    dir: &Path,
    out_dir: &Path,
    window: &TimeWindow,
    options: &WalkOptions,
) -> Result<Vec<FileProcessResult>> {
    let files = provider
        .find_files(dir, provider.suffixes())
        .with_context(|| format!("Failed to find log files in {}", dir.display()))?;
    if files.is_empty() {
        return Ok(Vec::new());
    }

    let records = provider
        .filter_files(&files, window)
        .with_context(|| format!("Failed to classify log files in {}", dir.display()))?;
    if records.is_empty() {
        debug!(
            "[{}] no file in {} overlaps the window",
            provider.name(),
            dir.display()
        );
        return Ok(Vec::new());
    }

    Ok(run_workers(provider, records, window, out_dir, options))
}

/// Fan `records` out over a scoped worker pool and gather every result.
fn run_workers<P: FileSourceProvider + ?Sized>(
    provider: &P,
    records: Vec<FileRecord>,
    window: &TimeWindow,
    out_dir: &Path,
    options: &WalkOptions,
) -> Vec<FileProcessResult> {
    let workers = worker_count(records.len(), options.max_workers);
    info!(
        "[{}] processing {} files with {} workers",
        provider.name(),
        records.len(),
        workers
    );
    run_pool(provider, records, window, out_dir, &options.cancel, workers)
}

/// Drain `records` with up to `workers` threads.
///
/// When no worker thread could be started the calling thread drains the
/// queue, so every record still yields a result.
fn run_pool<P: FileSourceProvider + ?Sized>(
    provider: &P,
    records: Vec<FileRecord>,
    window: &TimeWindow,
    out_dir: &Path,
    cancel: &CancellationToken,
    workers: usize,
) -> Vec<FileProcessResult> {
    let (task_tx, task_rx) = unbounded::<FileRecord>();
    let (result_tx, result_rx) = unbounded::<FileProcessResult>();

    for record in records {
        if task_tx.send(record).is_err() {
            break;
        }
    }
    drop(task_tx);

    thread::scope(|scope| {
        let mut started = 0;
        for worker_id in 0..workers {
            let task_rx = task_rx.clone();
            let result_tx = result_tx.clone();

            let spawned = thread::Builder::new()
                .name(format!("walker-{}", worker_id))
                .spawn_scoped(scope, move || {
                    drain_tasks(provider, &task_rx, &result_tx, window, out_dir, cancel, worker_id)
                });

            match spawned {
                Ok(_) => started += 1,
                Err(e) => warn!("Failed to spawn walker worker {}: {}", worker_id, e),
            }
        }

        if started == 0 {
            warn!(
                "[{}] no walker worker started, processing on the calling thread",
                provider.name()
            );
            drain_tasks(provider, &task_rx, &result_tx, window, out_dir, cancel, workers);
        }

        // Only the workers hold senders now; the queue closes when the last one exits.
        drop(result_tx);
        result_rx.iter().collect()
    })
}

fn drain_tasks<P: FileSourceProvider + ?Sized>(
    provider: &P,
    task_rx: &Receiver<FileRecord>,
    result_tx: &Sender<FileProcessResult>,
    window: &TimeWindow,
    out_dir: &Path,
    cancel: &CancellationToken,
    worker_id: usize,
) {
    for record in task_rx.iter() {
        if cancel.is_cancelled() {
            debug!("Worker {} stopping, collection cancelled", worker_id);
            break;
        }

        debug!("Worker {} processing {}", worker_id, record.file_name);
        let result = match provider.process_file(&record, window, out_dir) {
            Ok(result) => result,
            Err(e) => {
                warn!("Failed to process {}: {:#}", record.path.display(), e);
                FileProcessResult::failed(&record.path, &e)
            }
        };

        if result_tx.send(result).is_err() {
            break;
        }
    }
}

/// Recursive walk of one log tree for one provider.
///
/// Every sub-directory gets a matching (possibly empty) output directory.
/// Symlinked directories are not followed.
pub struct DirectoryWalker<'a, P: FileSourceProvider + ?Sized> {
    provider: &'a P,
    window: &'a TimeWindow,
    options: &'a WalkOptions,
}

impl<'a, P: FileSourceProvider + ?Sized> DirectoryWalker<'a, P> {
    pub fn new(provider: &'a P, window: &'a TimeWindow, options: &'a WalkOptions) -> Self {
        DirectoryWalker {
            provider,
            window,
            options,
        }
    }

    /// Walk `root`, mirroring its layout under `output_root`.
    pub fn walk(&self, root: &Path, output_root: &Path) -> Vec<FileProcessResult> {
        let mut results = Vec::new();
        self.walk_directory_recursive(root, output_root, &mut results);
        results
    }

    fn walk_directory_recursive(
        &self,
        current_path: &Path,
        output_path: &Path,
        results: &mut Vec<FileProcessResult>,
    ) {
        if self.options.cancel.is_cancelled() {
            return;
        }

        match self
            .provider
            .process_dir(current_path, output_path, self.window, self.options)
        {
            Ok(dir_results) => results.extend(dir_results),
            Err(e) => {
                warn!(
                    "[{}] failed to process {}: {:#}",
                    self.provider.name(),
                    current_path.display(),
                    e
                );
                results.push(FileProcessResult::failed(current_path, &e));
            }
        }

        for sub_dir in sub_directories(current_path) {
            let Some(name) = sub_dir.file_name() else {
                continue;
            };

            let sub_output = output_path.join(name);
            if let Err(e) = fs::create_dir_all(&sub_output) {
                warn!(
                    "Failed to create output directory {}: {}",
                    sub_output.display(),
                    e
                );
                continue;
            }

            self.walk_directory_recursive(&sub_dir, &sub_output, results);
        }
    }
}

fn sub_directories(dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("Directory {} does not exist", dir.display());
            return Vec::new();
        }
        Err(e) => {
            warn!("Failed to read directory {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|entry| entry.path())
        .collect();
    dirs.sort();
    dirs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::provider::{ClassifiedProvider, FileInfoClassifier};
    use crate::collectors::reader::ReaderKind;
    use crate::collectors::strategy::{ContentStrategy, LineFilter, OutputNaming};
    use chrono::{Local, TimeZone};
    use regex::Regex;
    use tempfile::TempDir;

    /// Accepts `*.txt`, rejects names containing "bad".
    struct TxtClassifier;

    impl FileInfoClassifier for TxtClassifier {
        fn is_match(&self, file_name: &str) -> bool {
            file_name.ends_with(".txt")
        }

        fn classify(&self, path: &Path, file_name: &str) -> Result<FileRecord> {
            if file_name.contains("bad") {
                anyhow::bail!("cannot classify {}", file_name);
            }
            Ok(FileRecord::new(path.to_path_buf(), file_name, None, "txt"))
        }
    }

    fn copy_provider() -> ClassifiedProvider {
        ClassifiedProvider::new("txt", TxtClassifier, &[".txt"], ContentStrategy::Copy)
    }

    fn filter_provider() -> ClassifiedProvider {
        let filter = LineFilter {
            pattern: Regex::new(r"^\[(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2})\]").unwrap(),
            time_format: "%Y-%m-%d %H:%M:%S",
            naming: OutputNaming::Keep,
            reader: ReaderKind::PlainFile,
        };
        ClassifiedProvider::new("txt", TxtClassifier, &[".txt"], ContentStrategy::Filter(filter))
    }

    fn window() -> TimeWindow {
        TimeWindow::new(
            Local.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            Local.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_worker_count() {
        assert_eq!(worker_count(0, None), 1);
        assert_eq!(worker_count(3, Some(8)), 3);
        assert_eq!(worker_count(10, Some(2)), 2);
        assert_eq!(worker_count(1, Some(0)), 1);
        assert!(worker_count(10_000, None) <= num_cpus::get());
    }

    #[test]
    fn test_process_dir_pool_sizes_agree() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let logs = temp_dir.path().join("logs");
        fs::create_dir(&logs)?;
        for i in 0..12 {
            fs::write(logs.join(format!("f{:02}.txt", i)), vec![b'x'; i + 1])?;
        }

        let provider = copy_provider();
        let mut totals = Vec::new();
        for workers in [Some(1), Some(4), None] {
            let out = temp_dir.path().join(format!("out-{:?}", workers));
            fs::create_dir(&out)?;
            let options = WalkOptions::default().with_max_workers(workers);

            let results = process_dir(&provider, &logs, &out, &window(), &options)?;
            let bytes: u64 = results.iter().map(|r| r.file_size_bytes).sum();
            let files: usize = results.iter().map(|r| r.matched_files).sum();
            totals.push((results.len(), files, bytes));
        }

        assert_eq!(totals[0], (12, 12, 78));
        assert!(totals.iter().all(|t| *t == totals[0]));
        Ok(())
    }

    #[test]
    fn test_filtered_line_totals_match_across_pool_sizes() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let logs = temp_dir.path().join("logs");
        fs::create_dir(&logs)?;
        // File i: i + 1 two-line entries in the window, one three-line entry before it.
        for i in 0..12 {
            let mut content = String::from("[2024-12-31 23:00:00] early\n  detail\n  detail\n");
            for n in 0..=i {
                content.push_str(&format!("[2025-01-01 10:{:02}:00] entry {}\n  detail\n", n, n));
            }
            fs::write(logs.join(format!("f{:02}.txt", i)), content)?;
        }

        let provider = filter_provider();
        let mut totals = Vec::new();
        for workers in [Some(1), Some(4), None] {
            let out = temp_dir.path().join(format!("out-{:?}", workers));
            fs::create_dir(&out)?;
            let options = WalkOptions::default().with_max_workers(workers);

            let results = process_dir(&provider, &logs, &out, &window(), &options)?;
            assert!(results.iter().all(|r| !r.is_error()));
            let files: usize = results.iter().map(|r| r.file_count).sum();
            let total: usize = results.iter().map(|r| r.total_lines).sum();
            let matched: usize = results.iter().map(|r| r.matched_lines).sum();
            totals.push((files, total, matched));
        }

        assert_eq!(totals[0], (12, 192, 156));
        assert!(totals.iter().all(|t| *t == totals[0]));
        Ok(())
    }

    #[test]
    fn test_pool_without_workers_drains_on_calling_thread() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let mut records = Vec::new();
        for name in ["a.txt", "b.txt", "c.txt"] {
            let path = temp_dir.path().join(name);
            fs::write(&path, name)?;
            records.push(FileRecord::new(path, name, None, "txt"));
        }
        let out = TempDir::new()?;

        let results = run_pool(
            &copy_provider(),
            records,
            &window(),
            out.path(),
            &CancellationToken::new(),
            0,
        );

        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| !r.is_error()));
        assert_eq!(fs::read_to_string(out.path().join("b.txt"))?, "b.txt");
        Ok(())
    }

    #[test]
    fn test_process_dir_classification_failure_fails_directory() -> Result<()> {
        let temp_dir = TempDir::new()?;
        fs::write(temp_dir.path().join("bad.txt"), "x")?;
        let out = TempDir::new()?;

        let result = process_dir(
            &copy_provider(),
            temp_dir.path(),
            out.path(),
            &window(),
            &WalkOptions::default(),
        );
        assert!(result.is_err());
        Ok(())
    }

    #[test]
    fn test_walker_mirrors_tree_and_records_errors() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path().join("root");
        fs::create_dir_all(root.join("a/deep"))?;
        fs::create_dir_all(root.join("empty"))?;
        fs::create_dir_all(root.join("broken"))?;
        fs::write(root.join("top.txt"), "top")?;
        fs::write(root.join("a/deep/inner.txt"), "inner")?;
        fs::write(root.join("broken/bad.txt"), "bad")?;

        let out = temp_dir.path().join("out");
        fs::create_dir(&out)?;

        let provider = copy_provider();
        let window = window();
        let options = WalkOptions::default();
        let results = DirectoryWalker::new(&provider, &window, &options).walk(&root, &out);

        assert_eq!(results.len(), 3);
        assert_eq!(results.iter().filter(|r| r.is_error()).count(), 1);
        assert_eq!(fs::read_to_string(out.join("top.txt"))?, "top");
        assert_eq!(fs::read_to_string(out.join("a/deep/inner.txt"))?, "inner");
        assert!(out.join("empty").is_dir());
        Ok(())
    }

    #[test]
    fn test_walker_stops_when_cancelled() -> Result<()> {
        let temp_dir = TempDir::new()?;
        fs::write(temp_dir.path().join("one.txt"), "1")?;
        let out = TempDir::new()?;

        let provider = copy_provider();
        let window = window();
        let options = WalkOptions::default();
        options.cancel.cancel();

        let results = DirectoryWalker::new(&provider, &window, &options).walk(temp_dir.path(), out.path());
        assert!(results.is_empty());
        Ok(())
    }
}
