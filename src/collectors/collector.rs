use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::anyhow;
use futures::future;
use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::collectors::registry::SourceRegistry;
use crate::collectors::source::LogSource;
use crate::collectors::walker::WalkOptions;
use crate::constants::{ARCHIVE_NAME_PREFIX, ARCHIVE_NAME_TIME_FORMAT, HEADER_TIME_FORMAT, TEMP_DIR_PREFIX};
use crate::error::{CollectError, CollectResult};
use crate::models::{SourceResult, TimeWindow};
use crate::utils::compress::{self, ArchiveStats};

/// Outcome of a successful collection run.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionReport {
    pub archive_path: PathBuf,
    pub window: TimeWindow,
    /// One entry per source, in the order the sources were added.
    pub sources: Vec<SourceResult>,
    #[serde(skip)]
    pub archive: ArchiveStats,
}

impl CollectionReport {
    pub fn total_lines(&self) -> usize {
        self.sources.iter().map(SourceResult::total_lines).sum()
    }

    pub fn matched_lines(&self) -> usize {
        self.sources.iter().map(SourceResult::matched_lines).sum()
    }

    pub fn file_count(&self) -> usize {
        self.sources.iter().map(SourceResult::file_count).sum()
    }

    pub fn file_size_bytes(&self) -> u64 {
        self.sources.iter().map(SourceResult::file_size_bytes).sum()
    }
}

/// Name of the snapshot archive covering `window`.
pub fn archive_file_name(window: &TimeWindow) -> String {
    format!(
        "{}_{}_{}.zip",
        ARCHIVE_NAME_PREFIX,
        window.start.format(ARCHIVE_NAME_TIME_FORMAT),
        window.end.format(ARCHIVE_NAME_TIME_FORMAT)
    )
}

/// Runs a set of log sources over one window and packs their output.
#[derive(Debug)]
pub struct Collector {
    sources: Vec<Arc<LogSource>>,
    output_dir: PathBuf,
    max_workers: Option<usize>,
    cancel: CancellationToken,
}

impl Collector {
    pub fn new(sources: Vec<LogSource>, output_dir: impl Into<PathBuf>) -> Self {
        Collector {
            sources: sources.into_iter().map(Arc::new).collect(),
            output_dir: output_dir.into(),
            max_workers: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Build a collector for the named kinds, or for every registered kind
    /// when `names` is empty.
    ///
    /// Fails with [`CollectError::UnsupportedSource`] before touching the
    /// filesystem if any name is unknown.
    pub fn from_registry(
        registry: &SourceRegistry,
        names: &[String],
        log_root: &Path,
        output_dir: impl Into<PathBuf>,
    ) -> CollectResult<Self> {
        let names: Vec<String> = if names.is_empty() {
            registry.names().into_iter().map(str::to_string).collect()
        } else {
            names.to_vec()
        };

        let sources = names
            .iter()
            .map(|name| registry.create(name, log_root, Path::new("")))
            .collect::<CollectResult<Vec<_>>>()?;

        Ok(Collector::new(sources, output_dir))
    }

    /// Limit the per-directory worker pools.
    pub fn with_max_workers(mut self, max_workers: Option<usize>) -> Self {
        self.max_workers = max_workers;
        self
    }

    pub fn add_source(&mut self, source: LogSource) {
        info!("Added log source {}", source.name());
        self.sources.push(Arc::new(source));
    }

    /// Remove the first source called `name`.
    pub fn remove_source(&mut self, name: &str) -> bool {
        match self.sources.iter().position(|s| s.name() == name) {
            Some(index) => {
                self.sources.remove(index);
                info!("Removed log source {}", name);
                true
            }
            None => {
                warn!("No log source named {}", name);
                false
            }
        }
    }

    pub fn get_source(&self, name: &str) -> Option<&LogSource> {
        self.sources
            .iter()
            .find(|s| s.name() == name)
            .map(|s| s.as_ref())
    }

    pub fn has_source(&self, name: &str) -> bool {
        self.get_source(name).is_some()
    }

    pub fn sources(&self) -> impl Iterator<Item = &LogSource> {
        self.sources.iter().map(|s| s.as_ref())
    }

    pub fn clear_sources(&mut self) {
        self.sources.clear();
        info!("Cleared all log sources");
    }

    pub fn set_output_dir(&mut self, output_dir: impl Into<PathBuf>) {
        self.output_dir = output_dir.into();
        info!("Output directory set to {}", self.output_dir.display());
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Token stopping an in-flight collection when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Collect `window` from every source and archive the result.
    ///
    /// Sources run concurrently, one blocking task each. Per-file and
    /// per-source failures are reported inside the returned
    /// [`CollectionReport`]; only window validation, an empty run, a missing
    /// workspace and archiving fail the call. The per-run workspace is removed
    /// on every exit path.
    pub async fn collect_async(&self, window: &TimeWindow) -> CollectResult<CollectionReport> {
        window
            .validate()
            .map_err(|e| CollectError::InvalidTimeWindow(e.to_string()))?;

        if self.sources.is_empty() {
            return Err(CollectError::NoSources);
        }

        let workspace = tempfile::Builder::new()
            .prefix(TEMP_DIR_PREFIX)
            .tempdir()
            .map_err(|e| CollectError::Workspace(anyhow!(e).context("Failed to create temporary directory")))?;
        info!("Using workspace {}", workspace.path().display());

        let start = Instant::now();
        let sources = self.run_sources(window, workspace.path()).await;

        if self.cancel.is_cancelled() {
            return Err(CollectError::Cancelled);
        }

        let total_lines: usize = sources.iter().map(SourceResult::total_lines).sum();
        let matched_lines: usize = sources.iter().map(SourceResult::matched_lines).sum();
        info!(
            "Collected {} sources in {:?}: {} lines, {} matched",
            sources.len(),
            start.elapsed(),
            total_lines,
            matched_lines
        );

        if matched_lines == 0 {
            info!("No matching log entries in the requested window");
            return Err(CollectError::NoLogsInRange {
                start: window.start.format(HEADER_TIME_FORMAT).to_string(),
                end: window.end.format(HEADER_TIME_FORMAT).to_string(),
            });
        }

        let archive_path = self.output_dir.join(archive_file_name(window));
        let archive = self.archive(workspace.path(), &archive_path).await?;

        Ok(CollectionReport {
            archive_path,
            window: *window,
            sources,
            archive,
        })
    }

    /// Blocking wrapper around [`Collector::collect_async`] on a fresh runtime.
    ///
    /// Fails with [`CollectError::NestedRuntime`] when called from a thread
    /// already driving a Tokio runtime.
    pub fn collect(&self, window: &TimeWindow) -> CollectResult<CollectionReport> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(CollectError::NestedRuntime);
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(num_cpus::get())
            .enable_all()
            .build()
            .map_err(|e| CollectError::Workspace(anyhow!(e).context("Failed to create Tokio runtime")))?;

        runtime.block_on(self.collect_async(window))
    }

    async fn run_sources(&self, window: &TimeWindow, workspace: &Path) -> Vec<SourceResult> {
        let options = WalkOptions::default()
            .with_max_workers(self.max_workers)
            .with_cancel(self.cancel.clone());
        let (sender, mut receiver) = mpsc::unbounded_channel::<SourceResult>();

        let tasks = self.sources.iter().enumerate().map(|(index, source)| {
            let source = Arc::clone(source);
            let sender = sender.clone();
            let window = *window;
            let workspace = workspace.to_path_buf();
            let options = options.clone();

            debug!("Starting task #{} for source {}", index + 1, source.name());
            tokio::task::spawn_blocking(move || {
                let result = source.collect(&window, &workspace, &options);
                if let Some(error) = &result.error {
                    warn!("[{}] collection failed: {}", result.source_name, error);
                }
                // The receiver lives until every task has joined.
                let _ = sender.send(result);
            })
        });

        let joined = future::join_all(tasks).await;
        drop(sender);

        let mut results = Vec::with_capacity(self.sources.len());
        while let Some(result) = receiver.recv().await {
            results.push(result);
        }

        for (source, outcome) in self.sources.iter().zip(joined) {
            if let Err(e) = outcome {
                warn!("[{}] collection task failed: {}", source.name(), e);
                let mut failed = SourceResult::new(source.name());
                failed.error = Some(format!("collection task failed: {}", e));
                results.push(failed);
            }
        }

        // Report in source order, not completion order.
        let position = |name: &str| self.sources.iter().position(|s| s.name() == name);
        results.sort_by_key(|r| position(&r.source_name));
        results
    }

    async fn archive(&self, workspace: &Path, archive_path: &Path) -> CollectResult<ArchiveStats> {
        let archive_error = |source: anyhow::Error| CollectError::Archive {
            path: archive_path.to_path_buf(),
            source,
        };

        fs::create_dir_all(&self.output_dir).map_err(|e| {
            archive_error(anyhow!(e).context(format!(
                "Failed to create output directory {}",
                self.output_dir.display()
            )))
        })?;

        let source_dir = workspace.to_path_buf();
        let dest = archive_path.to_path_buf();
        tokio::task::spawn_blocking(move || compress::zip_directory(&source_dir, &dest, None))
            .await
            .map_err(|e| archive_error(anyhow!(e).context("Archive task failed")))?
            .map_err(archive_error)
    }
}
