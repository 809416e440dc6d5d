use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::collectors::provider::FileSourceProvider;
use crate::collectors::walker::{DirectoryWalker, WalkOptions};
use crate::models::{SourceResult, TimeWindow};

/// Fields every log source has, whatever its kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    /// Registry name, e.g. `xyz-hmi`.
    pub name: String,
    /// Root of the application's log tree.
    pub log_dir: PathBuf,
    /// Relative directory receiving the extracted tree inside a run's workspace.
    pub output_subdir: PathBuf,
}

/// One application's log tree together with the providers that understand it.
pub struct LogSource {
    config: SourceConfig,
    providers: Vec<Box<dyn FileSourceProvider>>,
}

impl LogSource {
    pub fn new(config: SourceConfig, providers: Vec<Box<dyn FileSourceProvider>>) -> Self {
        LogSource { config, providers }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn log_dir(&self) -> &Path {
        &self.config.log_dir
    }

    pub fn output_subdir(&self) -> &Path {
        &self.config.output_subdir
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Extract the window from this source's tree into `output_root/<output_subdir>`.
    ///
    /// Failures that concern the whole source (no providers, output directory
    /// not creatable) are recorded on the returned result. A missing log
    /// directory is not a failure and yields an empty result.
    pub fn collect(
        &self,
        window: &TimeWindow,
        output_root: &Path,
        options: &WalkOptions,
    ) -> SourceResult {
        let mut result = SourceResult::new(self.name());

        if self.providers.is_empty() {
            result.error = Some(format!("log source {} has no file providers", self.name()));
            return result;
        }

        let output_dir = output_root.join(&self.config.output_subdir);
        if let Err(e) = fs::create_dir_all(&output_dir) {
            result.error = Some(format!(
                "failed to create output directory {}: {}",
                output_dir.display(),
                e
            ));
            return result;
        }
        result.output_path = Some(output_dir.clone());

        if !self.config.log_dir.is_dir() {
            warn!(
                "[{}] log directory {} does not exist, skipping",
                self.name(),
                self.config.log_dir.display()
            );
            return result;
        }

        for provider in &self.providers {
            if options.cancel.is_cancelled() {
                break;
            }
            let walker = DirectoryWalker::new(provider.as_ref(), window, options);
            result
                .results
                .extend(walker.walk(&self.config.log_dir, &output_dir));
        }

        info!(
            "[{}] processed {}: {} lines, {} matched, {} files",
            self.name(),
            self.config.log_dir.display(),
            result.total_lines(),
            result.matched_lines(),
            result.file_count()
        );

        result
    }
}

impl std::fmt::Debug for LogSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogSource")
            .field("config", &self.config)
            .field("providers", &self.provider_names())
            .finish()
    }
}
