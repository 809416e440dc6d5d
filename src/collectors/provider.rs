use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use log::debug;

use crate::collectors::filter::{filter_grouped, sort_and_filter};
use crate::collectors::strategy::ContentStrategy;
use crate::collectors::walker::{self, WalkOptions};
use crate::models::{FileProcessResult, FileRecord, TimeWindow};

/// Turns raw file names of one log kind into [`FileRecord`]s.
pub trait FileInfoClassifier: Send + Sync {
    /// Name-only test, no I/O.
    fn is_match(&self, file_name: &str) -> bool;

    /// Build the record of a file already known to match.
    fn classify(&self, path: &Path, file_name: &str) -> Result<FileRecord>;

    /// Classify every matching path, skipping the others.
    ///
    /// Fails on the first malformed embedded timestamp.
    fn parse_file_infos(&self, paths: &[PathBuf]) -> Result<Vec<FileRecord>> {
        let mut records = Vec::with_capacity(paths.len());
        for path in paths {
            let file_name = file_name_of(path);
            if !self.is_match(&file_name) {
                continue;
            }
            records.push(self.classify(path, &file_name)?);
        }
        Ok(records)
    }
}

/// Discovery, selection and extraction of one category of file in a log tree.
pub trait FileSourceProvider: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Name suffixes discovery is restricted to. Empty means every file.
    fn suffixes(&self) -> &[&'static str];

    fn find_files(&self, dir: &Path, suffixes: &[&str]) -> Result<Vec<PathBuf>> {
        find_files(dir, suffixes)
    }

    /// Classify `paths` and keep the records overlapping `window`, sorted.
    fn filter_files(&self, paths: &[PathBuf], window: &TimeWindow) -> Result<Vec<FileRecord>>;

    fn process_file(
        &self,
        record: &FileRecord,
        window: &TimeWindow,
        out_dir: &Path,
    ) -> Result<FileProcessResult>;

    /// Process the files directly inside `dir` on a worker pool.
    fn process_dir(
        &self,
        dir: &Path,
        out_dir: &Path,
        window: &TimeWindow,
        options: &WalkOptions,
    ) -> Result<Vec<FileProcessResult>> {
        walker::process_dir(self, dir, out_dir, window, options)
    }
}

/// Plain files directly inside `dir` whose names end with one of `suffixes`.
///
/// A missing directory yields an empty list. The result is sorted by path.
pub fn find_files(dir: &Path, suffixes: &[&str]) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!("Directory {} does not exist", dir.display());
            return Ok(Vec::new());
        }
        Err(err) => {
            return Err(err).context(format!("Failed to read directory {}", dir.display()));
        }
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.context("Failed to read directory entry")?;
        let file_type = entry
            .file_type()
            .with_context(|| format!("Failed to stat {}", entry.path().display()))?;
        if !file_type.is_file() {
            continue;
        }

        let name = entry.file_name();
        let name = name.to_string_lossy();
        if suffixes.is_empty() || suffixes.iter().any(|suffix| name.ends_with(suffix)) {
            files.push(entry.path());
        }
    }

    files.sort();
    Ok(files)
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Partition key used by providers whose files rotate as several independent sequences.
pub type GroupFn = fn(&FileRecord) -> u8;

/// Provider assembled from a classifier, a discovery filter and a strategy.
///
/// Every built-in log category is one of these with different parts.
pub struct ClassifiedProvider {
    name: &'static str,
    classifier: Box<dyn FileInfoClassifier>,
    suffixes: Vec<&'static str>,
    group_by: Option<GroupFn>,
    strategy: ContentStrategy,
}

impl ClassifiedProvider {
    pub fn new(
        name: &'static str,
        classifier: impl FileInfoClassifier + 'static,
        suffixes: &[&'static str],
        strategy: ContentStrategy,
    ) -> Self {
        ClassifiedProvider {
            name,
            classifier: Box::new(classifier),
            suffixes: suffixes.to_vec(),
            group_by: None,
            strategy,
        }
    }

    /// Filter each group returned by `group_by` as its own rotation sequence.
    pub fn grouped(mut self, group_by: GroupFn) -> Self {
        self.group_by = Some(group_by);
        self
    }

    pub fn classifier(&self) -> &dyn FileInfoClassifier {
        self.classifier.as_ref()
    }

    pub fn strategy(&self) -> &ContentStrategy {
        &self.strategy
    }
}

impl FileSourceProvider for ClassifiedProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn suffixes(&self) -> &[&'static str] {
        &self.suffixes
    }

    fn filter_files(&self, paths: &[PathBuf], window: &TimeWindow) -> Result<Vec<FileRecord>> {
        let mut records = self.classifier.parse_file_infos(paths)?;
        let now = Local::now();

        Ok(match self.group_by {
            Some(group_by) => filter_grouped(records, window, now, group_by),
            None => sort_and_filter(&mut records, window, now, None),
        })
    }

    fn process_file(
        &self,
        record: &FileRecord,
        window: &TimeWindow,
        out_dir: &Path,
    ) -> Result<FileProcessResult> {
        self.strategy.process(record, window, out_dir)
    }
}
