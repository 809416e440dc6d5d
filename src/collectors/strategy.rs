//! Content extraction strategies.
//!
//! ## Copy
//!
//! The file is streamed unchanged into the output directory. Used for logs
//! whose content has no per-line timestamps (JSON task dumps).
//!
//! ## Filter
//!
//! The file is scanned line by line. A line matching the strategy's timestamp
//! pattern starts a new entry, any following line without one is a
//! continuation of that entry. Entries are written whole, or not at all,
//! depending on whether their header timestamp lies in the window. The output
//! file is only created once the first entry matches, so a file with nothing in
//! range leaves nothing behind.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use log::{debug, warn};
use regex::Regex;

use crate::collectors::reader::ReaderKind;
use crate::constants::{
    DEFAULT_BUFFER_SIZE, HEADER_TIME_FORMAT, LINE_READER_BUFFER_SIZE, OUTPUT_SUFFIX_TIME_FORMAT,
};
use crate::models::{FileProcessResult, FileRecord, TimeWindow};
use crate::utils::time::parse_local;

/// How the output file of a processed record is named.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputNaming {
    /// Same name as the source file.
    Keep,
    /// `<stem>_<YYYYMMDD_HHMMSS><.ext>`, stamped with the source's modification time.
    Timestamped,
    /// Zip-archived logs become `<stem>.archive.log`, anything else is timestamped.
    ArchiveAware,
}

impl OutputNaming {
    pub fn output_name(&self, record: &FileRecord) -> String {
        match self {
            OutputNaming::Keep => record.file_name.clone(),
            OutputNaming::Timestamped => timestamped_name(record),
            OutputNaming::ArchiveAware => {
                if record.file_type == "zip" {
                    record
                        .file_name
                        .strip_suffix(".zip")
                        .unwrap_or(&record.file_name)
                        .replace(".log", ".archive.log")
                } else {
                    timestamped_name(record)
                }
            }
        }
    }
}

fn timestamped_name(record: &FileRecord) -> String {
    let modified = fs::metadata(&record.path)
        .and_then(|metadata| metadata.modified())
        .map(DateTime::<Local>::from)
        .unwrap_or_else(|_| Local::now());
    let stamp = modified.format(OUTPUT_SUFFIX_TIME_FORMAT);

    match record.file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}_{}.{}", stem, stamp, ext),
        _ => format!("{}_{}", record.file_name, stamp),
    }
}

/// Timestamp-driven line filter.
#[derive(Debug, Clone)]
pub struct LineFilter {
    /// Capture group 1 holds the entry timestamp.
    pub pattern: Regex,
    /// chrono format of the captured timestamp.
    pub time_format: &'static str,
    pub naming: OutputNaming,
    pub reader: ReaderKind,
}

#[derive(Debug, Clone)]
pub enum ContentStrategy {
    Copy,
    Filter(LineFilter),
}

impl ContentStrategy {
    /// Extract `record` into `out_dir`.
    ///
    /// # Returns
    ///
    /// Statistics for the file, with `output_path` set when a file was written.
    pub fn process(
        &self,
        record: &FileRecord,
        window: &TimeWindow,
        out_dir: &Path,
    ) -> Result<FileProcessResult> {
        match self {
            ContentStrategy::Copy => copy_file(record, out_dir),
            ContentStrategy::Filter(filter) => filter.process(record, window, out_dir),
        }
    }
}

fn copy_file(record: &FileRecord, out_dir: &Path) -> Result<FileProcessResult> {
    let output_path = out_dir.join(&record.file_name);

    let source = File::open(&record.path)
        .with_context(|| format!("Failed to open source file {}", record.path.display()))?;
    let dest = File::create(&output_path)
        .with_context(|| format!("Failed to create output file {}", output_path.display()))?;

    let mut reader = BufReader::with_capacity(DEFAULT_BUFFER_SIZE, source);
    let mut writer = BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, dest);
    let copied = std::io::copy(&mut reader, &mut writer)
        .with_context(|| format!("Failed to copy {}", record.path.display()))
        .and_then(|bytes| {
            writer
                .flush()
                .with_context(|| format!("Failed to flush {}", output_path.display()))?;
            Ok(bytes)
        });
    drop(writer);

    let bytes = match copied {
        Ok(bytes) => bytes,
        Err(err) => {
            let _ = fs::remove_file(&output_path);
            return Err(err);
        }
    };

    debug!("Copied {} ({} bytes)", record.path.display(), bytes);

    Ok(FileProcessResult {
        output_path: Some(output_path),
        file_count: 1,
        file_size_bytes: bytes,
        matched_files: 1,
        ..Default::default()
    })
}

/// Counters of one line scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub total_lines: usize,
    pub matched_lines: usize,
    pub matched_entries: usize,
    pub bytes_read: u64,
}

struct Entry {
    in_window: bool,
    lines: Vec<Vec<u8>>,
}

impl LineFilter {
    pub fn process(
        &self,
        record: &FileRecord,
        window: &TimeWindow,
        out_dir: &Path,
    ) -> Result<FileProcessResult> {
        let output_path = out_dir.join(self.naming.output_name(record));
        let mut output = LazyOutput::new(&output_path, &record.path, window);

        let stats = self.reader.scan(record, |reader| {
            self.scan_entries(reader, window, |lines| output.write_entry(lines))
        });
        let written = output.finish();

        // A failed scan must not leave a half-written file behind.
        let (stats, written) = match (stats, written) {
            (Ok(stats), Ok(written)) => (stats, written),
            (Err(err), _) | (_, Err(err)) => {
                if output_path.exists() {
                    let _ = fs::remove_file(&output_path);
                }
                return Err(err);
            }
        };

        Ok(FileProcessResult {
            output_path: written.then_some(output_path),
            error: None,
            file_count: 1,
            file_size_bytes: stats.bytes_read,
            total_lines: stats.total_lines,
            matched_lines: stats.matched_lines,
            matched_files: usize::from(written),
        })
    }

    /// Group the lines of `reader` into entries and hand every in-window entry to `emit`.
    ///
    /// Lines before the first timestamped line belong to no entry and are
    /// dropped. A header whose timestamp does not parse opens an entry that is
    /// never emitted, so its continuation lines are dropped with it.
    pub fn scan_entries(
        &self,
        reader: &mut dyn Read,
        window: &TimeWindow,
        mut emit: impl FnMut(&[Vec<u8>]) -> Result<()>,
    ) -> Result<ScanStats> {
        let mut reader = BufReader::with_capacity(LINE_READER_BUFFER_SIZE, reader);
        let mut stats = ScanStats::default();
        let mut current: Option<Entry> = None;
        let mut buf = Vec::new();

        let mut flush = |entry: Option<Entry>, stats: &mut ScanStats| -> Result<()> {
            if let Some(entry) = entry {
                if entry.in_window && !entry.lines.is_empty() {
                    emit(&entry.lines)?;
                    stats.matched_entries += 1;
                    stats.matched_lines += entry.lines.len();
                }
            }
            Ok(())
        };

        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .with_context(|| format!("Failed to read log content after line {}", stats.total_lines))?;
            if read == 0 {
                break;
            }
            stats.bytes_read += read as u64;
            stats.total_lines += 1;

            let line = trim_line_ending(&buf);
            let text = String::from_utf8_lossy(line);

            match self.pattern.captures(&text) {
                Some(captures) => {
                    flush(current.take(), &mut stats)?;

                    let stamp = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
                    match parse_local(stamp, self.time_format) {
                        Ok(timestamp) => {
                            current = Some(Entry {
                                in_window: window.contains(&timestamp),
                                lines: vec![line.to_vec()],
                            });
                        }
                        Err(err) => {
                            warn!("Skipping entry at line {}: {:#}", stats.total_lines, err);
                            current = Some(Entry {
                                in_window: false,
                                lines: Vec::new(),
                            });
                        }
                    }
                }
                None => match current.as_mut() {
                    Some(entry) => entry.lines.push(line.to_vec()),
                    None => debug!("Ignoring line {} outside of any entry", stats.total_lines),
                },
            }
        }

        flush(current.take(), &mut stats)?;
        Ok(stats)
    }
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Output file opened on the first matching entry, header first.
struct LazyOutput<'a> {
    path: &'a Path,
    source: &'a Path,
    window: &'a TimeWindow,
    writer: Option<BufWriter<File>>,
}

impl<'a> LazyOutput<'a> {
    fn new(path: &'a Path, source: &'a Path, window: &'a TimeWindow) -> Self {
        LazyOutput {
            path,
            source,
            window,
            writer: None,
        }
    }

    fn write_entry(&mut self, lines: &[Vec<u8>]) -> Result<()> {
        if self.writer.is_none() {
            let file = File::create(self.path)
                .with_context(|| format!("Failed to create output file {}", self.path.display()))?;
            let mut writer = BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file);
            write_header(&mut writer, self.source, self.window)?;
            self.writer = Some(writer);
        }

        if let Some(writer) = self.writer.as_mut() {
            for line in lines {
                writer.write_all(line)?;
                writer.write_all(b"\n")?;
            }
        }
        Ok(())
    }

    /// Flush the file if one was opened. Returns whether it exists.
    fn finish(self) -> Result<bool> {
        match self.writer {
            Some(mut writer) => {
                writer
                    .flush()
                    .with_context(|| format!("Failed to flush {}", self.path.display()))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Write the provenance header preceding extracted entries.
pub fn write_header(writer: &mut impl Write, source: &Path, window: &TimeWindow) -> Result<()> {
    writeln!(writer, "# original log file: {}", source.display())?;
    writeln!(
        writer,
        "# time range: {} to {}",
        window.start.format(HEADER_TIME_FORMAT),
        window.end.format(HEADER_TIME_FORMAT)
    )?;
    writeln!(writer)?;
    Ok(())
}
