use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;

use anyhow::{anyhow, bail, Context, Result};
use crossbeam::channel::unbounded;
use log::{debug, info, warn};
use walkdir::WalkDir;
use zip::{write::FileOptions, ZipArchive, ZipWriter};

use crate::constants::{
    ARCHIVE_COMPRESSION_LEVEL, ARCHIVE_ENTRY_PERMISSIONS, DEFAULT_BUFFER_SIZE, MAX_ARCHIVE_WORKERS,
};

/// Outcome of [`zip_directory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveStats {
    pub path: PathBuf,
    pub entries: usize,
    /// Uncompressed bytes of all entries.
    pub input_bytes: u64,
    pub archive_bytes: u64,
    pub batches: usize,
}

/// File queued for compression.
#[derive(Debug, Clone)]
struct FileEntry {
    rel_path: String,
    abs_path: PathBuf,
}

/// Options every archive entry is written with.
pub fn entry_options() -> FileOptions {
    FileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .compression_level(Some(ARCHIVE_COMPRESSION_LEVEL))
        .unix_permissions(ARCHIVE_ENTRY_PERMISSIONS)
}

/// Number of compression batches for `files` files.
pub fn batch_count(files: usize, concurrency: Option<usize>) -> usize {
    let workers = concurrency
        .filter(|workers| *workers > 0)
        .unwrap_or_else(num_cpus::get)
        .min(MAX_ARCHIVE_WORKERS);
    workers.min(files).max(1)
}

/// Pack every file below `source_dir` into the zip archive `dest`.
///
/// Files are split into contiguous batches, each compressed by its own thread
/// into a temporary archive, then the batches are merged in order by copying
/// the already-compressed entries. Entry names are `/`-separated paths
/// relative to `source_dir`. An empty tree produces a valid empty archive.
///
/// # Arguments
///
/// * `source_dir` - Directory to pack
/// * `dest` - Archive to create, replaced if it exists
/// * `concurrency` - Maximum batches, defaults to the CPU count
///
/// # Returns
///
/// Statistics of the finished archive. On any failure `dest` is removed.
pub fn zip_directory(
    source_dir: &Path,
    dest: &Path,
    concurrency: Option<usize>,
) -> Result<ArchiveStats> {
    let start = Instant::now();

    let result = build_archive(source_dir, dest, concurrency);
    match result {
        Ok(stats) => {
            info!(
                "Created archive {} ({} entries, {} bytes) in {:?}",
                stats.path.display(),
                stats.entries,
                stats.archive_bytes,
                start.elapsed()
            );
            Ok(stats)
        }
        Err(e) => {
            if dest.exists() {
                if let Err(remove_err) = fs::remove_file(dest) {
                    warn!(
                        "Failed to remove partial archive {}: {}",
                        dest.display(),
                        remove_err
                    );
                }
            }
            Err(e)
        }
    }
}

fn build_archive(source_dir: &Path, dest: &Path, concurrency: Option<usize>) -> Result<ArchiveStats> {
    if !source_dir.is_dir() {
        bail!("source {} is not a directory", source_dir.display());
    }

    if dest.exists() {
        fs::remove_file(dest)
            .with_context(|| format!("Failed to remove existing archive {}", dest.display()))?;
    }

    let files = scan_directory(source_dir)?;
    let input_bytes = files
        .iter()
        .filter_map(|entry| fs::metadata(&entry.abs_path).ok())
        .map(|metadata| metadata.len())
        .sum();

    if files.is_empty() {
        warn!("No files under {}, writing an empty archive", source_dir.display());
        let file = File::create(dest)
            .with_context(|| format!("Failed to create archive {}", dest.display()))?;
        ZipWriter::new(file)
            .finish()
            .context("Failed to finalize empty archive")?;
        let archive_bytes = verify_archive(dest).map(|_| file_len(dest))?;
        return Ok(ArchiveStats {
            path: dest.to_path_buf(),
            entries: 0,
            input_bytes: 0,
            archive_bytes,
            batches: 0,
        });
    }

    let batches = batch_count(files.len(), concurrency);
    let batch_size = (files.len() + batches - 1) / batches;
    info!(
        "Compressing {} files from {} in batches of {}",
        files.len(),
        source_dir.display(),
        batch_size
    );

    let scratch = tempfile::Builder::new()
        .prefix("logsnap_zip_")
        .tempdir()
        .context("Failed to create temporary directory for archive batches")?;

    let batch_paths = compress_batches(&files, batch_size, scratch.path())?;
    merge_archives(&batch_paths, dest)?;

    let entries = verify_archive(dest)?;
    if entries != files.len() {
        bail!(
            "archive {} holds {} entries, expected {}",
            dest.display(),
            entries,
            files.len()
        );
    }

    Ok(ArchiveStats {
        path: dest.to_path_buf(),
        entries,
        input_bytes,
        archive_bytes: file_len(dest),
        batches: batch_paths.len(),
    })
}

/// Every regular file below `base`, sorted by path, symlinks not followed.
fn scan_directory(base: &Path) -> Result<Vec<FileEntry>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(base)
        .follow_links(false)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
    {
        let entry = entry.with_context(|| format!("Failed to walk {}", base.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let rel_path = entry
            .path()
            .strip_prefix(base)
            .with_context(|| format!("{} is outside {}", entry.path().display(), base.display()))?;

        files.push(FileEntry {
            rel_path: archive_name(rel_path),
            abs_path: entry.path().to_path_buf(),
        });
    }
    Ok(files)
}

/// `/`-joined form of a relative path.
pub fn archive_name(rel_path: &Path) -> String {
    rel_path
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Compress each batch into `scratch/batch_<n>.zip`, one thread per batch.
fn compress_batches(files: &[FileEntry], batch_size: usize, scratch: &Path) -> Result<Vec<PathBuf>> {
    let (sender, receiver) = unbounded::<(usize, Result<PathBuf>)>();

    thread::scope(|scope| -> Result<()> {
        for (index, batch) in files.chunks(batch_size).enumerate() {
            let sender = sender.clone();
            let batch_path = scratch.join(format!("batch_{}.zip", index));

            thread::Builder::new()
                .name(format!("compression-{}", index))
                .spawn_scoped(scope, move || {
                    let result = compress_batch(batch, &batch_path).map(|_| batch_path);
                    // The receiver outlives the scope.
                    let _ = sender.send((index, result));
                })
                .with_context(|| format!("Failed to spawn compression worker {}", index))?;
        }
        Ok(())
    })?;
    drop(sender);

    let mut done: Vec<(usize, Result<PathBuf>)> = receiver.iter().collect();
    done.sort_by_key(|(index, _)| *index);

    done.into_iter()
        .map(|(index, result)| result.with_context(|| format!("Compression batch {} failed", index)))
        .collect()
}

fn compress_batch(batch: &[FileEntry], batch_path: &Path) -> Result<()> {
    let file = File::create(batch_path)
        .with_context(|| format!("Failed to create {}", batch_path.display()))?;
    let mut zip = ZipWriter::new(BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file));
    let options = entry_options();

    for entry in batch {
        let source = File::open(&entry.abs_path)
            .with_context(|| format!("Failed to open {}", entry.abs_path.display()))?;
        let mut reader = BufReader::with_capacity(DEFAULT_BUFFER_SIZE, source);

        zip.start_file(entry.rel_path.as_str(), options)
            .with_context(|| format!("Failed to start archive entry {}", entry.rel_path))?;
        let bytes = std::io::copy(&mut reader, &mut zip)
            .with_context(|| format!("Failed to compress {}", entry.abs_path.display()))?;

        debug!("Compressed {} ({} bytes)", entry.rel_path, bytes);
    }

    let mut writer = zip
        .finish()
        .with_context(|| format!("Failed to finalize {}", batch_path.display()))?;
    writer
        .flush()
        .with_context(|| format!("Failed to flush {}", batch_path.display()))?;
    Ok(())
}

/// Copy the entries of `sources`, in order, into a new archive `dest`.
///
/// Entries are copied raw, without recompressing.
fn merge_archives(sources: &[PathBuf], dest: &Path) -> Result<()> {
    let file = File::create(dest).with_context(|| format!("Failed to create archive {}", dest.display()))?;
    let mut writer = ZipWriter::new(BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file));

    for source in sources {
        let file = File::open(source).with_context(|| format!("Failed to open {}", source.display()))?;
        let mut archive = ZipArchive::new(BufReader::new(file))
            .with_context(|| format!("Failed to read {}", source.display()))?;

        for index in 0..archive.len() {
            let entry = archive
                .by_index_raw(index)
                .with_context(|| format!("Failed to read entry {} of {}", index, source.display()))?;
            let name = entry.name().to_string();
            writer
                .raw_copy_file(entry)
                .with_context(|| format!("Failed to copy entry {}", name))?;
        }
    }

    let mut inner = writer
        .finish()
        .with_context(|| format!("Failed to finalize archive {}", dest.display()))?;
    inner
        .flush()
        .with_context(|| format!("Failed to flush archive {}", dest.display()))?;
    Ok(())
}

/// Check that `path` is a non-empty, readable zip archive.
///
/// # Returns
///
/// The number of entries.
pub fn verify_archive(path: &Path) -> Result<usize> {
    let metadata = fs::metadata(path)
        .with_context(|| format!("Failed to stat archive {}", path.display()))?;
    if metadata.len() == 0 {
        return Err(anyhow!("archive {} is empty", path.display()));
    }

    let file = File::open(path).with_context(|| format!("Failed to open archive {}", path.display()))?;
    let archive = ZipArchive::new(BufReader::new(file))
        .with_context(|| format!("Archive {} is not a valid zip file", path.display()))?;
    Ok(archive.len())
}

fn file_len(path: &Path) -> u64 {
    fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    fn read_archive(path: &Path) -> Result<Vec<(String, Vec<u8>)>> {
        let mut archive = ZipArchive::new(File::open(path)?)?;
        let mut entries = Vec::new();
        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            let mut content = Vec::new();
            entry.read_to_end(&mut content)?;
            entries.push((entry.name().to_string(), content));
        }
        Ok(entries)
    }

    #[test]
    fn test_batch_count() {
        assert_eq!(batch_count(0, Some(4)), 1);
        assert_eq!(batch_count(3, Some(8)), 3);
        assert_eq!(batch_count(1000, Some(500)), MAX_ARCHIVE_WORKERS);
        assert_eq!(batch_count(10, Some(2)), 2);
    }

    #[test]
    fn test_archive_name_uses_forward_slashes() {
        let rel: PathBuf = ["xyz_hmi", "node", "app.log"].iter().collect();
        assert_eq!(archive_name(&rel), "xyz_hmi/node/app.log");
    }

    #[test]
    fn test_zip_directory_preserves_paths_and_bytes() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let source = temp_dir.path().join("tree");
        fs::create_dir_all(source.join("a/b"))?;
        fs::create_dir_all(source.join("empty"))?;
        fs::write(source.join("top.log"), b"top level\n")?;
        fs::write(source.join("a/one.log"), b"one\n")?;
        fs::write(source.join("a/b/two.bin"), [0u8, 159, 146, 150])?;

        for concurrency in [Some(1), Some(3)] {
            let dest = temp_dir.path().join(format!("out-{:?}.zip", concurrency));
            let stats = zip_directory(&source, &dest, concurrency)?;
            assert_eq!(stats.entries, 3);
            assert_eq!(stats.input_bytes, 18);

            let entries = read_archive(&dest)?;
            assert_eq!(
                entries,
                vec![
                    ("a/b/two.bin".to_string(), vec![0u8, 159, 146, 150]),
                    ("a/one.log".to_string(), b"one\n".to_vec()),
                    ("top.log".to_string(), b"top level\n".to_vec()),
                ]
            );
        }
        Ok(())
    }

    #[test]
    fn test_zip_directory_empty_tree() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let source = temp_dir.path().join("empty");
        fs::create_dir(&source)?;
        let dest = temp_dir.path().join("empty.zip");

        let stats = zip_directory(&source, &dest, None)?;
        assert_eq!(stats.entries, 0);
        assert_eq!(verify_archive(&dest)?, 0);
        Ok(())
    }

    #[test]
    fn test_zip_directory_replaces_existing_archive() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let source = temp_dir.path().join("tree");
        fs::create_dir(&source)?;
        fs::write(source.join("x.log"), "x")?;
        let dest = temp_dir.path().join("snap.zip");
        fs::write(&dest, "stale, not a zip")?;

        zip_directory(&source, &dest, None)?;
        assert_eq!(verify_archive(&dest)?, 1);
        Ok(())
    }

    #[test]
    fn test_zip_directory_missing_source_leaves_nothing() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let dest = temp_dir.path().join("snap.zip");
        fs::write(&dest, "stale")?;

        assert!(zip_directory(&temp_dir.path().join("absent"), &dest, None).is_err());
        assert!(!dest.exists());
        Ok(())
    }

    #[test]
    fn test_verify_archive_rejects_garbage() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let empty = temp_dir.path().join("empty.zip");
        File::create(&empty)?;
        assert!(verify_archive(&empty).is_err());

        let garbage = temp_dir.path().join("garbage.zip");
        fs::write(&garbage, "definitely not a zip")?;
        assert!(verify_archive(&garbage).is_err());
        Ok(())
    }
}
