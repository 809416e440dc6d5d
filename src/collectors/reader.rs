//! How a log file's bytes are reached.
//!
//! Most logs are plain files. Rotated server logs are stored as a zip holding
//! a single `<name>.log`; scanning one of those opens the container, finds the
//! entry and hands its decompressed stream to the caller. Both layers are
//! dropped together when the closure returns.

use std::fs::File;
use std::io::{BufReader, Read};

use anyhow::{anyhow, Context, Result};
use log::debug;

use crate::models::FileRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderKind {
    PlainFile,
    /// The entry whose base name equals the record's file name minus `.zip`.
    ZipEntry,
}

impl ReaderKind {
    /// Run `scan` over the content of `record`.
    pub fn scan<T>(
        &self,
        record: &FileRecord,
        scan: impl FnOnce(&mut dyn Read) -> Result<T>,
    ) -> Result<T> {
        match self {
            ReaderKind::PlainFile => {
                let mut file = File::open(&record.path)
                    .with_context(|| format!("Failed to open log file {}", record.path.display()))?;
                scan(&mut file)
            }
            ReaderKind::ZipEntry => scan_zip_entry(record, scan),
        }
    }
}

fn scan_zip_entry<T>(
    record: &FileRecord,
    scan: impl FnOnce(&mut dyn Read) -> Result<T>,
) -> Result<T> {
    let file = File::open(&record.path)
        .with_context(|| format!("Failed to open zip file {}", record.path.display()))?;
    let mut archive = zip::ZipArchive::new(BufReader::new(file))
        .with_context(|| format!("Failed to read zip file {}", record.path.display()))?;

    let wanted = record
        .file_name
        .strip_suffix(".zip")
        .unwrap_or(&record.file_name);

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).with_context(|| {
            format!("Failed to read entry {} of {}", index, record.path.display())
        })?;

        let base_name = entry.name().rsplit('/').next().unwrap_or_default();
        if base_name == wanted {
            debug!("Reading {} from {}", entry.name(), record.path.display());
            return scan(&mut entry);
        }
    }

    Err(anyhow!(
        "log file {} not found in zip file {}",
        wanted,
        record.path.display()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::FileOptions;

    fn read_all(kind: ReaderKind, record: &FileRecord) -> Result<String> {
        kind.scan(record, |reader| {
            let mut content = String::new();
            reader.read_to_string(&mut content)?;
            Ok(content)
        })
    }

    #[test]
    fn test_plain_file_reader() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("server.log");
        std::fs::write(&path, "hello\n")?;

        let record = FileRecord::new(path, "server.log", None, "log");
        assert_eq!(read_all(ReaderKind::PlainFile, &record)?, "hello\n");
        Ok(())
    }

    #[test]
    fn test_zip_entry_reader_finds_nested_log() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let name = "server.2025-03-05_20-35-21_035329.log.zip";
        let path = temp_dir.path().join(name);

        let mut writer = zip::ZipWriter::new(File::create(&path)?);
        writer.start_file("notes.txt", FileOptions::default())?;
        writer.write_all(b"ignored")?;
        writer.start_file(
            "nested/server.2025-03-05_20-35-21_035329.log",
            FileOptions::default(),
        )?;
        writer.write_all(b"archived line\n")?;
        writer.finish()?;

        let record = FileRecord::new(path, name, None, "zip");
        assert_eq!(read_all(ReaderKind::ZipEntry, &record)?, "archived line\n");
        Ok(())
    }

    #[test]
    fn test_zip_entry_reader_missing_entry() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let name = "server.log.zip";
        let path = temp_dir.path().join(name);

        let mut writer = zip::ZipWriter::new(File::create(&path)?);
        writer.start_file("other.log", FileOptions::default())?;
        writer.write_all(b"x")?;
        writer.finish()?;

        let record = FileRecord::new(path, name, None, "zip");
        let err = read_all(ReaderKind::ZipEntry, &record).unwrap_err();
        assert!(err.to_string().contains("not found"));
        Ok(())
    }
}
