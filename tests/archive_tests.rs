//! Integration tests for the batched archiver.

use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::Path;

use anyhow::Result;
use tempfile::TempDir;
use zip::{CompressionMethod, ZipArchive};

use logsnap::utils::compress::{verify_archive, zip_directory};

/// 120 files spread over nested directories, contents derived from the path.
fn create_tree(root: &Path) -> Result<BTreeMap<String, Vec<u8>>> {
    let mut expected = BTreeMap::new();
    for dir in 0..6 {
        for file in 0..20 {
            let rel = if file % 2 == 0 {
                format!("app_{}/node/f{:02}.log", dir, file)
            } else {
                format!("app_{}/f{:02}.log", dir, file)
            };
            let content = format!("{} line\n", rel).repeat(file + 1).into_bytes();

            let path = root.join(&rel);
            fs::create_dir_all(path.parent().unwrap())?;
            fs::write(&path, &content)?;
            expected.insert(rel, content);
        }
    }
    Ok(expected)
}

fn read_entries(path: &Path) -> Result<Vec<(String, Vec<u8>, CompressionMethod)>> {
    let mut archive = ZipArchive::new(fs::File::open(path)?)?;
    let mut entries = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let mut content = Vec::new();
        entry.read_to_end(&mut content)?;
        entries.push((entry.name().to_string(), content, entry.compression()));
    }
    Ok(entries)
}

#[test]
fn test_round_trip_preserves_paths_and_bytes() -> Result<()> {
    let source = TempDir::new()?;
    let expected = create_tree(source.path())?;
    let out = TempDir::new()?;

    for concurrency in [Some(1), Some(7), None] {
        let dest = out.path().join("snap.zip");
        let stats = zip_directory(source.path(), &dest, concurrency)?;
        assert_eq!(stats.entries, expected.len());

        let entries = read_entries(&dest)?;
        let names: Vec<&str> = entries.iter().map(|(name, _, _)| name.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted, "entries are merged in path order");

        for (name, content, method) in &entries {
            assert_eq!(Some(content), expected.get(name));
            assert_eq!(*method, CompressionMethod::Deflated);
        }
    }
    Ok(())
}

#[test]
fn test_batch_count_follows_concurrency() -> Result<()> {
    let source = TempDir::new()?;
    create_tree(source.path())?;
    let out = TempDir::new()?;

    let stats = zip_directory(source.path(), &out.path().join("a.zip"), Some(7))?;
    assert_eq!(stats.batches, 7);

    let stats = zip_directory(source.path(), &out.path().join("b.zip"), Some(1))?;
    assert_eq!(stats.batches, 1);
    Ok(())
}

#[test]
fn test_empty_tree_gives_valid_archive() -> Result<()> {
    let source = TempDir::new()?;
    fs::create_dir_all(source.path().join("only/dirs"))?;
    let out = TempDir::new()?;
    let dest = out.path().join("empty.zip");

    let stats = zip_directory(source.path(), &dest, None)?;
    assert_eq!(stats.entries, 0);
    assert_eq!(verify_archive(&dest)?, 0);
    Ok(())
}
