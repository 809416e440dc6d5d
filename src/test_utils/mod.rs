//! Fixtures shared by unit tests: windows on a fixed day and small log trees.

#![cfg(test)]

use anyhow::Result;
use chrono::{DateTime, Local, TimeZone};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

use crate::models::TimeWindow;

/// Local time on 2025-02-28.
pub fn at(hour: u32, minute: u32) -> DateTime<Local> {
    Local
        .with_ymd_and_hms(2025, 2, 28, hour, minute, 0)
        .single()
        .unwrap_or_else(|| panic!("ambiguous local time {}:{}", hour, minute))
}

/// Window between two times of 2025-02-28.
pub fn window(start: (u32, u32), end: (u32, u32)) -> TimeWindow {
    TimeWindow {
        start: at(start.0, start.1),
        end: at(end.0, end.1),
    }
}

/// Write `content` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, content: &str) -> Result<()> {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

/// A two-level tree of glog-style files for 2025-02-28.
///
/// Layout:
/// - `hmi.log.INFO.20250228-100000.1`: one in-window entry with a continuation
///   line, one entry at 11:30
/// - `node/hmi.log.WARNING.20250228-093000.1`: one entry at 10:20
/// - `node/deep/hmi.log.INFO.20250228-120000.1`: starts after the 10:00-11:00 window
pub fn create_cpp_log_tree() -> Result<TempDir> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();

    write_file(
        root,
        "hmi.log.INFO.20250228-100000.1",
        "I20250228 10:15:00.000000 11 main.cc:10] starting\n\
         \tcontinued detail\n\
         I20250228 11:30:00.000000 11 main.cc:20] later\n",
    )?;
    write_file(
        root,
        "node/hmi.log.WARNING.20250228-093000.1",
        "W20250228 10:20:00.000000 12 node.cc:5] slow response\n",
    )?;
    write_file(
        root,
        "node/deep/hmi.log.INFO.20250228-120000.1",
        "I20250228 12:00:01.000000 13 deep.cc:1] noon\n",
    )?;

    Ok(temp_dir)
}
