//! File categories of the built-in log kinds.
//!
//! Each submodule owns the name and line grammar of one category and builds a
//! [`ClassifiedProvider`](crate::collectors::provider::ClassifiedProvider) for it.

pub mod cpp_log;
pub mod json_task;
pub mod server_log;
pub mod user_op;

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local};
use regex::Regex;

use crate::models::FileRecord;

/// Build a record from the timestamp captured by group 1 of `pattern`.
pub(crate) fn stamped_record(
    pattern: &Regex,
    path: &Path,
    file_name: &str,
    file_type: &str,
    parse: impl Fn(&str) -> Result<DateTime<Local>>,
) -> Result<FileRecord> {
    let stamp = pattern
        .captures(file_name)
        .and_then(|captures| captures.get(1))
        .ok_or_else(|| anyhow!("no timestamp in file name {}", file_name))?
        .as_str();

    let start_time =
        parse(stamp).with_context(|| format!("Invalid timestamp in file name {}", file_name))?;

    Ok(FileRecord::new(
        path.to_path_buf(),
        file_name,
        Some(start_time),
        file_type,
    ))
}
