//! glog-style rotated program logs.
//!
//! Names look like `bin.host.user.log.ERROR.20250228-094825.2966778`: one
//! rotation sequence per severity, the embedded stamp marks when the file was
//! opened. Lines start with the severity letter and a microsecond timestamp,
//! e.g. `I20250228 09:48:25.123456 2966778 main.cc:42] started`.

use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;

use super::stamped_record;
use crate::collectors::provider::{ClassifiedProvider, FileInfoClassifier};
use crate::collectors::reader::ReaderKind;
use crate::collectors::strategy::{ContentStrategy, LineFilter, OutputNaming};
use crate::models::FileRecord;
use crate::utils::time::parse_local;

const NAME_PATTERN: &str = r"\.(\d{8}-\d{6})\.";
const NAME_TIME_FORMAT: &str = "%Y%m%d-%H%M%S";
const LINE_PATTERN: &str = r"[IWEF](\d{8} \d{2}:\d{2}:\d{2}\.\d{6})";
const LINE_TIME_FORMAT: &str = "%Y%m%d %H:%M:%S%.f";

pub struct CppLogClassifier {
    pattern: Regex,
}

impl CppLogClassifier {
    pub fn new() -> Result<Self> {
        Ok(CppLogClassifier {
            pattern: Regex::new(NAME_PATTERN).context("Invalid program log name pattern")?,
        })
    }
}

impl FileInfoClassifier for CppLogClassifier {
    fn is_match(&self, file_name: &str) -> bool {
        self.pattern.is_match(file_name)
    }

    fn classify(&self, path: &Path, file_name: &str) -> Result<FileRecord> {
        stamped_record(&self.pattern, path, file_name, "log", |stamp| {
            parse_local(stamp, NAME_TIME_FORMAT)
        })
    }
}

/// Rotation sequence a file belongs to.
pub fn severity_group(record: &FileRecord) -> u8 {
    let name = &record.file_name;
    if name.contains(".INFO.") {
        0
    } else if name.contains(".WARNING.") {
        1
    } else if name.contains(".ERROR.") {
        2
    } else {
        3
    }
}

pub fn provider() -> Result<ClassifiedProvider> {
    let filter = LineFilter {
        pattern: Regex::new(LINE_PATTERN).context("Invalid program log line pattern")?,
        time_format: LINE_TIME_FORMAT,
        naming: OutputNaming::Keep,
        reader: ReaderKind::PlainFile,
    };

    Ok(ClassifiedProvider::new(
        "cpp_log",
        CppLogClassifier::new()?,
        &[],
        ContentStrategy::Filter(filter),
    )
    .grouped(severity_group))
}
