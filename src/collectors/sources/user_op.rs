//! Operator action logs of the HMI.
//!
//! One file per session named `YYYYMMDD-HHMMSS.<anything>`, lines like
//! `20250228 10:20:30.123] clicked "Start"`.

use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;

use super::stamped_record;
use crate::collectors::provider::{ClassifiedProvider, FileInfoClassifier};
use crate::collectors::reader::ReaderKind;
use crate::collectors::strategy::{ContentStrategy, LineFilter, OutputNaming};
use crate::models::FileRecord;
use crate::utils::time::parse_local;

const NAME_PATTERN: &str = r"^(\d{8}-\d{6})\.";
const NAME_TIME_FORMAT: &str = "%Y%m%d-%H%M%S";
const LINE_PATTERN: &str = r"^(\d{8} \d{2}:\d{2}:\d{2}\.\d{3})\]";
const LINE_TIME_FORMAT: &str = "%Y%m%d %H:%M:%S%.f";

pub struct UserOpClassifier {
    pattern: Regex,
}

impl UserOpClassifier {
    pub fn new() -> Result<Self> {
        Ok(UserOpClassifier {
            pattern: Regex::new(NAME_PATTERN).context("Invalid user operation name pattern")?,
        })
    }
}

impl FileInfoClassifier for UserOpClassifier {
    fn is_match(&self, file_name: &str) -> bool {
        self.pattern.is_match(file_name)
    }

    fn classify(&self, path: &Path, file_name: &str) -> Result<FileRecord> {
        stamped_record(&self.pattern, path, file_name, "user_op", |stamp| {
            parse_local(stamp, NAME_TIME_FORMAT)
        })
    }
}

pub fn provider() -> Result<ClassifiedProvider> {
    let filter = LineFilter {
        pattern: Regex::new(LINE_PATTERN).context("Invalid user operation line pattern")?,
        time_format: LINE_TIME_FORMAT,
        naming: OutputNaming::Keep,
        reader: ReaderKind::PlainFile,
    };

    Ok(ClassifiedProvider::new(
        "user_op",
        UserOpClassifier::new()?,
        &[],
        ContentStrategy::Filter(filter),
    ))
}
