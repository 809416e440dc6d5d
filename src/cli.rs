use anyhow::{anyhow, Result};
use chrono::{DateTime, Local};
use clap::{ArgGroup, Parser};
use std::path::PathBuf;

use crate::constants::DEFAULT_TIME_SPAN;
use crate::models::TimeWindow;
use crate::utils::time::{parse_relative_span, parse_time, CalendarRange};

/// Command-line arguments for logsnap.
///
/// The window is given by exactly one of: a relative span ending now, an
/// explicit `--start-time` (with optional `--end-time`), or a calendar
/// shortcut. With none of them the last 30 minutes are collected.
#[derive(Parser, Debug)]
#[clap(
    name = "logsnap",
    about = "Snapshot the logs of a time window into one zip archive",
    disable_version_flag = true
)]
#[clap(group(
    ArgGroup::new("window")
        .args(["span", "start_time", "today", "yesterday", "this_week"])
        .multiple(false)
))]
pub struct Args {
    /// Relative span ending now: <n>m, <n>h, <n>d or <n>w
    #[clap(value_name = "TIME")]
    pub span: Option<String>,

    /// Window start (RFC 3339, "YYYY-MM-DD HH:MM:SS", "HH:MM:SS", unix seconds, ...)
    #[clap(short = 's', long)]
    pub start_time: Option<String>,

    /// Window end, defaults to now
    #[clap(short = 'e', long, requires = "start_time")]
    pub end_time: Option<String>,

    /// Collect everything since midnight
    #[clap(long)]
    pub today: bool,

    /// Collect the whole of yesterday
    #[clap(long)]
    pub yesterday: bool,

    /// Collect everything since Monday 00:00
    #[clap(long)]
    pub this_week: bool,

    /// Root directory holding every application's logs
    #[clap(short = 'l', long)]
    pub log_dir: Option<PathBuf>,

    /// Directory receiving the snapshot archive
    #[clap(short = 'o', long)]
    pub output_dir: Option<PathBuf>,

    /// Log source to collect (repeatable; default: all)
    #[clap(short = 'p', long = "program")]
    pub programs: Vec<String>,

    /// Path to configuration YAML file
    #[clap(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Maximum workers per log directory
    #[clap(short = 'w', long)]
    pub workers: Option<usize>,

    /// Verbose logging
    #[clap(short, long)]
    pub verbose: bool,

    /// Print the JSON run summary
    #[clap(long)]
    pub json: bool,

    /// List the supported log sources and exit
    #[clap(long)]
    pub list_sources: bool,

    /// Print version information and exit
    #[clap(short = 'V', long)]
    pub version: bool,
}

impl Args {
    fn calendar_range(&self) -> Option<CalendarRange> {
        if self.today {
            Some(CalendarRange::Today)
        } else if self.yesterday {
            Some(CalendarRange::Yesterday)
        } else if self.this_week {
            Some(CalendarRange::ThisWeek)
        } else {
            None
        }
    }

    /// Resolve the requested window against `now`.
    ///
    /// An explicit start/end pair is returned as given, even when inverted;
    /// the collector rejects it before any I/O.
    pub fn resolve_window(&self, now: DateTime<Local>) -> Result<TimeWindow> {
        if let Some(range) = self.calendar_range() {
            return range.window(now);
        }

        if let Some(start) = &self.start_time {
            let start = parse_time(start)?;
            let end = match &self.end_time {
                Some(end) => parse_time(end)?,
                None => now,
            };
            return Ok(TimeWindow { start, end });
        }

        let span = self.span.as_deref().unwrap_or(DEFAULT_TIME_SPAN);
        let start = now
            .checked_sub_signed(parse_relative_span(span)?)
            .ok_or_else(|| anyhow!("time span '{}' reaches before the earliest supported time", span))?;
        TimeWindow::new(start, now)
    }
}
