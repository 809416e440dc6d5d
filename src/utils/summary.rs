use anyhow::{Context, Result};
use chrono::Local;
use serde_json::json;
use uuid::Uuid;

use crate::collectors::collector::CollectionReport;
use crate::config::BuildInfo;
use crate::constants::HEADER_TIME_FORMAT;

/// Create a JSON summary of a collection run.
///
/// # Arguments
///
/// * `report` - Result of a successful collection
/// * `build` - Metadata of the binary that ran it
///
/// # Returns
///
/// Pretty-printed JSON with a fresh collection id.
///
/// # Example Output
///
/// ```json
/// {
///   "collection_id": "550e8400-e29b-41d4-a716-446655440000",
///   "hostname": "cell-07",
///   "build": { "name": "logsnap", "version": "0.4.0", "git_hash": "1a2b3c4" },
///   "window": { "start": "2025-02-28 10:00:00", "end": "2025-02-28 11:00:00" },
///   "archive": { "path": "./logsnap_20250228_100000_20250228_110000.zip", ... },
///   "sources": [...]
/// }
/// ```
pub fn create_collection_summary(report: &CollectionReport, build: &BuildInfo) -> Result<String> {
    let hostname = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    let sources: Vec<_> = report
        .sources
        .iter()
        .map(|source| {
            let file_errors: Vec<&str> = source
                .results
                .iter()
                .filter_map(|r| r.error.as_deref())
                .collect();

            json!({
                "name": source.source_name,
                "output_path": source.output_path,
                "total_lines": source.total_lines(),
                "matched_lines": source.matched_lines(),
                "file_count": source.file_count(),
                "matched_files": source.matched_files(),
                "file_size_bytes": source.file_size_bytes(),
                "error": source.error,
                "file_errors": file_errors,
            })
        })
        .collect();

    let summary = json!({
        "collection_id": Uuid::new_v4().to_string(),
        "hostname": hostname,
        "collection_time": Local::now().to_rfc3339(),
        "build": build,
        "window": {
            "start": report.window.start.format(HEADER_TIME_FORMAT).to_string(),
            "end": report.window.end.format(HEADER_TIME_FORMAT).to_string(),
        },
        "archive": {
            "path": report.archive_path,
            "entries": report.archive.entries,
            "input_bytes": report.archive.input_bytes,
            "archive_bytes": report.archive.archive_bytes,
        },
        "totals": {
            "total_lines": report.total_lines(),
            "matched_lines": report.matched_lines(),
            "file_count": report.file_count(),
            "file_size_bytes": report.file_size_bytes(),
        },
        "sources": sources,
    });

    serde_json::to_string_pretty(&summary).context("Failed to serialize collection summary")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FileProcessResult, SourceResult, TimeWindow};
    use crate::utils::compress::ArchiveStats;
    use chrono::TimeZone;
    use std::path::PathBuf;

    fn report() -> CollectionReport {
        let mut hmi = SourceResult::new("xyz-hmi");
        hmi.results.push(FileProcessResult {
            file_count: 1,
            total_lines: 10,
            matched_lines: 4,
            matched_files: 1,
            file_size_bytes: 512,
            ..Default::default()
        });
        hmi.results.push(FileProcessResult::failed(
            std::path::Path::new("/logs/bad.log"),
            &anyhow::anyhow!("unreadable"),
        ));

        let mut server = SourceResult::new("xyz-max-hmi-server");
        server.error = Some("no providers".to_string());

        CollectionReport {
            archive_path: PathBuf::from("/out/snap.zip"),
            window: TimeWindow::new(
                Local.with_ymd_and_hms(2025, 2, 28, 10, 0, 0).unwrap(),
                Local.with_ymd_and_hms(2025, 2, 28, 11, 0, 0).unwrap(),
            )
            .unwrap(),
            sources: vec![hmi, server],
            archive: ArchiveStats {
                path: PathBuf::from("/out/snap.zip"),
                entries: 1,
                input_bytes: 300,
                archive_bytes: 200,
                batches: 1,
            },
        }
    }

    #[test]
    fn test_summary_contents() -> Result<()> {
        let build = BuildInfo {
            name: "logsnap".to_string(),
            version: "0.4.0".to_string(),
            git_hash: Some("abc1234".to_string()),
        };
        let summary: serde_json::Value = serde_json::from_str(&create_collection_summary(&report(), &build)?)?;

        assert!(Uuid::parse_str(summary["collection_id"].as_str().unwrap_or_default()).is_ok());
        assert_eq!(summary["build"]["git_hash"], "abc1234");
        assert_eq!(summary["window"]["start"], "2025-02-28 10:00:00");
        assert_eq!(summary["archive"]["path"], "/out/snap.zip");
        assert_eq!(summary["totals"]["matched_lines"], 4);

        let sources = summary["sources"].as_array().unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0]["file_errors"].as_array().unwrap().len(), 1);
        assert_eq!(sources[1]["error"], "no providers");
        Ok(())
    }

    #[test]
    fn test_summary_ids_are_unique() -> Result<()> {
        let build = BuildInfo::current();
        let first: serde_json::Value = serde_json::from_str(&create_collection_summary(&report(), &build)?)?;
        let second: serde_json::Value = serde_json::from_str(&create_collection_summary(&report(), &build)?)?;
        assert_ne!(first["collection_id"], second["collection_id"]);
        Ok(())
    }
}
