//! Property tests for start-time sorting and window filtering.

use std::path::PathBuf;

use chrono::{DateTime, Duration, Local, TimeZone};
use proptest::prelude::*;

use logsnap::collectors::filter::{filter_by_time_range, sort_and_filter, sort_by_start_time};
use logsnap::models::{FileRecord, TimeWindow};

fn base() -> DateTime<Local> {
    Local.with_ymd_and_hms(2025, 2, 28, 0, 0, 0).unwrap()
}

fn record(index: usize, offset: Option<i64>) -> FileRecord {
    FileRecord::new(
        PathBuf::from(format!("/logs/{}.log", index)),
        format!("{}.log", index),
        offset.map(|minutes| base() + Duration::minutes(minutes)),
        "log",
    )
}

fn records(offsets: &[Option<i64>]) -> Vec<FileRecord> {
    offsets
        .iter()
        .enumerate()
        .map(|(i, offset)| record(i, *offset))
        .collect()
}

prop_compose! {
    fn arb_window()(start in 0i64..1440, len in 0i64..600) -> TimeWindow {
        TimeWindow::new(base() + Duration::minutes(start), base() + Duration::minutes(start + len)).unwrap()
    }
}

proptest! {
    #[test]
    fn undated_records_sort_last(offsets in prop::collection::vec(prop::option::of(0i64..2000), 0..40)) {
        let mut items = records(&offsets);
        sort_by_start_time(&mut items);

        let first_undated = items.iter().position(|r| r.start_time.is_none()).unwrap_or(items.len());
        prop_assert!(items[first_undated..].iter().all(|r| r.start_time.is_none()));
        prop_assert!(items[..first_undated]
            .windows(2)
            .all(|pair| pair[0].start_time <= pair[1].start_time));
    }

    #[test]
    fn retained_records_overlap_the_window(
        offsets in prop::collection::vec(prop::option::of(0i64..2000), 0..40),
        window in arb_window(),
    ) {
        let now = base() + Duration::minutes(3000);
        let mut items = records(&offsets);
        let kept = sort_and_filter(&mut items, &window, now, None);

        // `items` is now sorted; recompute each record's lifetime end.
        for (i, item) in items.iter().enumerate() {
            let retained = kept.iter().any(|k| k.path == item.path);
            let Some(start) = item.start_time else {
                prop_assert!(retained, "undated record dropped");
                continue;
            };
            let end = items
                .get(i + 1)
                .and_then(|next| next.start_time)
                .unwrap_or(now);
            prop_assert_eq!(retained, window.overlaps(&start, &end));
        }
    }

    #[test]
    fn latest_file_started_before_window_is_kept(
        offsets in prop::collection::vec(0i64..2000, 1..40),
        window in arb_window(),
    ) {
        let now = base() + Duration::minutes(3000);
        let mut items = records(&offsets.iter().map(|o| Some(*o)).collect::<Vec<_>>());
        let kept = sort_and_filter(&mut items, &window, now, None);

        if let Some(latest_before) = items
            .iter()
            .filter(|r| r.start_time.map_or(false, |s| s <= window.start))
            .last()
        {
            let latest_start = latest_before.start_time;
            prop_assert!(kept.iter().any(|k| k.start_time == latest_start));
        }
    }
}

#[test]
fn three_file_scenario_keeps_first_two() {
    let window = TimeWindow::new(
        base() + Duration::minutes(10 * 60 + 15),
        base() + Duration::minutes(10 * 60 + 45),
    )
    .unwrap();
    let items = records(&[Some(600), Some(630), Some(660)]);
    let now = base() + Duration::minutes(12 * 60);

    let kept = filter_by_time_range(&items, &window, now, None);
    let names: Vec<&str> = kept.iter().map(|r| r.file_name.as_str()).collect();
    assert_eq!(names, vec!["0.log", "1.log"]);
}

#[test]
fn current_file_survives_any_window() {
    let window = TimeWindow::new(base(), base() + Duration::minutes(1)).unwrap();
    let mut items = records(&[None, Some(900), Some(1200)]);
    let kept = sort_and_filter(&mut items, &window, base() + Duration::minutes(2000), None);

    assert_eq!(kept.len(), 1);
    assert!(kept[0].is_current());
}
