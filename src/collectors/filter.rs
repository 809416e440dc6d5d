//! Time-range selection over rotated file sequences.
//!
//! A rotated log file covers the span from its own start time up to the start
//! of the next file in the sequence. The newest rotated file runs until "now",
//! and the active file (no embedded start time) is always kept.

use chrono::{DateTime, Local};

use crate::models::{FileRecord, TimeWindow};

/// Anything positioned in time by an embedded start timestamp.
///
/// `None` marks the active file, which sorts after every dated item.
pub trait HasStartTime {
    fn start_time(&self) -> Option<DateTime<Local>>;
}

impl HasStartTime for FileRecord {
    fn start_time(&self) -> Option<DateTime<Local>> {
        self.start_time
    }
}

/// Caller-supplied end of item `index` in a sorted slice.
pub type EndTimeFn<'a, T> = dyn Fn(&[T], usize) -> DateTime<Local> + 'a;

/// Stable ascending sort by start time, undated items last.
pub fn sort_by_start_time<T: HasStartTime>(items: &mut [T]) {
    items.sort_by(|a, b| match (a.start_time(), b.start_time()) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
}

/// Keep the items of a sorted slice whose covered span overlaps `window`.
///
/// # Arguments
///
/// * `items` - Items already ordered by [`sort_by_start_time`]
/// * `window` - Inclusive window to test against
/// * `now` - End of the newest dated item
/// * `end_time` - Optional override for an item's end
pub fn filter_by_time_range<T: HasStartTime + Clone>(
    items: &[T],
    window: &TimeWindow,
    now: DateTime<Local>,
    end_time: Option<&EndTimeFn<'_, T>>,
) -> Vec<T> {
    items
        .iter()
        .enumerate()
        .filter(|(index, item)| {
            let Some(start) = item.start_time() else {
                return true;
            };

            let end = match end_time {
                Some(end_time) => end_time(items, *index),
                None => items
                    .get(index + 1)
                    .and_then(|next| next.start_time())
                    .unwrap_or(now),
            };

            window.overlaps(&start, &end)
        })
        .map(|(_, item)| item.clone())
        .collect()
}

/// Sort `items` in place, then select the ones overlapping `window`.
pub fn sort_and_filter<T: HasStartTime + Clone>(
    items: &mut [T],
    window: &TimeWindow,
    now: DateTime<Local>,
    end_time: Option<&EndTimeFn<'_, T>>,
) -> Vec<T> {
    sort_by_start_time(items);
    filter_by_time_range(items, window, now, end_time)
}

/// Filter each group on its own, then merge and re-sort the survivors.
///
/// Groups are independent rotation sequences (one per severity, say), so a
/// file's span ends at the next file of its own group only.
pub fn filter_grouped<T, K, F>(
    items: Vec<T>,
    window: &TimeWindow,
    now: DateTime<Local>,
    group_of: F,
) -> Vec<T>
where
    T: HasStartTime + Clone,
    K: Ord,
    F: Fn(&T) -> K,
{
    let mut groups: std::collections::BTreeMap<K, Vec<T>> = std::collections::BTreeMap::new();
    for item in items {
        groups.entry(group_of(&item)).or_default().push(item);
    }

    let mut selected: Vec<T> = groups
        .into_values()
        .flat_map(|mut group| sort_and_filter(&mut group, window, now, None))
        .collect();

    sort_by_start_time(&mut selected);
    selected
}
