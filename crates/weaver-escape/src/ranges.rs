use std::cmp::Ordering;

use crate::snippet::Offset;

fn outer_first(a: Offset, b: Offset) -> Ordering {
    match a.start.cmp(&b.start) {
        // At the same start the longer range sorts first so it wins the sweep.
        Ordering::Equal => b.end.cmp(&a.end),
        ord => ord,
    }
}

/// Keep the outermost, pairwise-disjoint ranges of `items`.
///
/// Items are sorted by ascending start (longer first on ties) and swept left to
/// right; an item is kept when it starts at or after the end of the last kept
/// item. The result is in ascending start order. Adjacent ranges are both kept.
pub fn outermost_ranges<T, F>(mut items: Vec<T>, offset: F) -> Vec<T>
where
    F: Fn(&T) -> Offset,
{
    items.sort_by(|a, b| outer_first(offset(a), offset(b)));

    let mut current = 0;
    let mut kept = Vec::with_capacity(items.len());
    for item in items {
        let range = offset(&item);
        if range.start >= current {
            current = range.end;
            kept.push(item);
        }
    }
    kept
}
