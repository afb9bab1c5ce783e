//! Spreading angles around a node so that adjacent ones keep a minimum gap.

use crate::normalize_degrees;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
struct Entry<K> {
    key: K,
    angle: f32,
    fixed: bool,
}

/// Result of [`distribute_circular`].
#[derive(Debug, Clone, PartialEq)]
pub struct CircularLayout<K> {
    /// Final angle of every floating key, in degrees.
    pub angles: BTreeMap<K, f32>,
    /// Keys of every run that was too dense, in angular order.
    pub runs: Vec<Vec<K>>,
}

/// Redistribute floating angles that crowd each other or fixed angles.
///
/// Angles are in degrees. A run of adjacent angles is too dense when its span is
/// less than `(len - 1) * min_separation`. Only floating members of such runs
/// move; fixed angles and floating angles outside any run keep their value.
pub fn distribute_circular<K: Ord + Clone>(
    floating: &BTreeMap<K, f32>,
    fixed: &BTreeMap<K, f32>,
    min_separation: f32,
) -> CircularLayout<K> {
    let mut entries: Vec<Entry<K>> = floating
        .iter()
        .map(|(key, &angle)| Entry {
            key: key.clone(),
            angle: normalize_degrees(angle),
            fixed: false,
        })
        .chain(fixed.iter().map(|(key, &angle)| Entry {
            key: key.clone(),
            angle: normalize_degrees(angle),
            fixed: true,
        }))
        .collect();
    entries.sort_by(|a, b| a.angle.total_cmp(&b.angle));

    let mut layout = CircularLayout {
        angles: floating
            .iter()
            .map(|(key, &angle)| (key.clone(), angle))
            .collect(),
        runs: Vec::new(),
    };

    let count = entries.len();
    if count < 2 || min_separation <= 0.0 {
        return layout;
    }

    let wrap = |index: usize| index % count;
    let wrap_back = |index: usize| (index + count - 1) % count;
    let run_len = |start: usize, end: usize| {
        if start < end {
            end - start + 1
        } else {
            end + count - start + 1
        }
    };
    let span = |start: usize, end: usize| {
        let delta = entries[end].angle - entries[start].angle;
        if start < end { delta } else { 360.0 + delta }
    };
    let too_dense = |start: usize, end: usize| {
        span(start, end) < (run_len(start, end) - 1) as f32 * min_separation
    };

    let mut claimed = vec![false; count];
    let mut runs: Vec<(usize, usize)> = Vec::new();
    let iteration_limit = count * 4 + 8;
    let mut iterations = 0;

    let mut index = 0;
    while index < count {
        let next = wrap(index + 1);
        if claimed[index] || claimed[next] || !too_dense(index, next) {
            index += 1;
            continue;
        }

        let (mut start, mut end) = (index, next);
        loop {
            iterations += 1;
            if iterations > iteration_limit {
                tracing::warn!(
                    "Circular distribution of {} angles hit its iteration bound",
                    count
                );
                break;
            }
            if run_len(start, end) >= count {
                break;
            }
            let after = wrap(end + 1);
            if !claimed[after] && too_dense(start, after) {
                end = after;
                continue;
            }
            let before = wrap_back(start);
            if !claimed[before] && too_dense(before, end) {
                start = before;
                continue;
            }
            break;
        }

        let len = run_len(start, end);
        for offset in 0..len {
            claimed[wrap(start + offset)] = true;
        }
        runs.push((start, end));

        if end < index {
            // Run wrapped past the end of the list
            break;
        }
        index = end + 1;
    }

    for (start, end) in runs {
        let len = run_len(start, end);
        let run_span = span(start, end);
        let first = &entries[start];
        let last = &entries[end];
        for offset in 0..len {
            let entry = &entries[wrap(start + offset)];
            if entry.fixed {
                continue;
            }
            let k = offset as f32;
            let angle = match (first.fixed, last.fixed) {
                (true, true) => first.angle + k * run_span / (len - 1) as f32,
                (true, false) => first.angle + k * min_separation,
                (false, true) => last.angle - (len - 1 - offset) as f32 * min_separation,
                (false, false) => {
                    let centre = first.angle + run_span / 2.0;
                    centre + (k - (len - 1) as f32 / 2.0) * min_separation
                }
            };
            layout
                .angles
                .insert(entry.key.clone(), normalize_degrees(angle));
        }
        layout.runs.push(
            (0..len)
                .map(|offset| entries[wrap(start + offset)].key.clone())
                .collect(),
        );
    }

    layout
}
