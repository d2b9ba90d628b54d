use std::ops::Range;

use orion_error::prelude::*;

use super::view::Window;
use crate::error::{CoreReason, CoreResult};

/// Split `window` into up to `parts` smaller windows covering the same
/// messages in order.
///
/// The window's time span is cut into `parts` equal slices (the last one
/// closed at `end_time`) and empty slices are dropped. When the timestamps
/// are too clustered to give at least two parts, messages are divided by
/// count instead. A single-message window comes back unchanged as one part.
///
/// Each part keeps the parent's window index; only the part(s) covering the
/// parent's overlap prefix report a non-zero overlap.
pub fn split_window<'a>(window: &Window<'a>, parts: usize) -> CoreResult<Vec<Window<'a>>> {
    if parts < 2 {
        return StructError::from(CoreReason::InvalidSplit)
            .with_detail(format!("cannot split window {} into {parts} part(s)", window.index()))
            .err();
    }

    let by_time = time_ranges(window, parts);
    let ranges = if by_time.len() >= 2 || window.size() < 2 {
        by_time
    } else {
        count_ranges(window.size(), parts)
    };

    log::debug!(
        "split window {} ({} msgs) into {} part(s)",
        window.index(),
        window.size(),
        ranges.len()
    );
    Ok(ranges.into_iter().map(|r| window.slice(r)).collect())
}

fn time_ranges(window: &Window<'_>, parts: usize) -> Vec<Range<usize>> {
    let messages = window.messages();
    let start = window.start_time();
    let divisor = i32::try_from(parts).unwrap_or(i32::MAX);
    let slice = (window.end_time() - start) / divisor;

    let mut ranges = Vec::with_capacity(parts);
    let mut lo = 0;
    for i in 1..=parts {
        let hi = if i == parts {
            messages.len()
        } else {
            let bound = start + slice * i32::try_from(i).unwrap_or(i32::MAX);
            messages.partition_point(|m| m.timestamp < bound)
        };
        if hi > lo {
            ranges.push(lo..hi);
            lo = hi;
        }
    }
    ranges
}

fn count_ranges(len: usize, parts: usize) -> Vec<Range<usize>> {
    let parts = parts.min(len);
    let base = len / parts;
    let extra = len % parts;

    let mut ranges = Vec::with_capacity(parts);
    let mut lo = 0;
    for i in 0..parts {
        let hi = lo + base + usize::from(i < extra);
        ranges.push(lo..hi);
        lo = hi;
    }
    ranges
}
