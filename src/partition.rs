use std::ops::Range;

use memchr::memchr;

/// Splits `input` into at most `n` contiguous, line-aligned byte ranges.
///
/// Every range starts at the beginning of a line and ends one past a newline (or at the end of
/// `input`), so together the ranges cover `input` exactly once and no line is split.
/// Empty ranges are never returned: an empty input yields no ranges, and an input with fewer
/// lines than `n` yields fewer than `n` ranges.
pub fn partition(input: &[u8], n: usize) -> Vec<Range<usize>> {
    let len = input.len();
    // a partition holds at least one byte, so more than `len` of them can never be used
    let n = n.clamp(1, len.max(1));
    let mut ranges = Vec::new();
    let mut start = 0;

    for i in 1..=n {
        if start == len {
            break;
        }
        // nominal boundary, then pushed forward to the start of the next line
        let nominal = if i == n {
            len
        } else {
            (len as u128 * i as u128 / n as u128) as usize
        };
        let end = align_to_line_start(input, nominal.max(start));
        if end > start {
            ranges.push(start..end);
            start = end;
        }
    }

    debug_assert_eq!(
        ranges.last().map_or(0, |r| r.end),
        len,
        "partitions should cover the whole input"
    );
    ranges
}

/// Returns `pos` if it already sits at a line start, otherwise one past the next newline
/// (or the end of `input` when no newline follows).
fn align_to_line_start(input: &[u8], pos: usize) -> usize {
    if pos == 0 || pos >= input.len() || input[pos - 1] == b'\n' {
        return pos.min(input.len());
    }
    match memchr(b'\n', &input[pos..]) {
        Some(offset) => pos + offset + 1,
        None => input.len(),
    }
}
