use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};

use memchr::memchr_iter;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::accumulator::Accumulator;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::parse::parse_record;

/// How many lines a worker scans between looks at the cancellation flag
const CANCEL_CHECK_INTERVAL: u64 = 1 << 14;

/// Statistics for one partition, owned by the worker that built them.
/// Keys borrow from the scanned input.
#[derive(Debug, Default)]
pub struct PartialResult<'a> {
    pub stats: FxHashMap<&'a str, Accumulator>,
    /// Non-blank lines seen, including skipped ones
    pub lines: u64,
    /// Lines rejected by the parser
    pub skipped: u64,
}

impl<'a> PartialResult<'a> {
    fn new() -> Self {
        let mut stats = FxHashMap::default();
        stats.reserve(4 * 128);
        Self {
            stats,
            lines: 0,
            skipped: 0,
        }
    }

    #[inline]
    fn record(&mut self, key: &'a str, value: f64) {
        // get_mut first: the common case is a key already seen, and it avoids hashing twice
        if let Some(acc) = self.stats.get_mut(key) {
            acc.fold(value);
        } else {
            self.stats.insert(key, Accumulator::of(value));
        }
    }
}

/// Scans the lines of `input[range]` into a fresh [`PartialResult`].
///
/// Assumes `range` is line-aligned, as produced by [`crate::partition::partition`].
/// Rejected lines are counted and skipped unless `config.strict` is set, in which case the
/// first one fails the scan. Returns early with an empty result once `cancel` is raised by
/// another worker; the caller discards it.
pub fn scan<'a>(
    input: &'a [u8],
    range: Range<usize>,
    partition: usize,
    config: &Config,
    cancel: &AtomicBool,
) -> Result<PartialResult<'a>> {
    debug_assert!(
        range.start == 0 || input[range.start - 1] == b'\n',
        "partition should begin at the start of a line"
    );
    let base = range.start;
    let chunk = &input[range];
    let mut partial = PartialResult::new();

    let mut line_start = 0;
    let ends = memchr_iter(b'\n', chunk).chain(std::iter::once(chunk.len()));
    for line_end in ends {
        let line = &chunk[line_start..line_end];
        let offset = base + line_start;
        line_start = line_end + 1;

        if line.is_empty() || line == b"\r" {
            continue;
        }
        partial.lines += 1;
        if partial.lines % CANCEL_CHECK_INTERVAL == 0 && cancel.load(Ordering::Relaxed) {
            debug!(partition, "scan cancelled");
            return Ok(PartialResult::default());
        }

        match parse_record(line, config.delimiter) {
            Ok(record) => partial.record(record.key, record.value),
            Err(source) if config.strict => {
                return Err(Error::Malformed {
                    partition,
                    offset,
                    source,
                });
            }
            Err(e) => {
                trace!(partition, offset, kind = ?e.kind(), "skipping line: {e}");
                partial.skipped += 1;
            }
        }
    }

    debug!(
        partition,
        start = base,
        end = base + chunk.len(),
        lines = partial.lines,
        skipped = partial.skipped,
        keys = partial.stats.len(),
        "partition scanned"
    );
    Ok(partial)
}
