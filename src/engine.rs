use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::Instant;

use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::merge::{merge, FinalResult};
use crate::partition::partition;
use crate::worker::{scan, PartialResult};

/// Counters describing one run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    /// Non-empty partitions actually scanned
    pub partitions: usize,
    /// Non-blank lines seen
    pub lines: u64,
    /// Lines rejected by the parser and left out of the result
    pub skipped: u64,
    /// Distinct keys in the result
    pub keys: usize,
}

/// Final per-key statistics plus the run summary. Keys borrow from the input.
#[derive(Debug)]
pub struct Aggregation<'a> {
    pub result: FinalResult<'a>,
    pub summary: Summary,
}

/// Collects count, mean, min and max for each key of the `key;value` lines in `input`,
/// scanning up to `config.workers` partitions in parallel.
///
/// Workers share nothing but the read-only input and a cancellation flag. The first fatal
/// error (a rejected line in strict mode, or a worker panic) stops the other workers and is
/// returned after all of them have been joined; no partial result is produced in that case.
pub fn aggregate<'a>(input: &'a [u8], config: &Config) -> Result<Aggregation<'a>> {
    config.validate()?;
    let started = Instant::now();

    let ranges = partition(input, config.workers.get());
    let partials = run_workers(&ranges, |i, range, cancel| {
        scan(input, range, i, config, cancel)
    })?;

    let mut summary = Summary {
        partitions: partials.len(),
        ..Summary::default()
    };
    for p in &partials {
        summary.lines += p.lines;
        summary.skipped += p.skipped;
    }

    let result = merge(partials);
    summary.keys = result.len();

    if summary.skipped > 0 {
        warn!(skipped = summary.skipped, "skipped malformed lines");
    }
    info!(
        partitions = summary.partitions,
        lines = summary.lines,
        keys = summary.keys,
        elapsed = ?started.elapsed(),
        "aggregation finished"
    );

    Ok(Aggregation { result, summary })
}

/// Runs `work` once per range, each on its own scoped thread, and joins them all.
///
/// The first error (or panic) raises the shared cancellation flag handed to every call and
/// is returned once every thread has finished; the other results are dropped.
fn run_workers<'a, F>(ranges: &[Range<usize>], work: F) -> Result<Vec<PartialResult<'a>>>
where
    F: Fn(usize, Range<usize>, &AtomicBool) -> Result<PartialResult<'a>> + Sync,
{
    let cancel = AtomicBool::new(false);
    let failure: Mutex<Option<Error>> = Mutex::new(None);

    let fail = |e: Error| {
        cancel.store(true, Ordering::Relaxed);
        failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_or_insert(e);
    };

    let partials: Vec<PartialResult<'a>> = thread::scope(|s| {
        let handles: Vec<_> = ranges
            .iter()
            .cloned()
            .enumerate()
            .map(|(i, range)| {
                let (cancel, fail, work) = (&cancel, &fail, &work);
                s.spawn(move || match work(i, range, cancel) {
                    Ok(partial) => Some(partial),
                    Err(e) => {
                        fail(e);
                        None
                    }
                })
            })
            .collect();

        // barrier: every worker is joined before anything is merged
        handles
            .into_iter()
            .enumerate()
            .filter_map(|(i, handle)| match handle.join() {
                Ok(partial) => partial,
                Err(_) => {
                    fail(Error::WorkerPanicked { partition: i });
                    None
                }
            })
            .collect()
    });

    match failure.into_inner().unwrap_or_else(PoisonError::into_inner) {
        Some(e) => Err(e),
        None => Ok(partials),
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::{Duration, Instant};

    use super::{aggregate, run_workers};
    use crate::config::Config;
    use crate::error::Error;
    use crate::worker::PartialResult;

    #[test]
    fn aggregates_example() {
        let input = b"Paris;10.0\nParis;20.0\nLondon;5.0\nParis;30.0\nLondon;15.0\n";
        for workers in [1, 2, 3, 8] {
            let config = Config::default().with_workers(workers);
            let agg = aggregate(input, &config).expect("valid input");
            assert_eq!(agg.summary.lines, 5, "workers = {workers}");
            assert_eq!(agg.summary.skipped, 0, "workers = {workers}");
            assert_eq!(agg.summary.keys, 2, "workers = {workers}");
            assert!(agg.summary.partitions <= workers, "workers = {workers}");

            let paris = agg.result["Paris"];
            assert!((paris.mean().unwrap() - 20.0).abs() <= 1e-5);
            assert_eq!((paris.min(), paris.max()), (Some(10.0), Some(30.0)));
            let london = agg.result["London"];
            assert!((london.mean().unwrap() - 10.0).abs() <= 1e-5);
            assert_eq!((london.min(), london.max()), (Some(5.0), Some(15.0)));
        }
    }

    #[test]
    fn empty_input() {
        let agg = aggregate(b"", &Config::default().with_workers(4)).unwrap();
        assert!(agg.result.is_empty());
        assert_eq!(agg.summary.partitions, 0);
    }

    #[test]
    fn strict_failure_yields_no_result() {
        let mut input = String::new();
        for i in 0..1000 {
            input.push_str(&format!("k{};{i}.0\n", i % 7));
        }
        input.push_str("broken line\n");
        let config = Config::default().with_workers(4).with_strict(true);
        match aggregate(input.as_bytes(), &config) {
            Err(Error::Malformed { offset, .. }) => {
                assert_eq!(&input.as_bytes()[offset..offset + 6], b"broken")
            }
            other => panic!("expected strict mode to fail, got {other:?}"),
        }
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = Config::default().with_delimiter(b'\n');
        assert!(matches!(
            aggregate(b"a;1\n", &config),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn absurd_worker_count_is_a_config_error() {
        let config = Config::default().with_workers(1 << 60);
        assert!(matches!(
            aggregate(b"a;1\n", &config),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn failure_cancels_the_other_workers() {
        let stopped_early = AtomicBool::new(false);
        let ranges = [0..1, 1..2, 2..3];
        let outcome = run_workers(&ranges, |i, _, cancel| {
            if i == 0 {
                return Err(Error::InvalidConfig("first worker failed".into()));
            }
            let deadline = Instant::now() + Duration::from_secs(10);
            while Instant::now() < deadline {
                if cancel.load(Ordering::Relaxed) {
                    stopped_early.store(true, Ordering::Relaxed);
                    break;
                }
                std::thread::sleep(Duration::from_millis(1));
            }
            Ok(PartialResult::default())
        });

        match outcome {
            Err(Error::InvalidConfig(msg)) => assert_eq!(msg, "first worker failed"),
            other => panic!("expected the first worker's error, got {other:?}"),
        }
        assert!(
            stopped_early.load(Ordering::Relaxed),
            "other workers should see the cancellation flag"
        );
    }

    #[test]
    fn worker_panic_becomes_an_error() {
        let ranges = [0..1, 1..2, 2..3];
        let outcome = run_workers(&ranges, |i, _, _| {
            if i == 1 {
                panic!("worker blew up");
            }
            Ok(PartialResult::default())
        });
        assert!(
            matches!(outcome, Err(Error::WorkerPanicked { partition: 1 })),
            "got {outcome:?}"
        );
    }

    #[test]
    fn all_workers_succeed() {
        let ranges = [0..1, 1..2];
        let partials = run_workers(&ranges, |i, _, _| {
            Ok(PartialResult {
                lines: i as u64 + 1,
                ..PartialResult::default()
            })
        })
        .unwrap();
        assert_eq!(partials.iter().map(|p| p.lines).sum::<u64>(), 3);
    }
}
