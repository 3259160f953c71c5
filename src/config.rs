use std::num::NonZeroUsize;
use std::thread;

use tracing::warn;

use crate::error::{Error, Result};

pub const DEFAULT_DELIMITER: u8 = b';';

/// Upper bound on worker threads; each one is a real OS thread
pub const MAX_WORKERS: usize = 4096;

/// Knobs for one aggregation run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Target number of partitions, and so of worker threads
    pub workers: NonZeroUsize,
    /// Byte separating key from value
    pub delimiter: u8,
    /// Fail the run on the first rejected line instead of skipping it
    pub strict: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: available_workers(),
            delimiter: DEFAULT_DELIMITER,
            strict: false,
        }
    }
}

impl Config {
    /// Zero is treated as one.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = NonZeroUsize::new(workers).unwrap_or(NonZeroUsize::MIN);
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if matches!(self.delimiter, b'\n' | b'\r') {
            return Err(Error::InvalidConfig(format!(
                "delimiter {:?} would split lines",
                self.delimiter as char
            )));
        }
        // a non-ASCII byte could split a multi-byte key and can't be written back as one byte
        if !self.delimiter.is_ascii() {
            return Err(Error::InvalidConfig(format!(
                "delimiter byte {:#04x} is not ASCII",
                self.delimiter
            )));
        }
        if self.workers.get() > MAX_WORKERS {
            return Err(Error::InvalidConfig(format!(
                "{} workers requested, at most {MAX_WORKERS} are supported",
                self.workers
            )));
        }
        Ok(())
    }
}

fn available_workers() -> NonZeroUsize {
    match thread::available_parallelism() {
        Ok(n) => n,
        Err(e) => {
            warn!("couldn't query the available parallelism ({e}), going single-threaded");
            NonZeroUsize::MIN
        }
    }
}
