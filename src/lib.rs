//! Per-key mean, min and max over large `key;value` text inputs.
//!
//! The input is split into line-aligned partitions, each partition is scanned by its own
//! thread into a private map of [`Accumulator`]s, and the maps are merged once every thread
//! has finished.
//!
//! ```no_run
//! use key_stats::{aggregate, write_results, Config, InputFile};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let input = InputFile::open("measurements.txt")?;
//! let config = Config::default();
//! let agg = aggregate(input.bytes(), &config)?;
//! write_results(&agg.result, config.delimiter, &mut std::io::stdout().lock())?;
//! # Ok(())
//! # }
//! ```

pub mod accumulator;
pub mod check;
pub mod config;
pub mod emit;
pub mod engine;
pub mod error;
pub mod input;
pub mod merge;
pub mod parse;
pub mod partition;
pub mod worker;

pub use accumulator::Accumulator;
pub use config::Config;
pub use emit::write_results;
pub use engine::{aggregate, Aggregation, Summary};
pub use error::{Error, ErrorKind, RecordError, Result};
pub use input::InputFile;
pub use merge::FinalResult;
