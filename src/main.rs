use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};

use key_stats::check::{compare, read_results, Stats, TOLERANCE};
use key_stats::config::DEFAULT_DELIMITER;
use key_stats::{aggregate, write_results, Config, InputFile};

/// Per-key mean, min and max of `key;value` lines
#[derive(Parser)]
#[command(name = "keystats", version)]
struct Cli {
    /// Verbose logging (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate an input file and write `key;mean;min;max` lines
    Aggregate {
        /// Input file of `key;value` lines
        input: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of worker threads (defaults to the available parallelism)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Field delimiter, a single ASCII character
        #[arg(short, long, default_value_t = DEFAULT_DELIMITER as char)]
        delimiter: char,

        /// Fail on the first malformed line instead of skipping it
        #[arg(long)]
        strict: bool,
    },
    /// Compare calculated results against expected ones
    Check {
        /// Expected results
        truth: PathBuf,

        /// Results to verify
        calculated: PathBuf,

        /// Absolute tolerance for mean, min and max
        #[arg(long, default_value_t = TOLERANCE)]
        tolerance: f64,

        /// Field delimiter used by both files
        #[arg(short, long, default_value_t = DEFAULT_DELIMITER as char)]
        delimiter: char,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(cli.verbose >= 2)
        .init();
    debug!("keystats started with verbosity level: {}", cli.verbose);

    match cli.command {
        Commands::Aggregate {
            input,
            output,
            workers,
            delimiter,
            strict,
        } => {
            let mut config = Config::default()
                .with_delimiter(ascii_delimiter(delimiter)?)
                .with_strict(strict);
            if let Some(n) = workers {
                config = config.with_workers(n);
            }
            run_aggregate(&input, output.as_deref(), &config)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check {
            truth,
            calculated,
            tolerance,
            delimiter,
        } => run_check(&truth, &calculated, tolerance, delimiter),
    }
}

fn ascii_delimiter(c: char) -> Result<u8> {
    if !c.is_ascii() {
        bail!("delimiter must be a single ASCII character, got {c:?}");
    }
    Ok(c as u8)
}

fn run_aggregate(input: &Path, output: Option<&Path>, config: &Config) -> Result<()> {
    let file = InputFile::open(input)?;
    info!(input = %input.display(), workers = config.workers.get(), "aggregating");
    let agg = aggregate(file.bytes(), config)
        .with_context(|| format!("failed to aggregate {}", input.display()))?;

    // output is written only once the whole run has succeeded
    match output {
        Some(path) => {
            let out = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            let mut w = BufWriter::with_capacity(1 << 20, out);
            write_results(&agg.result, config.delimiter, &mut w)
                .and_then(|_| w.flush())
                .with_context(|| format!("failed to write {}", path.display()))?;
        }
        None => {
            let mut w = BufWriter::with_capacity(1 << 20, std::io::stdout().lock());
            write_results(&agg.result, config.delimiter, &mut w)
                .and_then(|_| w.flush())
                .context("failed to write results to stdout")?;
        }
    }
    Ok(())
}

fn run_check(
    truth: &Path,
    calculated: &Path,
    tolerance: f64,
    delimiter: char,
) -> Result<ExitCode> {
    let read = |path: &Path| -> Result<BTreeMap<String, Stats>> {
        let f =
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        read_results(BufReader::new(f), delimiter)
            .with_context(|| format!("failed to read {}", path.display()))
    };
    let report = compare(&read(truth)?, &read(calculated)?, tolerance);

    for m in &report.mismatches {
        println!("{m}");
    }
    for key in &report.missing {
        println!("Missing:: key: {key}");
    }
    for key in &report.unexpected {
        println!("Unexpected:: key: {key}");
    }
    if report.is_success() {
        println!("Success");
        Ok(ExitCode::SUCCESS)
    } else {
        println!("Fail");
        Ok(ExitCode::FAILURE)
    }
}
