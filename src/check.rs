//! Comparison of two `key;mean;min;max` result files within an absolute tolerance.

use std::collections::BTreeMap;
use std::fmt;
use std::io::BufRead;

use thiserror::Error;

/// Absolute tolerance for mean, min and max; there is no relative tolerance
pub const TOLERANCE: f64 = 1e-5;

/// One parsed output line
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Error, Debug)]
pub enum ReadError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("line {line}: expected `key;mean;min;max`, got `{text}`")]
    Format { line: usize, text: String },
}

/// Reads an output file into a map ordered by key. Blank lines are ignored; a repeated key
/// is a format error.
pub fn read_results(
    reader: impl BufRead,
    delimiter: char,
) -> Result<BTreeMap<String, Stats>, ReadError> {
    let mut results = BTreeMap::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let text = line.trim_end_matches('\r');
        if text.is_empty() {
            continue;
        }
        let format_err = || ReadError::Format {
            line: i + 1,
            text: text.to_string(),
        };
        // keys may contain anything but the delimiter, so split numbers off the right
        let mut fields = text.rsplitn(4, delimiter);
        let (Some(max), Some(min), Some(mean), Some(key)) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return Err(format_err());
        };
        let parse = |s: &str| s.trim().parse::<f64>().map_err(|_| format_err());
        let stats = Stats {
            mean: parse(mean)?,
            min: parse(min)?,
            max: parse(max)?,
        };
        if results.insert(key.to_string(), stats).is_some() {
            return Err(format_err());
        }
    }
    Ok(results)
}

/// Outcome of comparing one key
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mismatch {
    pub key: String,
    pub mean: bool,
    pub min: bool,
    pub max: bool,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Failed:: key: {}; mean: {}; min: {}; max: {}",
            self.key,
            py_bool(self.mean),
            py_bool(self.min),
            py_bool(self.max)
        )
    }
}

fn py_bool(ok: bool) -> &'static str {
    if ok {
        "True"
    } else {
        "False"
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Report {
    /// Keys present on both sides whose statistics differ, sorted by key
    pub mismatches: Vec<Mismatch>,
    /// Keys expected but absent from the calculated results
    pub missing: Vec<String>,
    /// Keys calculated but absent from the expected results
    pub unexpected: Vec<String>,
}

impl Report {
    pub fn is_success(&self) -> bool {
        self.mismatches.is_empty() && self.missing.is_empty() && self.unexpected.is_empty()
    }
}

/// Compares `calculated` against `truth` key by key
pub fn compare(
    truth: &BTreeMap<String, Stats>,
    calculated: &BTreeMap<String, Stats>,
    tolerance: f64,
) -> Report {
    let close = |a: f64, b: f64| (a - b).abs() <= tolerance;
    let mut report = Report::default();

    for (key, t) in truth {
        let Some(c) = calculated.get(key) else {
            report.missing.push(key.clone());
            continue;
        };
        let m = Mismatch {
            key: key.clone(),
            mean: close(t.mean, c.mean),
            min: close(t.min, c.min),
            max: close(t.max, c.max),
        };
        if !(m.mean && m.min && m.max) {
            report.mismatches.push(m);
        }
    }
    report.unexpected = calculated
        .keys()
        .filter(|k| !truth.contains_key(*k))
        .cloned()
        .collect();
    report
}

#[cfg(test)]
mod test {
    use super::{compare, read_results, ReadError, Stats, TOLERANCE};

    #[test]
    fn reads_output_lines() {
        let text = "Paris;20.0;10.0;30.0\nNew York;1e2;-5;3.25\r\n\n";
        let results = read_results(text.as_bytes(), ';').unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(
            results["New York"],
            Stats {
                mean: 100.0,
                min: -5.0,
                max: 3.25
            }
        );
    }

    #[test]
    fn rejects_bad_lines() {
        for text in ["Paris;1.0;2.0", "Paris;x;1.0;2.0", "justakey"] {
            match read_results(text.as_bytes(), ';') {
                Err(ReadError::Format { line, .. }) => assert_eq!(line, 1, "input `{text}`"),
                other => panic!("input `{text}` gave {other:?}"),
            }
        }
    }

    #[test]
    fn tolerance_is_absolute() {
        let truth = read_results("a;1.0;0.0;2.0\nb;1000000.0;0.0;2e6\n".as_bytes(), ';').unwrap();
        let close = read_results("a;1.000009;0.0;2.0\nb;1000000.000009;0.0;2e6\n".as_bytes(), ';')
            .unwrap();
        assert!(compare(&truth, &close, TOLERANCE).is_success());

        let far = read_results("a;1.00002;0.0;2.0\nb;1000000.00002;0.0;2e6\n".as_bytes(), ';').unwrap();
        let report = compare(&truth, &far, TOLERANCE);
        assert_eq!(report.mismatches.len(), 2);
        assert_eq!(
            report.mismatches[0].to_string(),
            "Failed:: key: a; mean: False; min: True; max: True"
        );
    }

    #[test]
    fn reports_missing_and_unexpected_keys() {
        let truth = read_results("a;1.0;1.0;1.0\nb;2.0;2.0;2.0\n".as_bytes(), ';').unwrap();
        let calculated = read_results("b;2.0;2.0;2.0\nc;3.0;3.0;3.0\n".as_bytes(), ';').unwrap();
        let report = compare(&truth, &calculated, TOLERANCE);
        assert!(!report.is_success());
        assert_eq!(report.missing, vec!["a".to_string()]);
        assert_eq!(report.unexpected, vec!["c".to_string()]);
        assert!(report.mismatches.is_empty());
    }

    #[test]
    fn rejects_duplicate_keys() {
        let text = "a;1.0;1.0;1.0\nb;2.0;2.0;2.0\na;3.0;3.0;3.0\n";
        match read_results(text.as_bytes(), ';') {
            Err(ReadError::Format { line, text }) => {
                assert_eq!(line, 3);
                assert_eq!(text, "a;3.0;3.0;3.0");
            }
            other => panic!("duplicate key gave {other:?}"),
        }
    }
}
