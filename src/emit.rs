use std::io::Write;

use crate::merge::FinalResult;

/// Writes one `key;mean;min;max` line per key, in key order, each terminated by `\n`.
///
/// Numbers use the shortest representation that parses back to the same `f64`, always with
/// a decimal point or exponent (`20.0`, not `20`). Keys without data are not written.
pub fn write_results(
    result: &FinalResult<'_>,
    delimiter: u8,
    out: &mut impl Write,
) -> std::io::Result<()> {
    let d = delimiter as char;
    for (key, acc) in result {
        let (Some(mean), Some(min), Some(max)) = (acc.mean(), acc.min(), acc.max()) else {
            continue;
        };
        writeln!(out, "{key}{d}{mean:?}{d}{min:?}{d}{max:?}")?;
    }
    Ok(())
}
