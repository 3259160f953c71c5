use memchr::memchr;

use crate::error::RecordError;

/// Result of parsing a well-formed line
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Record<'a> {
    pub key: &'a str,
    pub value: f64,
}

/// Parses one newline-stripped line of the form `key<delimiter>value`.
/// A trailing `\r` is ignored, so CRLF input parses the same as LF input.
pub fn parse_record(line: &[u8], delimiter: u8) -> Result<Record<'_>, RecordError> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);

    let Some(at) = memchr(delimiter, line) else {
        return Err(RecordError::MissingDelimiter);
    };
    let (key, rest) = line.split_at(at);
    let value = &rest[1..];

    if key.is_empty() {
        return Err(RecordError::EmptyKey);
    }
    if value.is_empty() {
        return Err(RecordError::EmptyValue);
    }
    if memchr(delimiter, value).is_some() {
        return Err(RecordError::AmbiguousValue);
    }

    let key = std::str::from_utf8(key).map_err(|_| RecordError::InvalidUtf8)?;
    let value = parse_value(value)?;
    Ok(Record { key, value })
}

fn parse_value(bytes: &[u8]) -> Result<f64, RecordError> {
    let lossy = || String::from_utf8_lossy(bytes).into_owned();
    let text = std::str::from_utf8(bytes).map_err(|_| RecordError::InvalidNumber(lossy()))?;
    let value: f64 = text
        .parse()
        .map_err(|_| RecordError::InvalidNumber(lossy()))?;
    // `parse` accepts "inf"/"NaN" and overflows "1e999" to infinity
    if !value.is_finite() {
        return Err(RecordError::NonFinite(lossy()));
    }
    Ok(value)
}
