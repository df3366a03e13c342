//! Display formatting for listing rows: object sizes and modification times.

use chrono::NaiveDateTime;
use thiserror::Error;

/// Unit suffixes, each 1024 times the previous one.
const SIZE_UNITS: [&str; 7] = ["B", "K", "M", "G", "T", "P", "E"];

/// Timestamp layout produced by S3 listings.
const STORAGE_TIMESTAMP: &str = "%Y-%m-%dT%H:%M:%S.000Z";

/// Timestamp layout shown in the listing.
const DISPLAY_TIMESTAMP: &str = "%d-%b-%Y %H:%M:%S";

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("timestamp `{input}` is not in YYYY-MM-DDTHH:MM:SS.000Z form: {source}")]
    Timestamp {
        input: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Render a byte count as a fixed-width human size such as `"123 M"`,
/// `" 42 M"` or `"4.0 M"`.
///
/// The value is divided by 1024 while its rounded integer part has more
/// than three digits. Division stops at `E`; anything larger stays in
/// exabytes and is printed as a plain integer.
pub fn format_size(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;
    while integer_digits(value.round()) > 3 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let suffix = SIZE_UNITS[unit];
    match integer_digits(value.round()) {
        3 => format!("{:03.0} {}", value, suffix),
        2 => format!("{:3.0} {}", value, suffix),
        1 => format!("{:.1} {}", value, suffix),
        _ => format!("{:.0} {}", value, suffix),
    }
}

/// Convert an S3 `LastModified` value into `DD-Mon-YYYY HH:MM:SS`.
pub fn format_timestamp(input: &str) -> Result<String, FormatError> {
    let parsed = NaiveDateTime::parse_from_str(input, STORAGE_TIMESTAMP).map_err(|source| {
        FormatError::Timestamp {
            input: input.to_string(),
            source,
        }
    })?;
    Ok(parsed.format(DISPLAY_TIMESTAMP).to_string())
}

fn integer_digits(value: f64) -> usize {
    (value as u64).to_string().len()
}
