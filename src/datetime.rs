//! Timestamp text conversion.
//!
//! Parsing is a pure calendar conversion: the zone the text is expressed in is
//! passed explicitly (or carried by the text itself) and nothing touches the
//! process environment.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc};

const FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Parse `YYYY-MM-DD HH:MM:SS[.ffffff][offset]` into a UTC instant.
///
/// The date/time separator may be a space or `T`. A trailing `Z`, `+HH`,
/// `+HH:MM` or `+HHMM` (as printed by PostgreSQL for `timestamptz`) overrides
/// `offset`; otherwise the text is read as local time at `offset`.
/// ```rust
/// use chrono::{FixedOffset, Timelike};
/// use sql_multiplex::datetime::parse_timestamp;
///
/// let utc = FixedOffset::east_opt(0).unwrap();
/// let ts = parse_timestamp("2024-03-01 12:30:00.25", utc).unwrap();
/// assert_eq!(ts.nanosecond(), 250_000_000);
/// ```
#[must_use]
pub fn parse_timestamp(text: &str, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let bytes = text.as_bytes();
    if bytes.len() < 19
        || bytes[4] != b'-'
        || bytes[7] != b'-'
        || (bytes[10] != b' ' && bytes[10] != b'T')
        || bytes[13] != b':'
        || bytes[16] != b':'
    {
        return None;
    }

    let date = NaiveDate::from_ymd_opt(
        i32::try_from(digits(bytes, 0, 4)?).ok()?,
        digits(bytes, 5, 7)?,
        digits(bytes, 8, 10)?,
    )?;

    let mut idx = 19;
    let mut nanos = 0u32;
    if bytes.get(idx) == Some(&b'.') {
        let start = idx + 1;
        idx = start;
        while idx < bytes.len() && bytes[idx].is_ascii_digit() {
            idx += 1;
        }
        if idx == start {
            return None;
        }
        nanos = fraction_nanos(&bytes[start..idx]);
    }

    let time = NaiveTime::from_hms_nano_opt(
        digits(bytes, 11, 13)?,
        digits(bytes, 14, 16)?,
        digits(bytes, 17, 19)?,
        nanos,
    )?;

    let zone = if idx == bytes.len() {
        offset
    } else {
        parse_offset(&bytes[idx..])?
    };

    let local = NaiveDateTime::new(date, time);
    zone.from_local_datetime(&local)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse a timestamp that is already expressed in UTC.
#[must_use]
pub fn parse_utc(text: &str) -> Option<DateTime<Utc>> {
    parse_timestamp(text, utc_offset())
}

/// Render as `YYYY-MM-DD HH:MM:SS.ffffff` in UTC.
#[must_use]
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(FORMAT).to_string()
}

pub(crate) fn utc_offset() -> FixedOffset {
    Utc.fix()
}

fn digits(bytes: &[u8], start: usize, end: usize) -> Option<u32> {
    bytes[start..end].iter().try_fold(0u32, |acc, b| {
        b.is_ascii_digit()
            .then(|| acc * 10 + u32::from(b - b'0'))
    })
}

// Digits past nanosecond precision are dropped.
fn fraction_nanos(frac: &[u8]) -> u32 {
    let mut nanos = 0u32;
    for pos in 0..9 {
        nanos *= 10;
        if let Some(b) = frac.get(pos) {
            nanos += u32::from(b - b'0');
        }
    }
    nanos
}

fn parse_offset(suffix: &[u8]) -> Option<FixedOffset> {
    if suffix == b"Z" {
        return Some(utc_offset());
    }
    let sign = match suffix.first()? {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };
    let rest = &suffix[1..];
    let (hours, minutes) = match rest.len() {
        2 => (digits(rest, 0, 2)?, 0),
        4 => (digits(rest, 0, 2)?, digits(rest, 2, 4)?),
        5 if rest[2] == b':' => (digits(rest, 0, 2)?, digits(rest, 3, 5)?),
        _ => return None,
    };
    let seconds = i32::try_from(hours * 3600 + minutes * 60).ok()?;
    FixedOffset::east_opt(sign * seconds)
}
