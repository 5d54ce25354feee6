//! UTCTime and GeneralizedTime.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};

use crate::error::{Error, Result};

fn digits(s: &str, range: std::ops::Range<usize>) -> Option<u32> {
    let part = s.get(range)?;
    if !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

/// Splits off a trailing `Z` or `+hhmm`/`-hhmm` and returns the offset in
/// seconds east of UTC. No zone at all means UTC.
fn split_zone(s: &str) -> Option<(&str, i64)> {
    if let Some(body) = s.strip_suffix('Z') {
        return Some((body, 0));
    }
    let Some(idx) = s.rfind(['+', '-']) else {
        return Some((s, 0));
    };
    if idx + 5 != s.len() {
        return Some((s, 0));
    }
    let hours = digits(s, idx + 1..idx + 3)? as i64;
    let minutes = digits(s, idx + 3..idx + 5)? as i64;
    let sign = if s.as_bytes()[idx] == b'-' { -1 } else { 1 };
    Some((&s[..idx], sign * (hours * 3600 + minutes * 60)))
}

fn assemble(
    year: i32,
    body: &str,
    offset: usize,
    nanos: u32,
) -> Option<NaiveDateTime> {
    let month = digits(body, offset..offset + 2)?;
    let day = digits(body, offset + 2..offset + 4)?;
    let hour = digits(body, offset + 4..offset + 6)?;
    let minute = match body.len() > offset + 6 {
        true => digits(body, offset + 6..offset + 8)?,
        false => 0,
    };
    let second = match body.len() > offset + 8 {
        true => digits(body, offset + 8..offset + 10)?,
        false => 0,
    };
    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_nano_opt(hour, minute, second, nanos)
}

pub fn parse_utc_time(data: &[u8]) -> Result<NaiveDateTime> {
    let s = std::str::from_utf8(data).map_err(|_| Error::UtcTimeInvalidFormat(format!("{data:02x?}")))?;
    let invalid = || Error::UtcTimeInvalidFormat(s.to_string());
    let (body, offset) = split_zone(s).ok_or_else(invalid)?;
    if body.len() != 10 && body.len() != 12 {
        return Err(invalid());
    }
    let yy = digits(body, 0..2).ok_or_else(invalid)? as i32;
    // two-digit years pivot at 1950 (RFC 5280 4.1.2.5.1)
    let year = if yy >= 50 { 1900 + yy } else { 2000 + yy };
    let local = assemble(year, body, 2, 0).ok_or_else(invalid)?;
    Ok(local - Duration::seconds(offset))
}

pub fn parse_generalized_time(data: &[u8]) -> Result<NaiveDateTime> {
    let s = std::str::from_utf8(data)
        .map_err(|_| Error::GeneralizedTimeInvalidFormat(format!("{data:02x?}")))?;
    let invalid = || Error::GeneralizedTimeInvalidFormat(s.to_string());
    let (body, offset) = split_zone(s).ok_or_else(invalid)?;
    let (body, nanos) = match body.find(['.', ',']) {
        Some(idx) => {
            let fraction = &body[idx + 1..];
            if fraction.is_empty() || fraction.len() > 9 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            let scaled = format!("{:0<9}", fraction);
            (&body[..idx], scaled.parse::<u32>().map_err(|_| invalid())?)
        }
        None => (body, 0),
    };
    if ![10, 12, 14].contains(&body.len()) {
        return Err(invalid());
    }
    let year = digits(body, 0..4).ok_or_else(invalid)? as i32;
    let local = assemble(year, body, 4, nanos).ok_or_else(invalid)?;
    Ok(local - Duration::seconds(offset))
}

pub fn format_utc_time(time: &NaiveDateTime) -> String {
    time.format("%y%m%d%H%M%SZ").to_string()
}

/// DER GeneralizedTime: always `Z`, fractional seconds without trailing
/// zeros.
pub fn format_generalized_time(time: &NaiveDateTime) -> String {
    let mut s = format!(
        "{:04}{:02}{:02}{:02}{:02}{:02}",
        time.year(),
        time.month(),
        time.day(),
        time.hour(),
        time.minute(),
        time.second()
    );
    let nanos = time.nanosecond() % 1_000_000_000;
    if nanos != 0 {
        let fraction = format!("{:09}", nanos);
        s.push('.');
        s.push_str(fraction.trim_end_matches('0'));
    }
    s.push('Z');
    s
}

/// Whether `time` can be written as UTCTime (years 1950 through 2049).
pub fn fits_utc_time(time: &NaiveDateTime) -> bool {
    (1950..2050).contains(&time.year())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[rstest(input, expected,
        case("191215190210Z", at(2019, 12, 15, 19, 2, 10)),
        case("500101000000Z", at(1950, 1, 1, 0, 0, 0)),
        case("4912312359Z", at(2049, 12, 31, 23, 59, 0)),
        case("191215190210-0800", at(2019, 12, 16, 3, 2, 10)),
    )]
    fn test_parse_utc_time(input: &str, expected: NaiveDateTime) {
        assert_eq!(expected, parse_utc_time(input.as_bytes()).unwrap());
    }

    #[rstest(input,
        case("1912151902Z0"),
        case("191315190210Z"),
        case("19121519021Z"),
    )]
    fn test_parse_utc_time_rejects(input: &str) {
        assert!(parse_utc_time(input.as_bytes()).is_err());
    }

    #[rstest(input, expected,
        case("20191216030210Z", at(2019, 12, 16, 3, 2, 10)),
        case("20191216030210.5Z", at(2019, 12, 16, 3, 2, 10) + Duration::milliseconds(500)),
        case("20191216030210", at(2019, 12, 16, 3, 2, 10)),
        case("20501216030210+0100", at(2050, 12, 16, 2, 2, 10)),
    )]
    fn test_parse_generalized_time(input: &str, expected: NaiveDateTime) {
        assert_eq!(expected, parse_generalized_time(input.as_bytes()).unwrap());
    }

    #[test]
    fn test_format_times() {
        let t = at(2019, 12, 16, 3, 2, 10);
        assert_eq!("191216030210Z", format_utc_time(&t));
        assert_eq!("20191216030210Z", format_generalized_time(&t));
        let t = t + Duration::milliseconds(250);
        assert_eq!("20191216030210.25Z", format_generalized_time(&t));
        assert!(fits_utc_time(&t));
        assert!(!fits_utc_time(&at(2050, 1, 1, 0, 0, 0)));
    }
}
