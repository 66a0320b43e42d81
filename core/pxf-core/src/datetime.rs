//! Greenplum date/time text formats.
//!
//! - date: `yyyy-MM-dd`
//! - timestamp: `yyyy-MM-dd HH:mm:ss[.ffffff]`
//! - timestamp with time zone: timestamp followed by an offset (`+HH`, `+HH:MM`, `Z` on input)

use crate::error::{PxfError, PxfResult};
use chrono::{
    DateTime, Datelike, FixedOffset, Local, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc,
};
use serde::{Deserialize, Serialize};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Zone used to interpret and render timestamps without an explicit offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeZoneMode {
    Utc,
    Local,
}

impl TimeZoneMode {
    pub fn from_utc_flag(use_utc: bool) -> Self {
        if use_utc {
            TimeZoneMode::Utc
        } else {
            TimeZoneMode::Local
        }
    }
}

/// Days since 1970-01-01 for a `yyyy-MM-dd` date.
pub fn parse_date(text: &str) -> PxfResult<i32> {
    let date = NaiveDate::parse_from_str(text.trim(), DATE_FORMAT)
        .map_err(|_| PxfError::runtime(format!("invalid date literal \"{}\"", text)))?;
    Ok(date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
}

pub fn format_date(epoch_days: i32) -> String {
    match NaiveDate::from_num_days_from_ce_opt(epoch_days + UNIX_EPOCH_DAYS_FROM_CE) {
        Some(date) => date.format(DATE_FORMAT).to_string(),
        None => epoch_days.to_string(),
    }
}

/// Parse a timestamp without offset, interpreting it in `zone`.
pub fn parse_timestamp(text: &str, zone: TimeZoneMode) -> PxfResult<DateTime<Utc>> {
    let local = NaiveDateTime::parse_from_str(text.trim(), DATETIME_FORMAT)
        .map_err(|_| invalid_timestamp(text))?;
    match zone {
        TimeZoneMode::Utc => Ok(local.and_utc()),
        TimeZoneMode::Local => Local
            .from_local_datetime(&local)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| invalid_timestamp(text)),
    }
}

/// Parse a timestamp carrying an explicit offset.
pub fn parse_timestamp_with_zone(text: &str) -> PxfResult<DateTime<Utc>> {
    let trimmed = text.trim();
    let (local_part, offset) = split_offset(trimmed).ok_or_else(|| invalid_timestamp(text))?;
    let local = NaiveDateTime::parse_from_str(local_part.trim_end(), DATETIME_FORMAT)
        .map_err(|_| invalid_timestamp(text))?;
    offset
        .from_local_datetime(&local)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| invalid_timestamp(text))
}

/// Render an instant as a timestamp in `zone`.
pub fn format_timestamp(instant: DateTime<Utc>, zone: TimeZoneMode) -> String {
    let local = match zone {
        TimeZoneMode::Utc => instant.naive_utc(),
        TimeZoneMode::Local => instant.with_timezone(&Local).naive_local(),
    };
    format_naive(local)
}

/// Render an instant as a timestamp with offset in `zone`.
pub fn format_timestamp_with_zone(instant: DateTime<Utc>, zone: TimeZoneMode) -> String {
    let (local, offset_seconds) = match zone {
        TimeZoneMode::Utc => (instant.naive_utc(), 0),
        TimeZoneMode::Local => {
            let local = instant.with_timezone(&Local);
            (local.naive_local(), local.offset().fix().local_minus_utc())
        }
    };
    format!("{}{}", format_naive(local), format_offset(offset_seconds))
}

/// Instant from the (milliseconds, nanos-of-second) pair of a timestamp lane.
pub fn instant_from_parts(millis: i64, nanos: i32) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(millis.div_euclid(1000), nanos.max(0) as u32)
}

/// (milliseconds, nanos-of-second) pair of an instant.
pub fn parts_from_instant(instant: DateTime<Utc>) -> (i64, i32) {
    (
        instant.timestamp_millis(),
        instant.timestamp_subsec_nanos() as i32,
    )
}

fn format_naive(local: NaiveDateTime) -> String {
    let mut text = local.format("%Y-%m-%d %H:%M:%S").to_string();
    let micros = local.and_utc().timestamp_subsec_micros();
    if micros > 0 {
        let fraction = format!("{:06}", micros);
        text.push('.');
        text.push_str(fraction.trim_end_matches('0'));
    }
    text
}

fn format_offset(offset_seconds: i32) -> String {
    let sign = if offset_seconds < 0 { '-' } else { '+' };
    let total_minutes = offset_seconds.abs() / 60;
    let (hours, minutes) = (total_minutes / 60, total_minutes % 60);
    if minutes == 0 {
        format!("{}{:02}", sign, hours)
    } else {
        format!("{}{:02}:{:02}", sign, hours, minutes)
    }
}

/// Split `2013-07-23 21:00:05-07` into its local part and offset.
fn split_offset(text: &str) -> Option<(&str, FixedOffset)> {
    if let Some(local) = text.strip_suffix('Z') {
        return Some((local, Utc.fix()));
    }
    // the date itself contains '-', so only look after the time separator
    let time_start = text.find([' ', 'T'])?;
    let sign_pos = time_start + text[time_start..].rfind(['+', '-'])?;
    let (local, offset) = text.split_at(sign_pos);
    let negative = offset.starts_with('-');
    let digits: String = offset[1..].chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().ok()?, 0),
        4 => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
        _ => return None,
    };
    let seconds = (hours * 60 + minutes) * 60;
    let offset = if negative {
        FixedOffset::west_opt(seconds)?
    } else {
        FixedOffset::east_opt(seconds)?
    };
    Some((local, offset))
}

fn invalid_timestamp(text: &str) -> PxfError {
    PxfError::runtime(format!("invalid timestamp literal \"{}\"", text))
}
