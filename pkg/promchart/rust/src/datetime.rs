// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Duration text codec ("1h 10m" <-> milliseconds) and the timestamp
//! formats used for axis ticks and tooltip headers.

use std::fmt::Display;

use chrono::{DateTime, TimeZone};

pub const SECOND_MS: i64 = 1000;
pub const MINUTE_MS: i64 = 60 * SECOND_MS;
pub const HOUR_MS: i64 = 60 * MINUTE_MS;
pub const DAY_MS: i64 = 24 * HOUR_MS;
pub const WEEK_MS: i64 = 7 * DAY_MS;

/// Units largest first, as emitted by [`format_duration`].
const UNITS: [(char, i64); 5] = [
    ('w', WEEK_MS),
    ('d', DAY_MS),
    ('h', HOUR_MS),
    ('m', MINUTE_MS),
    ('s', SECOND_MS),
];

/// Axis tick format, e.g. "3:04 PM".
pub const TIME_FORMAT: &str = "%-I:%M %p";

/// Tooltip header format, e.g. "Oct 17, 2026, 3:04:05 PM".
pub const DATE_TIME_WITH_SECONDS_FORMAT: &str = "%b %-d, %Y, %-I:%M:%S %p";

fn unit_factor(unit: char) -> Option<i64> {
    UNITS.iter().find(|(u, _)| *u == unit).map(|(_, f)| *f)
}

fn parse_token(token: &str) -> Option<i64> {
    let unit = token.chars().last()?;
    let factor = unit_factor(unit)?;
    let digits = token.get(..token.len() - unit.len_utf8())?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<i64>().ok()?.checked_mul(factor)
}

/// Converts a duration like "1h 10m 23s" to milliseconds.
///
/// Returns 0 if any token is not `<integer><w|d|h|m|s>` or the total
/// overflows.
pub fn parse_duration(duration: &str) -> i64 {
    duration
        .split_whitespace()
        .try_fold(0i64, |total, token| total.checked_add(parse_token(token)?))
        .unwrap_or(0)
}

/// Formats a duration in milliseconds like "1h 10m".
///
/// Sub-second remainders are dropped; negative input yields "".
pub fn format_duration(ms: i64) -> String {
    if ms < 0 {
        return String::new();
    }
    let mut remaining = ms;
    let mut parts = Vec::new();
    for (unit, factor) in UNITS {
        let n = remaining / factor;
        if n > 0 {
            parts.push(format!("{n}{unit}"));
            remaining -= n * factor;
        }
    }
    parts.join(" ")
}

/// Day/hour/minute/second breakdown of a duration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DurationParts {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

pub fn duration_parts(ms: i64) -> DurationParts {
    let ms = ms.max(0);
    let total_seconds = ms / SECOND_MS;
    let total_minutes = total_seconds / 60;
    let total_hours = total_minutes / 60;
    DurationParts {
        days: total_hours / 24,
        hours: total_hours % 24,
        minutes: total_minutes % 60,
        seconds: total_seconds % 60,
    }
}

pub fn format_time<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    time.format(TIME_FORMAT).to_string()
}

pub fn format_date_time_with_seconds<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    time.format(DATE_TIME_WITH_SECONDS_FORMAT).to_string()
}
