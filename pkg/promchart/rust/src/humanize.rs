// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! SI unit formatting for chart values, e.g. `1313546240 => "1.31G"`.

use serde::Serialize;

const SI_UNITS: [&str; 7] = ["", "k", "M", "G", "T", "P", "E"];
const SI_DIVISOR: f64 = 1000.0;

/// Below this (and above zero) values switch to exponential notation.
const EXPONENTIAL_BELOW: f64 = 0.001;
/// At or above this values switch to exponential notation.
const EXPONENTIAL_FROM: f64 = 1e23;

/// A value scaled into an SI unit, with its display string.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumberSi {
    pub string: String,
    pub value: f64,
    pub unit: &'static str,
}

fn default_fraction_digits(value: f64) -> u8 {
    if value < 1.0 {
        3
    } else if value < 100.0 {
        2
    } else {
        1
    }
}

/// Divides by 1000 while the value allows it and units remain, starting at
/// `unit_index`. Returns the scaled value and the index of its unit.
fn convert_base_value_to_units(mut value: f64, mut unit_index: usize) -> (f64, usize) {
    while value >= SI_DIVISOR && unit_index + 1 < SI_UNITS.len() {
        value /= SI_DIVISOR;
        unit_index += 1;
    }
    (value, unit_index)
}

fn round(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let multiplier = 10f64.powi(i32::from(default_fraction_digits(value)));
    (value * multiplier).round() / multiplier
}

/// Inserts "," between groups of three integer digits.
fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut grouped = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

/// Formats a non-negative value with at most the bracket's fraction digits,
/// trailing zeros trimmed, and grouped integer digits.
fn format_number(value: f64) -> String {
    // Also turns -0 into 0.
    let value = if !value.is_finite() || value == 0.0 { 0.0 } else { value };
    let fixed = format!("{:.*}", usize::from(default_fraction_digits(value)), value);
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let frac_part = frac_part.trim_end_matches('0');
    if frac_part.is_empty() {
        group_thousands(int_part)
    } else {
        format!("{}.{}", group_thousands(int_part), frac_part)
    }
}

/// Formats the number to SI units.
///
/// Non-finite input is treated as 0. Negative input is scaled by its absolute
/// value and keeps its sign.
pub fn humanize_number_si(v: f64) -> NumberSi {
    let v = if v.is_finite() { v } else { 0.0 };
    let negative = v < 0.0;

    let (value, unit_index) = convert_base_value_to_units(v.abs(), 0);
    // Rounding can carry into the next unit (999.96 => 1000.0), so convert
    // again from the unit already chosen.
    let (value, unit_index) = convert_base_value_to_units(round(value), unit_index);

    let unit = SI_UNITS.get(unit_index).copied().unwrap_or_default();
    let mut string = format_number(value);
    string.push_str(unit);

    if negative && value != 0.0 {
        NumberSi {
            string: format!("-{string}"),
            value: -value,
            unit,
        }
    } else {
        NumberSi { string, value, unit }
    }
}

/// JavaScript-style `toExponential(1)`: "1.2e-5", "1.0e+24".
fn to_exponential(v: f64) -> String {
    let formatted = format!("{v:.1e}");
    match formatted.split_once('e') {
        Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
        _ => formatted,
    }
}

fn format_positive_value(v: f64) -> String {
    if v == 0.0 || (EXPONENTIAL_BELOW..EXPONENTIAL_FROM).contains(&v) || !v.is_finite() {
        humanize_number_si(v).string
    } else {
        to_exponential(v)
    }
}

/// Chart axis and tooltip value format. Uses exponential notation for very
/// small or very large magnitudes to keep labels short.
pub fn format_value(v: f64) -> String {
    let sign = if v < 0.0 { "-" } else { "" };
    format!("{sign}{}", format_positive_value(v.abs()))
}
