//! Typed scalar values and per-field type inference.
//!
//! Every field read from a delimited file becomes a [`Value`]. Inference
//! looks at the trimmed text and picks, in order: null, boolean, number,
//! date, and finally falls back to the untouched original text. Rendering
//! goes the other way and is stable, so inferring a rendered value yields
//! the same value again.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, TimeZone, Timelike, Utc};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static DECIMAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?$").expect("decimal pattern")
});

static RADIX_INTEGER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^0(?:[xX][0-9a-fA-F]+|[oO][0-7]+|[bB][01]+)$").expect("radix pattern")
});

static TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^([-+]\d{2})?(\d{4})(?:-(\d{2})(?:-(\d{2}))?)?(?:T(\d{2}):(\d{2})(?::(\d{2})(?:\.(\d{3}))?)?(Z|[-+]\d{2}:\d{2})?)?$",
    )
    .expect("timestamp pattern")
});

/// A single typed field
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Boolean(bool),
    Date(DateTime<Utc>),
    Null,
    Text(String),
}

/// Hashable identity of a value, used for key lookups.
///
/// Numbers compare by value with `0 == -0` and `NaN == NaN`, text byte
/// for byte. Dates have no key: each parsed date is its own object, so two
/// dates never compare equal as lookup keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueKey {
    Number(u64),
    Boolean(bool),
    Null,
    Text(String),
}

impl Value {
    /// Infer the type of a raw field
    pub fn infer(field: &str) -> Self {
        let trimmed = field.trim();

        if trimmed.is_empty() {
            return Value::Null;
        }

        match trimmed {
            "true" => return Value::Boolean(true),
            "false" => return Value::Boolean(false),
            "NaN" => return Value::Number(f64::NAN),
            _ => {}
        }

        if let Some(number) = parse_number(trimmed) {
            return Value::Number(number);
        }

        if let Some(date) = parse_timestamp(trimmed) {
            return Value::Date(date);
        }

        Value::Text(field.to_string())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Lookup key, or `None` for a date, which never matches anything
    pub fn key(&self) -> Option<ValueKey> {
        let key = match self {
            Value::Number(n) if *n == 0.0 => ValueKey::Number(0f64.to_bits()),
            Value::Number(n) if n.is_nan() => ValueKey::Number(f64::NAN.to_bits()),
            Value::Number(n) => ValueKey::Number(n.to_bits()),
            Value::Boolean(b) => ValueKey::Boolean(*b),
            Value::Date(_) => return None,
            Value::Null => ValueKey::Null,
            Value::Text(s) => ValueKey::Text(s.clone()),
        };
        Some(key)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Date(d) => f.write_str(&format_date(d)),
            Value::Null => Ok(()),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

/// Parse a numeric literal: decimal with optional exponent, signed
/// `Infinity`, or an unsigned hex/octal/binary integer
fn parse_number(text: &str) -> Option<f64> {
    if DECIMAL.is_match(text) {
        return text.parse::<f64>().ok();
    }

    match text {
        "Infinity" | "+Infinity" => return Some(f64::INFINITY),
        "-Infinity" => return Some(f64::NEG_INFINITY),
        _ => {}
    }

    if RADIX_INTEGER.is_match(text) {
        let radix = match text.as_bytes()[1] {
            b'x' | b'X' => 16,
            b'o' | b'O' => 8,
            _ => 2,
        };
        let value = text[2..]
            .chars()
            .filter_map(|c| c.to_digit(radix))
            .fold(0f64, |acc, digit| acc * radix as f64 + digit as f64);
        return Some(value);
    }

    None
}

/// Parse an ISO-8601 style date or timestamp into a UTC instant.
///
/// Missing month/day default to 1. A timestamp without an offset is read
/// as UTC. Out-of-range components (month 13, hour 25) are not dates.
fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let caps = TIMESTAMP.captures(text)?;

    let year_digits = caps.get(2)?.as_str();
    let year: i32 = match caps.get(1) {
        Some(extended) => format!("{}{}", extended.as_str(), year_digits)
            .parse()
            .ok()?,
        None => year_digits.parse().ok()?,
    };

    let component = |index: usize, default: u32| -> Option<u32> {
        match caps.get(index) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(default),
        }
    };

    let date = NaiveDate::from_ymd_opt(year, component(3, 1)?, component(4, 1)?)?;
    let naive = date.and_hms_milli_opt(
        component(5, 0)?,
        component(6, 0)?,
        component(7, 0)?,
        component(8, 0)?,
    )?;

    let offset_seconds = match caps.get(9).map(|m| m.as_str()) {
        None | Some("Z") => 0,
        Some(offset) => {
            let sign = if offset.starts_with('-') { -1 } else { 1 };
            let hours: i32 = offset[1..3].parse().ok()?;
            let minutes: i32 = offset[4..6].parse().ok()?;
            sign * (hours * 3600 + minutes * 60)
        }
    };

    let offset = FixedOffset::east_opt(offset_seconds)?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Render a number the way ECMAScript `Number#toString` does: shortest
/// round-trip digits, plain notation for exponents in -7..21, scientific
/// notation (`1e+21`, `1.5e-7`) outside it
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }

    let scientific = format!("{:e}", n.abs());
    let (mantissa, exponent) = scientific
        .split_once('e')
        .unwrap_or((scientific.as_str(), "0"));
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let exponent: i32 = exponent.parse().unwrap_or(0);

    let k = digits.len() as i32;
    let point = exponent + 1;

    let body = if k <= point && point <= 21 {
        format!("{}{}", digits, "0".repeat((point - k) as usize))
    } else if 0 < point && point <= 21 {
        let (int_part, frac_part) = digits.split_at(point as usize);
        format!("{}.{}", int_part, frac_part)
    } else if -6 < point && point <= 0 {
        format!("0.{}{}", "0".repeat((-point) as usize), digits)
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        let (lead, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{}e{}{}", lead, sign, exponent.abs())
        } else {
            format!("{}.{}e{}{}", lead, rest, sign, exponent.abs())
        }
    };

    if n < 0.0 { format!("-{}", body) } else { body }
}

/// Render a UTC instant as the shortest ISO-8601 form that keeps it exact
pub fn format_date(date: &DateTime<Utc>) -> String {
    let year = date.year();
    let year_text = if year < 0 {
        format!("-{:06}", -year)
    } else if year > 9999 {
        format!("+{:06}", year)
    } else {
        format!("{:04}", year)
    };

    let (hours, minutes, seconds) = (date.hour(), date.minute(), date.second());
    let millis = date.timestamp_subsec_millis();

    let time = if millis != 0 {
        format!("T{:02}:{:02}:{:02}.{:03}Z", hours, minutes, seconds, millis)
    } else if seconds != 0 {
        format!("T{:02}:{:02}:{:02}Z", hours, minutes, seconds)
    } else if minutes != 0 || hours != 0 {
        format!("T{:02}:{:02}Z", hours, minutes)
    } else {
        String::new()
    };

    format!("{}-{:02}-{:02}{}", year_text, date.month(), date.day(), time)
}
