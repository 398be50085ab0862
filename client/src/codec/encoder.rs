//! Typed encoding of contract arguments.
//!
//! The contract runtime behind the masternodes is not JSON-native for every
//! type: decimals travel as `{"__fixed__": "<digits>"}` so they never pass
//! through a binary float, datetimes as `{"__time__": [...]}` and durations
//! as `{"__delta__": [days, seconds]}`. [`encode`] turns a loosely typed
//! JSON value into the shape the runtime expects for a declared argument
//! type.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use serde_json::{json, Map, Value};
use thiserror::Error;

const FIXED_KEY: &str = "__fixed__";
const TIME_KEY: &str = "__time__";
const DELTA_KEY: &str = "__delta__";

/// Fractional digits kept in a fixed-point rendering. Extra digits are
/// truncated, never rounded.
const FIXED_PRECISION: usize = 30;

const MS_PER_DAY: i64 = 86_400_000;

const DATETIME_KEYS: [&str; 2] = ["datetime", "datetime.datetime"];
const TIMEDELTA_KEYS: [&str; 2] = ["timedelta", "datetime.timedelta"];

/// Errors produced by [`encode`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("{0} is not a valid encoder type")]
    UnknownType(String),

    #[error("error encoding {value} to {kind}")]
    Invalid { kind: ValueType, value: String },
}

/// Argument types understood by the contract runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Str,
    Int,
    Float,
    /// Integer when the value has no fractional part, fixed-point otherwise.
    Number,
    Bool,
    Dict,
    List,
    /// A list if the value parses as one, otherwise a dict.
    Object,
    DateTime,
    TimeDelta,
    Any,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Str => "str",
            Self::Int => "int",
            Self::Float => "float",
            Self::Number => "number",
            Self::Bool => "bool",
            Self::Dict => "dict",
            Self::List => "list",
            Self::Object => "object",
            Self::DateTime => "datetime.datetime",
            Self::TimeDelta => "datetime.timedelta",
            Self::Any => "Any",
        };
        f.write_str(name)
    }
}

impl FromStr for ValueType {
    type Err = EncodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "str" | "string" => Ok(Self::Str),
            "int" => Ok(Self::Int),
            "float" | "fixed" => Ok(Self::Float),
            "number" => Ok(Self::Number),
            "bool" | "boolean" => Ok(Self::Bool),
            "dict" => Ok(Self::Dict),
            "list" => Ok(Self::List),
            "object" => Ok(Self::Object),
            "datetime" | "datetime.datetime" => Ok(Self::DateTime),
            "timedelta" | "datetime.timedelta" => Ok(Self::TimeDelta),
            "Any" | "any" => Ok(Self::Any),
            other => Err(EncodeError::UnknownType(other.to_string())),
        }
    }
}

/// Encodes `value` as the runtime representation of `kind`.
pub fn encode(kind: ValueType, value: &Value) -> Result<Value, EncodeError> {
    let invalid = || EncodeError::Invalid {
        kind,
        value: value.to_string(),
    };

    match kind {
        ValueType::Str => Ok(match value {
            Value::String(s) => Value::String(s.clone()),
            other => Value::String(other.to_string()),
        }),
        ValueType::Int => decimal_text(value)
            .and_then(|d| integer_value(&d))
            .ok_or_else(invalid),
        ValueType::Float => decimal_text(value).map(|d| fixed(&d)).ok_or_else(invalid),
        ValueType::Number => {
            let d = decimal_text(value).ok_or_else(invalid)?;
            if has_fraction(&d) {
                Ok(fixed(&d))
            } else {
                integer_value(&d).ok_or_else(invalid)
            }
        }
        ValueType::Bool => match value {
            Value::Bool(b) => Ok(Value::Bool(*b)),
            Value::String(s) if s == "true" => Ok(Value::Bool(true)),
            Value::String(s) if s == "false" => Ok(Value::Bool(false)),
            Value::Number(n) if n.as_i64() == Some(1) => Ok(Value::Bool(true)),
            Value::Number(n) if n.as_i64() == Some(0) => Ok(Value::Bool(false)),
            _ => Err(invalid()),
        },
        ValueType::Dict => match parse_if_text(value) {
            Some(parsed @ Value::Object(_)) => Ok(normalize(&parsed)),
            _ => Err(invalid()),
        },
        ValueType::List => match parse_if_text(value) {
            Some(parsed @ Value::Array(_)) => Ok(normalize(&parsed)),
            _ => Err(invalid()),
        },
        ValueType::Object => encode(ValueType::List, value)
            .or_else(|_| encode(ValueType::Dict, value))
            .map_err(|_| invalid()),
        ValueType::DateTime => to_datetime(value)
            .map(|dt| encode_datetime(&dt))
            .ok_or_else(invalid),
        ValueType::TimeDelta => to_millis(value).map(encode_timedelta).ok_or_else(invalid),
        ValueType::Any => Ok(value.clone()),
    }
}

/// Renders a plain decimal string (`-12.3400`) as the fixed-point wire
/// object: integer part untouched, fraction truncated to 30 digits with
/// trailing zeros trimmed down to a single digit.
fn fixed(decimal: &str) -> Value {
    json!({ FIXED_KEY: fixed_string(decimal) })
}

fn fixed_string(decimal: &str) -> String {
    let (negative, body) = match decimal.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, decimal),
    };
    let (int_part, frac_part) = body.split_once('.').unwrap_or((body, ""));

    let int_part = int_part.trim_start_matches('0');
    let int_part = if int_part.is_empty() { "0" } else { int_part };

    let frac: String = frac_part.chars().take(FIXED_PRECISION).collect();
    let frac = frac.trim_end_matches('0');
    let frac = if frac.is_empty() { "0" } else { frac };

    let is_zero = int_part == "0" && frac == "0";
    let sign = if negative && !is_zero { "-" } else { "" };
    format!("{sign}{int_part}.{frac}")
}

/// Extracts a plain decimal rendering (no exponent) from a number or a
/// numeric string.
fn decimal_text(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Some(u.to_string())
            } else {
                n.as_f64().filter(|f| f.is_finite()).map(|f| format!("{f}"))
            }
        }
        Value::String(s) => {
            let s = s.trim();
            if is_plain_decimal(s) {
                Some(s.to_string())
            } else {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| format!("{f}"))
            }
        }
        _ => None,
    }
}

fn is_plain_decimal(s: &str) -> bool {
    let body = s.strip_prefix('-').unwrap_or(s);
    let (int_part, frac_part) = match body.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (body, None),
    };
    let digits = |p: &str| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit());
    digits(int_part) && frac_part.map_or(true, digits)
}

fn has_fraction(decimal: &str) -> bool {
    decimal
        .split_once('.')
        .map_or(false, |(_, frac)| frac.bytes().any(|b| b != b'0'))
}

/// Integer part of a decimal, truncated toward zero.
fn integer_value(decimal: &str) -> Option<Value> {
    let int_part = decimal.split('.').next().unwrap_or(decimal);
    if let Ok(i) = int_part.parse::<i64>() {
        return Some(Value::from(i));
    }
    int_part.parse::<u64>().ok().map(Value::from)
}

fn parse_if_text(value: &Value) -> Option<Value> {
    match value {
        Value::String(s) => serde_json::from_str(s).ok(),
        Value::Object(_) | Value::Array(_) => Some(value.clone()),
        _ => None,
    }
}

fn to_datetime(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }
}

fn to_millis(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        other => to_datetime(other).map(|dt| dt.timestamp_millis()),
    }
}

fn encode_datetime(dt: &DateTime<Utc>) -> Value {
    json!({
        TIME_KEY: [
            dt.year(),
            dt.month0(),
            dt.day(),
            dt.hour(),
            dt.minute(),
            dt.second(),
            dt.timestamp_subsec_millis(),
        ]
    })
}

fn encode_timedelta(millis: i64) -> Value {
    let days = millis / MS_PER_DAY;
    let remainder = millis - days * MS_PER_DAY;
    let seconds = if remainder % 1_000 == 0 {
        json!(remainder / 1_000)
    } else {
        json!(remainder as f64 / 1_000.0)
    };
    json!({ DELTA_KEY: [days, seconds] })
}

/// Walks a dict/list argument: fractional numbers become fixed-point,
/// `datetime`/`timedelta` keys are encoded, and a single-key
/// `{"datetime": ...}` wrapper collapses into the encoded value.
fn normalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some((key, inner)) = map.iter().next() {
                    if let Some(encoded) = encode_special(key, inner) {
                        return encoded;
                    }
                }
            }
            let mut out = Map::new();
            for (key, inner) in map {
                let encoded = if key == FIXED_KEY {
                    inner.clone()
                } else {
                    encode_special(key, inner).unwrap_or_else(|| normalize(inner))
                };
                out.insert(key.clone(), encoded);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(normalize).collect()),
        Value::Number(n) if n.as_i64().is_none() && n.as_u64().is_none() => {
            match decimal_text(value) {
                Some(d) if has_fraction(&d) => fixed(&d),
                _ => value.clone(),
            }
        }
        other => other.clone(),
    }
}

fn encode_special(key: &str, value: &Value) -> Option<Value> {
    if DATETIME_KEYS.contains(&key) {
        encode(ValueType::DateTime, value).ok()
    } else if TIMEDELTA_KEYS.contains(&key) {
        encode(ValueType::TimeDelta, value).ok()
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
