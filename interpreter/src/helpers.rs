//! Random-data helpers made available to expressions by default.

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use mixdown::{Context, Object, RuntimeError, RuntimeValue};
use rand::Rng;

const BASE64_ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
const HEX_ALPHABET: &str = "0123456789abcdef";
const DIGITS: &str = "0123456789";
const DEFAULT_LENGTH: usize = 8;
const MAX_LENGTH: usize = 1 << 20;
const DEFAULT_DOMAIN: &str = "example.com";
const DEFAULT_URL_BASE: &str = "http://example.com";
/// One day, in milliseconds.
const DEFAULT_DATE_INTERVAL: f64 = 86.4e6;

/// A context holding every helper:
///
/// | name | call | result |
/// |---|---|---|
/// | `randomStr` | `(len = 8, alphabet = base64)` | random string |
/// | `randomHex` | `(len = 8)` | lowercase hex string |
/// | `randomCode` | `(len = 8)` | string of digits |
/// | `randomEmail` | `(domain = "example.com")` | `test-<24 hex>@domain` |
/// | `randomUrl` | `(base = "http://example.com")` | `base/<24 hex>` |
/// | `random` | `()`, `(max)`, `(min, max)` | number in `[min, max)` |
/// | `randomInt` | `()`, `(max)`, `(min, max)` | integer in `[min, max)`, default `[0, 100)` |
/// | `randomBool` | `()` | boolean |
/// | `randomDate` | `(interval_ms = 1 day, base = now)` | RFC 3339 timestamp before `base` |
/// | `randomOf` | `(a, b, ...)` | one of the arguments |
/// | `empty` | | `{}` |
pub fn base_context() -> Context {
    Context::new()
        .with("randomStr", RuntimeValue::function("randomStr", |args| {
            let len = length_arg(args, 0)?;
            let alphabet = string_arg(args, 1)?.filter(|a| !a.is_empty());
            Ok(random_str(len, alphabet.unwrap_or(BASE64_ALPHABET)).into())
        }))
        .with("randomHex", RuntimeValue::function("randomHex", |args| {
            Ok(random_str(length_arg(args, 0)?, HEX_ALPHABET).into())
        }))
        .with("randomCode", RuntimeValue::function("randomCode", |args| {
            Ok(random_str(length_arg(args, 0)?, DIGITS).into())
        }))
        .with("randomEmail", RuntimeValue::function("randomEmail", |args| {
            let domain = string_arg(args, 0)?.filter(|d| !d.is_empty()).unwrap_or(DEFAULT_DOMAIN);
            Ok(format!("test-{}@{}", random_str(24, HEX_ALPHABET), domain).into())
        }))
        .with("randomUrl", RuntimeValue::function("randomUrl", |args| {
            let base = string_arg(args, 0)?.filter(|b| !b.is_empty()).unwrap_or(DEFAULT_URL_BASE);
            Ok(format!("{}/{}", base, random_str(24, HEX_ALPHABET)).into())
        }))
        .with("random", RuntimeValue::function("random", |args| {
            let (min, max) = bounds(args, 1.0)?;
            Ok(RuntimeValue::Number(random_between(min, max)))
        }))
        .with("randomInt", RuntimeValue::function("randomInt", |args| {
            let (min, max) = bounds(args, 100.0)?;
            Ok(RuntimeValue::Number(random_between(min, max).floor()))
        }))
        .with("randomBool", RuntimeValue::function("randomBool", |_| {
            Ok(RuntimeValue::Boolean(rand::thread_rng().gen_bool(0.5)))
        }))
        .with("randomDate", RuntimeValue::function("randomDate", random_date))
        .with("randomOf", RuntimeValue::function("randomOf", |args| {
            if args.is_empty() {
                return Ok(RuntimeValue::Null);
            }
            let index = rand::thread_rng().gen_range(0..args.len());
            Ok(args[index].clone())
        }))
        .with("empty", Object::new())
}

fn random_str(len: usize, alphabet: &str) -> String {
    let chars: Vec<char> = alphabet.chars().collect();
    let mut rng = rand::thread_rng();
    (0..len).map(|_| chars[rng.gen_range(0..chars.len())]).collect()
}

/// Uniform in `[min, max)`; also well-defined when `max <= min`.
fn random_between(min: f64, max: f64) -> f64 {
    let unit: f64 = rand::thread_rng().gen_range(0.0..1.0);
    min + unit * (max - min)
}

fn random_date(args: &[RuntimeValue]) -> Result<RuntimeValue, RuntimeError> {
    // `randomDate(base)` is shorthand for `randomDate(1 day, base)`.
    let (interval, base) = match args.first() {
        Some(RuntimeValue::String(base)) => (None, Some(base.as_str())),
        _ => (number_arg(args, 0)?, string_arg(args, 1)?),
    };

    let base = match base {
        Some(text) => DateTime::parse_from_rfc3339(text)
            .map_err(|e| RuntimeError::Custom(format!("randomDate: invalid date '{}': {}", text, e)))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };
    let interval = interval.filter(|i| *i != 0.0).unwrap_or(DEFAULT_DATE_INTERVAL);
    let offset = random_between(0.0, interval) as i64;
    let date = TimeDelta::try_milliseconds(offset)
        .and_then(|offset| base.checked_sub_signed(offset))
        .ok_or_else(|| {
            RuntimeError::Custom(format!("randomDate: interval {} is out of range", interval))
        })?;

    Ok(date.to_rfc3339_opts(SecondsFormat::Millis, true).into())
}

// ---------------------------------------------------------------------------
// Argument helpers
// ---------------------------------------------------------------------------

/// `None` for a missing or null argument.
fn number_arg(args: &[RuntimeValue], index: usize) -> Result<Option<f64>, RuntimeError> {
    match args.get(index) {
        None | Some(RuntimeValue::Null) => Ok(None),
        Some(RuntimeValue::Number(n)) => Ok(Some(*n)),
        Some(other) => Err(RuntimeError::TypeError {
            expected: "number".to_string(),
            got: other.type_name().to_string(),
        }),
    }
}

fn string_arg(args: &[RuntimeValue], index: usize) -> Result<Option<&str>, RuntimeError> {
    match args.get(index) {
        None | Some(RuntimeValue::Null) => Ok(None),
        Some(RuntimeValue::String(s)) => Ok(Some(s)),
        Some(other) => Err(RuntimeError::TypeError {
            expected: "string".to_string(),
            got: other.type_name().to_string(),
        }),
    }
}

/// A string length; zero or absent means the default.
fn length_arg(args: &[RuntimeValue], index: usize) -> Result<usize, RuntimeError> {
    match number_arg(args, index)? {
        Some(n) if n > MAX_LENGTH as f64 => Err(RuntimeError::Custom(format!(
            "length {} exceeds the maximum of {}",
            n, MAX_LENGTH
        ))),
        Some(n) if n >= 1.0 => Ok(n as usize),
        _ => Ok(DEFAULT_LENGTH),
    }
}

/// `()` is `[0, default_max)`, `(max)` is `[0, max)`, `(min, max)` as given.
fn bounds(args: &[RuntimeValue], default_max: f64) -> Result<(f64, f64), RuntimeError> {
    Ok(match (number_arg(args, 0)?, number_arg(args, 1)?) {
        (None, None) => (0.0, default_max),
        (Some(max), None) => (0.0, max),
        (min, Some(max)) => (min.unwrap_or(0.0), max),
    })
}
