//! Loading run-time contexts from JSON or TOML files.

use std::path::Path;

use mixdown::{Array, Context, Object, RuntimeValue};

/// Read a context file. `.toml` files are parsed as TOML, anything else as
/// JSON. The top level must be a table/object.
pub fn load(path: &str) -> Result<Context, String> {
    let text = std::fs::read_to_string(path).map_err(|e| format!("cannot read '{}': {}", path, e))?;
    let is_toml = Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    if is_toml {
        let table: toml::Table =
            toml::from_str(&text).map_err(|e| format!("invalid TOML in '{}': {}", path, e))?;
        Ok(table.into_iter().map(|(name, value)| (name, from_toml(value))).collect())
    } else {
        match serde_json::from_str(&text) {
            Ok(serde_json::Value::Object(map)) => Ok(Context::from(map)),
            Ok(_) => Err(format!("'{}' must contain a JSON object", path)),
            Err(e) => Err(format!("invalid JSON in '{}': {}", path, e)),
        }
    }
}

/// Datetimes become their RFC 3339 text.
fn from_toml(value: toml::Value) -> RuntimeValue {
    match value {
        toml::Value::String(s) => RuntimeValue::String(s),
        toml::Value::Integer(i) => RuntimeValue::Number(i as f64),
        toml::Value::Float(f) => RuntimeValue::Number(f),
        toml::Value::Boolean(b) => RuntimeValue::Boolean(b),
        toml::Value::Datetime(d) => RuntimeValue::String(d.to_string()),
        toml::Value::Array(items) => {
            RuntimeValue::Array(Array::new(items.into_iter().map(from_toml).collect(), false))
        }
        toml::Value::Table(table) => RuntimeValue::Object(
            table
                .into_iter()
                .map(|(key, value)| (key, from_toml(value)))
                .collect::<Object>(),
        ),
    }
}
