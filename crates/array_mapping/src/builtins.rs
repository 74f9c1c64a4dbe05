use serde_json::Value as JsonValue;

use crate::registry::{Arity, FunctionError, FunctionRegistry, FunctionResult};

impl FunctionRegistry {
    /// A registry preloaded with the builtin string functions:
    /// `concat`, `coalesce`, `to_string`, `trim`, `lowercase`, `uppercase`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        register_builtins(&mut registry);
        registry
    }
}

pub fn register_builtins(registry: &mut FunctionRegistry) {
    registry
        .register("concat", Arity::AtLeast(1), concat)
        .register("coalesce", Arity::AtLeast(1), coalesce)
        .register_unary("to_string", |value| {
            map_present(value, |value| value_to_string(value).map(JsonValue::String))
        })
        .register_unary("trim", |value| {
            map_present(value, |value| {
                value_as_string(value).map(|s| JsonValue::String(s.trim().to_string()))
            })
        })
        .register_unary("lowercase", |value| {
            map_present(value, |value| {
                value_as_string(value).map(|s| JsonValue::String(s.to_lowercase()))
            })
        })
        .register_unary("uppercase", |value| {
            map_present(value, |value| {
                value_as_string(value).map(|s| JsonValue::String(s.to_uppercase()))
            })
        });
}

fn concat(args: &[JsonValue]) -> FunctionResult {
    let mut joined = String::new();
    for value in args {
        if value.is_null() {
            return Ok(JsonValue::Null);
        }
        joined.push_str(&value_to_string(value)?);
    }
    Ok(JsonValue::String(joined))
}

fn coalesce(args: &[JsonValue]) -> FunctionResult {
    Ok(args
        .iter()
        .find(|value| !value.is_null())
        .cloned()
        .unwrap_or(JsonValue::Null))
}

fn map_present<F>(value: &JsonValue, op: F) -> FunctionResult
where
    F: FnOnce(&JsonValue) -> FunctionResult,
{
    if value.is_null() {
        return Ok(JsonValue::Null);
    }
    op(value)
}

fn value_to_string(value: &JsonValue) -> Result<String, FunctionError> {
    match value {
        JsonValue::String(s) => Ok(s.clone()),
        JsonValue::Number(n) => Ok(number_to_string(n)),
        JsonValue::Bool(b) => Ok(b.to_string()),
        _ => Err(FunctionError::new("value must be string/number/bool")),
    }
}

fn value_as_string(value: &JsonValue) -> Result<&str, FunctionError> {
    value
        .as_str()
        .ok_or_else(|| FunctionError::new("value must be a string"))
}

fn number_to_string(number: &serde_json::Number) -> String {
    if let Some(i) = number.as_i64() {
        return i.to_string();
    }
    if let Some(u) = number.as_u64() {
        return u.to_string();
    }
    if let Some(f) = number.as_f64() {
        let mut s = format!("{}", f);
        if s.contains('.') {
            while s.ends_with('0') {
                s.pop();
            }
            if s.ends_with('.') {
                s.pop();
            }
        }
        return s;
    }
    number.to_string()
}
