//! `[key]`-token substitution against the execution context.
//!
//! Strings get every `[identifier]` occurrence replaced with the context
//! value's string form (empty when absent); JSON objects are resolved
//! recursively; numbers, booleans, and arrays pass through unchanged.
//! Only word-character runs count as identifiers: unmatched brackets and
//! bracketed text containing spaces or punctuation stay literal, so
//! resolution is idempotent on inputs without identifier tokens.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(\w+)\]").expect("placeholder pattern compiles"));

pub fn resolve_str(raw: &str, context: &HashMap<String, Value>) -> String {
    PLACEHOLDER
        .replace_all(raw, |caps: &Captures<'_>| {
            context.get(&caps[1]).map(value_to_string).unwrap_or_default()
        })
        .into_owned()
}

pub fn resolve_value(value: &Value, context: &HashMap<String, Value>) -> Value {
    match value {
        Value::String(s) => Value::String(resolve_str(s, context)),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), resolve_value(v, context)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
