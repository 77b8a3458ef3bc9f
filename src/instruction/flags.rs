//! Free-form command flags
//!
//! Instruction-specific flags arrive as `--key=value` pairs and are collected
//! into one map. Values are parsed as JSON when they look like JSON so lists
//! and numbers work without per-flag wiring; everything else stays a string.

use crate::error::OpsError;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default)]
pub struct Flags {
    values: BTreeMap<String, Value>,
}

impl Flags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `--key=value` / `--key` pairs. Repeating a key collects the
    /// values into an array (used by `--skip`).
    pub fn from_pairs<S: AsRef<str>>(pairs: &[S]) -> Result<Self, OpsError> {
        let mut flags = Flags::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let stripped = pair.trim_start_matches('-');
            if stripped.is_empty() {
                return Err(OpsError::Configuration(format!("malformed flag: {}", pair)));
            }
            match stripped.split_once('=') {
                Some((key, raw)) => flags.push(key, parse_value(raw)),
                None => flags.push(stripped, Value::Bool(true)),
            }
        }
        Ok(flags)
    }

    fn push(&mut self, key: &str, value: Value) {
        match self.values.get_mut(key) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let previous = existing.take();
                *existing = Value::Array(vec![previous, value]);
            }
            None => {
                self.values.insert(key.to_string(), value);
            }
        }
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }

    /// Overlay every field of a JSON object onto these flags
    pub fn merge_object(&mut self, object: &Value) -> Result<(), OpsError> {
        let map = object.as_object().ok_or_else(|| {
            OpsError::Configuration(format!("expected a JSON object, got: {}", object))
        })?;
        for (key, value) in map {
            self.values.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// String form of a flag; numbers are rendered as decimal strings
    pub fn str(&self, key: &str) -> Option<String> {
        match self.values.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn u64(&self, key: &str) -> Option<u64> {
        match self.values.get(key)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Present-and-not-false, so both `--all` and `--all=true` work
    pub fn bool(&self, key: &str) -> bool {
        match self.values.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s != "false",
            Some(_) => true,
            None => false,
        }
    }

    /// A list flag: JSON array, repeated flag, or comma-separated string
    pub fn list(&self, key: &str) -> Vec<String> {
        match self.values.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
            Some(Value::String(s)) => s.split(',').map(|p| p.trim().to_string()).collect(),
            _ => Vec::new(),
        }
    }

    /// Validator names excluded via `--skip=<name>`
    pub fn skipped_validations(&self) -> Vec<String> {
        self.list("skip")
    }

    /// Explicit input bypassing flag parsing: `--input=<json>` or
    /// `--inputFile=<path>`
    pub fn input_override<T: DeserializeOwned>(&self) -> Result<Option<T>, OpsError> {
        if let Some(value) = self.values.get("input") {
            let parsed = match value {
                Value::String(raw) => serde_json::from_str(raw)
                    .map_err(|e| OpsError::Configuration(format!("invalid --input: {}", e)))?,
                other => other.clone(),
            };
            let input = serde_json::from_value(parsed)
                .map_err(|e| OpsError::Configuration(format!("invalid --input: {}", e)))?;
            return Ok(Some(input));
        }
        if let Some(path) = self.str("inputFile") {
            let raw = std::fs::read_to_string(&path).map_err(|e| {
                OpsError::Configuration(format!("cannot read input file {}: {}", path, e))
            })?;
            let input = serde_json::from_str(&raw).map_err(|e| {
                OpsError::Configuration(format!("invalid input file {}: {}", path, e))
            })?;
            return Ok(Some(input));
        }
        Ok(None)
    }

    /// Raw `--input` value without deserializing, for the batch wrapper
    pub fn raw_input(&self) -> Result<Option<Value>, OpsError> {
        self.input_override()
    }
}

fn parse_value(raw: &str) -> Value {
    // JSON first so --f=1 is a number and --signers=["a","b"] is an array;
    // bare words fall back to strings
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
