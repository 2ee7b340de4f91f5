//! Nested container values.
//!
//! Matrix-laboratory struct files load as values wrapped in several
//! levels of single-element arrays. A scalar `256` typically arrives as
//! `[[256]]`, a struct array of events as `[[{..}, {..}, ..]]`.
//!
//! ```text
//! MatValue
//!   ├─ Missing           null  (NaN in numeric contexts)
//!   ├─ Number(f64)       7, 2.5e-3
//!   ├─ Text(String)      "Fp1"
//!   ├─ Array(Vec<..>)    [..]               one dimension per nesting level
//!   └─ Struct(Vec<..>)   {"struct": [..]}   positional record, no dimension
//! ```
//!
//! On disk a container is a JSON object mapping variable name → value;
//! `null` is `Missing` and `{"struct": [..]}` is a struct record.
use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DecodeError;

/// Key marking a JSON object as a struct record.
const STRUCT_KEY: &str = "struct";

/// One node of a decoded container.
///
/// Equality treats NaN numbers as equal, so decoded values and their
/// snapshots compare equal when samples are missing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MatValue {
    Missing,
    Number(f64),
    Text(String),
    Array(Vec<MatValue>),
    Struct(Vec<MatValue>),
}

impl MatValue {
    /// Wrap a struct record.
    pub fn record(fields: Vec<MatValue>) -> Self {
        MatValue::Struct(fields)
    }

    /// Short kind name used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            MatValue::Missing   => "missing",
            MatValue::Number(_) => "number",
            MatValue::Text(_)   => "text",
            MatValue::Array(_)  => "array",
            MatValue::Struct(_) => "struct",
        }
    }

    /// Number of array dimensions, measured along the first element.
    ///
    /// Scalars, text and struct records count as 0-D; an empty array is 1-D.
    pub fn ndim(&self) -> usize {
        match self {
            MatValue::Array(items) => 1 + items.first().map_or(0, MatValue::ndim),
            _ => 0,
        }
    }

    /// First element of an array, if any.
    pub fn first(&self) -> Option<&MatValue> {
        match self {
            MatValue::Array(items) => items.first(),
            _ => None,
        }
    }

    /// Positional field of a struct record.
    pub fn field(&self, index: usize) -> Option<&MatValue> {
        match self {
            MatValue::Struct(fields) => fields.get(index),
            _ => None,
        }
    }

    /// Convert from the JSON export representation.
    pub fn from_json(value: &Value) -> Result<Self, DecodeError> {
        Ok(match value {
            Value::Null      => MatValue::Missing,
            Value::Number(n) => MatValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => MatValue::Text(s.clone()),
            Value::Array(items) => MatValue::Array(
                items.iter().map(MatValue::from_json).collect::<Result<_, _>>()?,
            ),
            Value::Object(map) => match (map.len(), map.get(STRUCT_KEY)) {
                (1, Some(Value::Array(fields))) => MatValue::Struct(
                    fields.iter().map(MatValue::from_json).collect::<Result<_, _>>()?,
                ),
                _ => return Err(DecodeError::NotAVector { found: "object" }),
            },
            Value::Bool(_) => return Err(DecodeError::NotANumber { found: "bool" }),
        })
    }

    /// Convert to the JSON export representation. NaN is written as `null`.
    pub fn to_json(&self) -> Value {
        match self {
            MatValue::Missing   => Value::Null,
            MatValue::Number(v) => serde_json::Number::from_f64(*v).map_or(Value::Null, Value::Number),
            MatValue::Text(s)   => Value::String(s.clone()),
            MatValue::Array(items) => Value::Array(items.iter().map(MatValue::to_json).collect()),
            MatValue::Struct(fields) => {
                let mut map = Map::new();
                map.insert(
                    STRUCT_KEY.to_string(),
                    Value::Array(fields.iter().map(MatValue::to_json).collect()),
                );
                Value::Object(map)
            }
        }
    }
}

impl PartialEq for MatValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (MatValue::Missing, MatValue::Missing) => true,
            (MatValue::Number(a), MatValue::Number(b)) => nan_eq(*a, *b),
            (MatValue::Text(a), MatValue::Text(b)) => a == b,
            (MatValue::Array(a), MatValue::Array(b))
            | (MatValue::Struct(a), MatValue::Struct(b)) => a == b,
            _ => false,
        }
    }
}

/// Float equality where NaN equals NaN.
#[inline]
pub fn nan_eq(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

/// A whole container: variable name → value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Container {
    pub variables: BTreeMap<String, MatValue>,
}

impl Container {
    /// Read a JSON container export from disk.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .with_context(|| format!("open {}", path.display()))?;
        let json: Value = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse container {}", path.display()))?;
        let Value::Object(map) = json else {
            anyhow::bail!("container {} is not a JSON object", path.display());
        };
        let mut variables = BTreeMap::new();
        for (name, value) in &map {
            let v = MatValue::from_json(value)
                .with_context(|| format!("variable '{name}' in {}", path.display()))?;
            variables.insert(name.clone(), v);
        }
        Ok(Container { variables })
    }

    /// Write the container as JSON (used by fixtures and converters).
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let map: Map<String, Value> = self
            .variables
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        let bytes = serde_json::to_vec(&Value::Object(map))?;
        std::fs::write(path, bytes)
            .with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    pub fn insert(&mut self, name: &str, value: MatValue) {
        self.variables.insert(name.to_string(), value);
    }

    /// Named variable lookup.
    pub fn get(&self, name: &str) -> Result<&MatValue, DecodeError> {
        self.variables
            .get(name)
            .ok_or_else(|| DecodeError::MissingVariable(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_numbers_compare_equal() {
        let a = MatValue::Array(vec![MatValue::Number(f64::NAN), MatValue::Number(1.0)]);
        assert_eq!(a, a.clone());
        assert_ne!(a, MatValue::Array(vec![MatValue::Number(f64::NAN), MatValue::Number(2.0)]));
        assert_ne!(MatValue::Number(f64::NAN), MatValue::Missing);
        assert_ne!(MatValue::Array(vec![]), MatValue::Struct(vec![]));
    }

    #[test]
    fn json_maps_onto_variants() {
        let json: Value = serde_json::from_str(
            r#"[[1, null, "Fp1", {"struct": [[51], [100.0]]}]]"#,
        ).unwrap();
        let v = MatValue::from_json(&json).unwrap();
        let row = v.first().unwrap();
        let MatValue::Array(items) = row else { panic!("expected array") };
        assert_eq!(items[0], MatValue::Number(1.0));
        assert_eq!(items[1], MatValue::Missing);
        assert_eq!(items[2], MatValue::Text("Fp1".into()));
        assert_eq!(items[3].field(0), Some(&MatValue::Array(vec![MatValue::Number(51.0)])));
    }

    #[test]
    fn struct_elements_add_no_dimension() {
        let events = MatValue::Array(vec![MatValue::Array(vec![
            MatValue::record(vec![MatValue::Number(1.0)]),
            MatValue::record(vec![MatValue::Number(2.0)]),
        ])]);
        assert_eq!(events.ndim(), 2);
        assert_eq!(MatValue::Array(vec![]).ndim(), 1);
        assert_eq!(MatValue::Number(3.0).ndim(), 0);
    }

    #[test]
    fn foreign_json_is_rejected() {
        let bad: Value = serde_json::from_str(r#"[{"fields": [1]}]"#).unwrap();
        assert!(MatValue::from_json(&bad).is_err());
        assert!(MatValue::from_json(&Value::Bool(true)).is_err());
    }

    #[test]
    fn nan_is_written_as_null() {
        let v = MatValue::Array(vec![MatValue::Number(f64::NAN), MatValue::Number(2.0)]);
        assert_eq!(v.to_json().to_string(), "[null,2.0]");
    }

    #[test]
    fn container_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.json");
        let mut c = Container::default();
        c.insert("EEG", MatValue::Array(vec![MatValue::record(vec![
            MatValue::Text("x".into()),
            MatValue::Number(3.5),
        ])]));
        c.write(&path).unwrap();
        assert_eq!(Container::read(&path).unwrap(), c);
    }

    #[test]
    fn missing_variable_is_reported() {
        let c = Container::default();
        assert_eq!(c.get("EEG"), Err(DecodeError::MissingVariable("EEG".into())));
    }
}
