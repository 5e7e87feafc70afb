// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tagged representation of hub payload values.
//!
//! Hub payloads mix nested and flat encodings: the same `state` key may hold
//! a plain string (`"open"`) on one firmware and an object with diagnostic
//! fields on another. [`StateValue`] makes that distinction explicit at the
//! boundary so merge logic matches on a variant instead of probing JSON.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// Field mapping used throughout snapshots and events.
pub type Fields = BTreeMap<String, StateValue>;

/// A value reported by the hub: either a scalar or a nested mapping.
///
/// [`StateValue::Scalar`] never holds a JSON object; objects are always
/// converted to [`StateValue::Mapping`]. Arrays are kept as scalars.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use yolocal_lib::types::StateValue;
///
/// let value = StateValue::from(json!({"state": "open", "battery": 4}));
/// let fields = value.as_mapping().unwrap();
/// assert_eq!(fields["state"].as_str(), Some("open"));
///
/// let scalar = StateValue::from(json!("closed"));
/// assert!(scalar.as_mapping().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum StateValue {
    /// A non-object JSON value (null, bool, number, string or array).
    Scalar(Value),
    /// A nested field mapping.
    Mapping(Fields),
}

impl StateValue {
    /// Returns the JSON `null` scalar.
    #[must_use]
    pub const fn null() -> Self {
        Self::Scalar(Value::Null)
    }

    /// Returns `true` if this is the `null` scalar.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Scalar(Value::Null))
    }

    /// Returns `true` if this is a nested mapping.
    #[must_use]
    pub fn is_mapping(&self) -> bool {
        matches!(self, Self::Mapping(_))
    }

    /// Returns the nested mapping, if any.
    #[must_use]
    pub fn as_mapping(&self) -> Option<&Fields> {
        match self {
            Self::Mapping(fields) => Some(fields),
            Self::Scalar(_) => None,
        }
    }

    /// Returns the scalar JSON value, if any.
    #[must_use]
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            Self::Scalar(value) => Some(value),
            Self::Mapping(_) => None,
        }
    }

    /// Returns the value as a string slice if it is a string scalar.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar().and_then(Value::as_str)
    }

    /// Returns the value as `f64` if it is a numeric scalar.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        self.as_scalar().and_then(Value::as_f64)
    }

    /// Returns the value as `i64` if it is an integral scalar.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        self.as_scalar().and_then(Value::as_i64)
    }

    /// Returns the value as `bool` if it is a boolean scalar.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        self.as_scalar().and_then(Value::as_bool)
    }

    /// Converts the value back to plain JSON.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Scalar(value) => value.clone(),
            Self::Mapping(fields) => fields_to_json(fields),
        }
    }
}

impl Default for StateValue {
    fn default() -> Self {
        Self::null()
    }
}

impl From<Value> for StateValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::Mapping(fields_from_json(map)),
            other => Self::Scalar(other),
        }
    }
}

impl From<StateValue> for Value {
    fn from(value: StateValue) -> Self {
        match value {
            StateValue::Scalar(value) => value,
            StateValue::Mapping(fields) => Value::Object(
                fields
                    .into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<Fields> for StateValue {
    fn from(fields: Fields) -> Self {
        Self::Mapping(fields)
    }
}

impl From<&str> for StateValue {
    fn from(value: &str) -> Self {
        Self::Scalar(Value::String(value.to_string()))
    }
}

impl From<String> for StateValue {
    fn from(value: String) -> Self {
        Self::Scalar(Value::String(value))
    }
}

impl From<bool> for StateValue {
    fn from(value: bool) -> Self {
        Self::Scalar(Value::Bool(value))
    }
}

impl From<i64> for StateValue {
    fn from(value: i64) -> Self {
        Self::Scalar(Value::from(value))
    }
}

impl From<f64> for StateValue {
    fn from(value: f64) -> Self {
        Self::Scalar(Value::from(value))
    }
}

/// Converts a JSON object into a field mapping.
#[must_use]
pub fn fields_from_json(map: Map<String, Value>) -> Fields {
    map.into_iter()
        .map(|(key, value)| (key, StateValue::from(value)))
        .collect()
}

/// Converts a field mapping into a JSON object.
#[must_use]
pub fn fields_to_json(fields: &Fields) -> Value {
    Value::Object(
        fields
            .iter()
            .map(|(key, value)| (key.clone(), value.to_json()))
            .collect(),
    )
}
