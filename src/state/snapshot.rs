// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-device state snapshots.

use std::ops::Index;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{Fields, StateValue, fields_from_json, fields_to_json};

/// Key holding the device-specific state, usually a nested mapping.
pub const STATE_KEY: &str = "state";

/// Liveness flag key.
pub const ONLINE_KEY: &str = "online";

/// Last report timestamp key.
pub const REPORT_AT_KEY: &str = "reportAt";

/// Everything known about one device at a point in time.
///
/// A snapshot is a field mapping. By convention the `state` key holds a
/// nested mapping of device-specific fields, while `online` and `reportAt`
/// are top-level liveness metadata. Snapshots are values: the store hands out
/// clones, and only the merge engine produces new ones.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use yolocal_lib::state::StateSnapshot;
///
/// let snapshot = StateSnapshot::from_json(json!({
///     "state": {"state": "open", "battery": 4},
///     "online": true
/// }));
///
/// assert_eq!(snapshot.online(), Some(true));
/// assert_eq!(snapshot.field("battery").and_then(|v| v.as_i64()), Some(4));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateSnapshot(Fields);

impl StateSnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub const fn new() -> Self {
        Self(Fields::new())
    }

    /// Builds a snapshot from a JSON value.
    ///
    /// Anything but a JSON object yields an empty snapshot.
    #[must_use]
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::from(map),
            _ => Self::new(),
        }
    }

    /// Returns a top-level field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&StateValue> {
        self.0.get(key)
    }

    /// Returns `true` if the top-level key is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Returns the top-level `state` value.
    #[must_use]
    pub fn state(&self) -> Option<&StateValue> {
        self.get(STATE_KEY)
    }

    /// Returns the nested `state` mapping, if `state` is a mapping.
    #[must_use]
    pub fn nested_state(&self) -> Option<&Fields> {
        self.state().and_then(StateValue::as_mapping)
    }

    /// Looks up a device field, preferring `state.<name>` over `<name>`.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&StateValue> {
        self.nested_state()
            .and_then(|nested| nested.get(name))
            .or_else(|| self.get(name))
    }

    /// Returns the top-level `online` flag.
    #[must_use]
    pub fn online(&self) -> Option<bool> {
        self.get(ONLINE_KEY).and_then(StateValue::as_bool)
    }

    /// Returns the top-level `reportAt` value.
    #[must_use]
    pub fn report_at(&self) -> Option<&StateValue> {
        self.get(REPORT_AT_KEY)
    }

    /// Returns all top-level fields.
    #[must_use]
    pub fn fields(&self) -> &Fields {
        &self.0
    }

    /// Consumes the snapshot, returning its fields.
    #[must_use]
    pub fn into_fields(self) -> Fields {
        self.0
    }

    /// Returns the number of top-level fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if nothing is known about the device.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Converts the snapshot to a JSON object.
    #[must_use]
    pub fn to_json(&self) -> Value {
        fields_to_json(&self.0)
    }
}

impl From<Fields> for StateSnapshot {
    fn from(fields: Fields) -> Self {
        Self(fields)
    }
}

impl From<Map<String, Value>> for StateSnapshot {
    fn from(map: Map<String, Value>) -> Self {
        Self(fields_from_json(map))
    }
}

impl Index<&str> for StateSnapshot {
    type Output = StateValue;

    /// # Panics
    ///
    /// Panics if the key is not present.
    fn index(&self, key: &str) -> &StateValue {
        &self.0[key]
    }
}
