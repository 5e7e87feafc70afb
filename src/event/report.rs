// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Normalized inbound device reports.

use serde_json::{Map, Value};

use crate::error::ParseError;
use crate::types::Fields;

use super::normalize_payload;

/// A normalized report addressed to one device.
///
/// Holds the device identifier, the canonical data mapping produced by
/// [`normalize_payload`](super::normalize_payload), the optional event kind
/// (e.g. `DoorSensor.Alert`) and the untouched original payload for
/// diagnostics.
///
/// # Examples
///
/// ```
/// use yolocal_lib::event::Event;
///
/// let event = Event::decode(br#"{"deviceId":"d1","event":"DoorSensor.Alert","data":{"state":"open"}}"#)
///     .unwrap();
///
/// assert_eq!(event.device_id(), "d1");
/// assert_eq!(event.kind(), Some("DoorSensor.Alert"));
/// assert_eq!(event.data()["state"].as_str(), Some("open"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    device_id: String,
    kind: Option<String>,
    data: Fields,
    raw: Map<String, Value>,
}

impl Event {
    /// Creates an event from an already-normalized data mapping.
    pub fn new(device_id: impl Into<String>, data: Fields) -> Self {
        Self {
            device_id: device_id.into(),
            kind: None,
            data,
            raw: Map::new(),
        }
    }

    /// Sets the event kind.
    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Normalizes a decoded JSON payload into an event.
    #[must_use]
    pub fn from_payload(payload: Map<String, Value>) -> Self {
        let (device_id, data) = normalize_payload(&payload);
        let kind = payload
            .get("event")
            .and_then(Value::as_str)
            .map(str::to_string);

        Self {
            device_id,
            kind,
            data,
            raw: payload,
        }
    }

    /// Decodes raw message bytes into an event.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Json`] if the bytes are not valid JSON and
    /// [`ParseError::UnexpectedFormat`] if the JSON is not an object.
    pub fn decode(bytes: &[u8]) -> Result<Self, ParseError> {
        match serde_json::from_slice(bytes)? {
            Value::Object(payload) => Ok(Self::from_payload(payload)),
            other => Err(ParseError::UnexpectedFormat(format!(
                "expected JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Returns the target device identifier.
    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Returns the event kind reported by the hub, if any.
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    /// Returns the normalized data mapping.
    #[must_use]
    pub fn data(&self) -> &Fields {
        &self.data
    }

    /// Returns the original payload.
    #[must_use]
    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
