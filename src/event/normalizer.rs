// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Normalization of inbound report payloads.
//!
//! Reports published by the hub come in several shapes depending on device
//! family and firmware:
//!
//! ```text
//! {"deviceId": "...", "data": {"state": "open", "battery": 4}}
//! {"deviceId": "...", "params": {"data": {...}}}
//! {"deviceId": "...", "params": {"temperature": 21.5}}
//! {"deviceId": "...", "state": "alert", "time": "..."}
//! ```
//!
//! [`normalize_payload`] reduces all of them to a device identifier plus one
//! field mapping, which is the only shape the merge engine accepts.

use serde_json::{Map, Value};

use crate::types::{Fields, StateValue, fields_from_json};

/// Extracts the device identifier and data mapping from a report payload.
///
/// Data is looked up in order, first match wins:
///
/// 1. a non-null top-level `data`
/// 2. a `params` object: its `data` sub-key if present, else the whole object
/// 3. a top-level `state`, wrapped as `{"state": <value>}`
/// 4. an empty mapping
///
/// A scalar found in steps 1 or 2 is wrapped as `{"state": <value>}`.
/// Missing `reportAt` is filled from the payload's `time`, and missing
/// `online` from the payload's `online`. Absent keys never produce an error.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use yolocal_lib::event::normalize_payload;
///
/// let payload = json!({
///     "deviceId": "abc",
///     "params": {"temperature": 21.5},
///     "time": "2026-01-01T10:00:00Z"
/// });
///
/// let (device_id, data) = normalize_payload(payload.as_object().unwrap());
/// assert_eq!(device_id, "abc");
/// assert_eq!(data["temperature"].as_f64(), Some(21.5));
/// assert_eq!(data["reportAt"].as_str(), Some("2026-01-01T10:00:00Z"));
/// ```
#[must_use]
pub fn normalize_payload(payload: &Map<String, Value>) -> (String, Fields) {
    let device_id = match payload.get("deviceId") {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => String::new(),
    };

    let mut data = extract_data(payload);

    if !data.contains_key("reportAt")
        && let Some(time) = payload.get("time").filter(|time| is_truthy(time))
    {
        data.insert("reportAt".to_string(), StateValue::from(time.clone()));
    }

    if !data.contains_key("online")
        && let Some(online) = payload.get("online")
    {
        data.insert("online".to_string(), StateValue::from(online.clone()));
    }

    (device_id, data)
}

fn extract_data(payload: &Map<String, Value>) -> Fields {
    if let Some(data) = payload.get("data").filter(|data| !data.is_null()) {
        return data_fields(data);
    }

    if let Some(Value::Object(params)) = payload.get("params") {
        match params.get("data") {
            None => return fields_from_json(params.clone()),
            Some(Value::Null) => {}
            Some(data) => return data_fields(data),
        }
    }

    if let Some(state) = payload.get("state") {
        return wrap_state(state);
    }

    Fields::new()
}

fn data_fields(data: &Value) -> Fields {
    match data {
        Value::Object(map) => fields_from_json(map.clone()),
        scalar => wrap_state(scalar),
    }
}

fn wrap_state(value: &Value) -> Fields {
    Fields::from([("state".to_string(), StateValue::from(value.clone()))])
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn normalize(payload: &Value) -> (String, Value) {
        let (device_id, data) = normalize_payload(payload.as_object().unwrap());
        (device_id, crate::types::fields_to_json(&data))
    }

    #[test]
    fn data_key_wins() {
        let (id, data) = normalize(&json!({
            "deviceId": "d1",
            "data": {"state": "open"},
            "params": {"ignored": true},
            "state": "ignored"
        }));
        assert_eq!(id, "d1");
        assert_eq!(data, json!({"state": "open"}));
    }

    #[test]
    fn null_data_falls_through_to_params() {
        let (_, data) = normalize(&json!({"data": null, "params": {"battery": 2}}));
        assert_eq!(data, json!({"battery": 2}));
    }

    #[test]
    fn params_data_sub_key() {
        let (_, data) = normalize(&json!({"params": {"data": {"state": "alert"}, "other": 1}}));
        assert_eq!(data, json!({"state": "alert"}));
    }

    #[test]
    fn params_without_data_is_used_whole() {
        let (_, data) = normalize(&json!({"params": {"temperature": 20, "humidity": 40}}));
        assert_eq!(data, json!({"temperature": 20, "humidity": 40}));
    }

    #[test]
    fn non_mapping_params_is_ignored() {
        let (_, data) = normalize(&json!({"params": "text", "state": "closed"}));
        assert_eq!(data, json!({"state": "closed"}));
    }

    #[test]
    fn top_level_state_is_wrapped() {
        let (_, data) = normalize(&json!({"deviceId": "d2", "state": {"lock": "locked"}}));
        assert_eq!(data, json!({"state": {"lock": "locked"}}));
    }

    #[test]
    fn scalar_data_is_wrapped() {
        let (_, data) = normalize(&json!({"data": "alert"}));
        assert_eq!(data, json!({"state": "alert"}));
    }

    #[test]
    fn empty_payload_degrades_gracefully() {
        let (id, data) = normalize(&json!({}));
        assert_eq!(id, "");
        assert_eq!(data, json!({}));
    }

    #[test]
    fn time_copied_as_report_at() {
        let (_, data) = normalize(&json!({"data": {"state": "open"}, "time": "2026-03-01T08:00:00Z"}));
        assert_eq!(data["reportAt"], json!("2026-03-01T08:00:00Z"));
    }

    #[test]
    fn existing_report_at_is_kept() {
        let (_, data) = normalize(&json!({
            "data": {"reportAt": "2026-03-01T08:00:00Z"},
            "time": "2026-03-02T08:00:00Z"
        }));
        assert_eq!(data["reportAt"], json!("2026-03-01T08:00:00Z"));
    }

    #[test]
    fn empty_time_is_not_copied() {
        let (_, data) = normalize(&json!({"data": {"state": "open"}, "time": ""}));
        assert!(data.get("reportAt").is_none());
    }

    #[test]
    fn online_copied_when_missing() {
        let (_, data) = normalize(&json!({"data": {"state": "open"}, "online": false}));
        assert_eq!(data["online"], json!(false));

        let (_, data) = normalize(&json!({"data": {"online": true}, "online": false}));
        assert_eq!(data["online"], json!(true));
    }

    #[test]
    fn numeric_device_id_is_stringified() {
        let (id, _) = normalize(&json!({"deviceId": 42}));
        assert_eq!(id, "42");
    }
}
