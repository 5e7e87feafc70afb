// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Merge engine combining reports with known device state.
//!
//! Reports are partial: a door sensor may publish only `{"state": "open"}`
//! while its last full fetch also carried battery level, firmware version and
//! alarm settings. [`merge`] overlays a report on the existing snapshot so
//! those fields survive, using last-write-wins at the field level.
//!
//! Two rule sets exist:
//!
//! - **General**: top-level overlay, plus a one-level merge of `state`.
//! - **TH sensors**: flat reading keys (`temperature`, `humidity`, ...) are
//!   folded into the nested `state` mapping, and a null reading never
//!   replaces a known value.

use crate::types::{DeviceType, Fields, StateValue};

use super::StateSnapshot;
use super::snapshot::{ONLINE_KEY, REPORT_AT_KEY, STATE_KEY};

/// TH readings for which `null` means "not reported".
const NULLABLE_TH_READINGS: [&str; 4] = ["temperature", "humidity", "mode", "version"];

/// Merges report data into an existing snapshot.
///
/// Neither input is modified. The rule set is chosen by `family`.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use yolocal_lib::state::{StateSnapshot, merge};
/// use yolocal_lib::types::{DeviceType, fields_from_json};
///
/// let existing = StateSnapshot::from_json(json!({"state": {"battery": 3}}));
/// let incoming = fields_from_json(json!({"state": "open"}).as_object().unwrap().clone());
///
/// let merged = merge(&existing, &incoming, &DeviceType::DoorSensor);
/// assert_eq!(merged.to_json(), json!({"state": {"battery": 3, "state": "open"}}));
/// ```
#[must_use]
pub fn merge(existing: &StateSnapshot, incoming: &Fields, family: &DeviceType) -> StateSnapshot {
    if family.is_th_sensor() {
        merge_th_sensor(existing, incoming)
    } else {
        merge_general(existing, incoming)
    }
}

fn merge_general(existing: &StateSnapshot, incoming: &Fields) -> StateSnapshot {
    let mut merged = existing.fields().clone();
    overlay(&mut merged, incoming);

    if let (Some(current), Some(reported)) = (existing.state(), incoming.get(STATE_KEY)) {
        let state = match (current, reported) {
            (StateValue::Mapping(current), StateValue::Mapping(reported)) => {
                let mut nested = current.clone();
                overlay(&mut nested, reported);
                StateValue::Mapping(nested)
            }
            (_, StateValue::Mapping(_)) => reported.clone(),
            (StateValue::Mapping(current), scalar) => {
                let mut nested = current.clone();
                nested.insert(STATE_KEY.to_string(), scalar.clone());
                StateValue::Mapping(nested)
            }
            (_, scalar) => scalar.clone(),
        };
        merged.insert(STATE_KEY.to_string(), state);
    }

    StateSnapshot::from(merged)
}

fn merge_th_sensor(existing: &StateSnapshot, incoming: &Fields) -> StateSnapshot {
    let mut merged = existing.fields().clone();
    for key in [STATE_KEY, ONLINE_KEY, REPORT_AT_KEY] {
        if let Some(value) = incoming.get(key) {
            merged.insert(key.to_string(), value.clone());
        }
    }

    let mut nested = existing.nested_state().cloned().unwrap_or_default();
    match incoming.get(STATE_KEY) {
        Some(StateValue::Mapping(reported)) => overlay(&mut nested, reported),
        Some(scalar) if !scalar.is_null() => {
            nested.insert(STATE_KEY.to_string(), scalar.clone());
        }
        _ => {}
    }

    for (key, value) in incoming {
        if matches!(key.as_str(), STATE_KEY | ONLINE_KEY | REPORT_AT_KEY) {
            continue;
        }
        if value.is_null() && NULLABLE_TH_READINGS.contains(&key.as_str()) {
            continue;
        }
        nested.insert(key.clone(), value.clone());
    }

    if !nested.is_empty() {
        merged.insert(STATE_KEY.to_string(), StateValue::Mapping(nested));
    }

    StateSnapshot::from(merged)
}

fn overlay(target: &mut Fields, source: &Fields) {
    target.extend(source.iter().map(|(key, value)| (key.clone(), value.clone())));
}
