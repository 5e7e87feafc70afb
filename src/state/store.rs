// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device state store.

use std::collections::HashMap;
use std::sync::Arc;

use crate::device::DeviceRegistry;
use crate::event::Event;

use super::{StateSnapshot, merge};

/// Last known snapshot of every device.
///
/// Populated once from the initial fetch with [`insert`](Self::insert), then
/// updated only through [`apply`](Self::apply), which runs the merge engine.
///
/// Snapshots are shared, so cloning the store copies pointers only.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use yolocal_lib::device::{DeviceRegistry, DiscoveryRecord};
/// use yolocal_lib::event::Event;
/// use yolocal_lib::state::{StateSnapshot, StateStore};
///
/// let registry = DeviceRegistry::from_records(&[DiscoveryRecord {
///     device_id: "door".to_string(),
///     name: "Front".to_string(),
///     token: String::new(),
///     device_type: "DoorSensor".to_string(),
///     app_eui: None,
/// }]);
///
/// let mut store = StateStore::new();
/// store.insert("door", StateSnapshot::from_json(json!({"state": {"battery": 4}})));
///
/// let event = Event::decode(br#"{"deviceId":"door","data":{"state":"open"}}"#).unwrap();
/// let merged = store.apply(&event, &registry).unwrap();
/// assert_eq!(merged.to_json(), json!({"state": {"battery": 4, "state": "open"}}));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateStore {
    states: HashMap<String, Arc<StateSnapshot>>,
}

impl StateStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a device's snapshot wholesale.
    ///
    /// Only meant for the initial fetch.
    pub fn insert(&mut self, device_id: impl Into<String>, snapshot: StateSnapshot) {
        self.states.insert(device_id.into(), Arc::new(snapshot));
    }

    /// Merges an event into the store.
    ///
    /// Returns the device's new snapshot, or `None` when the device is not
    /// registered, in which case the store is left untouched.
    pub fn apply(&mut self, event: &Event, registry: &DeviceRegistry) -> Option<&StateSnapshot> {
        let device_id = event.device_id();
        let Some(family) = registry.device_type(device_id) else {
            tracing::debug!(device_id = %device_id, "Ignoring event for unknown device");
            return None;
        };

        let merged = {
            let existing = self.states.get(device_id).map(AsRef::as_ref);
            merge(existing.unwrap_or(&StateSnapshot::new()), event.data(), family)
        };

        tracing::debug!(device_id = %device_id, family = %family, "Applied device event");
        self.states.insert(device_id.to_string(), Arc::new(merged));
        self.get(device_id)
    }

    /// Returns a device's snapshot.
    #[must_use]
    pub fn get(&self, device_id: &str) -> Option<&StateSnapshot> {
        self.states.get(device_id).map(AsRef::as_ref)
    }

    /// Returns a shared handle to a device's snapshot.
    #[must_use]
    pub fn snapshot(&self, device_id: &str) -> Option<Arc<StateSnapshot>> {
        self.states.get(device_id).cloned()
    }

    /// Returns `true` if the store holds a snapshot for the device.
    #[must_use]
    pub fn contains(&self, device_id: &str) -> bool {
        self.states.contains_key(device_id)
    }

    /// Iterates over all `(device_id, snapshot)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &StateSnapshot)> {
        self.states
            .iter()
            .map(|(device_id, snapshot)| (device_id.as_str(), snapshot.as_ref()))
    }

    /// Returns the number of devices with a snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Returns `true` if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DiscoveryRecord;
    use crate::types::fields_from_json;
    use serde_json::{Value, json};

    fn registry() -> DeviceRegistry {
        let record = |id: &str, device_type: &str| DiscoveryRecord {
            device_id: id.to_string(),
            name: id.to_string(),
            token: String::new(),
            device_type: device_type.to_string(),
            app_eui: None,
        };
        DeviceRegistry::from_records(&[record("door", "DoorSensor"), record("th", "THSensor")])
    }

    fn event(device_id: &str, data: Value) -> Event {
        let Value::Object(map) = data else {
            panic!("event data must be an object");
        };
        Event::new(device_id, fields_from_json(map))
    }

    #[test]
    fn unknown_device_leaves_store_unchanged() {
        let registry = registry();
        let mut store = StateStore::new();
        store.insert("door", StateSnapshot::from_json(json!({"state": "closed"})));
        let before = store.clone();

        for data in [json!({"state": "open"}), json!({}), json!({"online": false})] {
            assert!(store.apply(&event("ghost", data), &registry).is_none());
        }
        assert!(store.apply(&event("", json!({"state": "x"})), &registry).is_none());

        assert_eq!(store, before);
    }

    #[test]
    fn first_event_creates_snapshot() {
        let registry = registry();
        let mut store = StateStore::new();

        let merged = store
            .apply(&event("door", json!({"state": "open"})), &registry)
            .cloned();

        assert_eq!(merged, Some(StateSnapshot::from_json(json!({"state": "open"}))));
        assert!(store.contains("door"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn events_apply_in_arrival_order() {
        let registry = registry();
        let mut store = StateStore::new();

        store.apply(&event("door", json!({"state": "open"})), &registry);
        store.apply(&event("door", json!({"state": "closed"})), &registry);

        assert_eq!(store.get("door").unwrap().to_json(), json!({"state": "closed"}));
    }

    #[test]
    fn family_selects_merge_rule() {
        let registry = registry();
        let mut store = StateStore::new();
        store.insert("th", StateSnapshot::from_json(json!({"state": {"temperature": 21.5}})));

        store.apply(&event("th", json!({"temperature": null, "humidity": 50})), &registry);

        assert_eq!(
            store.get("th").unwrap().to_json(),
            json!({"state": {"temperature": 21.5, "humidity": 50}})
        );
    }

    #[test]
    fn cloned_store_shares_untouched_snapshots() {
        let registry = registry();
        let mut store = StateStore::new();
        store.insert("door", StateSnapshot::from_json(json!({"state": "closed"})));
        store.insert("th", StateSnapshot::from_json(json!({"state": {"temperature": 20}})));
        let before = store.clone();

        store.apply(&event("door", json!({"state": "open"})), &registry);

        assert!(Arc::ptr_eq(&store.states["th"], &before.states["th"]));
        assert!(!Arc::ptr_eq(&store.states["door"], &before.states["door"]));
        assert_eq!(before.get("door").unwrap().to_json(), json!({"state": "closed"}));
        assert_eq!(
            store.snapshot("th").unwrap().to_json(),
            json!({"state": {"temperature": 20}})
        );
    }
}
