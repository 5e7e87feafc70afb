// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Static registry of discovered devices.

use std::collections::HashMap;

use crate::types::DeviceType;

use super::{DeviceDescriptor, DiscoveryRecord};

/// Registry mapping device identifiers to their descriptors.
///
/// Built once at discovery time and never mutated afterwards. Iteration
/// follows discovery order.
///
/// # Examples
///
/// ```
/// use yolocal_lib::device::{DeviceRegistry, DiscoveryRecord};
/// use yolocal_lib::types::DeviceType;
///
/// let records = vec![DiscoveryRecord {
///     device_id: "lock-1".to_string(),
///     name: "Front Door".to_string(),
///     token: "t".to_string(),
///     device_type: "Lock".to_string(),
///     app_eui: None,
/// }];
///
/// let registry = DeviceRegistry::from_records(&records);
/// assert_eq!(registry.device_type("lock-1"), Some(&DeviceType::Lock));
/// assert!(registry.get("unknown").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    devices: Vec<DeviceDescriptor>,
    index: HashMap<String, usize>,
}

impl DeviceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from discovery records.
    #[must_use]
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a DiscoveryRecord>) -> Self {
        records
            .into_iter()
            .map(DeviceDescriptor::from_discovery)
            .collect()
    }

    /// Returns the descriptor for a device.
    #[must_use]
    pub fn get(&self, device_id: &str) -> Option<&DeviceDescriptor> {
        self.index.get(device_id).map(|&idx| &self.devices[idx])
    }

    /// Returns the family of a device.
    #[must_use]
    pub fn device_type(&self, device_id: &str) -> Option<&DeviceType> {
        self.get(device_id).map(DeviceDescriptor::device_type)
    }

    /// Returns `true` if the device is registered.
    #[must_use]
    pub fn contains(&self, device_id: &str) -> bool {
        self.index.contains_key(device_id)
    }

    /// Returns all descriptors in discovery order.
    #[must_use]
    pub fn devices(&self) -> &[DeviceDescriptor] {
        &self.devices
    }

    /// Returns an iterator over the registered device identifiers.
    pub fn device_ids(&self) -> impl Iterator<Item = &str> {
        self.devices.iter().map(DeviceDescriptor::device_id)
    }

    /// Returns the number of registered devices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Returns `true` if no devices are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    fn insert(&mut self, descriptor: DeviceDescriptor) {
        if let Some(&idx) = self.index.get(descriptor.device_id()) {
            tracing::warn!(
                device_id = %descriptor.device_id(),
                "Duplicate device in discovery response, keeping latest"
            );
            self.devices[idx] = descriptor;
        } else {
            self.index
                .insert(descriptor.device_id().to_string(), self.devices.len());
            self.devices.push(descriptor);
        }
    }
}

impl FromIterator<DeviceDescriptor> for DeviceRegistry {
    fn from_iter<I: IntoIterator<Item = DeviceDescriptor>>(iter: I) -> Self {
        let mut registry = Self::new();
        for descriptor in iter {
            registry.insert(descriptor);
        }
        registry
    }
}
