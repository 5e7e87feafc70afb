// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Discovered devices and their descriptors.
//!
//! At startup the hub's `Home.getDeviceList` call returns one
//! [`DiscoveryRecord`] per paired device. Each record is turned into an
//! immutable [`DeviceDescriptor`], and the descriptors are collected into a
//! [`DeviceRegistry`] that decides which inbound events may touch the state
//! store.
//!
//! # Examples
//!
//! ```
//! use yolocal_lib::device::{DeviceDescriptor, DiscoveryRecord};
//!
//! let record = DiscoveryRecord {
//!     device_id: "d88b4c0100000abc".to_string(),
//!     name: "Hallway".to_string(),
//!     token: "token".to_string(),
//!     device_type: "MotionSensor".to_string(),
//!     app_eui: Some("d88b4c7804000000".to_string()),
//! };
//!
//! let descriptor = DeviceDescriptor::from_discovery(&record);
//! assert_eq!(descriptor.model(), Some("YS7804-UC"));
//! ```

mod descriptor;
mod registry;

pub use descriptor::{
    DeviceDescriptor, DiscoveryRecord, display_type_override, model_code_from_app_eui,
};
pub use registry::DeviceRegistry;
