// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types shared across the crate.
//!
//! - [`StateValue`]: a payload value, either a scalar or a nested mapping
//! - [`Fields`]: the key/value mapping used by events and snapshots
//! - [`DeviceType`]: the device family reported by the hub

mod device_type;
mod value;

pub use device_type::DeviceType;
pub use value::{Fields, StateValue, fields_from_json, fields_to_json};
