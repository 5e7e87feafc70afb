// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device state reconciliation.
//!
//! - [`StateSnapshot`] - everything known about one device
//! - [`merge`] - combines a report with a snapshot, per device family
//! - [`StateStore`] - last snapshot of every device
//! - [`Dispatcher`] - sole owner of the store, fans updates out
//! - [`Readings`] - typed values derived from a snapshot
//!
//! # Examples
//!
//! ```
//! use serde_json::json;
//! use yolocal_lib::state::{StateSnapshot, merge};
//! use yolocal_lib::types::{DeviceType, fields_from_json};
//!
//! let existing = StateSnapshot::from_json(json!({"state": {"temperature": 21.5}}));
//! let report = fields_from_json(json!({"temperature": null, "humidity": 48}).as_object().unwrap().clone());
//!
//! let merged = merge(&existing, &report, &DeviceType::ThSensor);
//! assert_eq!(merged.to_json(), json!({"state": {"temperature": 21.5, "humidity": 48}}));
//! ```

mod dispatch;
mod merge;
mod readings;
mod snapshot;
mod store;

pub use dispatch::Dispatcher;
pub use merge::merge;
pub use readings::{LeakAlarm, Limits, Readings, TemperatureUnit, ThAlarm};
pub use snapshot::{ONLINE_KEY, REPORT_AT_KEY, STATE_KEY, StateSnapshot};
pub use store::StateStore;
