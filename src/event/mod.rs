// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Inbound reports and outbound notifications.
//!
//! Two kinds of events flow through a hub:
//!
//! - [`Event`]: a normalized report received from the hub for one device,
//!   produced by [`normalize_payload`] and consumed by the state store.
//! - [`DeviceEvent`]: a notification published on the [`EventBus`] after a
//!   report has been merged, or when the transport connects or drops.
//!
//! # Examples
//!
//! ```
//! use yolocal_lib::event::{DeviceEvent, Event, EventBus};
//!
//! let event = Event::decode(br#"{"deviceId":"d1","params":{"battery":4}}"#).unwrap();
//! assert_eq!(event.data()["battery"].as_i64(), Some(4));
//!
//! let bus = EventBus::new();
//! let _rx = bus.subscribe();
//! bus.publish(DeviceEvent::connected());
//! ```

mod device_event;
mod event_bus;
mod normalizer;
mod report;

pub use device_event::DeviceEvent;
pub use event_bus::EventBus;
pub use normalizer::normalize_payload;
pub use report::Event;
