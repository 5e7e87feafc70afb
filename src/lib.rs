// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `YoLocal` Lib - device state for YoLink local hubs.
//!
//! The hub reports device changes over MQTT as partial JSON payloads whose
//! shape differs between device families and firmware versions. This library
//! discovers the hub's devices over its HTTP API, keeps one coherent snapshot
//! per device, and merges every report into it.
//!
//! # Overview
//!
//! - [`event::normalize_payload`] turns any report shape into a flat field map
//! - [`state::merge`] folds those fields into a snapshot using the rules of
//!   the device family
//! - [`state::StateStore`] holds one snapshot per registered device
//! - [`device::DeviceRegistry`] decides which reports may touch the store
//! - [`subscription::ObserverRegistry`] fans updates out to observers
//! - [`Hub`] wires all of it to a live hub
//!
//! # Quick Start
//!
//! ```no_run
//! use yolocal_lib::state::Readings;
//! use yolocal_lib::subscription::Subscribable;
//! use yolocal_lib::{Hub, HubConfig};
//!
//! #[tokio::main]
//! async fn main() -> yolocal_lib::Result<()> {
//!     let config = HubConfig::new("192.168.1.20", "client-id", "client-secret", "net-id");
//!     let hub = Hub::connect(config).await?;
//!
//!     for device in hub.list_devices() {
//!         if let Some(state) = hub.get_state(device.device_id()) {
//!             let readings = Readings::new(&state, device);
//!             println!("{}: triggered={:?}", device.name(), readings.is_triggered());
//!         }
//!     }
//!
//!     hub.subscribe(|device_id, state| {
//!         println!("{device_id} -> {}", state.to_json());
//!         Ok(())
//!     });
//!
//!     tokio::time::sleep(std::time::Duration::from_secs(60)).await;
//!     hub.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Feeding events from another transport
//!
//! [`Hub::start`] runs discovery and the state dispatcher without opening the
//! MQTT connection; events are then pushed through [`Hub::event_sender`].
//!
//! ```
//! use yolocal_lib::event::Event;
//! use yolocal_lib::state::StateSnapshot;
//! use yolocal_lib::types::DeviceType;
//!
//! let event = Event::decode(br#"{"deviceId":"d1","data":{"state":"open"}}"#).unwrap();
//! let state = yolocal_lib::state::merge(&StateSnapshot::new(), event.data(), &DeviceType::DoorSensor);
//! assert_eq!(state.field("state").and_then(|v| v.as_str()), Some("open"));
//! ```

pub mod device;
pub mod error;
pub mod event;
pub mod manager;
pub mod protocol;
pub mod state;
pub mod subscription;
pub mod types;

pub use error::{ConfigError, Error, ParseError, ProtocolError, Result};
pub use manager::{Hub, HubConfig};
