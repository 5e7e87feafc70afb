// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Observer subscriptions for merged state updates.
//!
//! The subscription system consists of:
//!
//! - [`SubscriptionId`] - A stable handle used to unsubscribe
//! - [`ObserverRegistry`] - Stores observers and isolates their failures
//! - [`Subscribable`] - Trait for types that accept observers
//!
//! Observers run synchronously on the task that owns the state store, right
//! after each merge. For asynchronous consumption use the hub's event bus
//! instead.
//!
//! ```no_run
//! use yolocal_lib::{Hub, HubConfig};
//! use yolocal_lib::subscription::Subscribable;
//!
//! # async fn example() -> yolocal_lib::Result<()> {
//! let hub = Hub::connect(HubConfig::from_env()?).await?;
//!
//! let id = hub.subscribe(|device_id, state| {
//!     println!("{device_id}: {}", state.to_json());
//!     Ok(())
//! });
//!
//! hub.unsubscribe(id);
//! # Ok(())
//! # }
//! ```

mod callback;
mod subscribable;

pub use callback::{ObserverError, ObserverRegistry, SubscriptionId};
pub use subscribable::Subscribable;
