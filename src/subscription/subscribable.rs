// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subscribable trait for types that publish state updates.

use crate::state::StateSnapshot;

use super::{ObserverError, ObserverRegistry, SubscriptionId};

/// Trait for types that accept state observers.
///
/// # Examples
///
/// ```
/// use yolocal_lib::subscription::{ObserverRegistry, Subscribable};
///
/// fn watch_doors(source: &impl Subscribable) {
///     source.subscribe(|device_id, state| {
///         if state.field("state").and_then(|v| v.as_str()) == Some("open") {
///             println!("{device_id} opened");
///         }
///         Ok(())
///     });
/// }
///
/// watch_doors(&ObserverRegistry::new());
/// ```
pub trait Subscribable {
    /// Registers an observer called after every merged update.
    fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&str, &StateSnapshot) -> Result<(), ObserverError> + Send + Sync + 'static;

    /// Removes an observer. Returns `true` if it was registered.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

impl Subscribable for ObserverRegistry {
    fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&str, &StateSnapshot) -> Result<(), ObserverError> + Send + Sync + 'static,
    {
        ObserverRegistry::subscribe(self, observer)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        ObserverRegistry::unsubscribe(self, id)
    }
}
