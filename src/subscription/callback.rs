// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Observer management for device state updates.
//!
//! - [`SubscriptionId`] - Handle returned on registration, used to unsubscribe
//! - [`ObserverRegistry`] - Stores observers and dispatches updates to them

use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::state::StateSnapshot;

/// Unique identifier for a subscription.
///
/// Identifiers increase monotonically, so ordering them gives registration
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    #[must_use]
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", self.0)
    }
}

/// Error an observer may return to report a failed update.
pub type ObserverError = Box<dyn std::error::Error + Send + Sync>;

type StateObserver = Arc<dyn Fn(&str, &StateSnapshot) -> Result<(), ObserverError> + Send + Sync>;

/// Registry of state observers.
///
/// Observers are called synchronously, in registration order, with the
/// device identifier and a shared reference to its new snapshot. A failing
/// observer (one that returns an error or panics) is logged and skipped; the
/// remaining observers still receive the update.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use yolocal_lib::state::StateSnapshot;
/// use yolocal_lib::subscription::ObserverRegistry;
///
/// let registry = ObserverRegistry::new();
/// let seen = Arc::new(AtomicUsize::new(0));
///
/// let counter = Arc::clone(&seen);
/// let id = registry.subscribe(move |_device_id, _state| {
///     counter.fetch_add(1, Ordering::SeqCst);
///     Ok(())
/// });
///
/// registry.dispatch("d1", &StateSnapshot::new());
/// assert_eq!(seen.load(Ordering::SeqCst), 1);
///
/// assert!(registry.unsubscribe(id));
/// registry.dispatch("d1", &StateSnapshot::new());
/// assert_eq!(seen.load(Ordering::SeqCst), 1);
/// ```
pub struct ObserverRegistry {
    next_id: AtomicU64,
    observers: RwLock<BTreeMap<SubscriptionId, StateObserver>>,
}

impl ObserverRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            observers: RwLock::new(BTreeMap::new()),
        }
    }

    fn next_id(&self) -> SubscriptionId {
        SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Registers an observer.
    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&str, &StateSnapshot) -> Result<(), ObserverError> + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.observers.write().insert(id, Arc::new(observer));
        id
    }

    /// Removes an observer.
    ///
    /// Returns `true` if the observer was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.observers.write().remove(&id).is_some()
    }

    /// Removes all observers.
    pub fn clear(&self) {
        self.observers.write().clear();
    }

    /// Delivers an update to every observer.
    ///
    /// Returns the number of observers that failed.
    pub fn dispatch(&self, device_id: &str, state: &StateSnapshot) -> usize {
        // Snapshot the list so observers may (un)subscribe while being called.
        let observers: Vec<(SubscriptionId, StateObserver)> = self
            .observers
            .read()
            .iter()
            .map(|(id, observer)| (*id, Arc::clone(observer)))
            .collect();

        let mut failures = 0;
        for (id, observer) in observers {
            match catch_unwind(AssertUnwindSafe(|| observer(device_id, state))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failures += 1;
                    tracing::warn!(
                        subscription = %id,
                        device_id = %device_id,
                        error = %e,
                        "State observer failed"
                    );
                }
                Err(panic) => {
                    failures += 1;
                    tracing::warn!(
                        subscription = %id,
                        device_id = %device_id,
                        error = panic_message(panic.as_ref()),
                        "State observer panicked"
                    );
                }
            }
        }
        failures
    }

    /// Returns the number of registered observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.read().len()
    }

    /// Returns `true` if no observers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.read().is_empty()
    }
}

impl Default for ObserverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observers", &self.len())
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
