// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Single owner of the state store.
//!
//! Transports never touch the store. They send [`Event`]s over an unbounded
//! channel to the [`Dispatcher`], which applies them one at a time, publishes
//! the new store through a `watch` channel and notifies observers.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::device::DeviceRegistry;
use crate::event::{DeviceEvent, Event, EventBus};
use crate::subscription::ObserverRegistry;

use super::StateStore;

/// Applies events to the store and fans updates out.
///
/// Per update, in order:
///
/// 1. merge the event into the store
/// 2. publish the new store on the watch channel
/// 3. call observers in registration order
/// 4. broadcast [`DeviceEvent::StateChanged`] on the event bus
///
/// Events for unregistered devices stop at step 1.
#[derive(Debug)]
pub struct Dispatcher {
    registry: Arc<DeviceRegistry>,
    store: Arc<StateStore>,
    observers: Arc<ObserverRegistry>,
    bus: EventBus,
    published: watch::Sender<Arc<StateStore>>,
}

impl Dispatcher {
    /// Creates a dispatcher owning `store`.
    #[must_use]
    pub fn new(
        registry: Arc<DeviceRegistry>,
        store: StateStore,
        observers: Arc<ObserverRegistry>,
        bus: EventBus,
    ) -> Self {
        let store = Arc::new(store);
        let (published, _) = watch::channel(Arc::clone(&store));
        Self {
            registry,
            store,
            observers,
            bus,
            published,
        }
    }

    /// Returns a receiver always holding the latest store.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<Arc<StateStore>> {
        self.published.subscribe()
    }

    /// Returns the current store.
    #[must_use]
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Applies one event.
    ///
    /// Returns `true` if the event touched a registered device.
    pub fn apply_event(&mut self, event: &Event) -> bool {
        let store = Arc::make_mut(&mut self.store);
        let Some(state) = store.apply(event, &self.registry).cloned() else {
            return false;
        };

        self.published.send_replace(Arc::clone(&self.store));

        let device_id = event.device_id();
        let failures = self.observers.dispatch(device_id, &state);
        if failures > 0 {
            tracing::debug!(device_id = %device_id, failures, "Some observers failed");
        }

        self.bus.publish(DeviceEvent::state_changed(device_id, state));
        true
    }

    /// Applies events until every sender is dropped.
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<Event>) {
        tracing::debug!(devices = self.registry.len(), "State dispatcher started");
        while let Some(event) = events.recv().await {
            self.apply_event(&event);
        }
        tracing::debug!("Event channel closed, state dispatcher stopping");
    }
}
