// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Connected view of a local hub.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use crate::device::{DeviceDescriptor, DeviceRegistry};
use crate::error::{Error, Result};
use crate::event::{DeviceEvent, Event, EventBus};
use crate::protocol::{HubApi, HubClient, ReportListener};
use crate::state::{Dispatcher, StateSnapshot, StateStore};
use crate::subscription::{ObserverError, ObserverRegistry, Subscribable, SubscriptionId};

use super::HubConfig;

/// A running hub session.
///
/// Owns the device registry discovered at startup, the state dispatcher task
/// and, when created with [`Hub::connect`], the MQTT report listener.
///
/// # Examples
///
/// ```no_run
/// use yolocal_lib::{Hub, HubConfig};
///
/// #[tokio::main]
/// async fn main() -> yolocal_lib::Result<()> {
///     let hub = Hub::connect(HubConfig::from_env()?).await?;
///
///     for device in hub.list_devices() {
///         println!("{}: {}", device.name(), device.display_model());
///     }
///
///     let mut events = hub.subscribe_events();
///     while let Ok(event) = events.recv().await {
///         println!("{event:?}");
///     }
///
///     hub.shutdown().await;
///     Ok(())
/// }
/// ```
pub struct Hub<C: HubApi = HubClient> {
    client: C,
    registry: Arc<DeviceRegistry>,
    observers: Arc<ObserverRegistry>,
    bus: EventBus,
    states: watch::Receiver<Arc<StateStore>>,
    events: Mutex<Option<mpsc::UnboundedSender<Event>>>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
    listener: Mutex<Option<ReportListener>>,
}

impl Hub<HubClient> {
    /// Connects to the hub described by `config`.
    ///
    /// Fetches an access token, discovers devices, loads their initial state,
    /// then subscribes to device reports. A device whose state cannot be
    /// loaded starts with an empty snapshot.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if a required setting is empty
    /// - [`Error::Authentication`] if the credentials are rejected
    /// - [`Error::Protocol`] if the hub cannot be reached or the broker does
    ///   not accept the connection in time
    ///
    /// Nothing stays running when an error is returned.
    pub async fn connect(config: HubConfig) -> Result<Self> {
        config.validate()?;

        let client = HubClient::builder(config.base_url())
            .credentials(config.client_id(), config.client_secret())
            .timeout(config.request_timeout())
            .build()?;
        let token = client.tokens().access_token().await?;

        let hub = Self::start(client).await?;

        let sink = hub.event_sender()?;
        let listener = ReportListener::builder()
            .host(config.host())
            .port(config.mqtt_port())
            .net_id(config.net_id())
            .credentials(config.client_id(), token)
            .keep_alive(config.keep_alive())
            .connection_timeout(config.connect_timeout())
            .event_bus(hub.bus.clone())
            .connect(sink)
            .await;

        match listener {
            Ok(listener) => {
                *hub.listener.lock() = Some(listener);
                Ok(hub)
            }
            Err(e) => {
                tracing::error!(host = %config.host(), error = %e, "Report listener failed to start");
                hub.shutdown().await;
                Err(e.into())
            }
        }
    }
}

impl<C: HubApi> Hub<C> {
    /// Starts a session on `client` without a report transport.
    ///
    /// Events can be fed through [`Hub::event_sender`].
    ///
    /// # Errors
    ///
    /// Returns an error if device discovery fails.
    pub async fn start(client: C) -> Result<Self> {
        let records = client.device_list().await?;
        let registry = Arc::new(DeviceRegistry::from_records(&records));
        tracing::info!(devices = registry.len(), "Discovered hub devices");

        let mut store = StateStore::new();
        for device in registry.devices() {
            let snapshot = match client.device_state(device).await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    tracing::warn!(
                        device_id = %device.device_id(),
                        device_type = %device.device_type(),
                        error = %e,
                        "Failed to load initial state"
                    );
                    StateSnapshot::new()
                }
            };
            store.insert(device.device_id(), snapshot);
        }

        let observers = Arc::new(ObserverRegistry::new());
        let bus = EventBus::new();
        let dispatcher = Dispatcher::new(
            Arc::clone(&registry),
            store,
            Arc::clone(&observers),
            bus.clone(),
        );
        let states = dispatcher.watch();
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(dispatcher.run(rx));

        Ok(Self {
            client,
            registry,
            observers,
            bus,
            states,
            events: Mutex::new(Some(tx)),
            dispatcher: Mutex::new(Some(handle)),
            listener: Mutex::new(None),
        })
    }

    // =========================================================================
    // State
    // =========================================================================

    /// Returns a copy of the latest snapshot of a device.
    #[must_use]
    pub fn get_state(&self, device_id: &str) -> Option<StateSnapshot> {
        self.states.borrow().get(device_id).cloned()
    }

    /// Returns the latest state of every device.
    #[must_use]
    pub fn states(&self) -> Arc<StateStore> {
        Arc::clone(&self.states.borrow())
    }

    /// Returns a receiver that always holds the latest store.
    #[must_use]
    pub fn watch_states(&self) -> watch::Receiver<Arc<StateStore>> {
        self.states.clone()
    }

    /// Returns a sender that feeds events into the store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotRunning`] after [`Hub::shutdown`].
    pub fn event_sender(&self) -> Result<mpsc::UnboundedSender<Event>> {
        self.events.lock().clone().ok_or(Error::NotRunning)
    }

    // =========================================================================
    // Devices
    // =========================================================================

    /// Returns every discovered device.
    #[must_use]
    pub fn list_devices(&self) -> &[DeviceDescriptor] {
        self.registry.devices()
    }

    /// Returns a device by identifier.
    #[must_use]
    pub fn device(&self, device_id: &str) -> Option<&DeviceDescriptor> {
        self.registry.get(device_id)
    }

    /// Returns the device registry.
    #[must_use]
    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// Returns `true` while the report listener is connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.listener
            .lock()
            .as_ref()
            .is_some_and(ReportListener::is_connected)
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Sends a `setState` command to a device and returns the hub's answer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceNotFound`] for an unknown device,
    /// [`Error::NotRunning`] after shutdown, or the transport error.
    pub async fn send_command(&self, device_id: &str, params: Map<String, Value>) -> Result<Value> {
        if self.events.lock().is_none() {
            return Err(Error::NotRunning);
        }
        let device = self
            .registry
            .get(device_id)
            .ok_or_else(|| Error::DeviceNotFound(device_id.to_string()))?;

        tracing::debug!(device_id = %device_id, ?params, "Sending command");
        self.client.send_command(device, params).await
    }

    /// Locks a lock.
    ///
    /// # Errors
    ///
    /// See [`Hub::send_command`].
    pub async fn lock(&self, device_id: &str) -> Result<Value> {
        self.send_command(device_id, lock_params("locked")).await
    }

    /// Unlocks a lock.
    ///
    /// # Errors
    ///
    /// See [`Hub::send_command`].
    pub async fn unlock(&self, device_id: &str) -> Result<Value> {
        self.send_command(device_id, lock_params("unlocked")).await
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Subscribes to update broadcasts and connection changes.
    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<DeviceEvent> {
        self.bus.subscribe()
    }

    /// Stops the listener and the dispatcher and removes every observer.
    ///
    /// Snapshots stay readable. Calling it twice is harmless.
    pub async fn shutdown(&self) {
        let listener = self.listener.lock().take();
        if let Some(listener) = listener
            && let Err(e) = listener.disconnect().await
        {
            tracing::debug!(error = %e, "Report listener already gone");
        }

        self.events.lock().take();
        if let Some(handle) = self.dispatcher.lock().take() {
            handle.abort();
        }
        self.observers.clear();
        tracing::info!("Hub session shut down");
    }
}

impl<C: HubApi> Subscribable for Hub<C> {
    fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&str, &StateSnapshot) -> std::result::Result<(), ObserverError>
            + Send
            + Sync
            + 'static,
    {
        self.observers.subscribe(observer)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }
}

impl<C: HubApi> Drop for Hub<C> {
    fn drop(&mut self) {
        if let Some(handle) = self.dispatcher.get_mut().take() {
            handle.abort();
        }
    }
}

impl<C: HubApi> std::fmt::Debug for Hub<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub")
            .field("devices", &self.registry.len())
            .field("observers", &self.observers.len())
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

fn lock_params(state: &str) -> Map<String, Value> {
    let mut params = Map::new();
    params.insert("state".to_string(), Value::String(state.to_string()));
    params
}
