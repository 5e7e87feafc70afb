// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Broadcast of hub notifications to async consumers.

use tokio::sync::broadcast;

use super::DeviceEvent;

/// Default channel capacity for the event bus.
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Broadcast channel for [`DeviceEvent`]s.
///
/// Complements the synchronous observer registry: observers run inside the
/// store owner and see every update, while bus subscribers run on their own
/// tasks and may lag.
///
/// # Capacity
///
/// The bus holds at most 256 events by default. A subscriber that falls
/// further behind receives `RecvError::Lagged` and skips the oldest events.
/// The store itself never waits on the bus.
///
/// # Examples
///
/// ```
/// use yolocal_lib::event::{DeviceEvent, EventBus};
///
/// let bus = EventBus::new();
/// let mut rx = bus.subscribe();
///
/// bus.publish(DeviceEvent::connected());
/// assert!(rx.try_recv().unwrap().is_connection());
/// ```
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DeviceEvent>,
}

impl EventBus {
    /// Creates a new event bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Creates a new event bus buffering up to `capacity` events.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribes to events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Publishes an event; discarded when nobody is subscribed.
    pub fn publish(&self, event: DeviceEvent) {
        let _ = self.sender.send(event);
    }

    /// Publishes an event and returns the number of receivers that received it.
    ///
    /// Returns 0 if there are no subscribers.
    #[must_use]
    pub fn publish_counted(&self, event: DeviceEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateSnapshot;

    #[test]
    fn subscriber_count_follows_receivers() {
        let bus = EventBus::new();
        assert_eq!(bus.subscriber_count(), 0);

        let rx1 = bus.subscribe();
        let _rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        drop(rx1);
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn publish_reaches_every_subscriber() {
        let bus = EventBus::new();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(DeviceEvent::state_changed("d1", StateSnapshot::new()));

        assert_eq!(rx1.recv().await.unwrap().device_id(), Some("d1"));
        assert_eq!(rx2.recv().await.unwrap().device_id(), Some("d1"));
    }

    #[test]
    fn publish_counted_without_subscribers() {
        let bus = EventBus::with_capacity(8);
        assert_eq!(bus.publish_counted(DeviceEvent::connected()), 0);

        let _rx = bus.subscribe();
        assert_eq!(bus.publish_counted(DeviceEvent::connected()), 1);
    }

    #[test]
    fn clones_share_the_channel() {
        let bus = EventBus::new();
        let other = bus.clone();

        let _rx = bus.subscribe();
        assert_eq!(other.subscriber_count(), 1);
    }
}
