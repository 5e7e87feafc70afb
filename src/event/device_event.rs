// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Notifications broadcast by a running hub.

use crate::state::StateSnapshot;

/// Notifications published on the [`EventBus`](super::EventBus).
///
/// State changes carry the full merged snapshot of the device, so async
/// consumers never need to query the store after receiving one.
///
/// # Examples
///
/// ```
/// use yolocal_lib::event::DeviceEvent;
/// use yolocal_lib::state::StateSnapshot;
///
/// let changed = DeviceEvent::state_changed("d1", StateSnapshot::new());
/// assert_eq!(changed.device_id(), Some("d1"));
///
/// let lost = DeviceEvent::disconnected("connection reset");
/// assert!(lost.is_connection());
/// assert_eq!(lost.device_id(), None);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    /// A report was merged into a device's snapshot.
    StateChanged {
        /// The device whose snapshot changed.
        device_id: String,
        /// The snapshot after the merge.
        state: StateSnapshot,
    },

    /// The report transport connected or disconnected.
    ConnectionChanged {
        /// Whether the transport is now connected.
        connected: bool,
        /// Error message if the disconnection was caused by an error.
        error: Option<String>,
    },
}

impl DeviceEvent {
    /// Returns the device this event refers to, if any.
    #[must_use]
    pub fn device_id(&self) -> Option<&str> {
        match self {
            Self::StateChanged { device_id, .. } => Some(device_id),
            Self::ConnectionChanged { .. } => None,
        }
    }

    /// Returns `true` if this is a state change event.
    #[must_use]
    pub fn is_state_change(&self) -> bool {
        matches!(self, Self::StateChanged { .. })
    }

    /// Returns `true` if this is a connection event.
    #[must_use]
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::ConnectionChanged { .. })
    }

    /// Creates a state change event.
    pub fn state_changed(device_id: impl Into<String>, state: StateSnapshot) -> Self {
        Self::StateChanged {
            device_id: device_id.into(),
            state,
        }
    }

    /// Creates a connected event.
    #[must_use]
    pub fn connected() -> Self {
        Self::ConnectionChanged {
            connected: true,
            error: None,
        }
    }

    /// Creates a disconnected event with the cause.
    pub fn disconnected(error: impl Into<String>) -> Self {
        Self::ConnectionChanged {
            connected: false,
            error: Some(error.into()),
        }
    }
}
