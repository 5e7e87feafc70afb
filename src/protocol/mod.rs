// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transports to a YoLink local hub.
//!
//! The hub exposes two surfaces:
//!
//! - [`HubClient`]: HTTP API for token exchange, discovery, state polling and
//!   commands
//! - [`ReportListener`]: MQTT subscription delivering device reports as they
//!   happen
//!
//! The [`HubApi`] trait covers the request/response surface so the rest of
//! the crate can run against a fake hub in tests.

mod http;
mod mqtt;
mod topic;

pub use http::{HubClient, HubClientBuilder, TokenManager};
pub use mqtt::{ReportListener, ReportListenerBuilder, ReportListenerConfig};
pub use topic::ReportTopic;

use serde_json::{Map, Value};

use crate::device::{DeviceDescriptor, DiscoveryRecord};
use crate::error::Result;
use crate::state::StateSnapshot;

/// Request/response operations of the hub API.
#[allow(async_fn_in_trait)]
pub trait HubApi {
    /// Lists every device known to the hub.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the hub answers with an
    /// error code.
    async fn device_list(&self) -> Result<Vec<DiscoveryRecord>>;

    /// Fetches the current state of one device.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the hub answers with an
    /// error code.
    async fn device_state(&self, device: &DeviceDescriptor) -> Result<StateSnapshot>;

    /// Sends a `setState` command with `params` and returns the hub's `data`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the hub answers with an
    /// error code.
    async fn send_command(
        &self,
        device: &DeviceDescriptor,
        params: Map<String, Value>,
    ) -> Result<Value>;
}
