// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Report topic layout.
//!
//! The hub publishes device reports on `ylsubnet/<netId>/<deviceId>/report`.

/// First segment of every report topic.
const TOPIC_PREFIX: &str = "ylsubnet";

/// Last segment of every report topic.
const TOPIC_SUFFIX: &str = "report";

/// A parsed report topic.
///
/// # Examples
///
/// ```
/// use yolocal_lib::protocol::ReportTopic;
///
/// assert_eq!(ReportTopic::filter("net1"), "ylsubnet/net1/+/report");
///
/// let topic = ReportTopic::parse("ylsubnet/net1/d88b4c0100000abc/report").unwrap();
/// assert_eq!(topic.net_id(), "net1");
/// assert_eq!(topic.device_id(), "d88b4c0100000abc");
///
/// assert!(ReportTopic::parse("ylsubnet/net1/d1/request").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTopic<'a> {
    net_id: &'a str,
    device_id: &'a str,
}

impl<'a> ReportTopic<'a> {
    /// Returns the subscription filter matching every report of a network.
    #[must_use]
    pub fn filter(net_id: &str) -> String {
        format!("{TOPIC_PREFIX}/{net_id}/+/{TOPIC_SUFFIX}")
    }

    /// Parses a concrete report topic.
    #[must_use]
    pub fn parse(topic: &'a str) -> Option<Self> {
        let mut parts = topic.split('/');
        let (Some(TOPIC_PREFIX), Some(net_id), Some(device_id), Some(TOPIC_SUFFIX), None) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return None;
        };

        if net_id.is_empty() || device_id.is_empty() {
            return None;
        }
        Some(Self { net_id, device_id })
    }

    /// Returns the network identifier.
    #[must_use]
    pub fn net_id(&self) -> &'a str {
        self.net_id
    }

    /// Returns the device segment.
    #[must_use]
    pub fn device_id(&self) -> &'a str {
        self.device_id
    }
}
