// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Hub session management.
//!
//! [`HubConfig`] describes how to reach a hub; [`Hub`] ties discovery, the
//! state dispatcher and the report listener together.

mod config;
mod hub;

pub use config::HubConfig;
pub use hub::Hub;
