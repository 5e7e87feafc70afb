// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device family tags reported by the hub.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Device family as reported by the hub's discovery API.
///
/// The family decides which merge rule applies to a device's reports and which
/// readings consumers can derive from its snapshot. Unrecognized families are
/// kept verbatim in [`DeviceType::Other`].
///
/// # Examples
///
/// ```
/// use yolocal_lib::types::DeviceType;
///
/// let family: DeviceType = "DoorSensor".parse().unwrap();
/// assert_eq!(family, DeviceType::DoorSensor);
/// assert_eq!(family.on_state_token(), Some("open"));
///
/// let unknown: DeviceType = "Siren".parse().unwrap();
/// assert_eq!(unknown.as_str(), "Siren");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeviceType {
    /// Contact sensor for doors and windows.
    DoorSensor,
    /// Water leak sensor.
    LeakSensor,
    /// PIR motion sensor.
    MotionSensor,
    /// Vibration sensor.
    VibrationSensor,
    /// Temperature and humidity sensor.
    ThSensor,
    /// Smart lock.
    Lock,
    /// Tilt variant of the door sensor (display type only).
    TiltSensor,
    /// Temperature-only variant of the TH sensor (display type only).
    TempSensor,
    /// Any other family reported by the hub.
    Other(String),
}

impl DeviceType {
    /// Returns the hub's name for this family.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::DoorSensor => "DoorSensor",
            Self::LeakSensor => "LeakSensor",
            Self::MotionSensor => "MotionSensor",
            Self::VibrationSensor => "VibrationSensor",
            Self::ThSensor => "THSensor",
            Self::Lock => "Lock",
            Self::TiltSensor => "TiltSensor",
            Self::TempSensor => "TempSensor",
            Self::Other(name) => name,
        }
    }

    /// Returns the state token that means "triggered" for this family.
    ///
    /// Door sensors report `open`, leak/motion/vibration sensors report
    /// `alert` and locks report `locked`.
    #[must_use]
    pub fn on_state_token(&self) -> Option<&'static str> {
        match self {
            Self::DoorSensor | Self::TiltSensor => Some("open"),
            Self::LeakSensor | Self::MotionSensor | Self::VibrationSensor => Some("alert"),
            Self::Lock => Some("locked"),
            _ => None,
        }
    }

    /// Returns `true` for families that expose a binary open/alert state.
    #[must_use]
    pub fn is_binary_sensor(&self) -> bool {
        matches!(
            self,
            Self::DoorSensor
                | Self::TiltSensor
                | Self::LeakSensor
                | Self::MotionSensor
                | Self::VibrationSensor
        )
    }

    /// Returns `true` for the temperature/humidity family.
    #[must_use]
    pub fn is_th_sensor(&self) -> bool {
        matches!(self, Self::ThSensor)
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "DoorSensor" => Self::DoorSensor,
            "LeakSensor" => Self::LeakSensor,
            "MotionSensor" => Self::MotionSensor,
            "VibrationSensor" => Self::VibrationSensor,
            "THSensor" => Self::ThSensor,
            "Lock" => Self::Lock,
            "TiltSensor" => Self::TiltSensor,
            "TempSensor" => Self::TempSensor,
            other => Self::Other(other.to_string()),
        })
    }
}

impl From<String> for DeviceType {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(family) => family,
            Err(never) => match never {},
        }
    }
}

impl From<&str> for DeviceType {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<DeviceType> for String {
    fn from(value: DeviceType) -> Self {
        match value {
            DeviceType::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}
