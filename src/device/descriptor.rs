// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device descriptors derived from hub discovery records.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::DeviceType;

/// Model code that the hub reports as a door sensor but is a tilt sensor.
const TILT_SENSOR_CODE: &str = "7706";

/// Model code that the hub reports as a TH sensor but only measures temperature.
const TEMP_SENSOR_CODE: &str = "8004";

/// Models whose alarm threshold fields carry unusable sentinel values.
const MODELS_WITHOUT_THRESHOLDS: [&str; 2] = ["YS8003-UC", "YS8004-UC"];

/// One entry of the hub's `Home.getDeviceList` response.
///
/// # Examples
///
/// ```
/// use yolocal_lib::device::DiscoveryRecord;
///
/// let record: DiscoveryRecord = serde_json::from_str(r#"{
///     "deviceId": "d88b4c010003a1b2",
///     "name": "Front Door",
///     "token": "0f3b...",
///     "type": "DoorSensor",
///     "appEui": "d88b4c7704000000"
/// }"#).unwrap();
///
/// assert_eq!(record.device_type, "DoorSensor");
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryRecord {
    /// Unique device identifier.
    pub device_id: String,
    /// User-assigned device name.
    #[serde(default)]
    pub name: String,
    /// Per-device token required by state and command calls.
    #[serde(default)]
    pub token: String,
    /// Family name reported by the hub.
    #[serde(rename = "type")]
    pub device_type: String,
    /// Hardware identity string (hex) containing the model code.
    #[serde(default)]
    pub app_eui: Option<String>,
}

impl fmt::Debug for DiscoveryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscoveryRecord")
            .field("device_id", &self.device_id)
            .field("name", &self.name)
            .field("device_type", &self.device_type)
            .field("app_eui", &self.app_eui)
            .finish_non_exhaustive()
    }
}

/// Immutable description of a discovered device.
///
/// The descriptor is derived once from a [`DiscoveryRecord`]. Its model string
/// comes from the 4-character model code found at offset 6 of the hardware
/// identity string, and two model codes override the family name shown to
/// consumers:
///
/// | Model code | Reported type | Display type |
/// |------------|---------------|--------------|
/// | `7706`     | `DoorSensor`  | `TiltSensor` |
/// | `8004`     | `THSensor`    | `TempSensor` |
///
/// # Examples
///
/// ```
/// use yolocal_lib::device::{DeviceDescriptor, DiscoveryRecord};
/// use yolocal_lib::types::DeviceType;
///
/// let record = DiscoveryRecord {
///     device_id: "abc".to_string(),
///     name: "Garage".to_string(),
///     token: "t".to_string(),
///     device_type: "DoorSensor".to_string(),
///     app_eui: Some("d88b4c7706000000".to_string()),
/// };
///
/// let descriptor = DeviceDescriptor::from_discovery(&record);
/// assert_eq!(descriptor.model(), Some("YS7706-UC"));
/// assert_eq!(descriptor.device_type(), &DeviceType::DoorSensor);
/// assert_eq!(descriptor.display_type(), &DeviceType::TiltSensor);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    device_id: String,
    name: String,
    token: String,
    device_type: DeviceType,
    display_type: DeviceType,
    model: Option<String>,
}

impl DeviceDescriptor {
    /// Derives a descriptor from a discovery record.
    #[must_use]
    pub fn from_discovery(record: &DiscoveryRecord) -> Self {
        let device_type = DeviceType::from(record.device_type.as_str());
        let code = record.app_eui.as_deref().and_then(model_code_from_app_eui);

        let display_type = code
            .and_then(display_type_override)
            .unwrap_or_else(|| device_type.clone());

        Self {
            device_id: record.device_id.clone(),
            name: record.name.clone(),
            token: record.token.clone(),
            device_type,
            display_type,
            model: code.map(|code| format!("YS{code}-UC")),
        }
    }

    /// Returns the device identifier.
    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Returns the user-assigned name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the per-device API token.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Returns the family reported by the hub.
    ///
    /// This is the tag that selects merge rules and API method names.
    #[must_use]
    pub fn device_type(&self) -> &DeviceType {
        &self.device_type
    }

    /// Returns the family shown to consumers.
    #[must_use]
    pub fn display_type(&self) -> &DeviceType {
        &self.display_type
    }

    /// Returns the model string (e.g. `YS7804-UC`), if derivable.
    #[must_use]
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// Returns the 4-character model code, if derivable.
    #[must_use]
    pub fn model_code(&self) -> Option<&str> {
        self.model
            .as_deref()
            .and_then(|model| model.strip_prefix("YS"))
            .and_then(|rest| rest.strip_suffix("-UC"))
    }

    /// Returns the model label for device listings.
    ///
    /// Combines the model and display type when the model is known,
    /// e.g. `YS7804-UC (MotionSensor)`.
    #[must_use]
    pub fn display_model(&self) -> String {
        match &self.model {
            Some(model) => format!("{model} ({})", self.display_type),
            None => self.display_type.to_string(),
        }
    }

    /// Returns `true` if the device reports usable alarm thresholds.
    #[must_use]
    pub fn supports_threshold_readings(&self) -> bool {
        self.model
            .as_deref()
            .is_none_or(|model| !MODELS_WITHOUT_THRESHOLDS.contains(&model))
    }

    /// Returns `true` if the device measures humidity.
    #[must_use]
    pub fn supports_humidity(&self) -> bool {
        self.device_type.is_th_sensor() && self.display_type != DeviceType::TempSensor
    }
}

impl fmt::Debug for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceDescriptor")
            .field("device_id", &self.device_id)
            .field("name", &self.name)
            .field("device_type", &self.device_type)
            .field("display_type", &self.display_type)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

/// Extracts the 4-character model code from a hardware identity string.
///
/// Returns `None` when the string is shorter than 10 characters.
#[must_use]
pub fn model_code_from_app_eui(app_eui: &str) -> Option<&str> {
    let mut offsets = app_eui
        .char_indices()
        .map(|(offset, _)| offset)
        .chain(std::iter::once(app_eui.len()));
    let start = offsets.nth(6)?;
    let end = offsets.nth(3)?;
    Some(&app_eui[start..end])
}

/// Returns the display type forced by a model code, if any.
#[must_use]
pub fn display_type_override(code: &str) -> Option<DeviceType> {
    match code {
        TILT_SENSOR_CODE => Some(DeviceType::TiltSensor),
        TEMP_SENSOR_CODE => Some(DeviceType::TempSensor),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(device_type: &str, app_eui: Option<&str>) -> DiscoveryRecord {
        DiscoveryRecord {
            device_id: "d88b4c0100000001".to_string(),
            name: "Test".to_string(),
            token: "secret-token".to_string(),
            device_type: device_type.to_string(),
            app_eui: app_eui.map(str::to_string),
        }
    }

    #[test]
    fn model_from_identity_string() {
        let descriptor =
            DeviceDescriptor::from_discovery(&record("MotionSensor", Some("d88b4c7804000000")));
        assert_eq!(descriptor.model(), Some("YS7804-UC"));
        assert_eq!(descriptor.model_code(), Some("7804"));
        assert_eq!(descriptor.display_type(), &DeviceType::MotionSensor);
    }

    #[test]
    fn tilt_sensor_override() {
        let descriptor =
            DeviceDescriptor::from_discovery(&record("DoorSensor", Some("d88b4c7706000000")));
        assert_eq!(descriptor.device_type(), &DeviceType::DoorSensor);
        assert_eq!(descriptor.display_type(), &DeviceType::TiltSensor);
    }

    #[test]
    fn temp_sensor_override() {
        let descriptor =
            DeviceDescriptor::from_discovery(&record("THSensor", Some("d88b4c8004000000")));
        assert_eq!(descriptor.device_type(), &DeviceType::ThSensor);
        assert_eq!(descriptor.display_type(), &DeviceType::TempSensor);
        assert!(!descriptor.supports_humidity());
        assert!(!descriptor.supports_threshold_readings());
    }

    #[test]
    fn short_identity_string_has_no_model() {
        let descriptor = DeviceDescriptor::from_discovery(&record("Lock", Some("d88b4c770")));
        assert_eq!(descriptor.model(), None);
        assert_eq!(descriptor.model_code(), None);
        assert_eq!(descriptor.display_type(), &DeviceType::Lock);
    }

    #[test]
    fn missing_identity_string_has_no_model() {
        let descriptor = DeviceDescriptor::from_discovery(&record("Lock", None));
        assert_eq!(descriptor.model(), None);
        assert!(descriptor.supports_threshold_readings());
    }

    #[test]
    fn exactly_ten_characters_is_enough() {
        assert_eq!(model_code_from_app_eui("d88b4c8003"), Some("8003"));
        assert_eq!(model_code_from_app_eui("d88b4c800"), None);
    }

    #[test]
    fn model_code_counts_characters() {
        assert_eq!(model_code_from_app_eui("d88b4é7804000000"), Some("7804"));
        assert_eq!(model_code_from_app_eui("ééééééabcd"), Some("abcd"));
        assert_eq!(model_code_from_app_eui("éééééé800"), None);
    }

    #[test]
    fn display_model_label() {
        let with_model =
            DeviceDescriptor::from_discovery(&record("MotionSensor", Some("d88b4c7804000000")));
        assert_eq!(with_model.display_model(), "YS7804-UC (MotionSensor)");

        let without_model = DeviceDescriptor::from_discovery(&record("Lock", None));
        assert_eq!(without_model.display_model(), "Lock");
    }

    #[test]
    fn th_sensor_with_humidity() {
        let descriptor =
            DeviceDescriptor::from_discovery(&record("THSensor", Some("d88b4c8003000000")));
        assert!(descriptor.supports_humidity());
        assert!(!descriptor.supports_threshold_readings());

        let other = DeviceDescriptor::from_discovery(&record("THSensor", Some("d88b4c8006000000")));
        assert!(other.supports_threshold_readings());
    }

    #[test]
    fn debug_hides_token() {
        let descriptor = DeviceDescriptor::from_discovery(&record("Lock", None));
        let debug = format!("{descriptor:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("DeviceDescriptor"));
    }

    #[test]
    fn discovery_record_from_json() {
        let record: DiscoveryRecord = serde_json::from_str(
            r#"{"deviceId":"x","name":"Leak","token":"t","type":"LeakSensor","modelName":"YS7903-UC"}"#,
        )
        .unwrap();
        assert_eq!(record.device_id, "x");
        assert_eq!(record.app_eui, None);
    }
}
