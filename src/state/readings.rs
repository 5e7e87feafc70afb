// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Typed readings derived from a snapshot.
//!
//! Snapshots are untyped field mappings. [`Readings`] interprets them for one
//! device: binary states, battery percentage, TH measurements, configured
//! thresholds, alarm flags and liveness. Fields are looked up in the nested
//! `state` mapping first and at top level second.

use chrono::{DateTime, TimeDelta, Utc};
use serde_json::Value;

use crate::device::DeviceDescriptor;
use crate::types::{Fields, StateValue};

use super::{ONLINE_KEY, StateSnapshot};

/// A device without a report for this long is unavailable.
const STALE_AFTER_HOURS: i64 = 12;

/// Temperature thresholds outside this range mean "disabled".
const TEMPERATURE_LIMIT_RANGE: (f64, f64) = (-100.0, 100.0);

/// Humidity thresholds outside this range mean "disabled".
const HUMIDITY_LIMIT_RANGE: (f64, f64) = (0.0, 100.0);

/// Alarm flags reported by TH sensors under `alarm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThAlarm {
    /// Temperature below the low threshold.
    LowTemperature,
    /// Temperature above the high threshold.
    HighTemperature,
    /// Humidity below the low threshold.
    LowHumidity,
    /// Humidity above the high threshold.
    HighHumidity,
    /// Battery is low.
    LowBattery,
}

impl ThAlarm {
    /// Returns the payload key of this flag.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::LowTemperature => "lowTemp",
            Self::HighTemperature => "highTemp",
            Self::LowHumidity => "lowHumidity",
            Self::HighHumidity => "highHumidity",
            Self::LowBattery => "lowBattery",
        }
    }
}

/// Alarm flags reported by leak sensors under `alarmState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeakAlarm {
    /// Probe fault.
    DetectorError,
    /// Freeze protection triggered.
    FreezeError,
    /// Water present for an extended time.
    StayError,
    /// Reminder pending.
    Reminder,
}

impl LeakAlarm {
    /// Returns the payload key of this flag.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::DetectorError => "detectorError",
            Self::FreezeError => "freezeError",
            Self::StayError => "stayError",
            Self::Reminder => "reminder",
        }
    }
}

/// Temperature display unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemperatureUnit {
    /// Degrees Celsius.
    Celsius,
    /// Degrees Fahrenheit.
    Fahrenheit,
    /// Unrecognized unit, upper-cased as reported.
    Other(String),
}

impl TemperatureUnit {
    /// Interprets a reported unit (`c`, `0`, `celsius`, `F`, `1`, ...).
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_lowercase().as_str() {
            "c" | "0" | "celsius" | "centigrade" | "cel" => Self::Celsius,
            "f" | "1" | "fahrenheit" | "fahr" => Self::Fahrenheit,
            _ => Self::Other(raw.to_uppercase()),
        }
    }

    /// Returns the short label (`C`, `F` or the raw upper-cased unit).
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Celsius => "C",
            Self::Fahrenheit => "F",
            Self::Other(unit) => unit,
        }
    }
}

/// Configured alarm thresholds, with disabled sentinels filtered out.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Limits {
    /// Lower threshold.
    pub min: Option<f64>,
    /// Upper threshold.
    pub max: Option<f64>,
}

/// Typed view over one device's snapshot.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use yolocal_lib::device::{DeviceDescriptor, DiscoveryRecord};
/// use yolocal_lib::state::{Readings, StateSnapshot};
///
/// let descriptor = DeviceDescriptor::from_discovery(&DiscoveryRecord {
///     device_id: "d1".to_string(),
///     name: "Back Door".to_string(),
///     token: String::new(),
///     device_type: "DoorSensor".to_string(),
///     app_eui: None,
/// });
/// let snapshot = StateSnapshot::from_json(json!({
///     "state": {"state": "open", "battery": 3, "version": "0405"}
/// }));
///
/// let readings = Readings::new(&snapshot, &descriptor);
/// assert_eq!(readings.is_triggered(), Some(true));
/// assert_eq!(readings.battery_percent(), Some(75));
/// assert_eq!(readings.firmware_version(), Some("0405"));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Readings<'a> {
    snapshot: &'a StateSnapshot,
    descriptor: &'a DeviceDescriptor,
}

impl<'a> Readings<'a> {
    /// Creates a view over `snapshot` for the described device.
    #[must_use]
    pub fn new(snapshot: &'a StateSnapshot, descriptor: &'a DeviceDescriptor) -> Self {
        Self {
            snapshot,
            descriptor,
        }
    }

    /// Returns the device's primary state token, e.g. `open` or `locked`.
    #[must_use]
    pub fn state_token(&self) -> Option<&'a StateValue> {
        let token = match self.snapshot.state()? {
            StateValue::Mapping(nested) => nested.get("state"),
            scalar => Some(scalar),
        };
        present(token)
    }

    /// Returns `true` when a binary sensor reports its triggered token.
    ///
    /// Door and tilt sensors trigger on `open`, leak, motion and vibration
    /// sensors on `alert`.
    #[must_use]
    pub fn is_triggered(&self) -> Option<bool> {
        let on = self.descriptor.device_type().on_state_token().unwrap_or("open");
        self.state_token().map(|token| token.as_str() == Some(on))
    }

    /// Returns `true` when a lock reports `locked`.
    #[must_use]
    pub fn is_locked(&self) -> Option<bool> {
        self.state_token().map(|token| token.as_str() == Some("locked"))
    }

    /// Returns the battery level as a percentage.
    ///
    /// The hub reports levels 0 to 4.
    #[must_use]
    pub fn battery_percent(&self) -> Option<u8> {
        let level = self.number("battery")?;
        // Clamped to 0..=100 before the cast.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let percent = (level * 25.0).clamp(0.0, 100.0).round() as u8;
        Some(percent)
    }

    /// Returns the firmware version.
    #[must_use]
    pub fn firmware_version(&self) -> Option<&'a str> {
        self.snapshot.field("version").and_then(StateValue::as_str)
    }

    /// Returns the measured temperature in degrees Celsius.
    #[must_use]
    pub fn temperature(&self) -> Option<f64> {
        self.number("temperature")
    }

    /// Returns the measured relative humidity.
    ///
    /// Always `None` for temperature-only models.
    #[must_use]
    pub fn humidity(&self) -> Option<f64> {
        if self.descriptor.supports_humidity() {
            self.number("humidity")
        } else {
            None
        }
    }

    /// Returns the unit shown on the device's display.
    #[must_use]
    pub fn temperature_unit(&self) -> Option<TemperatureUnit> {
        const KEYS: [&str; 4] = ["mode", "tempUnit", "temperatureUnit", "unit"];

        let nested = self.snapshot.nested_state();
        let lookup = |fields: &'a Fields| KEYS.iter().find_map(|key| present(fields.get(*key)));
        let raw = nested
            .and_then(lookup)
            .or_else(|| lookup(self.snapshot.fields()))?;

        let text = match raw {
            StateValue::Scalar(Value::String(text)) => text.clone(),
            StateValue::Scalar(other) => other.to_string(),
            StateValue::Mapping(_) => return None,
        };
        Some(TemperatureUnit::parse(&text))
    }

    /// Returns the reporting interval in minutes.
    #[must_use]
    pub fn interval(&self) -> Option<i64> {
        self.integer("interval")
    }

    /// Returns the temperature calibration offset.
    #[must_use]
    pub fn temperature_correction(&self) -> Option<f64> {
        self.number("tempCorrection")
    }

    /// Returns the humidity calibration offset.
    #[must_use]
    pub fn humidity_correction(&self) -> Option<f64> {
        self.number("humidityCorrection")
    }

    /// Returns the temperature alarm thresholds.
    ///
    /// `None` for models whose thresholds are not meaningful. Values outside
    /// -100..=100 are treated as disabled.
    #[must_use]
    pub fn temperature_limits(&self) -> Option<Limits> {
        self.limits("tempLimit", TEMPERATURE_LIMIT_RANGE)
    }

    /// Returns the humidity alarm thresholds.
    ///
    /// Values outside 0..=100 are treated as disabled.
    #[must_use]
    pub fn humidity_limits(&self) -> Option<Limits> {
        if !self.descriptor.supports_humidity() {
            return None;
        }
        self.limits("humidityLimit", HUMIDITY_LIMIT_RANGE)
    }

    /// Returns the internal temperature of motion and leak sensors.
    #[must_use]
    pub fn device_temperature(&self) -> Option<f64> {
        self.number("devTemperature")
    }

    /// Returns a TH alarm flag.
    ///
    /// `None` if the device reported no `alarm` mapping; a missing flag
    /// inside the mapping reads as `false`.
    #[must_use]
    pub fn th_alarm(&self, alarm: ThAlarm) -> Option<bool> {
        self.flag("alarm", alarm.key())
    }

    /// Returns a leak sensor alarm flag.
    #[must_use]
    pub fn leak_alarm(&self, alarm: LeakAlarm) -> Option<bool> {
        self.flag("alarmState", alarm.key())
    }

    /// Returns whether the motion sensor's LED alarm is enabled.
    #[must_use]
    pub fn led_alarm(&self) -> Option<bool> {
        self.snapshot.field("ledAlarm").and_then(StateValue::as_bool)
    }

    /// Returns the motion sensitivity setting.
    #[must_use]
    pub fn sensitivity(&self) -> Option<i64> {
        self.integer("sensitivity")
    }

    /// Returns the no-motion delay in minutes.
    #[must_use]
    pub fn no_motion_delay(&self) -> Option<i64> {
        self.integer("nomotionDelay")
    }

    /// Returns the repeat alert interval in minutes.
    #[must_use]
    pub fn alert_interval(&self) -> Option<i64> {
        self.integer("alertInterval")
    }

    /// Returns the door sensor's open delay in seconds.
    #[must_use]
    pub fn delay(&self) -> Option<i64> {
        self.integer("delay")
    }

    /// Returns the door left-open reminder delay in minutes.
    #[must_use]
    pub fn open_remind_delay(&self) -> Option<i64> {
        self.integer("openRemindDelay")
    }

    /// Returns the leak sensor's probe mode.
    #[must_use]
    pub fn sensor_mode(&self) -> Option<&'a str> {
        self.snapshot.field("sensorMode").and_then(StateValue::as_str)
    }

    /// Returns the time of the last report.
    ///
    /// Accepts RFC 3339 strings and epoch milliseconds.
    #[must_use]
    pub fn last_reported(&self) -> Option<DateTime<Utc>> {
        match self.snapshot.report_at()? {
            StateValue::Scalar(Value::String(text)) => DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|at| at.with_timezone(&Utc)),
            StateValue::Scalar(Value::Number(millis)) => {
                millis.as_i64().and_then(DateTime::from_timestamp_millis)
            }
            StateValue::Scalar(_) | StateValue::Mapping(_) => None,
        }
    }

    /// Returns `true` unless the device is offline or stale.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.is_available_at(Utc::now())
    }

    /// Like [`is_available`](Self::is_available) at a given instant.
    #[must_use]
    pub fn is_available_at(&self, now: DateTime<Utc>) -> bool {
        if self
            .snapshot
            .get(ONLINE_KEY)
            .is_some_and(|online| !is_truthy(online))
        {
            return false;
        }
        self.last_reported()
            .is_none_or(|at| now - at <= TimeDelta::hours(STALE_AFTER_HOURS))
    }

    fn number(&self, name: &str) -> Option<f64> {
        self.snapshot.field(name).and_then(StateValue::as_f64)
    }

    fn integer(&self, name: &str) -> Option<i64> {
        self.snapshot.field(name).and_then(StateValue::as_i64)
    }

    fn flag(&self, group: &str, key: &str) -> Option<bool> {
        let flags = self.snapshot.field(group)?.as_mapping()?;
        Some(flags.get(key).and_then(StateValue::as_bool).unwrap_or(false))
    }

    fn limits(&self, name: &str, (low, high): (f64, f64)) -> Option<Limits> {
        if !self.descriptor.supports_threshold_readings() {
            return None;
        }
        let limits = self.snapshot.field(name)?.as_mapping()?;
        let bounded = |key: &str| {
            limits
                .get(key)
                .and_then(StateValue::as_f64)
                .filter(|value| (low..=high).contains(value))
        };
        Some(Limits {
            min: bounded("min"),
            max: bounded("max"),
        })
    }
}

fn present(value: Option<&StateValue>) -> Option<&StateValue> {
    value.filter(|value| !value.is_null())
}

/// Truthiness of a reported flag: null, false, zero and empty values are false.
fn is_truthy(value: &StateValue) -> bool {
    match value {
        StateValue::Mapping(fields) => !fields.is_empty(),
        StateValue::Scalar(scalar) => match scalar {
            Value::Null => false,
            Value::Bool(flag) => *flag,
            Value::Number(n) => n.as_f64().is_some_and(|n| n.abs() > 0.0),
            Value::String(text) => !text.is_empty(),
            Value::Array(items) => !items.is_empty(),
            Value::Object(map) => !map.is_empty(),
        },
    }
}
