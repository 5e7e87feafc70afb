// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `YoLocal` library.
//!
//! Failures are split by origin: hub API and MQTT transport problems
//! ([`ProtocolError`]), malformed payloads ([`ParseError`]) and invalid
//! configuration ([`ConfigError`]). Rejected credentials are reported through
//! the dedicated [`Error::Authentication`] variant so callers can tell
//! "bad credentials" apart from "hub unreachable".

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// The hub rejected the client credentials or the access token.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Error occurred during protocol communication.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Error occurred while parsing a payload.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Configuration is incomplete or invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Device is not present in the registry.
    #[error("unknown device: {0}")]
    DeviceNotFound(String),

    /// The hub has been shut down.
    #[error("hub is not running")]
    NotRunning,
}

impl Error {
    /// Returns `true` if this error was caused by rejected credentials.
    #[must_use]
    pub fn is_authentication(&self) -> bool {
        matches!(
            self,
            Self::Authentication(_) | Self::Protocol(ProtocolError::AuthenticationFailed)
        )
    }

    /// Returns `true` if this error was caused by an unreachable or failing transport.
    #[must_use]
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            Self::Protocol(
                ProtocolError::ConnectionFailed(_)
                    | ProtocolError::Timeout(_)
                    | ProtocolError::Http(_)
                    | ProtocolError::Mqtt(_)
            )
        )
    }
}

/// Errors related to protocol communication (HTTP/MQTT).
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// MQTT connection or communication failed.
    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// Connection to the hub failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Operation timed out.
    #[error("timed out after {0} ms")]
    Timeout(u64),

    /// Invalid URL or address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Authentication failed.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// The hub answered with a non-success result code.
    #[error("hub API error {code}: {message}")]
    Api {
        /// Result code reported by the hub.
        code: String,
        /// Description reported by the hub.
        message: String,
    },

    /// Internal channel was closed.
    #[error("channel closed: {0}")]
    ChannelClosed(String),
}

/// Errors related to parsing hub payloads.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Expected field is missing from the payload.
    #[error("missing field in payload: {0}")]
    MissingField(String),

    /// Unexpected payload shape.
    #[error("unexpected payload format: {0}")]
    UnexpectedFormat(String),
}

/// Errors related to hub configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required setting was not provided.
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    /// A setting could not be interpreted.
    #[error("invalid value for {name}: {value}")]
    Invalid {
        /// Name of the setting.
        name: &'static str,
        /// The rejected value.
        value: String,
    },
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
