// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Hub connection settings.

use std::time::Duration;

use ::config::Environment;
use serde::Deserialize;

use crate::error::ConfigError;

const ENV_PREFIX: &str = "YOLINK";
const ENV_HOST: &str = "YOLINK_HOST";
const ENV_CLIENT_ID: &str = "YOLINK_CLIENT_ID";
const ENV_CLIENT_SECRET: &str = "YOLINK_CLIENT_SECRET";
const ENV_NET_ID: &str = "YOLINK_NET_ID";
const ENV_NET_ID_FALLBACK: &str = "YOLINK_NET";
const ENV_HTTP_PORT: &str = "YOLINK_HTTP_PORT";
const ENV_MQTT_PORT: &str = "YOLINK_MQTT_PORT";

/// Settings needed to reach a local hub.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use yolocal_lib::HubConfig;
///
/// let config = HubConfig::new("http://192.168.1.20:1080", "client-id", "secret", "net-id")
///     .with_request_timeout(Duration::from_secs(5));
///
/// assert_eq!(config.host(), "192.168.1.20");
/// assert_eq!(config.base_url(), "http://192.168.1.20:1080");
/// assert_eq!(config.mqtt_port(), 18080);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct HubConfig {
    host: String,
    client_id: String,
    client_secret: String,
    net_id: String,
    http_port: u16,
    mqtt_port: u16,
    request_timeout: Duration,
    connect_timeout: Duration,
    keep_alive: Duration,
}

impl HubConfig {
    /// Default port of the HTTP API.
    pub const DEFAULT_HTTP_PORT: u16 = 1080;
    /// Default port of the MQTT broker.
    pub const DEFAULT_MQTT_PORT: u16 = 18080;
    /// Default HTTP request timeout.
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
    /// Default time allowed for the MQTT broker to accept the connection.
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
    /// Default MQTT keep-alive interval.
    pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(60);

    /// Creates a configuration with default ports and timeouts.
    ///
    /// `host` may be a bare host name or a URL; only its host part is kept.
    #[must_use]
    pub fn new(
        host: impl AsRef<str>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        net_id: impl Into<String>,
    ) -> Self {
        Self {
            host: normalize_host(host.as_ref()),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            net_id: net_id.into(),
            http_port: Self::DEFAULT_HTTP_PORT,
            mqtt_port: Self::DEFAULT_MQTT_PORT,
            request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: Self::DEFAULT_CONNECT_TIMEOUT,
            keep_alive: Self::DEFAULT_KEEP_ALIVE,
        }
    }

    /// Reads the configuration from `YOLINK_*` environment variables.
    ///
    /// `YOLINK_HOST`, `YOLINK_CLIENT_ID`, `YOLINK_CLIENT_SECRET` and
    /// `YOLINK_NET_ID` (or `YOLINK_NET`) are required. `YOLINK_HTTP_PORT` and
    /// `YOLINK_MQTT_PORT` override the default ports.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] for an absent required variable and
    /// [`ConfigError::Invalid`] for a port that is not a number.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(None)
    }

    /// Reads the `YOLINK_*` variables from `source`, or from the process
    /// environment when `source` is `None`.
    fn from_source(source: Option<::config::Map<String, String>>) -> Result<Self, ConfigError> {
        let settings: EnvSettings = ::config::Config::builder()
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .ignore_empty(true)
                    .source(source),
            )
            .build()
            .and_then(::config::Config::try_deserialize)
            .map_err(settings_error)?;

        let required = |value: Option<String>, name: &'static str| {
            value
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let host = required(settings.host, ENV_HOST)?;
        let client_id = required(settings.client_id, ENV_CLIENT_ID)?;
        let client_secret = required(settings.client_secret, ENV_CLIENT_SECRET)?;
        let net_id = required(settings.net_id.or(settings.net), ENV_NET_ID)?;

        let config = Self::new(host, client_id, client_secret, net_id)
            .with_http_port(settings.http_port)
            .with_mqtt_port(settings.mqtt_port);
        config.validate()?;
        Ok(config)
    }

    /// Sets the HTTP API port.
    #[must_use]
    pub fn with_http_port(mut self, port: u16) -> Self {
        self.http_port = port;
        self
    }

    /// Sets the MQTT broker port.
    #[must_use]
    pub fn with_mqtt_port(mut self, port: u16) -> Self {
        self.mqtt_port = port;
        self
    }

    /// Sets the HTTP request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets how long to wait for the MQTT broker.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the MQTT keep-alive interval.
    #[must_use]
    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Checks that every required setting is present.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] naming the first empty setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            (ENV_HOST, &self.host),
            (ENV_CLIENT_ID, &self.client_id),
            (ENV_CLIENT_SECRET, &self.client_secret),
            (ENV_NET_ID, &self.net_id),
        ];
        match required.into_iter().find(|(_, value)| value.is_empty()) {
            Some((name, _)) => Err(ConfigError::Missing(name)),
            None => Ok(()),
        }
    }

    /// Returns the hub host, without scheme or port.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the API client id.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Returns the API client secret.
    #[must_use]
    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    /// Returns the network identifier used in report topics.
    #[must_use]
    pub fn net_id(&self) -> &str {
        &self.net_id
    }

    /// Returns the HTTP API port.
    #[must_use]
    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    /// Returns the MQTT broker port.
    #[must_use]
    pub fn mqtt_port(&self) -> u16 {
        self.mqtt_port
    }

    /// Returns the HTTP request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Returns the MQTT connection timeout.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Returns the MQTT keep-alive interval.
    #[must_use]
    pub fn keep_alive(&self) -> Duration {
        self.keep_alive
    }

    /// Returns the HTTP API base URL.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.http_port)
    }
}

impl std::fmt::Debug for HubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubConfig")
            .field("host", &self.host)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("net_id", &self.net_id)
            .field("http_port", &self.http_port)
            .field("mqtt_port", &self.mqtt_port)
            .field("request_timeout", &self.request_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("keep_alive", &self.keep_alive)
            .finish()
    }
}

/// Raw `YOLINK_*` variables, keyed by their lowercased suffix.
#[derive(Debug, Deserialize)]
struct EnvSettings {
    host: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    net_id: Option<String>,
    net: Option<String>,
    #[serde(default = "default_http_port")]
    http_port: u16,
    #[serde(default = "default_mqtt_port")]
    mqtt_port: u16,
}

fn default_http_port() -> u16 {
    HubConfig::DEFAULT_HTTP_PORT
}

fn default_mqtt_port() -> u16 {
    HubConfig::DEFAULT_MQTT_PORT
}

fn settings_error(err: ::config::ConfigError) -> ConfigError {
    match err {
        ::config::ConfigError::Type {
            key, unexpected, ..
        } => ConfigError::Invalid {
            name: env_name(key.as_deref()),
            value: unexpected.to_string(),
        },
        other => ConfigError::Invalid {
            name: "YOLINK_*",
            value: other.to_string(),
        },
    }
}

fn env_name(key: Option<&str>) -> &'static str {
    match key {
        Some("host") => ENV_HOST,
        Some("client_id") => ENV_CLIENT_ID,
        Some("client_secret") => ENV_CLIENT_SECRET,
        Some("net_id") => ENV_NET_ID,
        Some("net") => ENV_NET_ID_FALLBACK,
        Some("http_port") => ENV_HTTP_PORT,
        Some("mqtt_port") => ENV_MQTT_PORT,
        _ => "YOLINK_*",
    }
}

/// Strips scheme, credentials, port and path from a host setting.
fn normalize_host(input: &str) -> String {
    let input = input.trim();
    let rest = input.split_once("://").map_or(input, |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let authority = authority.rsplit_once('@').map_or(authority, |(_, host)| host);

    // Bracketed IPv6 literal keeps its brackets off.
    if let Some(stripped) = authority.strip_prefix('[')
        && let Some((host, _)) = stripped.split_once(']')
    {
        return host.to_string();
    }

    authority
        .split_once(':')
        .map_or(authority, |(host, _)| host)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> Option<::config::Map<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        )
    }

    #[test]
    fn defaults() {
        let config = HubConfig::new("10.0.0.5", "id", "secret", "net");
        assert_eq!(config.http_port(), 1080);
        assert_eq!(config.mqtt_port(), 18080);
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.keep_alive(), Duration::from_secs(60));
        assert_eq!(config.base_url(), "http://10.0.0.5:1080");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn host_normalization() {
        assert_eq!(normalize_host("10.0.0.5"), "10.0.0.5");
        assert_eq!(normalize_host(" hub.local "), "hub.local");
        assert_eq!(normalize_host("http://10.0.0.5:1080"), "10.0.0.5");
        assert_eq!(normalize_host("https://hub.local/open/yolink"), "hub.local");
        assert_eq!(normalize_host("10.0.0.5:1080"), "10.0.0.5");
        assert_eq!(normalize_host("http://user:pw@hub.local:1080/"), "hub.local");
        assert_eq!(normalize_host("http://[fe80::1]:1080"), "fe80::1");
    }

    #[test]
    fn from_source_reads_all_settings() {
        let config = HubConfig::from_source(env(&[
            ("YOLINK_HOST", "http://10.0.0.5:1080"),
            ("YOLINK_CLIENT_ID", "id"),
            ("YOLINK_CLIENT_SECRET", "secret"),
            ("YOLINK_NET_ID", "net"),
            ("YOLINK_HTTP_PORT", "8080"),
            ("YOLINK_MQTT_PORT", "1883"),
        ]))
        .unwrap();

        assert_eq!(config.host(), "10.0.0.5");
        assert_eq!(config.client_id(), "id");
        assert_eq!(config.client_secret(), "secret");
        assert_eq!(config.net_id(), "net");
        assert_eq!(config.http_port(), 8080);
        assert_eq!(config.mqtt_port(), 1883);
    }

    #[test]
    fn from_source_falls_back_to_short_net_variable() {
        let config = HubConfig::from_source(env(&[
            ("YOLINK_HOST", "hub"),
            ("YOLINK_CLIENT_ID", "id"),
            ("YOLINK_CLIENT_SECRET", "secret"),
            ("YOLINK_NET", "short-net"),
        ]))
        .unwrap();
        assert_eq!(config.net_id(), "short-net");
        assert_eq!(config.http_port(), HubConfig::DEFAULT_HTTP_PORT);
    }

    #[test]
    fn from_source_reports_missing_variable() {
        let err = HubConfig::from_source(env(&[
            ("YOLINK_HOST", "hub"),
            ("YOLINK_CLIENT_SECRET", "secret"),
            ("YOLINK_NET_ID", "net"),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::Missing("YOLINK_CLIENT_ID"));
    }

    #[test]
    fn from_source_rejects_bad_port() {
        let err = HubConfig::from_source(env(&[
            ("YOLINK_HOST", "hub"),
            ("YOLINK_CLIENT_ID", "id"),
            ("YOLINK_CLIENT_SECRET", "secret"),
            ("YOLINK_NET_ID", "net"),
            ("YOLINK_MQTT_PORT", "mqtt"),
        ]))
        .unwrap_err();
        assert!(
            matches!(&err, ConfigError::Invalid { value, .. } if value.contains("mqtt")),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn from_source_ignores_empty_and_unrelated_variables() {
        let config = HubConfig::from_source(env(&[
            ("YOLINK_HOST", "hub"),
            ("YOLINK_CLIENT_ID", "12345"),
            ("YOLINK_CLIENT_SECRET", "secret"),
            ("YOLINK_NET_ID", ""),
            ("YOLINK_NET", "short-net"),
            ("YOLINK_HTTP_PORT", ""),
            ("YOLINK_DEBUG", "1"),
            ("OTHER_HOST", "elsewhere"),
        ]))
        .unwrap();
        assert_eq!(config.host(), "hub");
        assert_eq!(config.client_id(), "12345");
        assert_eq!(config.net_id(), "short-net");
        assert_eq!(config.http_port(), HubConfig::DEFAULT_HTTP_PORT);
    }

    #[test]
    fn settings_errors_name_the_variable() {
        assert_eq!(env_name(Some("mqtt_port")), "YOLINK_MQTT_PORT");
        assert_eq!(env_name(Some("net")), "YOLINK_NET");
        assert_eq!(env_name(None), "YOLINK_*");
    }

    #[test]
    fn validate_names_first_missing_setting() {
        let config = HubConfig::new("hub", "id", "", "");
        assert_eq!(
            config.validate(),
            Err(ConfigError::Missing("YOLINK_CLIENT_SECRET"))
        );
    }

    #[test]
    fn debug_redacts_secret() {
        let config = HubConfig::new("hub", "id", "top-secret", "net");
        let debug = format!("{config:?}");
        assert!(!debug.contains("top-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
