// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP client for the hub's local API.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::device::{DeviceDescriptor, DiscoveryRecord};
use crate::error::{Error, ParseError, ProtocolError, Result};
use crate::protocol::HubApi;
use crate::state::StateSnapshot;

/// Path of the OAuth token endpoint.
const TOKEN_PATH: &str = "/open/yolink/token";

/// Path of the API endpoint.
const API_PATH: &str = "/open/yolink/v2/api";

/// Result code of a successful API call.
const SUCCESS_CODE: &str = "000000";

/// Tokens are refreshed this long before they expire.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

// ============================================================================
// TokenManager - client-credentials access tokens
// ============================================================================

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Option<Instant>,
}

impl CachedToken {
    fn is_fresh(&self, now: Instant) -> bool {
        self.expires_at
            .is_none_or(|expires_at| now + REFRESH_MARGIN < expires_at)
    }
}

/// Fetches and caches access tokens using the client-credentials grant.
///
/// The cached token is reused until it is within 60 seconds of expiry.
/// Concurrent callers share a single refresh.
pub struct TokenManager {
    http: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenManager {
    fn new(http: Client, base_url: &str, client_id: String, client_secret: String) -> Self {
        Self {
            http,
            token_url: format!("{base_url}{TOKEN_PATH}"),
            client_id,
            client_secret,
            cached: Mutex::new(None),
        }
    }

    /// Returns the client identifier, also used as MQTT username.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Returns a valid access token, fetching a new one if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Authentication`] if the hub rejects the credentials
    /// and a protocol error if the hub cannot be reached.
    pub async fn access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref()
            && token.is_fresh(Instant::now())
        {
            return Ok(token.access_token.clone());
        }

        let token = self.fetch().await?;
        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }

    /// Drops the cached token so the next call fetches a new one.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }

    async fn fetch(&self) -> Result<CachedToken> {
        tracing::debug!(url = %self.token_url, "Requesting access token");

        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(ProtocolError::Http)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::Authentication(format!(
                "hub rejected client credentials (HTTP {})",
                status.as_u16()
            )));
        }
        if !status.is_success() {
            return Err(http_status_error(status).into());
        }

        let body: TokenResponse = response.json().await.map_err(ProtocolError::Http)?;
        let Some(access_token) = body.access_token.filter(|token| !token.is_empty()) else {
            return Err(Error::Authentication(
                "token response has no access_token".to_string(),
            ));
        };

        tracing::debug!(expires_in = ?body.expires_in, "Obtained access token");
        Ok(CachedToken {
            access_token,
            expires_at: body
                .expires_in
                .map(|secs| Instant::now() + Duration::from_secs(secs)),
        })
    }
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// HubClient - API calls
// ============================================================================

#[derive(Debug, Deserialize)]
struct ApiResponse {
    code: String,
    #[serde(default)]
    desc: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

/// Client for the hub's local HTTP API.
///
/// Every call is a JSON `POST` to `/open/yolink/v2/api` carrying a bearer
/// token. A call succeeds when the hub answers with code `000000`; its result
/// is the `data` member of the answer.
///
/// # Examples
///
/// ```no_run
/// use yolocal_lib::protocol::{HubApi, HubClient};
///
/// # async fn example() -> yolocal_lib::Result<()> {
/// let client = HubClient::builder("http://192.168.1.20:1080")
///     .credentials("client-id", "client-secret")
///     .build()?;
///
/// for record in client.device_list().await? {
///     println!("{} ({})", record.name, record.device_type);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HubClient {
    base_url: String,
    api_url: String,
    http: Client,
    tokens: Arc<TokenManager>,
}

impl HubClient {
    /// Creates a builder for a hub at `base_url` (e.g. `http://10.0.0.5:1080`).
    #[must_use]
    pub fn builder(base_url: impl Into<String>) -> HubClientBuilder {
        HubClientBuilder::new(base_url)
    }

    /// Returns the base URL of the hub.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the token manager.
    #[must_use]
    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Calls an API method and returns its `data`.
    ///
    /// `params` are merged into the request body next to `method`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Api`] if the hub answers with a failure code,
    /// [`ProtocolError::AuthenticationFailed`] if the token is rejected and
    /// other protocol errors if the hub cannot be reached.
    pub async fn call(&self, method: &str, params: Map<String, Value>) -> Result<Value> {
        let token = self.tokens.access_token().await?;

        let mut body = params;
        body.insert("method".to_string(), Value::from(method));

        tracing::debug!(method = %method, "Calling hub API");

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(ProtocolError::Http)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            self.tokens.invalidate().await;
            return Err(ProtocolError::AuthenticationFailed.into());
        }
        if !status.is_success() {
            return Err(http_status_error(status).into());
        }

        let text = response.text().await.map_err(ProtocolError::Http)?;
        let answer: ApiResponse = serde_json::from_str(&text).map_err(ParseError::Json)?;

        if answer.code != SUCCESS_CODE {
            tracing::debug!(method = %method, code = %answer.code, "Hub API call failed");
            return Err(ProtocolError::Api {
                code: answer.code,
                message: answer.desc.unwrap_or_default(),
            }
            .into());
        }

        Ok(answer.data.unwrap_or(Value::Null))
    }

    fn device_params(device: &DeviceDescriptor) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert("targetDevice".to_string(), Value::from(device.device_id()));
        params.insert("token".to_string(), Value::from(device.token()));
        params
    }
}

impl HubApi for HubClient {
    async fn device_list(&self) -> Result<Vec<DiscoveryRecord>> {
        let data = self.call("Home.getDeviceList", Map::new()).await?;

        let Some(Value::Array(devices)) = data.get("devices") else {
            return Err(ParseError::MissingField("devices".to_string()).into());
        };

        let records = devices
            .iter()
            .filter_map(|device| match DiscoveryRecord::deserialize(device) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping malformed device record");
                    None
                }
            })
            .collect::<Vec<_>>();

        tracing::debug!(count = records.len(), "Fetched device list");
        Ok(records)
    }

    async fn device_state(&self, device: &DeviceDescriptor) -> Result<StateSnapshot> {
        let method = format!("{}.getState", device.device_type());
        let data = self.call(&method, Self::device_params(device)).await?;
        Ok(StateSnapshot::from_json(data))
    }

    async fn send_command(
        &self,
        device: &DeviceDescriptor,
        params: Map<String, Value>,
    ) -> Result<Value> {
        let method = format!("{}.setState", device.device_type());
        let mut body = Self::device_params(device);
        body.insert("params".to_string(), Value::Object(params));
        self.call(&method, body).await
    }
}

fn http_status_error(status: StatusCode) -> ProtocolError {
    ProtocolError::ConnectionFailed(format!(
        "HTTP {} - {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown")
    ))
}

// ============================================================================
// HubClientBuilder
// ============================================================================

/// Builder for [`HubClient`].
#[derive(Debug, Clone)]
pub struct HubClientBuilder {
    base_url: String,
    client_id: String,
    client_secret: String,
    timeout: Duration,
}

impl HubClientBuilder {
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client_id: String::new(),
            client_secret: String::new(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Sets the API client credentials.
    #[must_use]
    pub fn credentials(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.client_id = client_id.into();
        self.client_secret = client_secret.into();
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the client. No request is made until the first call.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidAddress`] if the base URL is not an
    /// `http(s)` URL, or an HTTP error if the client cannot be created.
    pub fn build(self) -> std::result::Result<HubClient, ProtocolError> {
        let base_url = self.base_url.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ProtocolError::InvalidAddress(format!(
                "expected http(s) URL, got {base_url:?}"
            )));
        }

        let http = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(ProtocolError::Http)?;

        let tokens = TokenManager::new(
            http.clone(),
            &base_url,
            self.client_id,
            self.client_secret,
        );

        Ok(HubClient {
            api_url: format!("{base_url}{API_PATH}"),
            base_url,
            http,
            tokens: Arc::new(tokens),
        })
    }
}
