/*
[INPUT]:  HTTP configuration (base URL, timeouts) and challenge payloads
[OUTPUT]: Challenge envelopes and authenticated addresses from a remote verifier
[POS]:    HTTP layer - reqwest-backed challenge transport
[UPDATE]: When auth endpoints or response shapes change
*/

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use crate::auth::client::ChallengeTransport;
use crate::error::TransportError;
use crate::types::AuthEnvelope;

const CHALLENGE_ENDPOINT: &str = "auth/challenge";
const VERIFY_ENDPOINT: &str = "auth/verify";

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    address: String,
}

/// Challenge transport talking to a verifier over HTTP
#[derive(Debug, Clone)]
pub struct HttpChallengeTransport {
    http_client: Client,
    base_url: Url,
}

impl HttpChallengeTransport {
    /// Create a transport with default configuration
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        Self::with_config(base_url, ClientConfig::default())
    }

    pub fn with_config(base_url: &str, config: ClientConfig) -> Result<Self, TransportError> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url: parse_base_url(base_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn request(&self, method: Method, endpoint: &str) -> Result<RequestBuilder, TransportError> {
        let url = self.base_url.join(endpoint)?;
        Ok(self.http_client.request(method, url))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, TransportError> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(TransportError::Api {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| TransportError::InvalidResponse(format!("{e}: {body}")))
    }
}

#[async_trait]
impl ChallengeTransport for HttpChallengeTransport {
    /// POST /auth/challenge
    async fn request_challenge(&self, address: &str) -> Result<AuthEnvelope, TransportError> {
        debug!(address = %address, "requesting challenge");
        let builder = self
            .request(Method::POST, CHALLENGE_ENDPOINT)?
            .json(&json!({ "address": address }));
        self.send_json(builder).await
    }

    /// POST /auth/verify
    async fn submit(
        &self,
        envelope: &AuthEnvelope,
        signature: &str,
    ) -> Result<String, TransportError> {
        let builder = self.request(Method::POST, VERIFY_ENDPOINT)?.json(&json!({
            "typedData": envelope,
            "signature": signature,
        }));
        let response: VerifyResponse = self.send_json(builder).await?;
        Ok(response.address)
    }
}

// Url::join drops the last path segment unless it ends with '/'
fn parse_base_url(base_url: &str) -> Result<Url, url::ParseError> {
    if base_url.ends_with('/') {
        Url::parse(base_url)
    } else {
        Url::parse(&format!("{base_url}/"))
    }
}

/// Prefer the server's `error`/`message` field over the raw body
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["error", "message"]
                .iter()
                .find_map(|key| value.get(*key).and_then(|v| v.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| body.to_string())
}
