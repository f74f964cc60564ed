//! HTTP transport for the narration and chat endpoints.

use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::config::ServerConfig;
use crate::error::{ClientError, ClientResult};
use crate::narration::NarrationRequest;
use crate::session_id::SessionId;
use crate::wire::{ChatMessage, ChoiceBody, NarrationResponse};

/// Connection settings for [`AdventureClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server origin without a trailing slash, e.g. `http://127.0.0.1:8080`.
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// Create a config for `base_url` with default timeouts:
    ///
    /// - connect_timeout: 3 s
    /// - request_timeout: 45 s
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            connect_timeout: Duration::from_secs(3),
            request_timeout: Duration::from_secs(45),
        }
    }
}

/// Thin wrapper over `reqwest::Client` that maps every failure to
/// [`ClientError`].
#[derive(Debug, Clone)]
pub struct AdventureClient {
    config: ClientConfig,
    client: reqwest::Client,
}

impl AdventureClient {
    pub fn builder(base_url: impl Into<String>) -> AdventureClientBuilder {
        AdventureClientBuilder::new(base_url)
    }

    pub fn from_config(server: &ServerConfig) -> Self {
        Self::builder(server.base_url.clone())
            .connect_timeout(server.connect_timeout())
            .request_timeout(server.request_timeout())
            .build()
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Narration endpoint for `session`. The id is percent-encoded as one
    /// path segment, so `/`, `?` and `#` in it cannot change the route.
    pub fn narrate_url(&self, session: &SessionId) -> ClientResult<String> {
        if !session.is_path_segment() {
            return Err(ClientError::InvalidSession(session.to_string()));
        }
        let invalid = |detail: String| ClientError::Connect {
            url: self.config.base_url.clone(),
            detail,
        };
        let mut url =
            reqwest::Url::parse(&self.config.base_url).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("base url cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(["api", "narrate", session.as_str()]);
        Ok(url.into())
    }

    pub fn send_url(&self) -> String {
        format!("{}/send", self.config.base_url)
    }

    /// `GET /api/narrate/{session}`: start or resume the session's story.
    pub async fn begin_story(&self, session: &SessionId) -> ClientResult<NarrationResponse> {
        let url = self.narrate_url(session)?;
        debug!(%url, "GET narration");
        let resp = self.client.get(&url).send().await;
        Self::decode(url, resp).await
    }

    /// `POST /api/narrate/{session}` with `{"choice": ...}`.
    pub async fn choose(
        &self,
        session: &SessionId,
        choice: &str,
    ) -> ClientResult<NarrationResponse> {
        let url = self.narrate_url(session)?;
        debug!(%url, choice, "POST narration choice");
        let body = ChoiceBody {
            choice: choice.to_string(),
        };
        let resp = self.client.post(&url).json(&body).send().await;
        Self::decode(url, resp).await
    }

    /// Execute whatever a narration ticket asks for.
    pub async fn narrate(
        &self,
        session: &SessionId,
        request: &NarrationRequest,
    ) -> ClientResult<NarrationResponse> {
        match request {
            NarrationRequest::Begin => self.begin_story(session).await,
            NarrationRequest::Choose { choice } => self.choose(session, choice).await,
        }
    }

    /// `POST /send` with `{"message": ...}`; returns the reply.
    pub async fn send_message(&self, text: &str) -> ClientResult<ChatMessage> {
        let url = self.send_url();
        debug!(%url, "POST chat message");
        let body = ChatMessage {
            message: text.to_string(),
        };
        let resp = self.client.post(&url).json(&body).send().await;
        Self::decode(url, resp).await
    }

    async fn decode<R: DeserializeOwned>(
        url: String,
        resp: Result<reqwest::Response, reqwest::Error>,
    ) -> ClientResult<R> {
        let resp = resp.map_err(|e| ClientError::Connect {
            url: url.clone(),
            detail: e.to_string(),
        })?;

        if !resp.status().is_success() {
            return Err(ClientError::Request {
                status: resp.status().as_u16(),
                url,
            });
        }

        let bytes = resp.bytes().await.map_err(|e| ClientError::Connect {
            url: url.clone(),
            detail: e.to_string(),
        })?;

        serde_json::from_slice::<R>(&bytes).map_err(|e| ClientError::Decode {
            url,
            detail: e.to_string(),
        })
    }
}

/// Builder for [`AdventureClient`].
pub struct AdventureClientBuilder {
    config: ClientConfig,
}

impl AdventureClientBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            config: ClientConfig::new(base_url),
        }
    }

    /// Override the TCP connect timeout (default 3 s).
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Override the whole-request timeout (default 45 s).
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn build(self) -> AdventureClient {
        // Client::builder() only fails if the TLS backend can't initialize;
        // fall back to a default client rather than panicking.
        let client = reqwest::Client::builder()
            .connect_timeout(self.config.connect_timeout)
            .timeout(self.config.request_timeout)
            .build()
            .unwrap_or_default();

        AdventureClient {
            config: self.config,
            client,
        }
    }
}
