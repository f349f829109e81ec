//! # HTTP Transport
//!
//! A thin wrapper around `reqwest` shared by every API component. It joins
//! endpoint paths onto the configured server URL, applies the uniform request
//! timeout, injects the bearer credential from the [`Session`], maps status
//! codes onto [`ClientError`] and retries transport failures on reads.
//!
//! Writes (`POST`) are sent exactly once: a retried add whose first attempt
//! reached the server would insert twice.

use crate::client::config::Config;
use crate::client::retry::RetryPolicy;
use crate::client::session::Session;
use crate::shared::error::{ClientError, ClientResult};
use reqwest::{header::AUTHORIZATION, Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Whether an endpoint needs the bearer credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Auth {
    Public,
    Bearer,
}

/// Shared HTTP client. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ApiClient {
    config: Config,
    session: Session,
    client: Client,
    retry: RetryPolicy,
}

impl ApiClient {
    pub fn new(config: Config, session: Session) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(config.app().request_timeout)
            .build()
            .map_err(|e| ClientError::network(format!("cannot build HTTP client: {}", e)))?;
        let retry = RetryPolicy::from_settings(&config.app().retry);
        Ok(Self {
            config,
            session,
            client,
            retry,
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// GET a JSON document, retrying transport failures
    pub async fn get_value(&self, path: &str, auth: Auth) -> ClientResult<Value> {
        let label = format!("GET {}", path);
        self.retry
            .run(&label, || self.send(Method::GET, path, auth, None::<&()>))
            .await
    }

    /// GET and deserialize into `T`
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str, auth: Auth) -> ClientResult<T> {
        let value = self.get_value(path, auth).await?;
        serde_json::from_value(value)
            .map_err(|e| ClientError::malformed(format!("GET {}: {}", path, e)))
    }

    /// POST an optional JSON body. Returns the response document, or
    /// `Value::Null` for an empty body.
    pub async fn post<B: Serialize>(
        &self,
        path: &str,
        body: Option<&B>,
        auth: Auth,
    ) -> ClientResult<Value> {
        self.send(Method::POST, path, auth, body).await
    }

    async fn send<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        auth: Auth,
        body: Option<&B>,
    ) -> ClientResult<Value> {
        // Resolve the credential before anything goes on the wire
        let token = match auth {
            Auth::Bearer => Some(self.session.require().await?),
            Auth::Public => None,
        };

        let url = self.config.api_url(path);
        tracing::debug!("[Http] {} {}", method, url);

        let mut request = self
            .client
            .request(method.clone(), &url)
            .header("Accept", "application/json");
        if let Some(token) = token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::warn!("[Http] {} {} failed: {}", method, url, e);
            ClientError::from(e)
        })?;

        let status = response.status();
        let text = response.text().await.map_err(ClientError::from)?;

        if !status.is_success() {
            tracing::warn!("[Http] {} {} returned {}", method, url, status);
            if status == StatusCode::UNAUTHORIZED && auth == Auth::Bearer {
                return Err(ClientError::Unauthenticated);
            }
            return Err(ClientError::remote(status.as_u16(), error_message(status, &text)));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| ClientError::malformed(format!("{} {}: {}", method, path, e)))
    }
}

/// Prefer the server's `message` field, then the raw body, then the reason.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        if let Some(Value::String(message)) = map.get("message").or_else(|| map.get("error")) {
            return message.clone();
        }
    }
    let body = body.trim();
    if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("Unknown status")
            .to_string()
    } else {
        body.to_string()
    }
}
