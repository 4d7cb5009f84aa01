//! JSON-over-HTTP client for the PollMaster backend.
//!
//! Every exchange is bounded by the configured request timeout. A request that
//! completes, successfully or not, yields an [`ApiReply`]; callers decide how a
//! failing status maps onto their own error vocabulary.

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::util::compact_text;

#[derive(Clone)]
pub struct ApiClient {
    config: ClientConfig,
    client: Client,
}

/// A completed HTTP exchange
#[derive(Debug, Clone, PartialEq)]
pub struct ApiReply {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiReply {
    /// 2xx status and no `"success": false` envelope flag.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
            && self.body.get("success").and_then(Value::as_bool) != Some(false)
    }

    pub const fn is_auth_rejection(&self) -> bool {
        matches!(
            self.status,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        )
    }

    /// Human readable failure text taken from the payload.
    pub fn message(&self) -> String {
        parse_api_error(self.status, &self.body)
    }

    /// Field-level validation messages (`errors` object or array).
    pub fn field_errors(&self) -> Vec<String> {
        collect_field_errors(self.body.get("errors"))
    }

    /// `data` from a `{success, message, data}` envelope, or the whole body.
    pub fn into_data(self) -> Value {
        match self.body {
            Value::Object(mut map) if map.contains_key("data") => {
                map.remove("data").unwrap_or(Value::Null)
            }
            other => other,
        }
    }

    /// Default status mapping for authenticated endpoints.
    pub fn into_success(self) -> Result<Value> {
        if self.is_success() {
            return Ok(self.into_data());
        }
        Err(self.into_error())
    }

    pub fn into_error(self) -> Error {
        let message = self.message();
        match self.status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Unauthorized(message),
            StatusCode::NOT_FOUND => Error::NotFound(message),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                let fields = self.field_errors();
                if fields.is_empty() {
                    Error::Validation(message)
                } else {
                    Error::Validation(fields.join(", "))
                }
            }
            _ => Error::Api(message),
        }
    }
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let config = config.normalized()?;
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|error| {
                Error::InvalidConfiguration(format!("failed to build HTTP client: {error}"))
            })?;
        Ok(Self { config, client })
    }

    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<ApiReply> {
        self.execute(Method::GET, path, None, token).await
    }

    pub async fn post(&self, path: &str, body: &Value, token: Option<&str>) -> Result<ApiReply> {
        self.execute(Method::POST, path, Some(body), token).await
    }

    pub async fn put(&self, path: &str, body: &Value, token: Option<&str>) -> Result<ApiReply> {
        self.execute(Method::PUT, path, Some(body), token).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> Result<ApiReply> {
        self.execute(Method::DELETE, path, None, token).await
    }

    /// Send one request and read the full body, all within the timeout.
    ///
    /// Dropping the returned future cancels the request; nothing is applied
    /// by this layer, so a timed-out call leaves no partial state behind.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        token: Option<&str>,
    ) -> Result<ApiReply> {
        let url = self.config.endpoint(path);
        tracing::debug!("{} {}", method, url);

        let mut request = self
            .client
            .request(method, &url)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let timeout = self.config.request_timeout();
        match tokio::time::timeout(timeout, self.read_reply(request)).await {
            Ok(reply) => reply,
            Err(_) => {
                tracing::warn!("Request to {} timed out after {:?}", url, timeout);
                Err(Error::Timeout(self.config.request_timeout_secs))
            }
        }
    }

    async fn read_reply(&self, request: RequestBuilder) -> Result<ApiReply> {
        let response = request.send().await.map_err(|error| self.map_transport(&error))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|error| self.map_transport(&error))?;
        Ok(ApiReply {
            status,
            body: parse_body(&text),
        })
    }

    fn map_transport(&self, error: &reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::Timeout(self.config.request_timeout_secs)
        } else {
            Error::Network(error.to_string())
        }
    }
}

/// Decode `data` (or the whole body) into `T`.
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    Ok(serde_json::from_value(value)?)
}

/// Percent-encode a single path segment such as an item id.
pub fn path_segment(value: &str) -> String {
    urlencoding::encode(value.trim()).into_owned()
}

fn parse_body(text: &str) -> Value {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(compact_text(trimmed)))
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &Value) -> String {
    if let Ok(payload) = serde_json::from_value::<ErrorPayload>(body.clone()) {
        if let Some(message) = payload
            .message
            .or(payload.msg)
            .or(payload.error_description)
            .or(payload.error)
            .filter(|message| !message.trim().is_empty())
        {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let fields = collect_field_errors(body.get("errors"));
    if !fields.is_empty() {
        return format!("{} ({})", fields.join(", "), status.as_u16());
    }

    match body {
        Value::String(text) if !text.trim().is_empty() => {
            format!("{} ({})", text.trim(), status.as_u16())
        }
        _ => format!("HTTP {}", status.as_u16()),
    }
}

fn collect_field_errors(errors: Option<&Value>) -> Vec<String> {
    let mut messages = Vec::new();
    match errors {
        Some(Value::Object(map)) => {
            for value in map.values() {
                push_messages(value, &mut messages);
            }
        }
        Some(Value::Array(items)) => {
            for item in items {
                push_messages(item, &mut messages);
            }
        }
        _ => {}
    }
    messages
}

fn push_messages(value: &Value, messages: &mut Vec<String>) {
    match value {
        Value::String(text) if !text.trim().is_empty() => messages.push(text.trim().to_string()),
        Value::Array(items) => {
            for item in items {
                push_messages(item, messages);
            }
        }
        Value::Object(map) => {
            if let Some(text) = map
                .get("msg")
                .or_else(|| map.get("message"))
                .and_then(Value::as_str)
            {
                messages.push(text.trim().to_string());
            }
        }
        _ => {}
    }
}
