use std::time::Duration;
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use url::Url;
use crate::config::{HttpConfig, PlatformConfig};
use crate::core::{QueueError, Result, UploadPhase};

/// Connection to the ad platform's Graph API, shared by the per-kind uploaders.
#[derive(Debug, Clone)]
pub struct PlatformClient {
    client: Client,
    base: Url,
    ad_account_id: String,
    access_token: String,
}

impl PlatformClient {
    pub fn new(platform: &PlatformConfig, http: &HttpConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = http.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build()?;

        let base = Url::parse(&format!(
            "{}/{}/",
            platform.graph_url.trim_end_matches('/'),
            platform.api_version.trim_matches('/'),
        ))?;

        Ok(Self {
            client,
            base,
            ad_account_id: platform.ad_account_id.clone(),
            access_token: platform.access_token.clone(),
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn ad_account_id(&self) -> &str {
        &self.ad_account_id
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// `{base}/{ad_account_id}/{edge}`
    pub fn endpoint(&self, edge: &str) -> Result<Url> {
        Ok(self.base.join(&format!("{}/{}", self.ad_account_id, edge))?)
    }
}

/// Reads a response body as JSON. Empty bodies become `Null`, non-JSON
/// bodies are kept as a string so they can still be reported.
pub(crate) async fn decode(response: Response) -> Result<(StatusCode, Value)> {
    let status = response.status();
    let bytes = response.bytes().await?;

    if bytes.is_empty() {
        return Ok((status, Value::Null));
    }

    let body = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    Ok((status, body))
}

/// Message of a Graph `{"error": {...}}` envelope, if the body carries one.
pub(crate) fn graph_error(body: &Value) -> Option<String> {
    let error = body.get("error")?;
    let message = match error.get("message").and_then(Value::as_str) {
        Some(message) => message.to_string(),
        None => match error {
            Value::String(message) => message.clone(),
            other => other.to_string(),
        },
    };
    Some(message)
}

/// Turns a non-2xx status or an error envelope into a rejection for `phase`.
pub(crate) fn ensure_accepted(phase: UploadPhase, status: StatusCode, body: &Value) -> Result<()> {
    if let Some(message) = graph_error(body) {
        return Err(QueueError::upload_rejected(phase, status.as_u16(), message));
    }

    if !status.is_success() {
        let message = match body {
            Value::String(text) if !text.is_empty() => text.clone(),
            _ => format!("request failed with status {}", status),
        };
        return Err(QueueError::upload_rejected(phase, status.as_u16(), message));
    }

    Ok(())
}

/// Identifier fields come back as strings or as bare numbers.
pub(crate) fn id_field(body: &Value, key: &str) -> Option<String> {
    match body.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
