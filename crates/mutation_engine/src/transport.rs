//! REST adapter for a JSON collection endpoint.

use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use shared::domain::Record;
use tracing::debug;
use url::Url;

use crate::{error::RemoteFailure, RemoteAdapter};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Talks to `{server_url}/{resource}`:
///
/// | operation | request                         |
/// |-----------|---------------------------------|
/// | list      | `GET    /{resource}`            |
/// | create    | `POST   /{resource}`            |
/// | update    | `PATCH  /{resource}/{id}`       |
/// | delete    | `DELETE /{resource}/{id}`       |
pub struct HttpRemote {
    http: Client,
    collection_url: Url,
}

impl HttpRemote {
    pub fn new(server_url: &str, resource: &str) -> anyhow::Result<Self> {
        Self::with_timeout(server_url, resource, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(
        server_url: &str,
        resource: &str,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build http client")?;
        let mut collection_url = Url::parse(server_url)
            .with_context(|| format!("invalid server url '{server_url}'"))?;
        collection_url
            .path_segments_mut()
            .map_err(|_| anyhow!("server url '{server_url}' cannot carry a path"))?
            .pop_if_empty()
            .extend(resource.split('/').filter(|segment| !segment.is_empty()));
        Ok(Self {
            http,
            collection_url,
        })
    }

    pub fn collection_url(&self) -> &Url {
        &self.collection_url
    }

    /// Fetches the current records. Accepts a bare array or `{ "items": [...] }`.
    pub async fn list(&self) -> Result<Vec<Record>, RemoteFailure> {
        let body = send(self.http.get(self.collection_url.clone())).await?;
        let items = match body {
            Value::Array(items) => items,
            Value::Object(mut envelope) => match envelope.remove("items") {
                Some(Value::Array(items)) => items,
                _ => return Err(anyhow!("list response has no 'items' array").into()),
            },
            other => return Err(anyhow!("unexpected list response: {other}").into()),
        };
        items
            .into_iter()
            .map(|item| match item {
                Value::Object(record) => Ok(record),
                other => Err(anyhow!("list entry is not an object: {other}").into()),
            })
            .collect()
    }

    fn item_url(&self, id: &str) -> Result<Url, RemoteFailure> {
        let mut url = self.collection_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("collection url cannot carry an id"))?
            .push(id);
        Ok(url)
    }
}

#[async_trait]
impl RemoteAdapter for HttpRemote {
    async fn create(&self, draft: &Record) -> Result<Value, RemoteFailure> {
        send(self.http.post(self.collection_url.clone()).json(draft)).await
    }

    async fn update(&self, id: &str, patch: &Record) -> Result<Value, RemoteFailure> {
        send(self.http.patch(self.item_url(id)?).json(patch)).await
    }

    async fn delete(&self, id: &str) -> Result<(), RemoteFailure> {
        send(self.http.delete(self.item_url(id)?)).await.map(|_| ())
    }
}

async fn send(request: RequestBuilder) -> Result<Value, RemoteFailure> {
    let response = request.send().await?;
    debug!(
        url = %response.url(),
        status = response.status().as_u16(),
        "http: response received"
    );
    decode(response).await
}

async fn decode(response: Response) -> Result<Value, RemoteFailure> {
    let status = response.status();
    let text = response.text().await?;
    // Non-JSON bodies carry nothing the engine can reconcile or normalize.
    let body = if text.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or_else(|error| {
            debug!(%status, %error, bytes = text.len(), "http: non-json body ignored");
            Value::Null
        })
    };
    if status.is_success() {
        Ok(body)
    } else {
        Err(RemoteFailure::Http {
            status: status.as_u16(),
            reason: status.canonical_reason().map(str::to_string),
            body,
        })
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
