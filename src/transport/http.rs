//! `reqwest`-backed [`Transport`].

use super::{Response, Transport, TransportError};
use crate::config::HttpConfig;
use async_trait::async_trait;
use reqwest::header::CACHE_CONTROL;
use reqwest::header::CONTENT_TYPE;
use std::time::Instant;
use url::Url;

/// HTTP transport with connect and overall timeouts.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    max_body_bytes: usize,
}

impl HttpTransport {
    /// Builds a transport from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Client`] if the client cannot be built.
    pub fn new(config: &HttpConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;
        Ok(Self {
            client,
            max_body_bytes: config.max_body_bytes,
        })
    }

    async fn send(
        &self,
        uri: &Url,
        request: reqwest::RequestBuilder,
    ) -> Result<Response, TransportError> {
        if !matches!(uri.scheme(), "http" | "https") {
            return Err(TransportError::UnsupportedScheme {
                scheme: uri.scheme().to_string(),
            });
        }
        let started = Instant::now();
        let mut response = request.send().await.map_err(|e| to_error(uri, e))?;

        let status = response.status();
        let protocol = format!("{:?}", response.version());
        let cache_control = response
            .headers()
            .get(CACHE_CONTROL)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        if response
            .content_length()
            .is_some_and(|len| len > self.max_body_bytes as u64)
        {
            return Err(self.too_large(uri));
        }
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| to_error(uri, e))? {
            if body.len() + chunk.len() > self.max_body_bytes {
                return Err(self.too_large(uri));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(Response {
            status: status.as_u16(),
            protocol,
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            cache_control,
            body,
            elapsed: started.elapsed(),
        })
    }

    fn too_large(&self, uri: &Url) -> TransportError {
        TransportError::BodyTooLarge {
            uri: uri.to_string(),
            limit: self.max_body_bytes,
        }
    }
}

fn to_error(uri: &Url, e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout {
            uri: uri.to_string(),
        }
    } else {
        TransportError::Request {
            uri: uri.to_string(),
            source: Box::new(e),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, uri: &Url) -> Result<Response, TransportError> {
        self.send(uri, self.client.get(uri.clone())).await
    }

    async fn post(
        &self,
        uri: &Url,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<Response, TransportError> {
        let request = self
            .client
            .post(uri.clone())
            .header(CONTENT_TYPE, content_type)
            .body(body);
        self.send(uri, request).await
    }
}
