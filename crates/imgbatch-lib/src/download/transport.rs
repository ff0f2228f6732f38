use super::types::ImageUrl;
use crate::error::ImgBatchError;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use reqwest::header::CONTENT_LENGTH;
use std::time::Duration;
use thiserror::Error;

/// Response body of a successful fetch, delivered chunk by chunk.
pub type ByteStream = BoxStream<'static, Result<Bytes, TransportError>>;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16 },

    #[error("{url} did not report a usable Content-Length")]
    MissingContentLength { url: String },

    #[error("failed to read response body of {url}: {reason}")]
    Body { url: String, reason: String },
}

/// Network side of a transfer. Failures are values, never panics.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// GET the resource. Non-2xx responses are errors.
    async fn fetch(&self, url: &ImageUrl) -> Result<ByteStream, TransportError>;

    /// Remote size in bytes, from a metadata-only request.
    async fn probe_size(&self, url: &ImageUrl) -> Result<u64, TransportError>;
}

#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(request_timeout: Option<Duration>) -> Result<Self, ImgBatchError> {
        let mut builder =
            reqwest::Client::builder().user_agent(concat!("imgbatch/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = request_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        url: &ImageUrl,
    ) -> Result<reqwest::Response, TransportError> {
        let response = request.send().await.map_err(|e| TransportError::Request {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, url: &ImageUrl) -> Result<ByteStream, TransportError> {
        let response = self.send(self.client.get(url.as_str()), url).await?;
        let url = url.to_string();
        Ok(response
            .bytes_stream()
            .map(move |chunk| {
                chunk.map_err(|e| TransportError::Body {
                    url: url.clone(),
                    reason: e.to_string(),
                })
            })
            .boxed())
    }

    async fn probe_size(&self, url: &ImageUrl) -> Result<u64, TransportError> {
        let response = self.send(self.client.head(url.as_str()), url).await?;
        // Read the header directly: for HEAD the body length hint is always zero.
        response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .ok_or_else(|| TransportError::MissingContentLength {
                url: url.to_string(),
            })
    }
}
