//! Network transport seam.
//!
//! The pipeline only ever talks to a [`Transport`]. Production code uses
//! [`ReqwestTransport`]; tests plug in scripted doubles.

use crate::descriptor::{Body, RequestDescriptor};
use crate::response::Response;
use crate::{ClientError, ClientResult};
use async_trait::async_trait;
use carebridge_config::ClientConfig;
use reqwest::cookie::Jar;
use reqwest::multipart::{Form, Part};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Coarse cause of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Timeout,
    Connect,
    /// The request could not be encoded (bad URL, bad multipart part).
    Request,
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::Connect => "connect",
            TransportErrorKind::Request => "request",
            TransportErrorKind::Other => "transport",
        };
        f.write_str(label)
    }
}

/// Failure before any response was received.
#[derive(Error, Debug, Clone)]
#[error("{kind} error: {message}")]
pub struct TransportError {
    kind: TransportErrorKind,
    message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    /// Timeouts and connection failures may succeed later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            TransportErrorKind::Timeout | TransportErrorKind::Connect
        )
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        let kind = if error.is_timeout() {
            TransportErrorKind::Timeout
        } else if error.is_connect() {
            TransportErrorKind::Connect
        } else if error.is_builder() {
            TransportErrorKind::Request
        } else {
            TransportErrorKind::Other
        };
        TransportError::new(kind, error.to_string())
    }
}

/// Executes one request. Implementations never interpret status codes.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &RequestDescriptor) -> Result<Response, TransportError>;
}

/// reqwest-backed transport sharing one cookie jar across calls.
///
/// The jar receives every `Set-Cookie` the server sends, so the CSRF
/// cookie re-issued by an identity check is visible to the next request.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    config: ClientConfig,
    request_timeout: Option<Duration>,
}

impl ReqwestTransport {
    /// Build a transport with a fresh cookie jar.
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        Self::with_jar(config, Arc::new(Jar::default()))
    }

    /// Build a transport on an existing cookie jar.
    pub fn with_jar(config: &ClientConfig, jar: Arc<Jar>) -> ClientResult<Self> {
        config.base_url()?;

        let client = reqwest::Client::builder()
            .cookie_provider(jar)
            .build()
            .map_err(|e| ClientError::InvalidRequest(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            client,
            config: config.clone(),
            request_timeout: config.request_timeout(),
        })
    }

    fn multipart_form(parts: &[crate::MultipartPart]) -> Result<Form, TransportError> {
        let mut form = Form::new();
        for part in parts {
            let mut field = Part::bytes(part.data.clone());
            if let Some(file_name) = &part.file_name {
                field = field.file_name(file_name.clone());
            }
            if let Some(content_type) = &part.content_type {
                field = field.mime_str(content_type)?;
            }
            form = form.part(part.name.clone(), field);
        }
        Ok(form)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &RequestDescriptor) -> Result<Response, TransportError> {
        let url = self
            .config
            .resolve(request.path())
            .map_err(|e| TransportError::new(TransportErrorKind::Request, e.to_string()))?;

        let mut builder = self
            .client
            .request(request.method().into(), url)
            .headers(request.headers().clone());

        if !request.query().is_empty() {
            builder = builder.query(request.query());
        }

        builder = match request.body() {
            Body::Empty => builder,
            Body::Json(value) => builder.json(value),
            Body::Bytes(data) => builder.body(data.clone()),
            Body::Multipart(parts) => builder.multipart(Self::multipart_form(parts)?),
        };

        if let Some(timeout) = self.request_timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        Ok(Response::new(status, headers, body))
    }
}
