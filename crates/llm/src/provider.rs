use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use snafu::Snafu;

use crate::wire::ChatRequest;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub endpoint: String,
    pub request_timeout: Duration,
}

impl TransportConfig {
    pub fn new(endpoint: impl Into<String>, request_timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into().trim().to_string(),
            request_timeout,
        }
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self::new(endpoint, DEFAULT_REQUEST_TIMEOUT)
    }
}

/// Status and body of one completed HTTP exchange, before interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
pub type ProviderResult<T> = Result<T, ProviderError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ProviderError {
    #[snafu(display("endpoint '{endpoint}' is invalid: {details}"))]
    InvalidEndpoint {
        stage: &'static str,
        endpoint: String,
        details: String,
    },
    #[snafu(display("http client failed on `{stage}`, {source}"))]
    BuildClient {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("request to {endpoint} failed on `{stage}`, {source}"))]
    SendRequest {
        stage: &'static str,
        endpoint: String,
        source: reqwest::Error,
    },
    #[snafu(display("failed to read response body on `{stage}`, {source}"))]
    ReadResponseBody {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("chat request has no messages to send"))]
    EmptyMessageSet { stage: &'static str },
}

impl ProviderError {
    /// Returns true when the request never produced an HTTP response.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::SendRequest { .. } | Self::ReadResponseBody { .. } | Self::BuildClient { .. }
        )
    }
}

/// One request/response exchange with the completion endpoint.
pub trait CompletionTransport: Send + Sync {
    fn id(&self) -> &str;
    fn endpoint(&self) -> &str;
    fn exchange<'a>(&'a self, request: &'a ChatRequest) -> BoxFuture<'a, ProviderResult<RawResponse>>;
}
