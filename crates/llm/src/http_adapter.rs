use snafu::{ResultExt, ensure};

use super::provider::{
    BoxFuture, BuildClientSnafu, CompletionTransport, InvalidEndpointSnafu, ProviderResult,
    RawResponse, ReadResponseBodySnafu, SendRequestSnafu, TransportConfig,
};
use super::wire::ChatRequest;

pub const HTTP_TRANSPORT_ID: &str = "http-json";

/// JSON-over-HTTP transport posting to a single chat endpoint.
pub struct HttpTransport {
    config: TransportConfig,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: TransportConfig) -> ProviderResult<Self> {
        ensure!(
            !config.endpoint.is_empty(),
            InvalidEndpointSnafu {
                stage: "http-transport-new",
                endpoint: config.endpoint.clone(),
                details: "endpoint is empty".to_string(),
            }
        );

        if let Err(error) = reqwest::Url::parse(&config.endpoint) {
            return InvalidEndpointSnafu {
                stage: "parse-endpoint",
                endpoint: config.endpoint.clone(),
                details: error.to_string(),
            }
            .fail();
        }

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context(BuildClientSnafu {
                stage: "build-client",
            })?;

        Ok(Self { config, client })
    }

    async fn post(&self, request: &ChatRequest) -> ProviderResult<RawResponse> {
        tracing::debug!(
            endpoint = %self.config.endpoint,
            message_count = request.contents.len(),
            "posting chat request"
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(request)
            .send()
            .await
            .context(SendRequestSnafu {
                stage: "send-chat-request",
                endpoint: self.config.endpoint.clone(),
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.context(ReadResponseBodySnafu {
            stage: "read-chat-response",
        })?;

        Ok(RawResponse::new(status, body))
    }
}

impl CompletionTransport for HttpTransport {
    fn id(&self) -> &str {
        HTTP_TRANSPORT_ID
    }

    fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    fn exchange<'a>(
        &'a self,
        request: &'a ChatRequest,
    ) -> BoxFuture<'a, ProviderResult<RawResponse>> {
        Box::pin(self.post(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderError;

    #[test]
    fn rejects_blank_endpoint() {
        let result = HttpTransport::new(TransportConfig::with_endpoint("   "));

        assert!(matches!(
            result,
            Err(ProviderError::InvalidEndpoint { stage: "http-transport-new", .. })
        ));
    }

    #[test]
    fn rejects_unparseable_endpoint() {
        let result = HttpTransport::new(TransportConfig::with_endpoint("not a url"));

        assert!(matches!(
            result,
            Err(ProviderError::InvalidEndpoint { stage: "parse-endpoint", .. })
        ));
    }

    #[test]
    fn keeps_trimmed_endpoint() {
        let transport =
            HttpTransport::new(TransportConfig::with_endpoint(" http://localhost:8000/chat "))
                .unwrap();

        assert_eq!(transport.endpoint(), "http://localhost:8000/chat");
        assert_eq!(transport.id(), HTTP_TRANSPORT_ID);
    }
}
