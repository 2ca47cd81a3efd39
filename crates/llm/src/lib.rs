use std::sync::Arc;

mod coordinator;
mod http_adapter;
mod provider;
pub mod wire;

pub use coordinator::{
    CompletionOutcome, DEFAULT_PROTOCOL_ERROR_TEXT, DEFAULT_TRANSPORT_ERROR_TEXT, Failure,
    FailureKind, FailureMessages, ResponseCoordinator,
};
pub use http_adapter::{HTTP_TRANSPORT_ID, HttpTransport};
pub use provider::{
    BoxFuture, CompletionTransport, DEFAULT_REQUEST_TIMEOUT, ProviderError, ProviderResult,
    RawResponse, TransportConfig,
};

pub fn create_transport(config: TransportConfig) -> ProviderResult<Arc<dyn CompletionTransport>> {
    Ok(Arc::new(HttpTransport::new(config)?))
}
