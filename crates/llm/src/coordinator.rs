use std::sync::Arc;

use chatdock_core::Message;
use snafu::ensure;

use super::provider::{CompletionTransport, EmptyMessageSetSnafu, ProviderResult, RawResponse};
use super::wire::{ChatRequest, ChatResponse, ErrorPayload};

pub const DEFAULT_TRANSPORT_ERROR_TEXT: &str =
    "Sorry, I couldn't reach the assistant. Please try again.";
pub const DEFAULT_PROTOCOL_ERROR_TEXT: &str = "A request error occurred.";

/// User-facing strings substituted when the endpoint gives nothing better.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureMessages {
    pub transport: String,
    pub protocol: String,
}

impl Default for FailureMessages {
    fn default() -> Self {
        Self {
            transport: DEFAULT_TRANSPORT_ERROR_TEXT.to_string(),
            protocol: DEFAULT_PROTOCOL_ERROR_TEXT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// No HTTP response arrived: unreachable host, timeout, broken body.
    Transport,
    /// A response arrived but was non-2xx or did not carry a reply.
    Protocol,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: FailureKind,
    /// Text shown to the user in place of the reply.
    pub reason: String,
}

/// Result of one turn's request. Every outcome is a value; nothing escapes as
/// an error or a panic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    Reply(String),
    Failure(Failure),
}

/// Turns a transcript into one endpoint request and interprets the answer.
pub struct ResponseCoordinator {
    transport: Arc<dyn CompletionTransport>,
    failure_messages: FailureMessages,
}

impl ResponseCoordinator {
    pub fn new(transport: Arc<dyn CompletionTransport>) -> Self {
        Self {
            transport,
            failure_messages: FailureMessages::default(),
        }
    }

    pub fn with_failure_messages(mut self, failure_messages: FailureMessages) -> Self {
        self.failure_messages = failure_messages;
        self
    }

    /// Builds the outgoing body from final conversation messages only.
    pub fn build_request(history: &[Message]) -> ProviderResult<ChatRequest> {
        let request = ChatRequest::from_history(history);
        ensure!(
            !request.is_empty(),
            EmptyMessageSetSnafu {
                stage: "build-request",
            }
        );
        Ok(request)
    }

    /// Sends `history` and waits for exactly one outcome. Never retries.
    pub async fn request(&self, history: &[Message]) -> CompletionOutcome {
        let request = match Self::build_request(history) {
            Ok(request) => request,
            Err(error) => {
                tracing::warn!(error = %error, "refusing to send chat request");
                return self.protocol_failure(None);
            }
        };

        match self.transport.exchange(&request).await {
            Ok(raw) => self.interpret(raw),
            Err(error) => {
                tracing::warn!(
                    transport = %self.transport.id(),
                    endpoint = %self.transport.endpoint(),
                    error = %error,
                    "chat request failed before a response arrived"
                );
                if error.is_transport() {
                    self.transport_failure()
                } else {
                    self.protocol_failure(None)
                }
            }
        }
    }

    /// Maps a raw endpoint response onto an outcome.
    pub fn interpret(&self, raw: RawResponse) -> CompletionOutcome {
        if !raw.is_success() {
            let server_message =
                ErrorPayload::parse(&raw.body).and_then(|payload| payload.server_message());
            tracing::warn!(
                status = raw.status,
                server_message = ?server_message,
                "chat endpoint returned an error status"
            );
            return self.protocol_failure(server_message);
        }

        let response = match serde_json::from_str::<ChatResponse>(&raw.body) {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(error = %error, "chat endpoint returned a malformed body");
                return self.protocol_failure(None);
            }
        };

        match response.first_text().map(str::trim) {
            Some(text) if !text.is_empty() => CompletionOutcome::Reply(text.to_string()),
            Some(_) => {
                tracing::warn!("chat endpoint returned a blank reply");
                self.protocol_failure(None)
            }
            None => {
                tracing::warn!("chat endpoint response has no candidate text");
                self.protocol_failure(None)
            }
        }
    }

    fn transport_failure(&self) -> CompletionOutcome {
        CompletionOutcome::Failure(Failure {
            kind: FailureKind::Transport,
            reason: self.failure_messages.transport.clone(),
        })
    }

    fn protocol_failure(&self, server_message: Option<String>) -> CompletionOutcome {
        CompletionOutcome::Failure(Failure {
            kind: FailureKind::Protocol,
            reason: server_message.unwrap_or_else(|| self.failure_messages.protocol.clone()),
        })
    }
}
