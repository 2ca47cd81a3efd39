//! JSON shapes exchanged with the completion endpoint.

use chatdock_core::{Message, Role};
use serde::{Deserialize, Serialize};

/// Request body: `{ "contents": [ { "role", "parts": [{ "text" }] } ] }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub contents: Vec<ChatContent>,
}

impl ChatRequest {
    /// Builds the request body from a transcript.
    ///
    /// Pending placeholders and the synthetic greeting are left out.
    pub fn from_history(history: &[Message]) -> Self {
        Self {
            contents: history
                .iter()
                .filter(|message| message.is_sendable())
                .map(ChatContent::from)
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatContent {
    pub role: WireRole,
    pub parts: Vec<ChatPart>,
}

impl From<&Message> for ChatContent {
    fn from(message: &Message) -> Self {
        Self {
            role: WireRole::from(message.role),
            parts: vec![ChatPart {
                text: message.text.clone(),
            }],
        }
    }
}

/// Endpoint-side speaker names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireRole {
    User,
    Model,
}

impl From<Role> for WireRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => Self::User,
            Role::Assistant => Self::Model,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPart {
    pub text: String,
}

/// Success body. Every level is optional so a partial payload parses and is
/// then rejected by [`ChatResponse::first_text`] instead of by serde.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub candidates: Vec<ChatCandidate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatCandidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CandidatePart {
    #[serde(default)]
    pub text: Option<String>,
}

impl ChatResponse {
    /// Returns `candidates[0].content.parts[0].text` when present.
    pub fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .text
            .as_deref()
    }
}

/// Paths checked, in order, for a server-provided failure message.
const ERROR_MESSAGE_POINTERS: [&str; 3] = ["/error/message", "/message", "/detail"];

/// Failure body. Servers report the message as `error.message`, a top-level
/// `message`, or a FastAPI-style `detail` string. The body is kept untyped so
/// a field of an unexpected shape does not hide the others.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorPayload(serde_json::Value);

impl ErrorPayload {
    pub fn parse(body: &str) -> Option<Self> {
        serde_json::from_str(body).ok().map(Self)
    }

    /// Returns the first non-blank string message, trimmed.
    pub fn server_message(&self) -> Option<String> {
        ERROR_MESSAGE_POINTERS
            .iter()
            .filter_map(|pointer| self.0.pointer(pointer).and_then(serde_json::Value::as_str))
            .map(str::trim)
            .find(|message| !message.is_empty())
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatdock_core::{MessageId, PlaceholderId};

    #[test]
    fn history_maps_roles_and_skips_pending_and_greeting() {
        let history = vec![
            Message::greeting(MessageId::new(1), "Hello! How can I help?"),
            Message::user(MessageId::new(2), "hello"),
            Message::assistant(MessageId::new(3), "hi there"),
            Message::user(MessageId::new(4), "what is a contract?"),
            Message::assistant_pending(MessageId::new(5), PlaceholderId::new(2)),
        ];

        let request = ChatRequest::from_history(&history);

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "contents": [
                    { "role": "user", "parts": [{ "text": "hello" }] },
                    { "role": "model", "parts": [{ "text": "hi there" }] },
                    { "role": "user", "parts": [{ "text": "what is a contract?" }] },
                ]
            })
        );
    }

    #[test]
    fn first_text_walks_the_candidate_path() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"  answer \n"}]}}]}"#,
        )
        .unwrap();

        assert_eq!(response.first_text(), Some("  answer \n"));
    }

    #[test]
    fn first_text_is_none_for_partial_payloads() {
        for body in [
            r#"{}"#,
            r#"{"candidates":[]}"#,
            r#"{"candidates":[{}]}"#,
            r#"{"candidates":[{"content":{"parts":[]}}]}"#,
            r#"{"candidates":[{"content":{"parts":[{}]}}]}"#,
        ] {
            let response: ChatResponse = serde_json::from_str(body).unwrap();
            assert_eq!(response.first_text(), None, "body: {body}");
        }
    }

    fn server_message_of(body: &str) -> Option<String> {
        ErrorPayload::parse(body).and_then(|payload| payload.server_message())
    }

    #[test]
    fn server_message_prefers_nested_error() {
        assert_eq!(
            server_message_of(r#"{"error":{"message":"quota exceeded"},"message":"outer"}"#)
                .as_deref(),
            Some("quota exceeded")
        );
        assert_eq!(
            server_message_of(r#"{"message":"bad request"}"#).as_deref(),
            Some("bad request")
        );
        assert_eq!(
            server_message_of(r#"{"detail":"backend exploded"}"#).as_deref(),
            Some("backend exploded")
        );
    }

    #[test]
    fn server_message_survives_fields_of_unexpected_type() {
        assert_eq!(
            server_message_of(r#"{"error":"RESOURCE_EXHAUSTED","message":"quota exceeded"}"#)
                .as_deref(),
            Some("quota exceeded")
        );
        assert_eq!(
            server_message_of(r#"{"message":503,"detail":"backend down"}"#).as_deref(),
            Some("backend down")
        );
        assert_eq!(
            server_message_of(r#"{"status":"error","message":"model offline","error":true}"#)
                .as_deref(),
            Some("model offline")
        );
    }

    #[test]
    fn server_message_ignores_blank_and_structured_detail() {
        assert_eq!(
            server_message_of(
                r#"{"error":{"message":"  "},"detail":[{"loc":["body"],"msg":"field required"}]}"#
            ),
            None
        );
        assert_eq!(server_message_of("upstream timeout"), None);
        assert_eq!(server_message_of(r#"["not", "an", "object"]"#), None);
    }
}
