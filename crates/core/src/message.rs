use std::fmt;

/// Stable identifier for one message in a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub u64);

impl MessageId {
    /// Creates a typed message identifier.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Identifier for one pending assistant placeholder.
///
/// A new value is minted for every turn so a late resolution can never land on a
/// newer placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlaceholderId(pub u64);

impl PlaceholderId {
    /// Creates a typed placeholder identifier.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for PlaceholderId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "p{}", self.0)
    }
}

/// Chat speaker role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Assistant,
}

/// Lifecycle status for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStatus {
    Final,
    Pending(PlaceholderId),
}

impl MessageStatus {
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Final)
    }

    pub fn placeholder(&self) -> Option<PlaceholderId> {
        match self {
            Self::Pending(id) => Some(*id),
            Self::Final => None,
        }
    }
}

/// Where a message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageOrigin {
    /// Synthetic welcome text seeded into a fresh transcript. Never sent upstream.
    Greeting,
    Conversation,
}

/// Core immutable message model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub text: String,
    pub status: MessageStatus,
    pub origin: MessageOrigin,
}

impl Message {
    /// Creates a final user message.
    pub fn user(id: MessageId, text: impl Into<String>) -> Self {
        Self {
            id,
            role: Role::User,
            text: text.into(),
            status: MessageStatus::Final,
            origin: MessageOrigin::Conversation,
        }
    }

    /// Creates a final assistant message.
    pub fn assistant(id: MessageId, text: impl Into<String>) -> Self {
        Self {
            id,
            role: Role::Assistant,
            text: text.into(),
            status: MessageStatus::Final,
            origin: MessageOrigin::Conversation,
        }
    }

    /// Creates an empty assistant placeholder awaiting a reply.
    pub fn assistant_pending(id: MessageId, placeholder: PlaceholderId) -> Self {
        Self {
            id,
            role: Role::Assistant,
            text: String::new(),
            status: MessageStatus::Pending(placeholder),
            origin: MessageOrigin::Conversation,
        }
    }

    /// Creates the synthetic greeting shown at the top of a fresh transcript.
    pub fn greeting(id: MessageId, text: impl Into<String>) -> Self {
        Self {
            id,
            role: Role::Assistant,
            text: text.into(),
            status: MessageStatus::Final,
            origin: MessageOrigin::Greeting,
        }
    }

    pub fn is_pending(&self) -> bool {
        !self.status.is_final()
    }

    /// Returns true when this message belongs in the history sent upstream.
    pub fn is_sendable(&self) -> bool {
        self.status.is_final() && self.origin == MessageOrigin::Conversation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_placeholder_is_not_sendable() {
        let pending = Message::assistant_pending(MessageId::new(2), PlaceholderId::new(1));

        assert!(pending.is_pending());
        assert!(!pending.is_sendable());
        assert_eq!(pending.status.placeholder(), Some(PlaceholderId::new(1)));
    }

    #[test]
    fn greeting_is_final_but_never_sent() {
        let greeting = Message::greeting(MessageId::new(1), "Hello!");

        assert!(greeting.status.is_final());
        assert_eq!(greeting.role, Role::Assistant);
        assert!(!greeting.is_sendable());
    }

    #[test]
    fn conversation_messages_are_sendable() {
        assert!(Message::user(MessageId::new(1), "hi").is_sendable());
        assert!(Message::assistant(MessageId::new(2), "hello").is_sendable());
    }
}
