use crate::error::{PendingAlreadyExistsSnafu, StoreResult};
use crate::message::{Message, MessageId, MessageStatus, PlaceholderId};

/// Outcome of resolving a placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The placeholder was replaced in place by a final message with this id.
    Replaced(MessageId),
    /// No pending message carried the placeholder id; nothing changed.
    Stale,
}

/// Owner of the transcript for one chat session.
///
/// All mutation goes through this type. The transcript only ever grows, except
/// that a pending assistant placeholder may be swapped for its final resolution
/// at the same position. At most one placeholder exists at a time.
#[derive(Debug, Clone)]
pub struct ConversationStore {
    messages: Vec<Message>,
    greeting: Option<String>,
    next_message_id: u64,
    next_placeholder_id: u64,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationStore {
    /// Creates an empty transcript.
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            greeting: None,
            next_message_id: 1,
            next_placeholder_id: 1,
        }
    }

    /// Creates a transcript seeded with a synthetic greeting.
    ///
    /// Blank greetings are treated as no greeting at all.
    pub fn with_greeting(greeting: impl Into<String>) -> Self {
        let greeting = greeting.into();
        let mut store = Self::new();
        if !greeting.trim().is_empty() {
            store.greeting = Some(greeting);
        }
        store.seed_greeting();
        store
    }

    /// Appends a user message holding the trimmed text.
    ///
    /// Blank input is ignored and returns `None`.
    pub fn append_user(&mut self, text: &str) -> Option<MessageId> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let id = self.mint_message_id();
        self.messages.push(Message::user(id, text));
        Some(id)
    }

    /// Appends a pending assistant placeholder at the end of the transcript.
    pub fn append_pending(&mut self) -> StoreResult<PlaceholderId> {
        if let Some(active) = self.pending() {
            return PendingAlreadyExistsSnafu {
                stage: "append-pending",
                active,
            }
            .fail();
        }

        let placeholder = PlaceholderId::new(self.next_placeholder_id);
        self.next_placeholder_id = self.next_placeholder_id.saturating_add(1);

        let id = self.mint_message_id();
        self.messages.push(Message::assistant_pending(id, placeholder));
        Ok(placeholder)
    }

    /// Replaces the placeholder with the assistant reply.
    pub fn resolve_pending(&mut self, id: PlaceholderId, text: impl Into<String>) -> Resolution {
        self.replace_placeholder(id, text.into())
    }

    /// Replaces the placeholder with a user-facing error string.
    pub fn resolve_error(&mut self, id: PlaceholderId, message: impl Into<String>) -> Resolution {
        self.replace_placeholder(id, message.into())
    }

    /// Read-only ordered view for rendering.
    pub fn snapshot(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the active placeholder, if any.
    pub fn pending(&self) -> Option<PlaceholderId> {
        self.messages
            .iter()
            .rev()
            .find_map(|message| message.status.placeholder())
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Starts a fresh transcript, re-seeding the greeting.
    ///
    /// Id counters keep counting so placeholders from the previous transcript
    /// can never match a new one.
    pub fn restart(&mut self) {
        self.messages.clear();
        self.seed_greeting();
    }

    fn replace_placeholder(&mut self, placeholder: PlaceholderId, text: String) -> Resolution {
        let Some(message) = self
            .messages
            .iter_mut()
            .find(|message| message.status == MessageStatus::Pending(placeholder))
        else {
            tracing::debug!("dropping resolution for unknown placeholder {placeholder}");
            return Resolution::Stale;
        };

        let resolved = Message::assistant(message.id, text);
        *message = resolved;
        Resolution::Replaced(message.id)
    }

    fn seed_greeting(&mut self) {
        let Some(greeting) = self.greeting.clone() else {
            return;
        };
        let id = self.mint_message_id();
        self.messages.push(Message::greeting(id, greeting));
    }

    fn mint_message_id(&mut self) -> MessageId {
        let id = MessageId::new(self.next_message_id);
        self.next_message_id = self.next_message_id.saturating_add(1);
        id
    }
}

/// Checks the single-pending invariant over a snapshot.
pub fn pending_count(messages: &[Message]) -> usize {
    messages.iter().filter(|message| message.is_pending()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{MessageOrigin, Role};
    use proptest::prelude::*;

    #[test]
    fn hello_turn_resolves_in_place() {
        let mut store = ConversationStore::new();

        store.append_user("hello");
        let p1 = store.append_pending().unwrap();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].role, Role::User);
        assert_eq!(snapshot[0].text, "hello");
        assert_eq!(snapshot[1].status, MessageStatus::Pending(p1));

        let placeholder_message_id = snapshot[1].id;
        let resolution = store.resolve_pending(p1, "hi there");

        assert_eq!(resolution, Resolution::Replaced(placeholder_message_id));
        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[1].role, Role::Assistant);
        assert_eq!(snapshot[1].status, MessageStatus::Final);
        assert_eq!(snapshot[1].text, "hi there");
    }

    #[test]
    fn error_resolution_becomes_final_assistant_message() {
        let mut store = ConversationStore::new();

        store.append_user("a");
        let p1 = store.append_pending().unwrap();
        store.resolve_error(p1, "network error");

        let last = store.snapshot().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.status, MessageStatus::Final);
        assert_eq!(last.text, "network error");
        assert_eq!(store.pending(), None);
    }

    #[test]
    fn blank_input_leaves_transcript_unchanged() {
        let mut store = ConversationStore::with_greeting("Hello!");
        let before = store.snapshot().to_vec();

        assert_eq!(store.append_user(""), None);
        assert_eq!(store.append_user("   "), None);
        assert_eq!(store.append_user("\n\t"), None);

        assert_eq!(store.snapshot(), before.as_slice());
    }

    #[test]
    fn user_text_is_trimmed() {
        let mut store = ConversationStore::new();
        store.append_user("  what is a tort?  ");

        assert_eq!(store.snapshot()[0].text, "what is a tort?");
    }

    #[test]
    fn second_placeholder_is_rejected_without_mutation() {
        let mut store = ConversationStore::new();
        store.append_user("first");
        let p1 = store.append_pending().unwrap();
        let before = store.snapshot().to_vec();

        let error = store.append_pending().unwrap_err();

        assert!(matches!(
            error,
            crate::StoreError::PendingAlreadyExists { active, .. } if active == p1
        ));
        assert_eq!(store.snapshot(), before.as_slice());
    }

    #[test]
    fn stale_resolution_is_dropped() {
        let mut store = ConversationStore::new();
        store.append_user("a");
        let p1 = store.append_pending().unwrap();
        store.resolve_pending(p1, "first answer");
        let before = store.snapshot().to_vec();

        assert_eq!(store.resolve_pending(p1, "late duplicate"), Resolution::Stale);
        assert_eq!(
            store.resolve_error(PlaceholderId::new(99), "unknown"),
            Resolution::Stale
        );
        assert_eq!(store.snapshot(), before.as_slice());
    }

    #[test]
    fn old_placeholder_cannot_resolve_newer_turn() {
        let mut store = ConversationStore::new();
        store.append_user("a");
        let p1 = store.append_pending().unwrap();
        store.resolve_error(p1, "failed");

        store.append_user("b");
        let p2 = store.append_pending().unwrap();
        assert_ne!(p1, p2);

        assert_eq!(store.resolve_pending(p1, "stale"), Resolution::Stale);
        assert_eq!(store.pending(), Some(p2));
    }

    #[test]
    fn restart_reseeds_greeting_and_keeps_counters() {
        let mut store = ConversationStore::with_greeting("Hello!");
        store.append_user("a");
        let p1 = store.append_pending().unwrap();

        store.restart();

        assert_eq!(store.len(), 1);
        assert_eq!(store.snapshot()[0].origin, MessageOrigin::Greeting);
        assert_eq!(store.resolve_pending(p1, "late"), Resolution::Stale);

        store.append_user("b");
        let p2 = store.append_pending().unwrap();
        assert!(p2 > p1);
    }

    #[test]
    fn blank_greeting_is_not_seeded() {
        let store = ConversationStore::with_greeting("  ");
        assert!(store.is_empty());
    }

    #[derive(Debug, Clone)]
    enum Op {
        User(String),
        Pending,
        Resolve(u64),
        Fail(u64),
        Restart,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            "[ a-z]{0,6}".prop_map(Op::User),
            Just(Op::Pending),
            (1u64..8).prop_map(Op::Resolve),
            (1u64..8).prop_map(Op::Fail),
            Just(Op::Restart),
        ]
    }

    proptest! {
        #[test]
        fn never_more_than_one_pending(ops in prop::collection::vec(op_strategy(), 0..64)) {
            let mut store = ConversationStore::with_greeting("Hello!");

            for op in ops {
                let before = store.snapshot().to_vec();
                let restarted = matches!(op, Op::Restart);

                match op {
                    Op::User(text) => {
                        store.append_user(&text);
                    }
                    Op::Pending => {
                        let _ = store.append_pending();
                    }
                    Op::Resolve(raw) => {
                        store.resolve_pending(PlaceholderId::new(raw), "reply");
                    }
                    Op::Fail(raw) => {
                        store.resolve_error(PlaceholderId::new(raw), "error");
                    }
                    Op::Restart => store.restart(),
                }

                let after = store.snapshot();
                prop_assert!(pending_count(after) <= 1);

                if !restarted {
                    // Existing rows keep their ids and order.
                    prop_assert!(after.len() >= before.len());
                    for (old, new) in before.iter().zip(after.iter()) {
                        prop_assert_eq!(old.id, new.id);
                        if old.status.is_final() {
                            prop_assert_eq!(old, new);
                        }
                    }
                }
            }
        }
    }
}
