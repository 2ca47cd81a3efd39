#![deny(unsafe_code)]

//! Conversation state for the chat widget.
//!
//! [`ConversationStore`] owns the transcript and its invariants; [`TurnState`]
//! tracks the single request allowed in flight.
pub mod error;
/// Domain entities for transcript rows.
pub mod message;
pub mod store;
/// Deterministic turn lifecycle boundaries.
pub mod turn;

pub use error::{StoreError, StoreResult};
pub use message::{Message, MessageId, MessageOrigin, MessageStatus, PlaceholderId, Role};
pub use store::{ConversationStore, Resolution, pending_count};
pub use turn::{TurnRejection, TurnState, TurnTransition, TurnTransitionResult};
