use std::sync::Arc;

use chatdock_core::{
    ConversationStore, Message, PlaceholderId, Resolution, StoreError, TurnState, TurnTransition,
};
use chatdock_llm::{CompletionOutcome, ResponseCoordinator};
use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::watch;

/// Immutable copy of the transcript handed to the render boundary.
pub type TranscriptSnapshot = Arc<[Message]>;

/// Why a submission did not start a turn. Neither case mutates the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRejection {
    /// Input was empty after trimming.
    Blank,
    /// Another turn is still waiting on its reply.
    TurnInFlight { active: PlaceholderId },
}

/// Result of one turn's request, routed back to the session that started it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnCompleted {
    pub placeholder: PlaceholderId,
    pub outcome: CompletionOutcome,
}

/// What [`ChatSession::complete`] did with a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionDisposition {
    Applied(Resolution),
    /// The turn was abandoned or superseded; nothing changed.
    Stale,
}

/// A turn whose placeholder is already visible and whose request has not been
/// sent yet. Nothing goes over the wire until the future is polled.
pub struct PendingTurn {
    placeholder: PlaceholderId,
    request: BoxFuture<'static, TurnCompleted>,
}

impl PendingTurn {
    pub fn placeholder(&self) -> PlaceholderId {
        self.placeholder
    }

    /// Sends the request and waits for its outcome.
    pub async fn resolve(self) -> TurnCompleted {
        self.request.await
    }
}

/// Owns one chat session: the transcript, the turn lifecycle, and the feed of
/// snapshots for whoever renders it.
///
/// The session lives on a single event loop. Requests run detached as
/// [`PendingTurn`] futures and report back through [`ChatSession::complete`].
pub struct ChatSession {
    store: ConversationStore,
    turn: TurnState,
    coordinator: Arc<ResponseCoordinator>,
    snapshot_tx: watch::Sender<TranscriptSnapshot>,
}

impl ChatSession {
    pub fn new(coordinator: Arc<ResponseCoordinator>, store: ConversationStore) -> Self {
        let (snapshot_tx, _) = watch::channel(TranscriptSnapshot::from(store.snapshot()));
        Self {
            store,
            turn: TurnState::Idle,
            coordinator,
            snapshot_tx,
        }
    }

    /// Subscribes to transcript snapshots. A new value is published after
    /// every mutation.
    pub fn subscribe(&self) -> watch::Receiver<TranscriptSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn snapshot(&self) -> &[Message] {
        self.store.snapshot()
    }

    pub fn turn_state(&self) -> &TurnState {
        &self.turn
    }

    /// Starts a turn: appends the user message and the pending placeholder,
    /// publishes the snapshot, then hands back the unsent request.
    pub fn submit(&mut self, text: &str) -> Result<PendingTurn, SubmitRejection> {
        if text.trim().is_empty() {
            return Err(SubmitRejection::Blank);
        }

        if let Some(active) = self.turn.in_flight().or(self.store.pending()) {
            tracing::debug!("rejecting submission while {active} is in flight");
            return Err(SubmitRejection::TurnInFlight { active });
        }

        if self.store.append_user(text).is_none() {
            return Err(SubmitRejection::Blank);
        }

        let placeholder = match self.store.append_pending() {
            Ok(placeholder) => placeholder,
            Err(StoreError::PendingAlreadyExists { active, .. }) => {
                tracing::error!("placeholder {active} was pending without an in-flight turn");
                self.publish();
                return Err(SubmitRejection::TurnInFlight { active });
            }
        };

        match self.turn.apply(TurnTransition::Start(placeholder)) {
            Ok(next) => self.turn = next,
            Err(rejection) => tracing::error!("turn start rejected: {rejection:?}"),
        }

        self.publish();
        tracing::debug!("turn {placeholder} started");

        // History is captured after the placeholder is visible. The coordinator
        // filters the placeholder itself out of the request body.
        let history = self.store.snapshot().to_vec();
        let coordinator = Arc::clone(&self.coordinator);
        let request = async move {
            let outcome = coordinator.request(&history).await;
            TurnCompleted {
                placeholder,
                outcome,
            }
        }
        .boxed();

        Ok(PendingTurn {
            placeholder,
            request,
        })
    }

    /// Applies a finished request to the transcript, or drops it if the turn
    /// is no longer live.
    pub fn complete(&mut self, completed: TurnCompleted) -> CompletionDisposition {
        let TurnCompleted {
            placeholder,
            outcome,
        } = completed;

        if !self.turn.accepts_completion(placeholder) {
            tracing::debug!("dropping stale completion for {placeholder}");
            return CompletionDisposition::Stale;
        }

        let (resolution, transition) = match outcome {
            CompletionOutcome::Reply(text) => (
                self.store.resolve_pending(placeholder, text),
                TurnTransition::Complete(placeholder),
            ),
            CompletionOutcome::Failure(failure) => {
                tracing::debug!("turn {placeholder} failed: {:?}", failure.kind);
                (
                    self.store.resolve_error(placeholder, failure.reason.clone()),
                    TurnTransition::Fail {
                        placeholder,
                        reason: failure.reason,
                    },
                )
            }
        };

        match self.turn.apply(transition) {
            Ok(next) => self.turn = next,
            Err(rejection) => tracing::error!("turn completion rejected: {rejection:?}"),
        }

        if resolution == Resolution::Stale {
            return CompletionDisposition::Stale;
        }

        self.publish();
        CompletionDisposition::Applied(resolution)
    }

    /// Abandons any in-flight turn and starts over with a fresh transcript.
    pub fn start_new_conversation(&mut self) {
        if let Some(active) = self.turn.in_flight() {
            tracing::debug!("abandoning turn {active}");
        }

        match self.turn.apply(TurnTransition::Abandon) {
            Ok(next) => self.turn = next,
            Err(rejection) => tracing::error!("turn abandon rejected: {rejection:?}"),
        }

        self.store.restart();
        self.publish();
    }

    fn publish(&self) {
        self.snapshot_tx
            .send_replace(TranscriptSnapshot::from(self.store.snapshot()));
    }
}
