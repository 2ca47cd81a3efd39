use crate::message::PlaceholderId;

/// Lifecycle of the current user turn.
///
/// `Idle`, `Resolved` and `Failed` all accept new input. Only `InFlight` holds a
/// request open, and there is never more than one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TurnState {
    #[default]
    Idle,
    InFlight(PlaceholderId),
    Resolved(PlaceholderId),
    Failed {
        placeholder: PlaceholderId,
        reason: String,
    },
}

/// State transition input for the turn lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnTransition {
    Start(PlaceholderId),
    Complete(PlaceholderId),
    Fail {
        placeholder: PlaceholderId,
        reason: String,
    },
    /// The owner walked away from the conversation. Any in-flight result is
    /// stale from here on.
    Abandon,
}

/// Rejection reason for illegal turn transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnRejection {
    AlreadyInFlight {
        active: PlaceholderId,
        attempted: PlaceholderId,
    },
    NoActiveTurn,
    PlaceholderMismatch {
        active: PlaceholderId,
        attempted: PlaceholderId,
    },
}

pub type TurnTransitionResult = Result<TurnState, TurnRejection>;

impl TurnState {
    /// Returns the in-flight placeholder if and only if state is `InFlight`.
    pub fn in_flight(&self) -> Option<PlaceholderId> {
        match self {
            Self::InFlight(placeholder) => Some(*placeholder),
            Self::Idle | Self::Resolved(_) | Self::Failed { .. } => None,
        }
    }

    /// Returns true when the user may start a new turn.
    pub fn accepts_input(&self) -> bool {
        self.in_flight().is_none()
    }

    /// Returns true when a completion for `placeholder` belongs to the live turn.
    pub fn accepts_completion(&self, placeholder: PlaceholderId) -> bool {
        matches!(self, Self::InFlight(active) if *active == placeholder)
    }

    /// Applies one transition deterministically.
    ///
    /// `Complete` and `Fail` must name the in-flight placeholder exactly.
    /// `Abandon` is accepted from every state.
    pub fn apply(&self, transition: TurnTransition) -> TurnTransitionResult {
        match transition {
            TurnTransition::Start(placeholder) => self.apply_start(placeholder),
            TurnTransition::Complete(placeholder) => {
                self.apply_terminal(placeholder, Self::Resolved(placeholder))
            }
            TurnTransition::Fail {
                placeholder,
                reason,
            } => self.apply_terminal(
                placeholder,
                Self::Failed {
                    placeholder,
                    reason,
                },
            ),
            TurnTransition::Abandon => Ok(Self::Idle),
        }
    }

    fn apply_start(&self, placeholder: PlaceholderId) -> TurnTransitionResult {
        match self {
            Self::InFlight(active) => Err(TurnRejection::AlreadyInFlight {
                active: *active,
                attempted: placeholder,
            }),
            Self::Idle | Self::Resolved(_) | Self::Failed { .. } => {
                Ok(Self::InFlight(placeholder))
            }
        }
    }

    fn apply_terminal(&self, placeholder: PlaceholderId, next: Self) -> TurnTransitionResult {
        match self {
            Self::InFlight(active) if *active == placeholder => Ok(next),
            Self::InFlight(active) => Err(TurnRejection::PlaceholderMismatch {
                active: *active,
                attempted: placeholder,
            }),
            Self::Idle | Self::Resolved(_) | Self::Failed { .. } => {
                Err(TurnRejection::NoActiveTurn)
            }
        }
    }
}
