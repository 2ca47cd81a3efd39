#![deny(unsafe_code)]

/// Terminal driver: input commands, session wiring and the event loop.
pub mod app;
/// Line-oriented transcript output.
pub mod render;
/// Chat session orchestration between the transcript and the endpoint.
pub mod session;
/// Settings layering and persistence.
pub mod settings;

pub use app::{
    AppError, AppResult, InputCommand, build_session, effective_settings, parse_input, run,
    write_settings,
};
pub use render::TranscriptRenderer;
pub use session::{
    ChatSession, CompletionDisposition, PendingTurn, SubmitRejection, TranscriptSnapshot,
    TurnCompleted,
};
pub use settings::{SettingsError, SettingsStore, WidgetSettings};
