use std::io::Write;
use std::ops::ControlFlow;
use std::sync::Arc;

use chatdock_core::ConversationStore;
use chatdock_llm::{ProviderError, ResponseCoordinator, create_transport};
use snafu::{ResultExt, Snafu};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;

use crate::render::TranscriptRenderer;
use crate::session::{ChatSession, SubmitRejection, TurnCompleted};
use crate::settings::{SettingsError, SettingsStore, WidgetSettings};

pub const QUIT_COMMANDS: [&str; 2] = ["/quit", "q"];
pub const NEW_CONVERSATION_COMMAND: &str = "/new";
const IN_FLIGHT_NOTICE: &str = "(still waiting on the previous reply)";

/// One line of terminal input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputCommand<'a> {
    Submit(&'a str),
    NewConversation,
    Quit,
}

pub fn parse_input(line: &str) -> InputCommand<'_> {
    let trimmed = line.trim();
    if QUIT_COMMANDS.contains(&trimmed) {
        InputCommand::Quit
    } else if trimmed == NEW_CONVERSATION_COMMAND {
        InputCommand::NewConversation
    } else {
        InputCommand::Submit(line)
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum AppError {
    #[snafu(display("failed to read input on `{stage}`: {source}"))]
    ReadInput {
        stage: &'static str,
        source: std::io::Error,
    },
    #[snafu(display("failed to write output on `{stage}`: {source}"))]
    WriteOutput {
        stage: &'static str,
        source: std::io::Error,
    },
    #[snafu(display("transport setup failed on `{stage}`: {source}"))]
    Provider {
        stage: &'static str,
        source: ProviderError,
    },
    #[snafu(display("settings failed on `{stage}`: {source}"))]
    Settings {
        stage: &'static str,
        source: SettingsError,
    },
}

pub type AppResult<T> = Result<T, AppError>;

/// Wires the HTTP transport, failure texts and greeting into a fresh session.
pub fn build_session(settings: &WidgetSettings) -> AppResult<ChatSession> {
    let transport = create_transport(settings.transport_config()).context(ProviderSnafu {
        stage: "create-http-transport",
    })?;
    tracing::debug!(
        endpoint = transport.endpoint(),
        transport = transport.id(),
        "transport ready"
    );

    let coordinator =
        ResponseCoordinator::new(transport).with_failure_messages(settings.failure_messages());
    let store = match settings.greeting() {
        Some(greeting) => ConversationStore::with_greeting(greeting),
        None => ConversationStore::new(),
    };

    Ok(ChatSession::new(Arc::new(coordinator), store))
}

/// Loaded settings with command-line overrides applied on top.
pub fn effective_settings(store: &SettingsStore, endpoint: Option<String>) -> WidgetSettings {
    let mut settings = store.settings().as_ref().clone();
    if let Some(endpoint) = endpoint {
        settings.endpoint = endpoint;
    }
    settings.normalized()
}

/// Writes `settings` to the store's file, creating it if needed.
pub fn write_settings(store: &SettingsStore, settings: WidgetSettings) -> AppResult<()> {
    store.update(settings).context(SettingsSnafu {
        stage: "write-settings-file",
    })
}

/// Drives one session from line input until quit or end of input.
///
/// At end of input the loop keeps running until the in-flight turn, if any,
/// has been applied.
pub async fn run<R, W>(
    mut session: ChatSession,
    mut renderer: TranscriptRenderer,
    input: R,
    mut output: W,
) -> AppResult<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    let mut snapshots = session.subscribe();
    let (completed_tx, mut completed_rx) = mpsc::unbounded_channel::<TurnCompleted>();
    let mut input_open = true;

    renderer.header(&mut output).context(WriteOutputSnafu {
        stage: "write-header",
    })?;
    let initial = snapshots.borrow_and_update().clone();
    renderer.render(&initial, &mut output).context(WriteOutputSnafu {
        stage: "render-initial-transcript",
    })?;

    loop {
        tokio::select! {
            biased;

            Some(completed) = completed_rx.recv() => {
                let disposition = session.complete(completed);
                tracing::debug!(?disposition, "turn completion handled");
            }
            line = lines.next_line(), if input_open => {
                match line.context(ReadInputSnafu { stage: "read-input-line" })? {
                    Some(line) => {
                        let flow = handle_line(&mut session, &line, &completed_tx, &mut output)?;
                        if flow.is_break() {
                            break;
                        }
                    }
                    None => input_open = false,
                }
            }
            else => break,
        }

        if snapshots.has_changed().unwrap_or(false) {
            let snapshot = snapshots.borrow_and_update().clone();
            renderer.render(&snapshot, &mut output).context(WriteOutputSnafu {
                stage: "render-transcript",
            })?;
        }

        if !input_open && session.turn_state().in_flight().is_none() {
            break;
        }
    }

    Ok(())
}

fn handle_line(
    session: &mut ChatSession,
    line: &str,
    completed_tx: &mpsc::UnboundedSender<TurnCompleted>,
    output: &mut impl Write,
) -> AppResult<ControlFlow<()>> {
    match parse_input(line) {
        InputCommand::Quit => return Ok(ControlFlow::Break(())),
        InputCommand::NewConversation => session.start_new_conversation(),
        InputCommand::Submit(text) => match session.submit(text) {
            Ok(turn) => {
                let completed_tx = completed_tx.clone();
                tokio::spawn(async move {
                    let completed = turn.resolve().await;
                    if completed_tx.send(completed).is_err() {
                        tracing::debug!("session closed before turn completed");
                    }
                });
            }
            Err(SubmitRejection::Blank) => {}
            Err(SubmitRejection::TurnInFlight { .. }) => {
                writeln!(output, "{IN_FLIGHT_NOTICE}").context(WriteOutputSnafu {
                    stage: "write-in-flight-notice",
                })?;
            }
        },
    }

    Ok(ControlFlow::Continue(()))
}
