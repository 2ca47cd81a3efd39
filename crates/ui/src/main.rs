use std::path::PathBuf;
use std::process::ExitCode;

use chatdock::{
    AppResult, SettingsStore, TranscriptRenderer, build_session, effective_settings, run,
    write_settings,
};
use clap::{Parser, Subcommand};
use tokio::io::BufReader;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Terminal chat client for a single `/chat` endpoint.
#[derive(Debug, Parser)]
#[command(name = "chatdock", version)]
struct Cli {
    /// Settings file to load instead of the per-user default.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Endpoint URL, overriding the settings file and environment.
    #[arg(long, value_name = "URL")]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write the effective settings to the settings file and exit.
    Init,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so they never interleave with the transcript.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(error = %error, "chatdock stopped");
            eprintln!("chatdock: {error}");
            ExitCode::FAILURE
        }
    }
}

async fn execute(cli: Cli) -> AppResult<()> {
    let config_path = cli
        .config
        .unwrap_or_else(SettingsStore::default_config_path);
    let store = SettingsStore::new(config_path);

    let settings = effective_settings(&store, cli.endpoint);

    if let Some(Command::Init) = cli.command {
        write_settings(&store, settings)?;
        println!("wrote {}", store.config_path().display());
        return Ok(());
    }

    let session = build_session(&settings)?;
    let renderer = TranscriptRenderer::from_settings(&settings);
    let input = BufReader::new(tokio::io::stdin());

    run(session, renderer, input, std::io::stdout()).await
}
