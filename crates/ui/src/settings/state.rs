use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use chatdock_llm::{
    DEFAULT_PROTOCOL_ERROR_TEXT, DEFAULT_TRANSPORT_ERROR_TEXT, FailureMessages, TransportConfig,
};
use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000/chat";
pub const DEFAULT_TITLE: &str = "Agent Chatbot";
pub const DEFAULT_GREETING: &str = "Hello! I'm Chat-bot. How can I help you today?";
pub const DEFAULT_PENDING_TEXT: &str = "Thinking...";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const SETTINGS_DIRECTORY_NAME: &str = "chatdock";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const ENV_PREFIX: &str = "CHATDOCK_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetSettings {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_title")]
    pub title: String,
    /// Seeded into every fresh transcript. Empty disables the greeting.
    #[serde(default = "default_greeting")]
    pub greeting: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_pending_text")]
    pub pending_text: String,
    #[serde(default = "default_transport_error_text")]
    pub transport_error_text: String,
    #[serde(default = "default_protocol_error_text")]
    pub protocol_error_text: String,
}

impl Default for WidgetSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            title: default_title(),
            greeting: default_greeting(),
            request_timeout_secs: default_request_timeout_secs(),
            pending_text: default_pending_text(),
            transport_error_text: default_transport_error_text(),
            protocol_error_text: default_protocol_error_text(),
        }
    }
}

impl WidgetSettings {
    /// Layers defaults, the JSON file at `path` (if any), then `CHATDOCK_*`
    /// environment variables.
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(WidgetSettings::default()))
            .merge(Json::file(path))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn extract(path: &Path) -> Result<Self, figment::Error> {
        Self::figment(path)
            .extract::<WidgetSettings>()
            .map(WidgetSettings::normalized)
    }

    pub fn normalized(mut self) -> Self {
        self.endpoint = non_blank_or(self.endpoint, default_endpoint);
        self.title = non_blank_or(self.title, default_title);
        self.greeting = self.greeting.trim().to_string();
        self.pending_text = non_blank_or(self.pending_text, default_pending_text);
        self.transport_error_text =
            non_blank_or(self.transport_error_text, default_transport_error_text);
        self.protocol_error_text =
            non_blank_or(self.protocol_error_text, default_protocol_error_text);
        if self.request_timeout_secs == 0 {
            self.request_timeout_secs = default_request_timeout_secs();
        }

        self
    }

    pub fn greeting(&self) -> Option<&str> {
        if self.greeting.is_empty() {
            None
        } else {
            Some(&self.greeting)
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig::new(&self.endpoint, self.request_timeout())
    }

    pub fn failure_messages(&self) -> FailureMessages {
        FailureMessages {
            transport: self.transport_error_text.clone(),
            protocol: self.protocol_error_text.clone(),
        }
    }
}

pub struct SettingsStore {
    settings: Arc<ArcSwap<WidgetSettings>>,
    config_path: PathBuf,
}

impl SettingsStore {
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".chatdock"))
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(SETTINGS_FILE_NAME)
    }

    pub fn new(config_path: PathBuf) -> Self {
        let settings = Self::load_from_disk(&config_path);
        Self {
            settings: Arc::new(ArcSwap::from_pointee(settings)),
            config_path,
        }
    }

    pub fn settings(&self) -> Arc<WidgetSettings> {
        self.settings.load_full()
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn update(&self, settings: WidgetSettings) -> Result<(), SettingsError> {
        let normalized_settings = settings.normalized();
        self.persist(&normalized_settings)?;
        self.settings.store(Arc::new(normalized_settings));
        Ok(())
    }

    fn load_from_disk(path: &Path) -> WidgetSettings {
        if !path.exists() {
            tracing::info!("settings file not found at {:?}, using defaults", path);
        }

        match WidgetSettings::extract(path) {
            Ok(settings) => settings,
            Err(error) => {
                tracing::warn!(
                    "failed to parse settings from {:?}: {}. using defaults",
                    path,
                    error
                );
                WidgetSettings::default()
            }
        }
    }

    fn persist(&self, settings: &WidgetSettings) -> Result<(), SettingsError> {
        if let Some(parent) = self.config_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).context(CreateDirSnafu {
                stage: "create-settings-directory",
                path: parent.to_path_buf(),
            })?;
        }

        let content = serde_json::to_string_pretty(settings).context(SerializeConfigSnafu {
            stage: "serialize-settings-json",
        })?;

        let temp_path = self.config_path.with_extension("json.tmp");
        std::fs::write(&temp_path, content).context(WriteFileSnafu {
            stage: "write-temporary-settings-file",
            path: temp_path.clone(),
        })?;

        std::fs::rename(&temp_path, &self.config_path).context(RenameTempFileSnafu {
            stage: "rename-temporary-settings-file",
            from: temp_path,
            to: self.config_path.clone(),
        })?;

        tracing::info!("saved settings to {:?}", self.config_path);
        Ok(())
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SettingsError {
    #[snafu(display("failed to create settings directory at {path:?} on `{stage}`: {source}"))]
    CreateDir {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("failed to serialize settings on `{stage}`: {source}"))]
    SerializeConfig {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("failed to write settings file at {path:?} on `{stage}`: {source}"))]
    WriteFile {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display(
        "failed to replace settings file from {from:?} to {to:?} on `{stage}`: {source}"
    ))]
    RenameTempFile {
        stage: &'static str,
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

fn non_blank_or(value: String, fallback: fn() -> String) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback()
    } else {
        trimmed.to_string()
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

fn default_greeting() -> String {
    DEFAULT_GREETING.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_pending_text() -> String {
    DEFAULT_PENDING_TEXT.to_string()
}

fn default_transport_error_text() -> String {
    DEFAULT_TRANSPORT_ERROR_TEXT.to_string()
}

fn default_protocol_error_text() -> String {
    DEFAULT_PROTOCOL_ERROR_TEXT.to_string()
}
