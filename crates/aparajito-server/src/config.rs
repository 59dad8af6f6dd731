use std::fs;
use std::time::Duration;

use anyhow::Result;
use aparajito_bridge::BridgeConfig;
use aparajito_models::layout::DEFAULT_PORTRAIT_HEIGHT_FRACTION;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub mpv: MpvSection,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Optional path to a directory containing the built web UI
    pub web_dir: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            web_dir: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Mpv,
    /// In-process engine with scripted media, for UI development.
    Simulated,
}

impl BackendKind {
    fn as_str(self) -> &'static str {
        match self {
            BackendKind::Mpv => "mpv",
            BackendKind::Simulated => "simulated",
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PlaybackConfig {
    #[serde(default)]
    pub backend: BackendKind,
    #[serde(default = "default_timeline_interval_ms")]
    pub timeline_interval_ms: u64,
    /// Share of the window height the player keeps in portrait mode.
    #[serde(default = "default_portrait_height_fraction")]
    pub portrait_height_fraction: f32,
    /// Notifications buffered per UI before a slow UI is disconnected.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            timeline_interval_ms: default_timeline_interval_ms(),
            portrait_height_fraction: default_portrait_height_fraction(),
            event_capacity: default_event_capacity(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct MpvSection {
    /// Path to the mpv executable. Searched for on PATH when unset.
    pub binary: Option<String>,
    pub ipc_socket: Option<String>,
    #[serde(default)]
    pub extra_args: Vec<String>,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl Default for MpvSection {
    fn default() -> Self {
        Self {
            binary: None,
            ipc_socket: None,
            extra_args: Vec::new(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1:8790".into()
}
fn default_timeline_interval_ms() -> u64 {
    500
}
fn default_portrait_height_fraction() -> f32 {
    DEFAULT_PORTRAIT_HEIGHT_FRACTION
}
fn default_event_capacity() -> usize {
    256
}
fn default_connect_timeout_ms() -> u64 {
    6000
}

/// Generate a commented config file template with the given values filled in.
fn generate_config_template(config: &Config) -> String {
    format!(
        r#"# Aparajito Playback Host Configuration
# Generated automatically on first run. Edit as needed.

[server]
bind_address = "{bind_address}"
# Directory with the built web UI:
# web_dir = "./web"

[playback]
# Playback engine: "mpv" (default) or "simulated".
backend = "{backend}"
# How often position updates are pushed while playing (250-1000 ms).
timeline_interval_ms = {timeline_interval_ms}
# Share of the window height the player keeps in portrait mode.
portrait_height_fraction = {portrait_height_fraction}
event_capacity = {event_capacity}

[mpv]
# binary = "/usr/bin/mpv"
# ipc_socket = "/tmp/aparajito-mpv.sock"
extra_args = []
connect_timeout_ms = {connect_timeout_ms}
"#,
        bind_address = config.server.bind_address,
        backend = config.playback.backend.as_str(),
        timeline_interval_ms = config.playback.timeline_interval_ms,
        portrait_height_fraction = config.playback.portrait_height_fraction,
        event_capacity = config.playback.event_capacity,
        connect_timeout_ms = config.mpv.connect_timeout_ms,
    )
}

// ── Config Loading ───────────────────────────────────────────────────────────

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let mut config = if std::path::Path::new(path).exists() {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        } else {
            tracing::info!(
                "Config file not found at '{}', generating defaults...",
                path
            );
            let config = Config::default();

            if let Some(parent) = std::path::Path::new(path).parent() {
                fs::create_dir_all(parent)?;
            }

            let template = generate_config_template(&config);
            fs::write(path, &template)?;
            tracing::info!("Generated default config at '{}'", path);
            config
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var("APARAJITO_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Ok(value) = std::env::var("APARAJITO_WEB_DIR") {
            self.server.web_dir = Some(value);
        }
        if let Ok(value) = std::env::var("APARAJITO_BACKEND") {
            match value.trim().to_ascii_lowercase().as_str() {
                "mpv" => self.playback.backend = BackendKind::Mpv,
                "simulated" => self.playback.backend = BackendKind::Simulated,
                _ => {
                    tracing::warn!(
                        "Ignoring invalid APARAJITO_BACKEND value '{}'; expected mpv or simulated",
                        value
                    );
                }
            }
        }
        if let Ok(value) = std::env::var("APARAJITO_TIMELINE_INTERVAL_MS") {
            if let Ok(parsed) = value.parse::<u64>() {
                self.playback.timeline_interval_ms = parsed;
            }
        }
        if let Ok(value) = std::env::var("APARAJITO_PORTRAIT_HEIGHT_FRACTION") {
            if let Ok(parsed) = value.parse::<f32>() {
                self.playback.portrait_height_fraction = parsed;
            }
        }
        if let Ok(value) = std::env::var("APARAJITO_EVENT_CAPACITY") {
            if let Ok(parsed) = value.parse::<usize>() {
                self.playback.event_capacity = parsed;
            }
        }
        if let Ok(value) = std::env::var("APARAJITO_MPV_BINARY") {
            self.mpv.binary = Some(value);
        }
        if let Ok(value) = std::env::var("APARAJITO_MPV_IPC_SOCKET") {
            self.mpv.ipc_socket = Some(value);
        }
        if let Ok(value) = std::env::var("APARAJITO_MPV_CONNECT_TIMEOUT_MS") {
            if let Ok(parsed) = value.parse::<u64>() {
                self.mpv.connect_timeout_ms = parsed;
            }
        }
    }

    pub fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            timeline_interval: Duration::from_millis(self.playback.timeline_interval_ms),
            portrait_height_fraction: self.playback.portrait_height_fraction,
        }
    }

    #[cfg(unix)]
    pub fn mpv_config(&self) -> aparajito_mpv::MpvConfig {
        aparajito_mpv::MpvConfig {
            binary: self.mpv.binary.as_ref().map(Into::into),
            ipc_socket: self.mpv.ipc_socket.as_ref().map(Into::into),
            extra_args: self.mpv.extra_args.clone(),
            connect_timeout: Duration::from_millis(self.mpv.connect_timeout_ms),
        }
    }
}
