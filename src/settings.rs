use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

use smarthome_client_rs::DEFAULT_PLUG_MODEL;

pub const DEFAULT_WEB_PORT: u16 = 8080;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Shelly Cloud server, e.g. `https://shelly-49-eu.shelly.cloud`.
    pub shelly_host: Option<String>,
    pub shelly_auth_key: Option<String>,
    /// Model codes treated as smart plugs.
    pub plug_models: Vec<String>,
    pub hue_bridge: Option<String>,
    pub hue_username: Option<String>,
    pub poll_interval_ms: u64,
    pub web_enabled: bool,
    pub web_port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            shelly_host: None,
            shelly_auth_key: None,
            plug_models: vec![DEFAULT_PLUG_MODEL.to_string()],
            hue_bridge: None,
            hue_username: None,
            poll_interval_ms: 1000,
            web_enabled: true,
            web_port: DEFAULT_WEB_PORT,
        }
    }
}

impl Settings {
    /// Read settings from a JSON file. A missing or unreadable file falls
    /// back to the defaults; malformed JSON is an error.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) => {
                warn!(
                    "Failed to read settings file {}: {e}, using default settings",
                    path.display()
                );
                Ok(Settings::default())
            }
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}
