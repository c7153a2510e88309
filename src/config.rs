//! Client configuration
//!
//! Configuration is read from YAML. Every key is optional; missing keys take the
//! defaults below.
//!
//! ```yaml
//! host: localhost
//! port: 8000
//! path: /
//! playback_fps: 60
//! lookahead_frames: 30
//! connect_timeout_ms: 5000
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{DEFAULT_PLAYBACK_FPS, PlaybackRate};
use crate::{Result, SimulationError};

/// Port the simulator websocket listens on
pub const DEFAULT_PORT: u16 = 8000;

/// Frames buffered before playback is considered caught up
pub const DEFAULT_LOOKAHEAD_FRAMES: usize = 30;

/// Settings for connecting to the simulator and pacing playback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulatorConfig {
    /// Host serving the simulator websocket
    pub host: String,
    pub port: u16,
    /// Websocket path, must start with `/`
    pub path: String,
    pub playback_fps: u32,
    pub lookahead_frames: usize,
    pub connect_timeout_ms: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            path: "/".to_string(),
            playback_fps: DEFAULT_PLAYBACK_FPS,
            lookahead_frames: DEFAULT_LOOKAHEAD_FRAMES,
            connect_timeout_ms: 5000,
        }
    }
}

impl SimulatorConfig {
    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        // An empty document means "all defaults"
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Self = serde_yaml_ng::from_str(yaml)
            .map_err(|e| SimulationError::parse_error("configuration", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading configuration from {}", path.display());
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| SimulationError::file_error(path.to_path_buf(), e))?;
        Self::from_yaml_str(&yaml)
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(SimulationError::config_error("host must not be empty"));
        }
        if !self.path.starts_with('/') {
            return Err(SimulationError::config_error(format!(
                "path must start with '/', got '{}'",
                self.path
            )));
        }
        if self.playback_fps == 0 {
            return Err(SimulationError::config_error("playback_fps must be greater than 0"));
        }
        if self.connect_timeout_ms == 0 {
            return Err(SimulationError::config_error(
                "connect_timeout_ms must be greater than 0",
            ));
        }
        Ok(())
    }

    /// Websocket URL of the simulator
    ///
    /// Always `ws://`; the websocket stack is built without TLS.
    pub fn endpoint(&self) -> String {
        format!("ws://{}:{}{}", self.host, self.port, self.path)
    }

    pub fn playback_rate(&self) -> PlaybackRate {
        if self.playback_fps == DEFAULT_PLAYBACK_FPS {
            PlaybackRate::Native
        } else {
            PlaybackRate::Fps(self.playback_fps)
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}
