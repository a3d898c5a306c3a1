use std::path::Path;

use serde::{Deserialize, Serialize};

/// One batch of enemies spawned together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedWave {
    pub enemy_id: String,
    #[serde(default = "default_wave_count")]
    pub count: u32,
    #[serde(default)]
    pub spawn_delay_ms: Option<f32>,
}

fn default_wave_count() -> u32 {
    1
}

/// Per-level override of the dive scheduler tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiveOverride {
    pub attack_tick_ms: f32,
    pub dive_chance_per_tick: f32,
    pub max_concurrent_divers: u32,
}

/// Immutable configuration for one level of a run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolvedLevelConfig {
    pub level_id: Option<String>,
    pub layout_id: String,
    pub waves: Vec<ResolvedWave>,
    pub dive: Option<DiveOverride>,
    /// Enemy fire chance per second, as a percentage (0-100).
    pub shooting: Option<f32>,
}

/// Everything the simulation needs to know about a run's content.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolvedRunConfig {
    pub levels: Vec<ResolvedLevelConfig>,
}

/// Failure to read or parse a configuration document.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config: {e}"),
            Self::Parse(m) => write!(f, "failed to parse config: {m}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Parse(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl ResolvedRunConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_json_str(contents: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Read a run config from disk, choosing the format by file extension.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&contents),
            _ => Self::from_toml_str(&contents),
        }
    }

    pub fn level(&self, index: usize) -> Option<&ResolvedLevelConfig> {
        self.levels.get(index)
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }
}
