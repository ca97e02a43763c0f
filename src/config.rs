use std::io::Read;
use std::path::{Path, PathBuf};

use crate::engine::{check_size, EngineError, DEFAULT_SIZE};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Engine(#[from] EngineError),
}

/// Session settings. Every key is optional in the TOML file.
///
/// ```toml
/// size = 5
/// seed = 42
/// best_score_path = "best.bin"
/// ```
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
pub struct Config {
    /// Board side length.
    #[serde(default = "defaults::size")]
    pub size: usize,

    /// Fixed seed for reproducible games. If None, each game draws one from entropy.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Where the best score is kept. If None, it lives only for the session.
    #[serde(default)]
    pub best_score_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self { size: defaults::size(), seed: None, best_score_path: None }
    }
}

impl Config {
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut file = std::fs::File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject settings that would fail later at game construction.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_size(self.size)?;
        Ok(())
    }
}

mod defaults {
    pub fn size() -> usize { super::DEFAULT_SIZE }
}
