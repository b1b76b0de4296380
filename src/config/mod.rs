//! Configuration for the slimekeep CLI and engine.
//!
//! A small TOML file covers the two things the engine cannot decide for
//! itself: where the sled store lives and which player identity the local
//! process acts as.
//!
//! ```toml
//! [storage]
//! data_dir = "data/slimekeep"
//!
//! [player]
//! key = "alice"
//! display_name = "Alice"
//! ```

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub storage: StorageConfig,
    pub player: PlayerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for the sled database.
    pub data_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Stable storage key for this player. Lowercased by the store.
    pub key: String,
    /// Name shown on market offers this player creates.
    pub display_name: String,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            player: PlayerConfig::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "data/slimekeep".to_string(),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            key: "player1".to_string(),
            display_name: "Player One".to_string(),
        }
    }
}

impl GameConfig {
    /// Load and validate a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: GameConfig =
            toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Write a default configuration file, refusing to overwrite.
    pub fn create_default<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if path.exists() {
            return Err(anyhow!("config file {} already exists", path.display()));
        }
        let rendered = toml::to_string_pretty(&GameConfig::default())?;
        std::fs::write(path, rendered)
            .with_context(|| format!("writing config file {}", path.display()))?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.storage.data_dir.trim().is_empty() {
            return Err(anyhow!("storage.data_dir must not be empty"));
        }
        if self.player.key.trim().is_empty() {
            return Err(anyhow!("player.key must not be empty"));
        }
        if self.player.display_name.trim().is_empty() {
            return Err(anyhow!("player.display_name must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let rendered = toml::to_string_pretty(&GameConfig::default()).unwrap();
        let parsed: GameConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.storage.data_dir, "data/slimekeep");
        assert_eq!(parsed.player.key, "player1");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let parsed: GameConfig = toml::from_str("[player]\nkey = \"alice\"\n").unwrap();
        assert_eq!(parsed.player.key, "alice");
        assert_eq!(parsed.player.display_name, "Player One");
        assert_eq!(parsed.storage.data_dir, "data/slimekeep");
    }

    #[test]
    fn empty_player_key_fails_validation() {
        let config = GameConfig {
            player: PlayerConfig {
                key: "  ".into(),
                ..PlayerConfig::default()
            },
            ..GameConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
