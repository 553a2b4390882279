use crate::error::{BlockchainError, Result};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::time::Duration;

pub static GLOBAL_CONFIG: Lazy<Config> = Lazy::new(Config::new);

/// Previous-hash sentinel carried by genesis blocks. Also the id of the
/// origin (minting) transaction.
pub const GENESIS_HASH: &str = "0";

/// Length of the all-zero hex prefix a mined block hash must start with.
pub const DEFAULT_DIFFICULTY: u32 = 5;

/// A hex SHA-256 digest has 64 characters, so no prefix can be longer.
pub const MAX_DIFFICULTY: u32 = 64;

const DIFFICULTY_KEY: &str = "DIFFICULTY";
const MINING_TIMEOUT_KEY: &str = "MINING_TIMEOUT_SECS";

const DIFFICULTY_ENV: &str = "LEDGER_DIFFICULTY";
const MINING_TIMEOUT_ENV: &str = "LEDGER_MINING_TIMEOUT_SECS";

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    mining: MiningSection,
}

#[derive(Debug, Default, Deserialize)]
struct MiningSection {
    difficulty: Option<u32>,
    timeout_secs: Option<u64>,
}

pub struct Config {
    inner: RwLock<HashMap<String, String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Defaults overlaid with `LEDGER_DIFFICULTY` and
    /// `LEDGER_MINING_TIMEOUT_SECS`. Unparsable values are logged and ignored.
    pub fn new() -> Config {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Config {
        let mut map = HashMap::new();
        map.insert(
            String::from(DIFFICULTY_KEY),
            DEFAULT_DIFFICULTY.to_string(),
        );

        if let Some(value) = lookup(DIFFICULTY_ENV) {
            match parse_difficulty(&value) {
                Ok(difficulty) => {
                    map.insert(String::from(DIFFICULTY_KEY), difficulty.to_string());
                }
                Err(e) => log::warn!("Ignoring {DIFFICULTY_ENV}: {e}"),
            }
        }

        if let Some(value) = lookup(MINING_TIMEOUT_ENV) {
            match value.trim().parse::<u64>() {
                Ok(secs) => {
                    map.insert(String::from(MINING_TIMEOUT_KEY), secs.to_string());
                }
                Err(e) => log::warn!("Ignoring {MINING_TIMEOUT_ENV}: {e}"),
            }
        }

        Config {
            inner: RwLock::new(map),
        }
    }

    /// Build a configuration from defaults plus the given TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Config> {
        let config = Config {
            inner: RwLock::new(HashMap::from([(
                String::from(DIFFICULTY_KEY),
                DEFAULT_DIFFICULTY.to_string(),
            )])),
        };
        config.merge_toml_str(contents)?;
        Ok(config)
    }

    /// Overlay the values found in a TOML document onto this configuration.
    ///
    /// ```toml
    /// [mining]
    /// difficulty = 4
    /// timeout_secs = 30
    /// ```
    pub fn merge_toml_str(&self, contents: &str) -> Result<()> {
        let file: FileConfig = toml::from_str(contents)?;
        if let Some(difficulty) = file.mining.difficulty {
            self.set_difficulty(difficulty)?;
        }
        if let Some(secs) = file.mining.timeout_secs {
            self.set_mining_timeout(Some(Duration::from_secs(secs)));
        }
        Ok(())
    }

    pub fn load_from_file(&self, path: &Path) -> Result<()> {
        let contents = std::fs::read_to_string(path)?;
        self.merge_toml_str(&contents)?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(())
    }

    pub fn get_difficulty(&self) -> u32 {
        let inner = self.inner.read();
        inner
            .get(DIFFICULTY_KEY)
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_DIFFICULTY)
    }

    pub fn set_difficulty(&self, difficulty: u32) -> Result<()> {
        validate_difficulty(difficulty)?;
        let mut inner = self.inner.write();
        inner.insert(String::from(DIFFICULTY_KEY), difficulty.to_string());
        Ok(())
    }

    pub fn get_mining_timeout(&self) -> Option<Duration> {
        let inner = self.inner.read();
        inner
            .get(MINING_TIMEOUT_KEY)
            .and_then(|value| value.parse().ok())
            .map(Duration::from_secs)
    }

    pub fn set_mining_timeout(&self, timeout: Option<Duration>) {
        let mut inner = self.inner.write();
        match timeout {
            Some(timeout) => {
                inner.insert(
                    String::from(MINING_TIMEOUT_KEY),
                    timeout.as_secs().to_string(),
                );
            }
            None => {
                inner.remove(MINING_TIMEOUT_KEY);
            }
        }
    }
}

pub fn validate_difficulty(difficulty: u32) -> Result<()> {
    if difficulty > MAX_DIFFICULTY {
        return Err(BlockchainError::Config(format!(
            "Difficulty {difficulty} exceeds maximum of {MAX_DIFFICULTY}"
        )));
    }
    Ok(())
}

fn parse_difficulty(value: &str) -> Result<u32> {
    let difficulty = value
        .trim()
        .parse::<u32>()
        .map_err(|e| BlockchainError::Config(format!("Invalid difficulty '{value}': {e}")))?;
    validate_difficulty(difficulty)?;
    Ok(difficulty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    type Pairs = &'static [(&'static str, &'static str)];

    fn lookup_from(pairs: Pairs) -> impl Fn(&str) -> Option<String> {
        move |key: &str| {
            pairs
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| value.to_string())
        }
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("LEDGER_DIFFICULTY", "3"),
            ("LEDGER_MINING_TIMEOUT_SECS", " 45 "),
        ]));
        assert_eq!(config.get_difficulty(), 3);
        assert_eq!(config.get_mining_timeout(), Some(Duration::from_secs(45)));
    }

    #[test]
    fn test_bad_env_values_are_ignored() {
        let config = Config::from_lookup(lookup_from(&[
            ("LEDGER_DIFFICULTY", "99"),
            ("LEDGER_MINING_TIMEOUT_SECS", "soon"),
        ]));
        assert_eq!(config.get_difficulty(), DEFAULT_DIFFICULTY);
        assert_eq!(config.get_mining_timeout(), None);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.toml");
        fs::write(&path, "[mining]\ndifficulty = 2\ntimeout_secs = 7\n").unwrap();

        let config = Config::from_lookup(lookup_from(&[("LEDGER_DIFFICULTY", "4")]));
        config.load_from_file(&path).unwrap();

        // The file is applied on top of the environment
        assert_eq!(config.get_difficulty(), 2);
        assert_eq!(config.get_mining_timeout(), Some(Duration::from_secs(7)));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let config = Config::from_toml_str("").unwrap();
        let result = config.load_from_file(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(BlockchainError::Io(_))));
        assert_eq!(config.get_difficulty(), DEFAULT_DIFFICULTY);
    }

    #[test]
    fn test_load_rejects_bad_difficulty_in_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.toml");
        fs::write(&path, "[mining]\ndifficulty = 80\n").unwrap();

        let config = Config::from_toml_str("").unwrap();
        assert!(matches!(
            config.load_from_file(&path),
            Err(BlockchainError::Config(_))
        ));
        assert_eq!(config.get_difficulty(), DEFAULT_DIFFICULTY);
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.get_difficulty(), DEFAULT_DIFFICULTY);
        assert_eq!(config.get_mining_timeout(), None);
    }

    #[test]
    fn test_toml_overrides() {
        let config = Config::from_toml_str(
            r#"
            [mining]
            difficulty = 3
            timeout_secs = 12
            "#,
        )
        .unwrap();
        assert_eq!(config.get_difficulty(), 3);
        assert_eq!(config.get_mining_timeout(), Some(Duration::from_secs(12)));
    }

    #[test]
    fn test_difficulty_out_of_range_rejected() {
        let result = Config::from_toml_str("[mining]\ndifficulty = 65\n");
        assert!(matches!(result, Err(BlockchainError::Config(_))));
    }

    #[test]
    fn test_malformed_toml_rejected() {
        let result = Config::from_toml_str("[mining\ndifficulty = ");
        assert!(matches!(result, Err(BlockchainError::Config(_))));
    }

    #[test]
    fn test_parse_difficulty() {
        assert_eq!(parse_difficulty(" 4 ").unwrap(), 4);
        assert!(parse_difficulty("four").is_err());
        assert!(parse_difficulty("100").is_err());
    }

    #[test]
    fn test_clear_mining_timeout() {
        let config = Config::from_toml_str("[mining]\ntimeout_secs = 5\n").unwrap();
        config.set_mining_timeout(None);
        assert_eq!(config.get_mining_timeout(), None);
    }
}
