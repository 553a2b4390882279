//! Configuration management
//!
//! Process-wide constants (genesis sentinel, default difficulty) and the
//! runtime settings that can be overridden from the environment or a TOML file.

pub mod settings;

pub use settings::{
    validate_difficulty, Config, DEFAULT_DIFFICULTY, GENESIS_HASH, GLOBAL_CONFIG, MAX_DIFFICULTY,
};
