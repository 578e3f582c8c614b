use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the tactics-battle engine.
///
/// Only loading and configuration surface errors. The simulation itself
/// logs and skips runtime problems instead of failing.
#[derive(Debug, Error)]
pub enum BattleEngineError {
    /// Error related to authored skill or combatant content
    #[error("Content error: {0}")]
    Content(#[from] ContentError),
    /// Error related to engine configuration
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors raised while loading skills and combatant templates.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed content in {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error("Content directory not found: {0}")]
    MissingDirectory(PathBuf),
    #[error("Skill '{skill}' referenced by '{owner}' is not in the library")]
    UnknownSkill { owner: String, skill: String },
    #[error("Duplicate skill name: {0}")]
    DuplicateSkill(String),
}

/// Errors raised while loading or validating a `BattleConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed config: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Type alias for Results using BattleEngineError
pub type BattleResult<T> = Result<T, BattleEngineError>;

/// Type alias for Results using ContentError
pub type ContentResult<T> = Result<T, ContentError>;
