//! Engine tuning knobs, loadable from RON.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::errors::ConfigError;

/// Tunables for one battle session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    /// Roster cap per faction; registrations beyond it are ignored.
    pub max_units_per_side: usize,
    /// Added to `accuracy - dodge` before the avoidance roll.
    pub hit_chance_offset: i32,
    pub block_damage_multiplier: f32,
    pub critical_damage_multiplier: f32,
    /// Defaults handed to combatants that don't specify their own cost curve.
    pub cost_steepness: f32,
    pub cost_factor: f32,
    /// Safety cap on the number of turns `BattleSession::run` will start.
    pub max_turns: Option<u32>,
    pub presentation: PresentationConfig,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            max_units_per_side: 5,
            hit_chance_offset: 0,
            block_damage_multiplier: 0.5,
            critical_damage_multiplier: 1.5,
            cost_steepness: 2.0,
            cost_factor: 1.0,
            max_turns: None,
            presentation: PresentationConfig::default(),
        }
    }
}

/// Timing of presentation beats and signal waits, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresentationConfig {
    /// When false the session runs headless and never suspends.
    pub enabled: bool,
    pub signal_timeout_secs: f32,
    pub default_move_secs: f32,
    pub default_attack_secs: f32,
    pub default_return_secs: f32,
    pub hit_signal_slack_secs: f32,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            signal_timeout_secs: 10.0,
            default_move_secs: 1.0,
            default_attack_secs: 0.5,
            default_return_secs: 1.0,
            hit_signal_slack_secs: 0.1,
        }
    }
}

impl PresentationConfig {
    pub fn headless() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn signal_timeout(&self) -> Duration {
        Duration::from_secs_f32(self.signal_timeout_secs)
    }
}

impl BattleConfig {
    /// Default tuning with every presentation wait disabled.
    pub fn headless() -> Self {
        Self {
            presentation: PresentationConfig::headless(),
            ..Self::default()
        }
    }

    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        let config: BattleConfig = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_units_per_side == 0 {
            return Err(ConfigError::Invalid {
                field: "max_units_per_side",
                reason: "must allow at least one unit".to_string(),
            });
        }
        if self.block_damage_multiplier < 0.0 || self.critical_damage_multiplier < 0.0 {
            return Err(ConfigError::Invalid {
                field: "damage multipliers",
                reason: "must not be negative".to_string(),
            });
        }
        if self.cost_steepness < 1.0 {
            return Err(ConfigError::Invalid {
                field: "cost_steepness",
                reason: format!("{} is below linear (1.0)", self.cost_steepness),
            });
        }

        let presentation = &self.presentation;
        let durations = [
            ("presentation.signal_timeout_secs", presentation.signal_timeout_secs),
            ("presentation.default_move_secs", presentation.default_move_secs),
            ("presentation.default_attack_secs", presentation.default_attack_secs),
            ("presentation.default_return_secs", presentation.default_return_secs),
            ("presentation.hit_signal_slack_secs", presentation.hit_signal_slack_secs),
        ];
        for (field, value) in durations {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("{} is not a valid duration", value),
                });
            }
        }

        Ok(())
    }
}
