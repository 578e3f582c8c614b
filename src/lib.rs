// In: src/lib.rs

//! Tactics Battle Engine
//!
//! The combat-resolution core of a turn-based tactical RPG: a speed-ordered
//! turn scheduler, a data-driven skill effect engine, an attack resolver and
//! an action orchestrator that sequences skills and their reactions against
//! an optional, asynchronous presentation layer.

// --- MODULE DECLARATIONS ---
pub mod battle;
pub mod combatant;
pub mod config;
pub mod content;
pub mod errors;
pub mod registry;

// --- PUBLIC API RE-EXPORTS ---

// --- From the `schema` crate ---
pub use schema::{
    // Bit-sets
    AttackType,
    CrowdControl,
    // Skill data
    EffectKind,
    EffectRecord,
    // Core Enums
    Faction,
    HitResult,
    RangeType,
    ReactionTiming,
    ResourceCost,
    ResourceType,
    ScopeType,
    SkillDefinition,
    SkillKind,
    StatBlock,
};

// --- From this crate's modules (`src/`) ---

// Session and turn flow.
pub use battle::ai::{FirstActiveSkillDriver, ManualFactionDriver, SkillRequest, TurnDecision, TurnDriver};
pub use battle::presentation::{AnimationSignal, NullPresentation, Presentation, SignalSender};
pub use battle::session::{BattleSession, SessionStatus};
pub use battle::state::{BattleEvent, BattleOutcome, EventBus, TurnRng};

// Runtime types for a battle.
pub use combatant::{Combatant, CombatantId};
pub use registry::CombatantRegistry;

// Content and configuration.
pub use config::{BattleConfig, PresentationConfig};
pub use content::{CombatantTemplate, SkillLibrary};

// Crate-specific error and result types.
pub use errors::{BattleEngineError, BattleResult, ConfigError, ContentError, ContentResult};
