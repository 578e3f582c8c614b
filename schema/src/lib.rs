// Tactics Battle Schema - Shared type definitions
// This crate contains the authored, immutable records that the combat core
// consumes: stat blocks, combat enums and bit-sets, skills and their effect
// records. Everything here is plain data with serde support.

// Re-export the main types
pub use combat_types::*;
pub use skill_data::*;
pub use stats::*;

pub mod combat_types;
pub mod skill_data;
pub mod stats;
