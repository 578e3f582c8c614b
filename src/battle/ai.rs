//! Turn drivers: whatever decides what a combatant does with its turn.

use schema::{Faction, SkillDefinition};
use std::sync::Arc;

use crate::battle::state::BattleWorld;
use crate::combatant::CombatantId;

/// A skill chosen for a turn, not yet paid for or resolved.
#[derive(Debug, Clone)]
pub struct SkillRequest {
    pub skill: Arc<SkillDefinition>,
    pub targets: Vec<CombatantId>,
}

#[derive(Debug, Clone)]
pub enum TurnDecision {
    Use(SkillRequest),
    Pass,
    /// The turn belongs to an outside controller; the session waits for a
    /// `request_use_skill` call.
    AwaitInput,
}

/// A trait for any system that can decide on a combatant's turn.
pub trait TurnDriver {
    fn decide(&mut self, actor: CombatantId, world: &mut BattleWorld) -> TurnDecision;
}

/// Uses the first equipped active skill the actor can pay for, aimed at a
/// random surviving opponent. Passes when there is no such skill or opponent.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstActiveSkillDriver;

impl TurnDriver for FirstActiveSkillDriver {
    fn decide(&mut self, actor: CombatantId, world: &mut BattleWorld) -> TurnDecision {
        let Some(combatant) = world.registry.get(actor) else {
            return TurnDecision::Pass;
        };

        let steepness = world.config.cost_steepness;
        let factor = world.config.cost_factor;
        let skill = combatant
            .equipped_skills()
            .filter(|skill| skill.is_active())
            .find(|skill| combatant.can_afford(&combatant.progressive_cost(skill, steepness, factor)))
            .cloned();
        let Some(skill) = skill else {
            tracing::debug!("{} has no affordable active skill", combatant.name());
            return TurnDecision::Pass;
        };

        let opponents: Vec<CombatantId> = world
            .registry
            .survivors(combatant.faction().opponent())
            .map(|c| c.id())
            .collect();
        let target = match opponents.len() {
            0 => return TurnDecision::Pass,
            1 => opponents[0],
            len => opponents[world.rng.pick_index(len, "AI target selection")],
        };

        TurnDecision::Use(SkillRequest {
            skill,
            targets: vec![target],
        })
    }
}

/// Hands one faction's turns to an outside controller and lets `fallback`
/// drive the other.
#[derive(Debug, Clone, Copy)]
pub struct ManualFactionDriver<D: TurnDriver = FirstActiveSkillDriver> {
    manual: Faction,
    fallback: D,
}

impl ManualFactionDriver {
    pub fn new(manual: Faction) -> Self {
        Self {
            manual,
            fallback: FirstActiveSkillDriver,
        }
    }
}

impl<D: TurnDriver> ManualFactionDriver<D> {
    pub fn with_fallback(manual: Faction, fallback: D) -> Self {
        Self { manual, fallback }
    }
}

impl<D: TurnDriver> TurnDriver for ManualFactionDriver<D> {
    fn decide(&mut self, actor: CombatantId, world: &mut BattleWorld) -> TurnDecision {
        match world.registry.get(actor) {
            Some(combatant) if combatant.faction() == self.manual => TurnDecision::AwaitInput,
            _ => self.fallback.decide(actor, world),
        }
    }
}
