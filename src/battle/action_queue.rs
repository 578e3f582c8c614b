use std::collections::VecDeque;
use std::sync::Arc;

use schema::{AttackType, HitResult, RangeType, SkillDefinition};

use crate::combatant::CombatantId;

/// Attack facts handed down to a reaction from the attack that triggered it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IncomingHit {
    pub hit_result: HitResult,
    pub attack_type: AttackType,
    pub range_type: RangeType,
}

/// One pending skill-use: either a turn's chosen skill or a queued reaction.
#[derive(Debug, Clone)]
pub struct BattleAction {
    pub caster: CombatantId,
    pub skill: Arc<SkillDefinition>,
    pub targets: Vec<CombatantId>,
    pub incoming: IncomingHit,
}

impl BattleAction {
    pub fn new(caster: CombatantId, skill: Arc<SkillDefinition>, targets: Vec<CombatantId>) -> Self {
        Self {
            caster,
            skill,
            targets,
            incoming: IncomingHit::default(),
        }
    }

    pub fn with_incoming(mut self, incoming: IncomingHit) -> Self {
        self.incoming = incoming;
        self
    }

    pub fn is_reaction(&self) -> bool {
        !self.skill.is_active()
    }
}

/// FIFO of pending skill-uses. Only one drains at a time, so nested reactions
/// run as a flat sequence instead of recursive calls.
#[derive(Debug, Default)]
pub struct ActionQueue {
    actions: VecDeque<BattleAction>,
}

impl ActionQueue {
    pub fn new() -> Self {
        Self {
            actions: VecDeque::new(),
        }
    }

    /// Adds an action to the end of the execution queue.
    pub fn push_back(&mut self, action: BattleAction) {
        self.actions.push_back(action);
    }

    /// Removes and returns the next action to be executed.
    pub fn pop_front(&mut self) -> Option<BattleAction> {
        self.actions.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }
}
