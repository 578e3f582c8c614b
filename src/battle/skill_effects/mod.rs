// In: src/battle/skill_effects/mod.rs

// --- 1. DECLARE HELPER MODULES ---
mod action_effects;
mod check_effects;
mod conditional_effects;

// --- 2. IMPORTS ---
use schema::{
    AttackType, CrowdControl, DamageEffect, EffectRecord, HitResult, ImmunityRule, LogicType,
    RangeType, ResourceCost, ResourceType, TargetType,
};
use std::collections::HashMap;
use strum::IntoEnumIterator;

use crate::battle::action_queue::IncomingHit;
use crate::battle::resolver::AttackRequest;
use crate::combatant::{Combatant, CombatantId};

use self::action_effects::{ChainDamageLogic, DamageLogic, ResourceRestoreLogic, SetImmunityLogic};
use self::check_effects::{CheckLogic, CrowdControlPredicate, HitResultPredicate, ResourcePredicate};
use self::conditional_effects::{
    ConditionalAttackLogic, ResourceRefundLogic, SetCrowdControlLogic, SetResourceLogic,
};

// --- 3. THE DATA BUS ---

/// A secondary target struck by a chain effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainHit {
    pub target: CombatantId,
    pub hit_result: HitResult,
}

/// Scratch state threaded through one target's effect chain.
///
/// Created fresh per (skill, target) pair and discarded when that chain ends.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionContext {
    pub caster: CombatantId,
    pub target: CombatantId,
    pub phys_damage: i32,
    pub magic_damage: i32,
    pub last_hit_result: HitResult,
    pub last_attack_type: AttackType,
    pub last_range_type: RangeType,
    /// Result of the most recent Check. Gates the next Conditional.
    pub is_condition_check: bool,
    pub abort: bool,
    /// What the caster paid for this skill-use.
    pub costs: ResourceCost,
    /// Net amounts restored by effects in this chain.
    pub restored: ResourceCost,
    pub chain_hits: Vec<ChainHit>,
}

impl ExecutionContext {
    pub fn new(caster: CombatantId, target: CombatantId) -> Self {
        Self {
            caster,
            target,
            phys_damage: 0,
            magic_damage: 0,
            last_hit_result: HitResult::None,
            last_attack_type: AttackType::empty(),
            last_range_type: RangeType::None,
            is_condition_check: false,
            abort: false,
            costs: ResourceCost::default(),
            restored: ResourceCost::default(),
            chain_hits: Vec::new(),
        }
    }

    /// Seeds the context with the attack that triggered a reaction. The range
    /// falls back to the skill's own range when nothing came in.
    pub fn with_incoming(mut self, incoming: IncomingHit, skill_range: RangeType) -> Self {
        if !incoming.attack_type.is_empty() {
            self.last_attack_type = incoming.attack_type;
        }
        self.last_range_type = if incoming.range_type == RangeType::None {
            skill_range
        } else {
            incoming.range_type
        };
        if incoming.hit_result != HitResult::None {
            self.last_hit_result = incoming.hit_result;
        }
        self
    }

    pub fn with_costs(mut self, costs: ResourceCost) -> Self {
        self.costs = costs;
        self
    }

    pub fn resolve(&self, target: TargetType) -> CombatantId {
        match target {
            TargetType::Caster => self.caster,
            TargetType::Target => self.target,
        }
    }
}

// --- 4. THE CAPABILITY INTERFACE ---

/// What an effect may ask of the battle. Effects never touch combatants
/// directly; every mutation is a request routed through the resolver.
pub trait CombatPort {
    fn combatant(&self, id: CombatantId) -> Option<&Combatant>;

    fn request_attack(&mut self, request: AttackRequest) -> HitResult;

    /// Returns the amounts actually applied.
    fn request_restore(
        &mut self,
        target: CombatantId,
        resources: ResourceType,
        amount: i32,
        allow_overheal: bool,
    ) -> ResourceCost;

    fn request_crowd_control(&mut self, target: CombatantId, flags: CrowdControl, source: CombatantId);

    fn request_immunity(&mut self, target: CombatantId, rule: ImmunityRule);

    /// Next combatant a chain jumps to from `from`, skipping `visited`.
    fn next_chain_target(&self, from: CombatantId, visited: &[CombatantId]) -> Option<CombatantId>;
}

// --- 5. THE EFFECT TABLE ---

/// One effect algorithm.
pub trait EffectLogic: Send + Sync {
    fn execute(&self, record: &EffectRecord, ctx: &mut ExecutionContext, port: &mut dyn CombatPort);
}

/// Static table mapping each logic tag to its algorithm.
pub struct EffectRegistry {
    logics: HashMap<LogicType, Box<dyn EffectLogic>>,
}

impl EffectRegistry {
    /// A table with an algorithm registered for every declared logic tag.
    pub fn standard() -> Self {
        let logics = LogicType::iter()
            .map(|logic_type| (logic_type, standard_logic(logic_type)))
            .collect();
        Self { logics }
    }

    pub fn empty() -> Self {
        Self {
            logics: HashMap::new(),
        }
    }

    pub fn register(&mut self, logic_type: LogicType, logic: Box<dyn EffectLogic>) {
        self.logics.insert(logic_type, logic);
    }

    pub fn unregister(&mut self, logic_type: LogicType) {
        self.logics.remove(&logic_type);
    }

    pub fn is_registered(&self, logic_type: LogicType) -> bool {
        self.logics.contains_key(&logic_type)
    }

    /// Dispatches `record` to its algorithm. Unregistered logic is logged and skipped.
    pub fn process(&self, record: &EffectRecord, ctx: &mut ExecutionContext, port: &mut dyn CombatPort) {
        let logic_type = record.logic_type();
        match self.logics.get(&logic_type) {
            Some(logic) => logic.execute(record, ctx, port),
            None => tracing::warn!("No effect logic registered for {}", logic_type),
        }
    }
}

impl Default for EffectRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for EffectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectRegistry")
            .field("registered", &self.logics.len())
            .finish()
    }
}

fn standard_logic(logic_type: LogicType) -> Box<dyn EffectLogic> {
    match logic_type {
        LogicType::ActionDamage => Box::new(DamageLogic),
        LogicType::ActionChainDamage => Box::new(ChainDamageLogic),
        LogicType::ActionResourceRestore => Box::new(ResourceRestoreLogic),
        LogicType::ActionSetImmunity => Box::new(SetImmunityLogic),
        LogicType::CheckHitResult => Box::new(CheckLogic(HitResultPredicate)),
        LogicType::CheckResource => Box::new(CheckLogic(ResourcePredicate)),
        LogicType::CheckCrowdControl => Box::new(CheckLogic(CrowdControlPredicate)),
        LogicType::ConditionalAttack => Box::new(ConditionalAttackLogic),
        LogicType::ConditionalResourceRefund => Box::new(ResourceRefundLogic),
        LogicType::ConditionalSetCrowdControl => Box::new(SetCrowdControlLogic),
        LogicType::ConditionalSetResource => Box::new(SetResourceLogic),
    }
}

// --- 6. SHARED HELPERS ---

fn mismatched(record: &EffectRecord, expected: LogicType) {
    tracing::warn!(
        "Effect '{}' ({}) was routed to the {} algorithm; skipped",
        record.description,
        record.logic_type(),
        expected
    );
}

/// Scales the caster's attack stats by `damage`'s coefficients and resolves
/// the strike against `target`.
///
/// Marks the chain aborted when the caster is gone.
fn strike(
    damage: &DamageEffect,
    multiplier: f32,
    target: CombatantId,
    ctx: &mut ExecutionContext,
    port: &mut dyn CombatPort,
) -> HitResult {
    let Some(caster_stats) = port.combatant(ctx.caster).map(|c| *c.current_stats()) else {
        ctx.abort = true;
        return HitResult::None;
    };

    let raw_physical =
        (caster_stats.phys_attack as f32 * damage.phys_power_percent as f32 / 100.0 * multiplier) as i32;
    let raw_magic =
        (caster_stats.magic_attack as f32 * damage.magic_power_percent as f32 / 100.0 * multiplier) as i32;
    ctx.phys_damage += raw_physical;
    ctx.magic_damage += raw_magic;

    let attack_type = damage.attack_type(ctx.last_attack_type);
    ctx.last_attack_type = attack_type;

    port.request_attack(AttackRequest {
        attacker: ctx.caster,
        target,
        raw_physical,
        raw_magic,
        attack_type,
        range_type: ctx.last_range_type,
        is_true_strike: damage.is_true_strike,
        is_unblockable: damage.is_unblockable,
    })
}

/// Applies a signed delta to every resource in `resources` on `target` and
/// records what landed in the context.
fn restore_each(
    resources: ResourceType,
    target: CombatantId,
    allow_overheal: bool,
    ctx: &mut ExecutionContext,
    port: &mut dyn CombatPort,
    mut delta_for: impl FnMut(ResourceType, &Combatant) -> i32,
) {
    for resource in ResourceType::ORDERED {
        if !resources.contains(resource) {
            continue;
        }
        let Some(combatant) = port.combatant(target) else {
            ctx.abort = true;
            return;
        };

        let delta = delta_for(resource, combatant);
        if delta == 0 {
            continue;
        }
        let applied = port.request_restore(target, resource, delta, allow_overheal);
        ctx.restored = ctx.restored + applied;
    }
}
