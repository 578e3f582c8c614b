use std::sync::Arc;

use schema::{
    ActionEffect, CheckCondition, CheckEffect, ConditionalEffect, DamageEffect, EffectKind,
    EffectRecord, Faction, HitResult, HitResultCheck, RangeType, ReactionTiming, ResourceRestoreEffect,
    ResourceType, RestoreMode, ScopeType, SkillDefinition, SkillKind, StatBlock, TargetType,
};

use crate::battle::orchestrator::ActionOrchestrator;
use crate::battle::presentation::{AnimationSignals, NullPresentation, Presentation};
use crate::battle::state::{BattleWorld, TurnRng};
use crate::combatant::{Combatant, CombatantId};
use crate::config::BattleConfig;

/// A builder for creating test combatants with common defaults: 100 hp,
/// accuracy 100, speed 10 and every other stat at zero.
///
/// # Example
/// ```ignore
/// let knight = TestCombatantBuilder::new("Knight")
///     .phys_attack(100)
///     .skill(active_skill("Slash", vec![damage(100)]))
///     .register(&mut world, Faction::Ally);
/// ```
pub struct TestCombatantBuilder {
    name: String,
    stats: StatBlock,
    grid_index: u8,
    skills: Vec<Arc<SkillDefinition>>,
    current_hp: Option<i32>,
    current_sp: Option<i32>,
    current_mp: Option<i32>,
}

impl TestCombatantBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            stats: StatBlock {
                hp: 100,
                accuracy_rate: 100,
                speed: 10,
                ..Default::default()
            },
            grid_index: 1,
            skills: Vec::new(),
            current_hp: None,
            current_sp: None,
            current_mp: None,
        }
    }

    /// Replaces the base stats wholesale.
    pub fn stats(mut self, stats: StatBlock) -> Self {
        self.stats = stats;
        self
    }

    pub fn hp(mut self, hp: i32) -> Self {
        self.stats.hp = hp;
        self
    }

    pub fn sp(mut self, sp: i32) -> Self {
        self.stats.sp = sp;
        self
    }

    pub fn mp(mut self, mp: i32) -> Self {
        self.stats.mp = mp;
        self
    }

    pub fn phys_attack(mut self, value: i32) -> Self {
        self.stats.phys_attack = value;
        self
    }

    pub fn magic_attack(mut self, value: i32) -> Self {
        self.stats.magic_attack = value;
        self
    }

    pub fn phys_defense(mut self, value: i32) -> Self {
        self.stats.phys_defense = value;
        self
    }

    pub fn magic_defense(mut self, value: i32) -> Self {
        self.stats.magic_defense = value;
        self
    }

    pub fn speed(mut self, value: i32) -> Self {
        self.stats.speed = value;
        self
    }

    pub fn accuracy(mut self, value: i32) -> Self {
        self.stats.accuracy_rate = value;
        self
    }

    pub fn dodge(mut self, value: i32) -> Self {
        self.stats.dodge_rate = value;
        self
    }

    pub fn critical(mut self, value: i32) -> Self {
        self.stats.critical_rate = value;
        self
    }

    pub fn block(mut self, value: i32) -> Self {
        self.stats.block_rate = value;
        self
    }

    pub fn grid(mut self, grid_index: u8) -> Self {
        self.grid_index = grid_index;
        self
    }

    pub fn skill(mut self, skill: Arc<SkillDefinition>) -> Self {
        self.skills.push(skill);
        self
    }

    /// Sets the starting hp. If not set, hp starts at max.
    pub fn current_hp(mut self, hp: i32) -> Self {
        self.current_hp = Some(hp);
        self
    }

    pub fn current_sp(mut self, sp: i32) -> Self {
        self.current_sp = Some(sp);
        self
    }

    pub fn current_mp(mut self, mp: i32) -> Self {
        self.current_mp = Some(mp);
        self
    }

    pub fn build(self) -> Combatant {
        let mut current = self.stats;
        if let Some(hp) = self.current_hp {
            current.hp = hp;
        }
        if let Some(sp) = self.current_sp {
            current.sp = sp;
        }
        if let Some(mp) = self.current_mp {
            current.mp = mp;
        }

        self.skills.into_iter().fold(
            Combatant::new(&self.name, self.stats)
                .with_grid_index(self.grid_index)
                .with_current_stats(current),
            |combatant, skill| combatant.with_skill(skill),
        )
    }

    /// Builds and registers the combatant, panicking if the roster refuses it.
    pub fn register(self, world: &mut BattleWorld, faction: Faction) -> CombatantId {
        let name = self.name.clone();
        match world.registry.register(self.build(), faction) {
            Some(id) => id,
            None => panic!("Failed to register test combatant {}", name),
        }
    }
}

/// A headless world whose rolls are scripted.
pub fn scripted_world(rolls: Vec<u8>) -> BattleWorld {
    BattleWorld::new(BattleConfig::headless(), TurnRng::new_for_test(rolls))
}

/// Creates a `TurnRng` with a long list of middling rolls (50).
/// Useful when the exact outcome is irrelevant, preventing panics from exhaustion.
pub fn predictable_rng() -> TurnRng {
    TurnRng::new_for_test(vec![50; 200])
}

// --- Skill helpers ---

pub fn active_skill(name: &str, records: Vec<EffectRecord>) -> Arc<SkillDefinition> {
    Arc::new(SkillDefinition {
        name: name.to_string(),
        description: String::new(),
        kind: SkillKind::Active,
        range_type: RangeType::Melee,
        scope: ScopeType::ENEMY | ScopeType::SINGLE,
        target_count: 1,
        effects: records.into_iter().map(Some).collect(),
    })
}

pub fn passive_skill(name: &str, timing: ReactionTiming, scope: ScopeType) -> Arc<SkillDefinition> {
    passive_skill_with(name, timing, scope, vec![])
}

pub fn passive_skill_with(
    name: &str,
    timing: ReactionTiming,
    scope: ScopeType,
    records: Vec<EffectRecord>,
) -> Arc<SkillDefinition> {
    Arc::new(SkillDefinition {
        name: name.to_string(),
        description: String::new(),
        kind: SkillKind::Passive { timing },
        range_type: RangeType::Melee,
        scope,
        target_count: 1,
        effects: records.into_iter().map(Some).collect(),
    })
}

/// A physical strike at `percent` of the caster's physical attack.
pub fn damage(percent: i32) -> EffectRecord {
    EffectRecord::new(EffectKind::Action(ActionEffect::Damage(DamageEffect {
        phys_power_percent: percent,
        ..Default::default()
    })))
}

pub fn check_hit(hit_result: HitResult, break_chain_on_fail: bool) -> EffectRecord {
    EffectRecord::new(EffectKind::Check(CheckEffect {
        break_chain_on_fail,
        condition: CheckCondition::HitResult(HitResultCheck {
            hit_result,
            ..Default::default()
        }),
    }))
}

pub fn conditional_attack(percent: i32) -> EffectRecord {
    EffectRecord::new(EffectKind::Conditional(ConditionalEffect::Attack(DamageEffect {
        phys_power_percent: percent,
        ..Default::default()
    })))
}

/// Flat hp restore aimed at the caster.
pub fn restore_own_hp(amount: i32) -> EffectRecord {
    EffectRecord::new(EffectKind::Action(ActionEffect::ResourceRestore(ResourceRestoreEffect {
        resources: ResourceType::HP,
        target: TargetType::Caster,
        mode: RestoreMode::FixedValue,
        value: amount,
        allow_overheal: false,
    })))
}

/// Drains the world's action queue headlessly with the standard effect table.
pub async fn drain(world: &mut BattleWorld) {
    ActionOrchestrator::default()
        .drain(world, &mut NullPresentation, &mut AnimationSignals::new())
        .await;
}

// --- Presentation double ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Play(CombatantId, String),
    SetOverride(CombatantId, String),
    RestoreDefault(CombatantId),
    Dodge(CombatantId),
}

/// Records every directive and reports the same length for every clip.
#[derive(Debug, Default)]
pub struct RecordingPresentation {
    pub directives: Vec<Directive>,
    pub clip_length: Option<f32>,
}

impl RecordingPresentation {
    pub fn with_clip_length(secs: f32) -> Self {
        Self {
            directives: Vec::new(),
            clip_length: Some(secs),
        }
    }

    pub fn played(&self, trigger: &str) -> usize {
        self.directives
            .iter()
            .filter(|d| matches!(d, Directive::Play(_, t) if t == trigger))
            .count()
    }
}

impl Presentation for RecordingPresentation {
    fn play_animation(&mut self, combatant: CombatantId, trigger: &str) {
        self.directives.push(Directive::Play(combatant, trigger.to_string()));
    }

    fn set_animator_override(&mut self, combatant: CombatantId, handle: &str) {
        self.directives.push(Directive::SetOverride(combatant, handle.to_string()));
    }

    fn restore_default_animator(&mut self, combatant: CombatantId) {
        self.directives.push(Directive::RestoreDefault(combatant));
    }

    fn play_dodge_animation(&mut self, combatant: CombatantId) {
        self.directives.push(Directive::Dodge(combatant));
    }

    fn animation_clip_length(&self, _combatant: CombatantId, _clip: &str) -> Option<f32> {
        self.clip_length
    }
}
