use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::combat_types::{
    AttackType, CompareType, CrowdControl, HitResult, RangeType, ReactionTiming, ResourceType,
    ScopeType, TargetType,
};

/// Whether a skill is used on the owner's turn or fires as a reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkillKind {
    Active,
    Passive { timing: ReactionTiming },
}

/// An authored skill: metadata plus an ordered chain of effect records.
///
/// Definitions are immutable once loaded and are shared between every
/// combatant that equips them. Empty slots in `effects` are authoring gaps
/// and are skipped at execution time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub kind: SkillKind,
    #[serde(default)]
    pub range_type: RangeType,
    #[serde(default)]
    pub scope: ScopeType,
    #[serde(default)]
    pub target_count: u8, // Only meaningful when scope includes MULTI
    pub effects: Vec<Option<EffectRecord>>,
}

impl SkillDefinition {
    pub fn is_active(&self) -> bool {
        matches!(self.kind, SkillKind::Active)
    }

    pub fn reaction_timing(&self) -> Option<ReactionTiming> {
        match self.kind {
            SkillKind::Active => None,
            SkillKind::Passive { timing } => Some(timing),
        }
    }

    /// Iterate over the authored (non-empty) effect records.
    pub fn records(&self) -> impl Iterator<Item = &EffectRecord> {
        self.effects.iter().flatten()
    }

    /// Plain sum of every record's cost, without progressive escalation.
    pub fn base_cost(&self) -> ResourceCost {
        self.records()
            .fold(ResourceCost::default(), |total, record| total + record.cost)
    }

    /// The first animator override carried by any record.
    pub fn animator_override(&self) -> Option<&str> {
        self.records().find_map(|record| record.animator_override.as_deref())
    }
}

/// HP/SP/MP amounts, used both for authored costs and for paid totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceCost {
    pub hp: i32,
    pub sp: i32,
    pub mp: i32,
}

impl ResourceCost {
    pub fn is_zero(&self) -> bool {
        self.hp + self.sp + self.mp <= 0
    }

    /// Amount for a single resource flag. Combined flags read as 0.
    pub fn amount(&self, resource: ResourceType) -> i32 {
        if resource == ResourceType::HP {
            self.hp
        } else if resource == ResourceType::SP {
            self.sp
        } else if resource == ResourceType::MP {
            self.mp
        } else {
            0
        }
    }

    pub fn add_amount(&mut self, resource: ResourceType, amount: i32) {
        if resource == ResourceType::HP {
            self.hp += amount;
        } else if resource == ResourceType::SP {
            self.sp += amount;
        } else if resource == ResourceType::MP {
            self.mp += amount;
        }
    }
}

impl std::ops::Add for ResourceCost {
    type Output = ResourceCost;

    fn add(self, rhs: ResourceCost) -> ResourceCost {
        ResourceCost {
            hp: self.hp + rhs.hp,
            sp: self.sp + rhs.sp,
            mp: self.mp + rhs.mp,
        }
    }
}

/// One authored step of a skill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectRecord {
    #[serde(default)]
    pub description: String,
    /// Animation trigger played when the step starts. Opaque to the core.
    #[serde(default)]
    pub animation_trigger: Option<String>,
    /// Presentation key to wait for before applying the step. Opaque to the core.
    #[serde(default)]
    pub trigger_key: Option<String>,
    /// Skill-specific animator handle. Opaque to the core.
    #[serde(default)]
    pub animator_override: Option<String>,
    #[serde(default)]
    pub cost: ResourceCost,
    pub effect: EffectKind,
}

impl EffectRecord {
    /// A record with no presentation hints and no cost.
    pub fn new(effect: EffectKind) -> Self {
        Self {
            description: String::new(),
            animation_trigger: None,
            trigger_key: None,
            animator_override: None,
            cost: ResourceCost::default(),
            effect,
        }
    }

    pub fn with_cost(mut self, cost: ResourceCost) -> Self {
        self.cost = cost;
        self
    }

    pub fn with_trigger_key(mut self, key: &str) -> Self {
        self.trigger_key = Some(key.to_string());
        self
    }

    pub fn with_animation_trigger(mut self, trigger: &str) -> Self {
        self.animation_trigger = Some(trigger.to_string());
        self
    }

    pub fn family(&self) -> EffectFamily {
        self.effect.family()
    }

    pub fn logic_type(&self) -> LogicType {
        self.effect.logic_type()
    }
}

/// The three effect families. The family decides which operations are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum EffectFamily {
    Action,
    Check,
    Conditional,
}

/// Logic tag that maps a record to its algorithm in the effect table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize)]
pub enum LogicType {
    ActionDamage,
    ActionChainDamage,
    ActionResourceRestore,
    ActionSetImmunity,
    CheckHitResult,
    CheckResource,
    CheckCrowdControl,
    ConditionalAttack,
    ConditionalResourceRefund,
    ConditionalSetCrowdControl,
    ConditionalSetResource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EffectKind {
    Action(ActionEffect),
    Check(CheckEffect),
    Conditional(ConditionalEffect),
}

impl EffectKind {
    pub fn family(&self) -> EffectFamily {
        match self {
            EffectKind::Action(_) => EffectFamily::Action,
            EffectKind::Check(_) => EffectFamily::Check,
            EffectKind::Conditional(_) => EffectFamily::Conditional,
        }
    }

    pub fn logic_type(&self) -> LogicType {
        match self {
            EffectKind::Action(action) => match action {
                ActionEffect::Damage(_) => LogicType::ActionDamage,
                ActionEffect::ChainDamage(_) => LogicType::ActionChainDamage,
                ActionEffect::ResourceRestore(_) => LogicType::ActionResourceRestore,
                ActionEffect::SetImmunity(_) => LogicType::ActionSetImmunity,
            },
            EffectKind::Check(check) => match check.condition {
                CheckCondition::HitResult(_) => LogicType::CheckHitResult,
                CheckCondition::Resource(_) => LogicType::CheckResource,
                CheckCondition::CrowdControl(_) => LogicType::CheckCrowdControl,
            },
            EffectKind::Conditional(conditional) => match conditional {
                ConditionalEffect::Attack(_) => LogicType::ConditionalAttack,
                ConditionalEffect::ResourceRefund(_) => LogicType::ConditionalResourceRefund,
                ConditionalEffect::SetCrowdControl(_) => LogicType::ConditionalSetCrowdControl,
                ConditionalEffect::SetResource(_) => LogicType::ConditionalSetResource,
            },
        }
    }
}

// --- Action family ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionEffect {
    Damage(DamageEffect),
    ChainDamage(ChainDamageEffect),
    ResourceRestore(ResourceRestoreEffect),
    SetImmunity(SetImmunityEffect),
}

/// Damage scaled from the caster's attack stats, in percent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DamageEffect {
    pub phys_power_percent: i32,
    pub magic_power_percent: i32,
    pub is_unblockable: bool,
    pub is_true_strike: bool,
}

impl DamageEffect {
    /// Attack-type bits implied by the non-zero coefficients, merged with `incoming`.
    pub fn attack_type(&self, incoming: AttackType) -> AttackType {
        let mut attack_type = incoming;
        if self.phys_power_percent > 0 {
            attack_type |= AttackType::PHYSICAL;
        }
        if self.magic_power_percent > 0 {
            attack_type |= AttackType::MAGIC;
        }
        attack_type
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainMode {
    #[default]
    Decay,       // Each jump multiplies by decay_rate% again
    Distributed, // Each jump reads its share from the distribution table
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainDamageEffect {
    pub damage: DamageEffect,
    pub mode: ChainMode,
    pub max_targets: u8,
    pub decay_rate: i32,         // Percent
    pub distribution: Vec<i32>,  // Basis points, 10000 = 100%
}

impl ChainDamageEffect {
    /// Damage multiplier for the given jump (0 = the first target).
    pub fn step_multiplier(&self, step: usize) -> f32 {
        match self.mode {
            ChainMode::Decay => (self.decay_rate as f32 / 100.0).powi(step as i32),
            ChainMode::Distributed => self
                .distribution
                .get(step)
                .map(|share| *share as f32 / 10_000.0)
                .unwrap_or(1.0),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RestoreMode {
    #[default]
    FixedValue,
    PercentOfMax,
    ScalingValue, // value% of the caster's magic attack
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceRestoreEffect {
    pub resources: ResourceType,
    pub target: TargetType,
    pub mode: RestoreMode,
    pub value: i32,
    pub allow_overheal: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetImmunityEffect {
    pub attack_type: AttackType,
    pub range_type: RangeType,
}

// --- Check family ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckEffect {
    #[serde(default)]
    pub break_chain_on_fail: bool,
    pub condition: CheckCondition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CheckCondition {
    HitResult(HitResultCheck),
    Resource(ResourceCheck),
    CrowdControl(CrowdControlCheck),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HitResultCheck {
    pub hit_result: HitResult,
    pub attack_type: AttackType, // Empty = any
    pub range_type: RangeType,   // None = any
}

impl Default for HitResultCheck {
    fn default() -> Self {
        Self {
            hit_result: HitResult::Hit,
            attack_type: AttackType::empty(),
            range_type: RangeType::None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckMode {
    #[default]
    FixedValue,
    PercentOfMax,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceCheck {
    pub resources: ResourceType,
    pub target: TargetType,
    pub mode: CheckMode,
    pub compare: CompareType,
    pub value: i32,
}

impl Default for ResourceCheck {
    fn default() -> Self {
        Self {
            resources: ResourceType::HP,
            target: TargetType::Caster,
            mode: CheckMode::FixedValue,
            compare: CompareType::Equal,
            value: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrowdControlCheck {
    pub flags: CrowdControl,
}

// --- Conditional family ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConditionalEffect {
    Attack(DamageEffect),
    ResourceRefund(ResourceRefundEffect),
    SetCrowdControl(SetCrowdControlEffect),
    SetResource(SetResourceEffect),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceRefundEffect {
    pub refund_percent: i32, // 0..=100
}

impl Default for ResourceRefundEffect {
    fn default() -> Self {
        Self { refund_percent: 50 }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetCrowdControlEffect {
    pub flags: CrowdControl,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetMode {
    #[default]
    FixedValue,       // Force the resource to exactly `value`
    PercentOfCurrent, // Reduce by `value`% of the current amount
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetResourceEffect {
    pub resources: ResourceType,
    pub target: TargetType,
    pub mode: SetMode,
    pub value: i32,
}

impl Default for SetResourceEffect {
    fn default() -> Self {
        Self {
            resources: ResourceType::empty(),
            target: TargetType::Caster,
            mode: SetMode::FixedValue,
            value: 0,
        }
    }
}
